//! SQLite plumbing: pool, schema, row shapes, repositories.

pub mod connection;
pub mod repositories;
pub mod row_types;
