//! # notewire-core
//!
//! Shared vocabulary for the notewire client and server:
//!
//! - **Branded IDs**: [`ids::ClientId`], [`ids::UserId`], [`ids::NoteId`] as newtypes
//! - **Wire values**: [`wire::WireValue`] with extended `$id`/`$ts` representations
//! - **Envelopes**: [`wire::Request`] / [`wire::Response`] plus the text codec
//! - **Note projections**: [`notes::NoteView`], [`notes::NoteType`], [`notes::UserIdentity`]
//! - **Errors**: [`errors::ProtocolError`] for everything the codec can reject
//! - **Settings**: [`settings::Settings`] with file and environment layering
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other notewire crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod notes;
pub mod settings;
pub mod wire;
