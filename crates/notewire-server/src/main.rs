//! `notewire-server` binary: load settings, open collaborators, serve.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use notewire_core::settings::Settings;
use notewire_server::NoteServer;
use notewire_store::{NoteCipher, NoteStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Notes server speaking the notewire session protocol.
#[derive(Parser, Debug)]
#[command(name = "notewire-server", version, about)]
struct Args {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database path (overrides settings).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Settings file to load instead of `notewire.json`.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = match &args.settings {
        Some(path) => {
            let mut loaded = Settings::load_from_path(path)?;
            loaded.apply_env(|var| std::env::var(var).ok())?;
            loaded
        }
        None => Settings::load()?,
    };
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(db) = args.db {
        settings.storage.db_path = db;
    }

    let store = Arc::new(
        NoteStore::open(&settings.storage.db_path)
            .with_context(|| format!("opening database {}", settings.storage.db_path.display()))?,
    );
    let cipher = Arc::new(NoteCipher::new(&settings.encryption_key));
    let server = NoteServer::new(store, cipher);

    let listener = TcpListener::bind(settings.server.bind_addr())
        .await
        .with_context(|| format!("binding {}", settings.server.bind_addr()))?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    server.serve(listener, shutdown).await;
    Ok(())
}
