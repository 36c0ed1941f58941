//! `notewire` binary: interactive console menu over the session facade.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use notewire_client::transport::WsConnector;
use notewire_client::{ConnectionManager, ConnectionState, SessionClient};
use notewire_core::notes::{NoteType, NoteView};
use notewire_core::settings::Settings;
use notewire_core::wire::Response;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

/// Console client for a notewire server.
#[derive(Parser, Debug)]
#[command(name = "notewire", version, about)]
struct Args {
    /// Server URL, e.g. `ws://127.0.0.1:8765` (overrides settings).
    #[arg(long)]
    server: Option<String>,

    /// Settings file to load instead of `notewire.json`.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = match &args.settings {
        Some(path) => {
            let mut loaded = Settings::load_from_path(path)?;
            loaded.apply_env(|var| std::env::var(var).ok())?;
            loaded
        }
        None => Settings::load()?,
    };
    let url = args.server.unwrap_or_else(|| settings.server.ws_url());

    let connector = Arc::new(WsConnector::new(url, settings.client.close_timeout()));
    let manager = Arc::new(ConnectionManager::new(connector, settings.client.clone()));
    if manager.start().await.is_err() {
        println!("Failed to connect to server. Please start the server first.");
        return Ok(());
    }

    let mut console = Console {
        client: SessionClient::new(Arc::clone(&manager)),
        lines: BufReader::new(tokio::io::stdin()).lines(),
    };
    let outcome = console.run().await;
    manager.stop().await;
    outcome
}

struct Console {
    client: SessionClient,
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.print_menu();
            let choice = self.prompt("Select an option: ").await?;
            match choice.trim() {
                "1" => self.handle_login().await?,
                "2" => self.handle_register().await?,
                "3" => self.handle_create_note().await?,
                "4" => self.handle_view_notes().await?,
                "5" => self.handle_search_notes().await?,
                "6" => self.handle_update_note().await?,
                "7" => self.handle_delete_note().await?,
                "8" => self.handle_delete_all_notes().await?,
                "9" => self.handle_logout().await,
                "0" => return Ok(()),
                _ => println!("Invalid option"),
            }
        }
    }

    fn print_menu(&self) {
        println!();
        if let Some(user) = self.client.current_user() {
            println!("Logged in as {} <{}>", user.username, user.email);
        }
        if self.client.manager().state() != ConnectionState::Connected {
            println!("(disconnected — trying to reconnect in the background)");
        }
        println!("1. Login");
        println!("2. Register");
        println!("3. Create Note");
        println!("4. View Notes");
        println!("5. Search Notes");
        println!("6. Update Note");
        println!("7. Delete Note");
        println!("8. Delete All Notes");
        println!("9. Logout");
        println!("0. Exit");
    }

    async fn prompt(&mut self, label: &str) -> anyhow::Result<String> {
        print!("{label}");
        std::io::stdout().flush().context("flushing prompt")?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line),
            None => bail!("input closed"),
        }
    }

    async fn handle_login(&mut self) -> anyhow::Result<()> {
        let email = self.prompt("Email: ").await?;
        let password = self.prompt("Password: ").await?;
        let resp = self.client.login(email.trim(), password.trim()).await;
        println!("{}", resp.message);
        Ok(())
    }

    async fn handle_register(&mut self) -> anyhow::Result<()> {
        let username = self.prompt("Username: ").await?;
        let email = self.prompt("Email: ").await?;
        let password = self.prompt("Password: ").await?;
        let resp = self
            .client
            .register(username.trim(), email.trim(), password.trim())
            .await;
        println!("{}", resp.message);
        Ok(())
    }

    async fn handle_create_note(&mut self) -> anyhow::Result<()> {
        let title = self.prompt("Note title: ").await?;
        let content = self.prompt("Note content: ").await?;
        println!("Note types: 1. Text 2. Voice 3. Image");
        let note_type = match self.prompt("Select note type (1-3): ").await?.trim() {
            "2" => NoteType::Voice,
            "3" => NoteType::Image,
            _ => NoteType::Text,
        };
        let encrypt = self
            .prompt("Encrypt note? (y/n): ")
            .await?
            .trim()
            .eq_ignore_ascii_case("y");

        let resp = self
            .client
            .create_note(title.trim(), content.trim(), note_type, encrypt)
            .await;
        println!("{}", resp.message);
        Ok(())
    }

    async fn handle_view_notes(&mut self) -> anyhow::Result<()> {
        let resp = self.client.get_notes().await;
        let Some(notes) = decode_notes(&resp) else {
            println!("{}", resp.message);
            return Ok(());
        };
        if notes.is_empty() {
            println!("No notes found");
            return Ok(());
        }

        println!("\nYour Notes:");
        for (idx, note) in notes.iter().enumerate() {
            println!("{}. {} ({})", idx + 1, note.title, note.note_type);
        }

        let choice = self
            .prompt("Enter note number to view details or 0 to go back: ")
            .await?;
        if let Ok(n) = choice.trim().parse::<usize>() {
            if n > 0 && n <= notes.len() {
                print_note(&notes[n - 1]);
                let _ = self.prompt("\nPress Enter to continue...").await?;
            }
        }
        Ok(())
    }

    async fn handle_search_notes(&mut self) -> anyhow::Result<()> {
        let query = self.prompt("Search query: ").await?;
        let resp = self.client.search_notes(query.trim()).await;
        let Some(notes) = decode_notes(&resp) else {
            println!("{}", resp.message);
            return Ok(());
        };
        if notes.is_empty() {
            println!("No notes found");
        }
        for note in &notes {
            print_note(note);
        }
        Ok(())
    }

    async fn handle_update_note(&mut self) -> anyhow::Result<()> {
        let note_id = self.prompt("Note id: ").await?;
        let title = self.prompt("New title (empty keeps current): ").await?;
        let content = self.prompt("New content (empty keeps current): ").await?;

        let title = (!title.trim().is_empty()).then(|| title.trim().to_string());
        let content = (!content.trim().is_empty()).then(|| content.trim().to_string());
        let resp = self
            .client
            .update_note(note_id.trim(), title.as_deref(), content.as_deref())
            .await;
        println!("{}", resp.message);
        Ok(())
    }

    async fn handle_delete_note(&mut self) -> anyhow::Result<()> {
        let note_id = self.prompt("Note id: ").await?;
        let resp = self.client.delete_note(note_id.trim()).await;
        println!("{}", resp.message);
        Ok(())
    }

    async fn handle_delete_all_notes(&mut self) -> anyhow::Result<()> {
        let confirm = self
            .prompt("Delete ALL notes? This cannot be undone (y/n): ")
            .await?;
        if !confirm.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled");
            return Ok(());
        }
        let resp = self.client.delete_all_notes().await;
        println!("{}", resp.message);
        Ok(())
    }

    async fn handle_logout(&mut self) {
        let resp = self.client.logout().await;
        println!("{}", resp.message);
    }
}

fn decode_notes(resp: &Response) -> Option<Vec<NoteView>> {
    if !resp.is_success() {
        return None;
    }
    let field = resp.field("notes")?;
    NoteView::list_from_wire(field).ok()
}

fn print_note(note: &NoteView) {
    println!("\nTitle: {}", note.title);
    println!("Id: {}", note.id);
    println!("Type: {}", note.note_type);
    println!("Created: {}", note.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Updated: {}", note.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Encrypted: {}", if note.is_encrypted { "Yes" } else { "No" });
    println!("\nContent:\n{}", note.content);
}
