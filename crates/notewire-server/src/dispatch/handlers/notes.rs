//! Note CRUD and search handlers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notewire_core::ids::{ClientId, NoteId};
use notewire_core::notes::{NoteType, NoteView};
use notewire_core::wire::{Request, WireValue};
use notewire_store::NoteCipher;
use notewire_store::sqlite::repositories::note::{CreateNoteOptions, NotePatch};
use notewire_store::sqlite::row_types::NoteRow;
use tracing::{instrument, warn};

use crate::dispatch::errors::HandlerError;
use crate::dispatch::handlers::{flag, optional_ref, require_str, require_user_id};
use crate::dispatch::{Ack, ActionHandler, DispatchContext};

/// What a client sees instead of content that failed to decrypt.
///
/// Decryption failures are logged server-side and never surfaced as
/// protocol errors.
pub const ENCRYPTED_PLACEHOLDER: &str = "[encrypted content unavailable]";

/// Create a note, optionally encrypting its content at rest.
pub struct CreateNoteHandler;

#[async_trait]
impl ActionHandler for CreateNoteHandler {
    #[instrument(skip_all, fields(action = "create_note"))]
    async fn handle(
        &self,
        req: &Request,
        _caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        let title = require_str(req, "title")?;
        let content = require_str(req, "content")?;
        let note_type: NoteType = optional_ref(req, "note_type")
            .unwrap_or("text")
            .parse()
            .map_err(|_| HandlerError::Validation("Invalid note type".to_string()))?;
        let encrypt = flag(req, "encrypt");
        let user_id = optional_ref(req, "user_id");

        let stored_content = if encrypt {
            ctx.cipher.encrypt(content)?
        } else {
            content.to_string()
        };

        let note = ctx.store.create_note(&CreateNoteOptions {
            user_id,
            title,
            content: &stored_content,
            note_type: note_type.as_str(),
            is_encrypted: encrypt,
        })?;

        Ok(Ack::success("Note created successfully").with_field("note_id", WireValue::id(&*note.id)))
    }
}

/// List the caller's notes as redacted views.
pub struct GetNotesHandler;

#[async_trait]
impl ActionHandler for GetNotesHandler {
    #[instrument(skip_all, fields(action = "get_notes"))]
    async fn handle(
        &self,
        req: &Request,
        _caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        let user_id = require_user_id(req)?;
        let rows = ctx.store.list_notes_for_user(user_id)?;
        Ok(Ack::success("Notes retrieved").with_field("notes", views(&rows, &ctx.cipher)))
    }
}

/// Patch a note's title and/or content.
pub struct UpdateNoteHandler;

#[async_trait]
impl ActionHandler for UpdateNoteHandler {
    #[instrument(skip_all, fields(action = "update_note"))]
    async fn handle(
        &self,
        req: &Request,
        _caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        let user_id = require_user_id(req)?;
        let note_id = parse_note_id(req)?;

        // The existing row decides whether new content must be re-encrypted;
        // ownership is enforced again by the update filter itself.
        let existing = ctx
            .store
            .get_note(user_id, note_id.as_str())?
            .ok_or_else(|| HandlerError::NotFound("Note not found or not updated".to_string()))?;

        let title = optional_ref(req, "title");
        let content = optional_ref(req, "content");
        let encrypted;
        let content = match content {
            Some(plain) if existing.is_encrypted => {
                encrypted = ctx.cipher.encrypt(plain)?;
                Some(encrypted.as_str())
            }
            other => other,
        };

        let changed = ctx
            .store
            .update_note(user_id, note_id.as_str(), &NotePatch { title, content })?;
        if !changed {
            return Err(HandlerError::NotFound(
                "Note not found or not updated".to_string(),
            ));
        }
        Ok(Ack::success("Note updated successfully"))
    }
}

/// Delete one note.
pub struct DeleteNoteHandler;

#[async_trait]
impl ActionHandler for DeleteNoteHandler {
    #[instrument(skip_all, fields(action = "delete_note"))]
    async fn handle(
        &self,
        req: &Request,
        _caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        let user_id = require_user_id(req)?;
        let note_id = parse_note_id(req)?;

        let deleted = ctx.store.delete_note(user_id, note_id.as_str())?;
        if !deleted {
            return Err(HandlerError::NotFound(
                "Note not found or not deleted".to_string(),
            ));
        }
        Ok(Ack::success("Note deleted successfully"))
    }
}

/// Substring search over the caller's notes.
pub struct SearchNotesHandler;

#[async_trait]
impl ActionHandler for SearchNotesHandler {
    #[instrument(skip_all, fields(action = "search_notes"))]
    async fn handle(
        &self,
        req: &Request,
        _caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        let user_id = require_user_id(req)?;
        let query = require_str(req, "query")?;
        let rows = ctx.store.search_notes(user_id, query)?;
        Ok(Ack::success("Search results retrieved").with_field("notes", views(&rows, &ctx.cipher)))
    }
}

/// Delete every note the caller owns.
pub struct DeleteAllNotesHandler;

#[async_trait]
impl ActionHandler for DeleteAllNotesHandler {
    #[instrument(skip_all, fields(action = "delete_all_notes"))]
    async fn handle(
        &self,
        req: &Request,
        _caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        let user_id = require_user_id(req)?;
        let deleted = ctx.store.delete_all_notes_for_user(user_id)?;
        Ok(Ack::success("All notes deleted successfully").with_field("deleted_count", deleted))
    }
}

fn parse_note_id(req: &Request) -> Result<NoteId, HandlerError> {
    let raw = optional_ref(req, "note_id")
        .ok_or_else(|| HandlerError::Validation("missing required field `note_id`".to_string()))?;
    NoteId::parse(raw).map_err(|_| HandlerError::Validation("Invalid note id".to_string()))
}

fn views(rows: &[NoteRow], cipher: &NoteCipher) -> Vec<WireValue> {
    rows.iter().map(|row| view(row, cipher).to_wire()).collect()
}

/// Redact a storage row into the client-facing projection.
fn view(row: &NoteRow, cipher: &NoteCipher) -> NoteView {
    let content = if row.is_encrypted {
        match cipher.decrypt(&row.content) {
            Ok(plain) => plain,
            Err(err) => {
                warn!(note_id = %row.id, error = %err, "failed to decrypt note content");
                ENCRYPTED_PLACEHOLDER.to_string()
            }
        }
    } else {
        row.content.clone()
    };

    NoteView {
        id: row.id.clone(),
        title: row.title.clone(),
        content,
        note_type: row.note_type.parse().unwrap_or_default(),
        is_encrypted: row.is_encrypted,
        created_at: parse_stored_time(&row.id, &row.created_at),
        updated_at: parse_stored_time(&row.id, &row.updated_at),
    }
}

fn parse_stored_time(note_id: &str, raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!(note_id, raw, "unparseable stored timestamp");
            Utc::now()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handlers::test_helpers::{TestHarness, make_test_context};
    use notewire_core::wire::Action;

    fn create_req(user: &str, title: &str, content: &str, encrypt: bool) -> Request {
        Request::new(Action::CreateNote)
            .with_field("user_id", user)
            .with_field("title", title)
            .with_field("content", content)
            .with_field("note_type", "text")
            .with_field("encrypt", encrypt)
    }

    async fn create_note(harness: &TestHarness, req: &Request) -> String {
        let ack = CreateNoteHandler
            .handle(req, &ClientId::new("c1"), &harness.context())
            .await
            .unwrap();
        ack.fields.get("note_id").unwrap().as_id().unwrap().to_string()
    }

    async fn list_views(harness: &TestHarness, user: &str) -> Vec<NoteView> {
        let ack = GetNotesHandler
            .handle(
                &Request::new(Action::GetNotes).with_field("user_id", user),
                &ClientId::new("c1"),
                &harness.context(),
            )
            .await
            .unwrap();
        NoteView::list_from_wire(ack.fields.get("notes").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn encrypted_note_round_trips_transparently() {
        let harness = make_test_context();
        let note_id = create_note(&harness, &create_req("usr_1", "T", "hello", true)).await;
        assert!(note_id.starts_with("note_"));

        // Stored content is ciphertext...
        let row = harness.store.get_note("usr_1", &note_id).unwrap().unwrap();
        assert!(row.is_encrypted);
        assert_ne!(row.content, "hello");

        // ...but the view decrypts transparently.
        let views = list_views(&harness, "usr_1").await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].content, "hello");
        assert_eq!(views[0].note_type, NoteType::Text);
        assert!(views[0].is_encrypted);
    }

    #[tokio::test]
    async fn undecryptable_content_becomes_the_placeholder() {
        let harness = make_test_context();
        let note_id = create_note(&harness, &create_req("usr_1", "T", "hello", true)).await;

        // Re-read the same row through a context with a different key.
        let other = DispatchContext {
            store: std::sync::Arc::clone(&harness.store),
            cipher: std::sync::Arc::new(NoteCipher::new("a different passphrase")),
            registry: std::sync::Arc::clone(&harness.registry),
        };
        let ack = GetNotesHandler
            .handle(
                &Request::new(Action::GetNotes).with_field("user_id", "usr_1"),
                &ClientId::new("c1"),
                &other,
            )
            .await
            .unwrap();

        let views = NoteView::list_from_wire(ack.fields.get("notes").unwrap()).unwrap();
        assert_eq!(views[0].content, ENCRYPTED_PLACEHOLDER);
        assert_eq!(views[0].id, note_id);
    }

    #[tokio::test]
    async fn invalid_note_type_is_rejected() {
        let harness = make_test_context();
        let err = CreateNoteHandler
            .handle(
                &Request::new(Action::CreateNote)
                    .with_field("user_id", "usr_1")
                    .with_field("title", "T")
                    .with_field("content", "c")
                    .with_field("note_type", "video"),
                &ClientId::new("c1"),
                &harness.context(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid note type");
    }

    #[tokio::test]
    async fn note_type_defaults_to_text() {
        let harness = make_test_context();
        let _ = create_note(
            &harness,
            &Request::new(Action::CreateNote)
                .with_field("user_id", "usr_1")
                .with_field("title", "T")
                .with_field("content", "c"),
        )
        .await;
        assert_eq!(list_views(&harness, "usr_1").await[0].note_type, NoteType::Text);
    }

    #[tokio::test]
    async fn update_rewrites_and_reencrypts() {
        let harness = make_test_context();
        let note_id = create_note(&harness, &create_req("usr_1", "T", "hello", true)).await;

        let ack = UpdateNoteHandler
            .handle(
                &Request::new(Action::UpdateNote)
                    .with_field("user_id", "usr_1")
                    .with_field("note_id", WireValue::id(&*note_id))
                    .with_field("title", "T2")
                    .with_field("content", "bye"),
                &ClientId::new("c1"),
                &harness.context(),
            )
            .await
            .unwrap();
        assert_eq!(ack.message, "Note updated successfully");

        // Stored content stays ciphertext, view decrypts the new value.
        let row = harness.store.get_note("usr_1", &note_id).unwrap().unwrap();
        assert_ne!(row.content, "bye");
        let views = list_views(&harness, "usr_1").await;
        assert_eq!(views[0].title, "T2");
        assert_eq!(views[0].content, "bye");
    }

    #[tokio::test]
    async fn update_of_another_users_note_is_not_found() {
        let harness = make_test_context();
        let note_id = create_note(&harness, &create_req("usr_1", "T", "hello", false)).await;

        let err = UpdateNoteHandler
            .handle(
                &Request::new(Action::UpdateNote)
                    .with_field("user_id", "usr_2")
                    .with_field("note_id", WireValue::id(&*note_id))
                    .with_field("title", "stolen"),
                &ClientId::new("c1"),
                &harness.context(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Note not found or not updated");
    }

    #[tokio::test]
    async fn malformed_note_id_is_a_validation_error() {
        let harness = make_test_context();
        for handler_err in [
            UpdateNoteHandler
                .handle(
                    &Request::new(Action::UpdateNote)
                        .with_field("user_id", "usr_1")
                        .with_field("note_id", "garbage"),
                    &ClientId::new("c1"),
                    &harness.context(),
                )
                .await
                .unwrap_err(),
            DeleteNoteHandler
                .handle(
                    &Request::new(Action::DeleteNote)
                        .with_field("user_id", "usr_1")
                        .with_field("note_id", "garbage"),
                    &ClientId::new("c1"),
                    &harness.context(),
                )
                .await
                .unwrap_err(),
        ] {
            assert_eq!(handler_err.to_string(), "Invalid note id");
        }
    }

    #[tokio::test]
    async fn delete_missing_note_is_not_found() {
        let harness = make_test_context();
        let err = DeleteNoteHandler
            .handle(
                &Request::new(Action::DeleteNote)
                    .with_field("user_id", "usr_1")
                    .with_field("note_id", NoteId::generate().as_str()),
                &ClientId::new("c1"),
                &harness.context(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Note not found or not deleted");
    }

    #[tokio::test]
    async fn delete_removes_the_note() {
        let harness = make_test_context();
        let note_id = create_note(&harness, &create_req("usr_1", "T", "x", false)).await;

        let ack = DeleteNoteHandler
            .handle(
                &Request::new(Action::DeleteNote)
                    .with_field("user_id", "usr_1")
                    .with_field("note_id", WireValue::id(&*note_id)),
                &ClientId::new("c1"),
                &harness.context(),
            )
            .await
            .unwrap();
        assert_eq!(ack.message, "Note deleted successfully");
        assert!(list_views(&harness, "usr_1").await.is_empty());
    }

    #[tokio::test]
    async fn search_decrypts_matches() {
        let harness = make_test_context();
        let _ = create_note(&harness, &create_req("usr_1", "shopping", "milk", false)).await;
        let _ = create_note(&harness, &create_req("usr_1", "secret plan", "ssh", true)).await;

        let ack = SearchNotesHandler
            .handle(
                &Request::new(Action::SearchNotes)
                    .with_field("user_id", "usr_1")
                    .with_field("query", "secret"),
                &ClientId::new("c1"),
                &harness.context(),
            )
            .await
            .unwrap();
        let views = NoteView::list_from_wire(ack.fields.get("notes").unwrap()).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].content, "ssh");
    }

    #[tokio::test]
    async fn note_actions_without_user_id_require_login() {
        let harness = make_test_context();
        let ctx = harness.context();
        let caller = ClientId::new("c1");

        let get_err = GetNotesHandler
            .handle(&Request::new(Action::GetNotes), &caller, &ctx)
            .await
            .unwrap_err();
        let search_err = SearchNotesHandler
            .handle(
                &Request::new(Action::SearchNotes).with_field("query", "x"),
                &caller,
                &ctx,
            )
            .await
            .unwrap_err();
        for err in [get_err, search_err] {
            assert_eq!(err.to_string(), "You need to login first");
        }
    }

    #[tokio::test]
    async fn delete_all_reports_the_count() {
        let harness = make_test_context();
        let _ = create_note(&harness, &create_req("usr_1", "a", "1", false)).await;
        let _ = create_note(&harness, &create_req("usr_1", "b", "2", false)).await;
        let _ = create_note(&harness, &create_req("usr_2", "c", "3", false)).await;

        let ack = DeleteAllNotesHandler
            .handle(
                &Request::new(Action::DeleteAllNotes).with_field("user_id", "usr_1"),
                &ClientId::new("c1"),
                &harness.context(),
            )
            .await
            .unwrap();
        assert_eq!(ack.message, "All notes deleted successfully");
        assert_eq!(ack.fields.get("deleted_count").unwrap().as_i64(), Some(2));
        assert!(list_views(&harness, "usr_1").await.is_empty());
        assert_eq!(list_views(&harness, "usr_2").await.len(), 1);
    }
}
