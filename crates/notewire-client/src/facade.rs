//! The session facade: user-facing operations over the connection manager.
//!
//! Owns the locally authenticated [`UserIdentity`]. Identity is set only by
//! a successful login response, and cleared on logout — note operations
//! short-circuit with a login-required error before touching the network.

use std::sync::Arc;

use notewire_core::notes::{NoteType, UserIdentity};
use notewire_core::wire::{Action, Response, WireMap, WireValue};
use parking_lot::RwLock;
use tracing::warn;

use crate::manager::ConnectionManager;

/// User-facing client operations.
pub struct SessionClient {
    manager: Arc<ConnectionManager>,
    current_user: RwLock<Option<UserIdentity>>,
}

impl SessionClient {
    /// A facade over an already-constructed manager.
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            current_user: RwLock::new(None),
        }
    }

    /// The underlying connection manager.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// The locally authenticated user, if any.
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.current_user.read().clone()
    }

    /// Authenticate. On success the identity is stored and session
    /// restoration is armed for future reconnects.
    pub async fn login(&self, email: &str, password: &str) -> Response {
        let resp = self
            .manager
            .submit(
                Action::Login,
                fields([("email", email.into()), ("password", password.into())]),
            )
            .await;

        if resp.is_success() {
            match resp.field("user").map(UserIdentity::from_wire) {
                Some(Ok(user)) => {
                    self.manager.set_authenticated(Some(user.id.clone()));
                    *self.current_user.write() = Some(user);
                }
                _ => warn!("login succeeded but the user payload was unreadable"),
            }
        }
        resp
    }

    /// Create an account. Does not authenticate; log in afterwards.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Response {
        self.manager
            .submit(
                Action::Register,
                fields([
                    ("username", username.into()),
                    ("email", email.into()),
                    ("password", password.into()),
                ]),
            )
            .await
    }

    /// Create a note, optionally encrypted at rest.
    pub async fn create_note(
        &self,
        title: &str,
        content: &str,
        note_type: NoteType,
        encrypt: bool,
    ) -> Response {
        let Some(user) = self.current_user() else {
            return login_required();
        };
        self.manager
            .submit(
                Action::CreateNote,
                fields([
                    ("user_id", user.id.as_str().into()),
                    ("title", title.into()),
                    ("content", content.into()),
                    ("note_type", note_type.as_str().into()),
                    ("encrypt", encrypt.into()),
                ]),
            )
            .await
    }

    /// List the authenticated user's notes.
    pub async fn get_notes(&self) -> Response {
        let Some(user) = self.current_user() else {
            return login_required();
        };
        self.manager
            .submit(
                Action::GetNotes,
                fields([("user_id", user.id.as_str().into())]),
            )
            .await
    }

    /// Patch a note's title and/or content.
    pub async fn update_note(
        &self,
        note_id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Response {
        let Some(user) = self.current_user() else {
            return login_required();
        };
        let mut payload = fields([
            ("user_id", user.id.as_str().into()),
            ("note_id", note_id.into()),
        ]);
        if let Some(title) = title {
            let _ = payload.insert("title".to_string(), title.into());
        }
        if let Some(content) = content {
            let _ = payload.insert("content".to_string(), content.into());
        }
        self.manager.submit(Action::UpdateNote, payload).await
    }

    /// Delete one note.
    pub async fn delete_note(&self, note_id: &str) -> Response {
        let Some(user) = self.current_user() else {
            return login_required();
        };
        self.manager
            .submit(
                Action::DeleteNote,
                fields([
                    ("user_id", user.id.as_str().into()),
                    ("note_id", note_id.into()),
                ]),
            )
            .await
    }

    /// Substring search over the authenticated user's notes.
    pub async fn search_notes(&self, query: &str) -> Response {
        let Some(user) = self.current_user() else {
            return login_required();
        };
        self.manager
            .submit(
                Action::SearchNotes,
                fields([
                    ("user_id", user.id.as_str().into()),
                    ("query", query.into()),
                ]),
            )
            .await
    }

    /// Delete every note the authenticated user owns.
    pub async fn delete_all_notes(&self) -> Response {
        let Some(user) = self.current_user() else {
            return login_required();
        };
        self.manager
            .submit(
                Action::DeleteAllNotes,
                fields([("user_id", user.id.as_str().into())]),
            )
            .await
    }

    /// End the login session. Local identity clears regardless of the
    /// server's answer; the server-side operation is idempotent anyway.
    pub async fn logout(&self) -> Response {
        let Some(user) = self.current_user() else {
            return Response::success("Logged out successfully");
        };
        let resp = self
            .manager
            .submit(
                Action::Logout,
                fields([("user_id", user.id.as_str().into())]),
            )
            .await;

        *self.current_user.write() = None;
        self.manager.set_authenticated(None);
        resp
    }
}

fn login_required() -> Response {
    Response::error("You need to login first")
}

fn fields<const N: usize>(pairs: [(&'static str, WireValue); N]) -> WireMap {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeConnector, FakeTransport, connected_frame, success_frame};
    use crate::transport::Connector;
    use notewire_core::ids::UserId;
    use notewire_core::settings::ClientSettings;
    use notewire_core::wire::{Status, encode_response};

    fn make_client(connector: &Arc<FakeConnector>) -> SessionClient {
        let connector: Arc<dyn Connector> = connector.clone();
        SessionClient::new(Arc::new(ConnectionManager::new(
            connector,
            ClientSettings::default(),
        )))
    }

    fn login_success_frame() -> String {
        let user = UserIdentity {
            id: UserId::new("usr_1"),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
        };
        encode_response(
            &Response::success("Login successful")
                .with_action(Action::Login)
                .with_field("user", user.to_wire()),
        )
    }

    #[tokio::test]
    async fn note_operations_require_login_locally() {
        let connector = Arc::new(FakeConnector::new());
        let client = make_client(&connector);

        let responses = [
            client.create_note("T", "c", NoteType::Text, false).await,
            client.get_notes().await,
            client.update_note("note_x", Some("T"), None).await,
            client.delete_note("note_x").await,
            client.search_notes("q").await,
            client.delete_all_notes().await,
        ];
        for resp in responses {
            assert_eq!(resp.status, Status::Error);
            assert_eq!(resp.message, "You need to login first");
        }
        // Nothing reached the network.
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test]
    async fn login_success_stores_identity_and_arms_restore() {
        let connector = Arc::new(FakeConnector::new());
        connector.push_transport(FakeTransport::new(vec![
            connected_frame(),
            login_success_frame(),
        ]));
        let client = make_client(&connector);

        let resp = client.login("a@x.com", "p").await;
        assert!(resp.is_success());

        let user = client.current_user().unwrap();
        assert_eq!(user.id.as_str(), "usr_1");
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn failed_login_leaves_no_identity() {
        let connector = Arc::new(FakeConnector::new());
        connector.push_transport(FakeTransport::new(vec![
            connected_frame(),
            encode_response(&Response::error("Invalid password").with_action(Action::Login)),
        ]));
        let client = make_client(&connector);

        let resp = client.login("a@x.com", "wrong").await;
        assert_eq!(resp.status, Status::Error);
        assert!(client.current_user().is_none());
    }

    #[tokio::test]
    async fn logout_clears_identity_even_when_the_server_errs() {
        let connector = Arc::new(FakeConnector::new());
        connector.push_transport(FakeTransport::new(vec![
            connected_frame(),
            login_success_frame(),
            encode_response(&Response::error("storage offline").with_action(Action::Logout)),
        ]));
        let client = make_client(&connector);

        let _ = client.login("a@x.com", "p").await;
        assert!(client.current_user().is_some());

        let resp = client.logout().await;
        assert_eq!(resp.status, Status::Error);
        assert!(client.current_user().is_none());
    }

    #[tokio::test]
    async fn logout_without_login_is_a_local_noop() {
        let connector = Arc::new(FakeConnector::new());
        let client = make_client(&connector);

        let resp = client.logout().await;
        assert!(resp.is_success());
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test]
    async fn note_requests_carry_the_authenticated_user_id() {
        let connector = Arc::new(FakeConnector::new());
        let transport = FakeTransport::new(vec![
            connected_frame(),
            login_success_frame(),
            success_frame("Note created successfully"),
        ]);
        let sent = transport.sent_frames();
        connector.push_transport(transport);
        let client = make_client(&connector);

        let _ = client.login("a@x.com", "p").await;
        let resp = client.create_note("T", "c", NoteType::Text, true).await;
        assert!(resp.is_success());

        let create_frame = sent.lock().last().unwrap().clone();
        assert!(create_frame.contains("\"user_id\":\"usr_1\""));
        assert!(create_frame.contains("\"encrypt\":true"));
    }
}
