//! Chat tab controller

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use banter_api::ApiClient;
use banter_session::SessionSync;
use banter_storage::Database;

use crate::message::{Message, MessageKind, MessageLog};

/// Cache name for the chat transcript.
const CHAT_MESSAGES_CACHE: &str = "chat-tab-messages";

const WELCOME_MESSAGE: &str = "Hello! I'm your AI assistant. How can I help you today?";
const CONFIGURE_FIRST_MESSAGE: &str = "Please configure the AI service first.";

pub struct ChatController {
    log: MessageLog,
    is_typing: Arc<RwLock<bool>>,
    is_uploading: Arc<RwLock<bool>>,
    api: ApiClient,
    session: SessionSync,
}

impl ChatController {
    /// Restores the transcript and greets on the first ever start.
    pub fn new(db: Database, api: ApiClient, session: SessionSync) -> Self {
        let log = MessageLog::new(db, CHAT_MESSAGES_CACHE);
        if log.is_empty() {
            log.append(Message::assistant(WELCOME_MESSAGE));
        }

        Self {
            log,
            is_typing: Arc::new(RwLock::new(false)),
            is_uploading: Arc::new(RwLock::new(false)),
            api,
            session,
        }
    }

    /// Sends one chat message.
    ///
    /// Unconfigured sessions get a single inline instruction and no network
    /// call. Every failure becomes an inline `Error:` message; the typing
    /// flag is cleared on all outcomes.
    pub async fn send(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if !self.session.is_configured() {
            self.log.append(Message::assistant(CONFIGURE_FIRST_MESSAGE));
            return;
        }

        *self.is_typing.write() = true;
        self.log.append(Message::user(text));

        match self.api.chat(text).await {
            Ok(reply) => {
                self.log.append(Message::assistant(reply));
            }
            Err(e) => {
                debug!(error = %e, "Chat request failed");
                self.log.append(Message::assistant(format!("Error: {e}")));
            }
        }

        *self.is_typing.write() = false;
    }

    /// Uploads a file as chat context and notes it in the transcript.
    pub async fn upload(&self, path: &Path) {
        if !self.session.is_configured() {
            return;
        }

        *self.is_uploading.write() = true;

        match self.api.upload_chat_file(path).await {
            Ok(_) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("file");
                self.log.append(
                    Message::assistant(format!("Uploaded file: {name}"))
                        .with_kind(MessageKind::File),
                );
            }
            Err(e) => {
                warn!(error = %e, "Chat file upload failed");
                self.log.append(Message::assistant(format!("Error: {e}")));
            }
        }

        *self.is_uploading.write() = false;
    }

    pub fn messages(&self) -> Vec<Message> {
        self.log.messages()
    }

    pub fn is_typing(&self) -> bool {
        *self.is_typing.read()
    }

    pub fn is_uploading(&self) -> bool {
        *self.is_uploading.read()
    }
}

impl Clone for ChatController {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            is_typing: Arc::clone(&self.is_typing),
            is_uploading: Arc::clone(&self.is_uploading),
            api: self.api.clone(),
            session: self.session.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Sender;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn configured_session(db: &Database, server: &MockServer) -> SessionSync {
        db.set_setting("session-id", "sess-test").unwrap();
        Mock::given(method("GET"))
            .and(path("/api/session/sess-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sessionId": "sess-test",
                "openaiApiKey": "sk-test"
            })))
            .mount(server)
            .await;

        let sync = SessionSync::new(db.clone(), ApiClient::new(server.uri()).unwrap());
        sync.initialize().await.unwrap();
        sync
    }

    fn unconfigured_session(db: &Database, server: &MockServer) -> SessionSync {
        SessionSync::new(db.clone(), ApiClient::new(server.uri()).unwrap())
    }

    #[tokio::test]
    async fn test_welcome_message_only_on_first_start() {
        let server = MockServer::start().await;
        let db = Database::open_in_memory().unwrap();
        let api = ApiClient::new(server.uri()).unwrap();
        let session = unconfigured_session(&db, &server);

        let chat = ChatController::new(db.clone(), api.clone(), session.clone());
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].content, WELCOME_MESSAGE);
        assert_eq!(chat.messages()[0].sender, Sender::Assistant);

        // A later start restores the transcript without greeting again
        let again = ChatController::new(db, api, session);
        assert_eq!(again.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_send_appends_instruction_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = unconfigured_session(&db, &server);
        let chat = ChatController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        chat.send("hello").await;

        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, CONFIGURE_FIRST_MESSAGE);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert!(!chat.is_typing());
    }

    #[tokio::test]
    async fn test_send_appends_user_message_and_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": "hi there" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = configured_session(&db, &server).await;
        let chat = ChatController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        chat.send("hello").await;

        let messages = chat.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "hello");
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[2].content, "hi there");
        assert_eq!(messages[2].sender, Sender::Assistant);
        assert!(!chat.is_typing());
    }

    #[tokio::test]
    async fn test_backend_error_becomes_inline_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "error": "model unavailable" })),
            )
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = configured_session(&db, &server).await;
        let chat = ChatController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        chat.send("hello").await;

        let last = chat.messages().pop().unwrap();
        assert_eq!(last.content, "Error: model unavailable");
        assert_eq!(last.sender, Sender::Assistant);
        assert!(!chat.is_typing());
    }

    #[tokio::test]
    async fn test_transport_failure_clears_typing_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = configured_session(&db, &server).await;
        let chat = ChatController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        chat.send("hello").await;

        let last = chat.messages().pop().unwrap();
        assert!(last.content.starts_with("Error:"));
        assert!(!chat.is_typing());
    }

    #[tokio::test]
    async fn test_upload_appends_file_note() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "File uploaded successfully",
                "fileName": "9f8e_notes.txt",
                "context": "chat"
            })))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = configured_session(&db, &server).await;
        let chat = ChatController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("notes.txt");
        std::fs::write(&file_path, b"some notes").unwrap();

        chat.upload(&file_path).await;

        let last = chat.messages().pop().unwrap();
        assert_eq!(last.content, "Uploaded file: notes.txt");
        assert_eq!(last.kind, MessageKind::File);
        assert!(!chat.is_uploading());
    }
}
