//! Image tab controller
//!
//! Keeps the generation form state (prompt, size, quality, style) alongside
//! the transcript. Form state persists to settings on change and restores
//! on start, so the last-used parameters survive a restart.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, warn};

use banter_api::ApiClient;
use banter_session::SessionSync;
use banter_storage::Database;

use crate::message::{Message, MessageKind, MessageLog};
use crate::options::{ImageOptions, ImageQuality, ImageSize, ImageStyle};

/// Cache name for the image transcript.
const IMAGE_MESSAGES_CACHE: &str = "image-tab-messages";

const PROMPT_KEY: &str = "image-tab-prompt";
const SIZE_KEY: &str = "image-tab-size";
const QUALITY_KEY: &str = "image-tab-quality";
const STYLE_KEY: &str = "image-tab-style";

const GENERATION_FAILED_MESSAGE: &str =
    "Sorry, I encountered an error while generating your image. Please try again.";
const UPLOAD_FAILED_MESSAGE: &str =
    "Sorry, I encountered an error while uploading your image. Please try again.";

pub struct ImageController {
    log: MessageLog,
    options: Arc<RwLock<ImageOptions>>,
    prompt: Arc<RwLock<String>>,
    is_generating: Arc<RwLock<bool>>,
    is_uploading: Arc<RwLock<bool>>,
    db: Database,
    api: ApiClient,
    session: SessionSync,
}

impl ImageController {
    /// Restores the transcript and the persisted form state.
    pub fn new(db: Database, api: ApiClient, session: SessionSync) -> Self {
        let log = MessageLog::new(db.clone(), IMAGE_MESSAGES_CACHE);

        let options = ImageOptions {
            size: restored_setting(&db, SIZE_KEY),
            quality: restored_setting(&db, QUALITY_KEY),
            style: restored_setting(&db, STYLE_KEY),
        };
        let prompt = db.get_setting(PROMPT_KEY).ok().flatten().unwrap_or_default();

        Self {
            log,
            options: Arc::new(RwLock::new(options)),
            prompt: Arc::new(RwLock::new(prompt)),
            is_generating: Arc::new(RwLock::new(false)),
            is_uploading: Arc::new(RwLock::new(false)),
            db,
            api,
            session,
        }
    }

    /// Generates one image from the prompt and current options.
    ///
    /// Empty prompts and unconfigured sessions are silent no-ops, matching
    /// the form guard. The draft prompt is kept on failure and cleared on
    /// success.
    pub async fn generate(&self, prompt: &str) {
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() || !self.session.is_configured() {
            return;
        }

        self.set_prompt(&prompt);
        self.log.append(
            Message::user(format!("Generate image: {prompt}"))
                .with_kind(MessageKind::Image)
                .with_prompt(prompt.as_str()),
        );
        *self.is_generating.write() = true;

        let options = self.options();
        match self
            .api
            .generate_image(
                &prompt,
                options.size.as_str(),
                options.quality.as_str(),
                options.style.as_str(),
            )
            .await
        {
            Ok(image) => {
                self.log.append(
                    Message::assistant(format!("Generated image for: {prompt}"))
                        .with_kind(MessageKind::Image)
                        .with_image_url(image.url)
                        .with_prompt(prompt.as_str()),
                );
                self.set_prompt("");
            }
            Err(e) => {
                warn!(error = %e, "Image generation failed");
                self.log.append(
                    Message::assistant(GENERATION_FAILED_MESSAGE)
                        .with_kind(MessageKind::Image)
                        .with_prompt(prompt.as_str()),
                );
            }
        }

        *self.is_generating.write() = false;
    }

    /// Uploads an image, letting the backend derive a variation from it.
    pub async fn upload(&self, path: &Path, prompt: Option<&str>) {
        if !self.session.is_configured() {
            return;
        }

        *self.is_uploading.write() = true;

        let prompt = prompt.map(str::trim).filter(|p| !p.is_empty());
        match self.api.upload_image_file(path, prompt).await {
            Ok(upload) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("image");
                let mut message = Message::user(format!("Uploaded image: {name}"))
                    .with_kind(MessageKind::Image)
                    .with_prompt(prompt.unwrap_or("Uploaded image"));
                if let Some(url) = upload.display_url() {
                    message = message.with_image_url(url);
                }
                self.log.append(message);
            }
            Err(e) => {
                warn!(error = %e, "Image upload failed");
                self.log.append(
                    Message::assistant(UPLOAD_FAILED_MESSAGE)
                        .with_kind(MessageKind::Image)
                        .with_prompt("Upload error"),
                );
            }
        }

        *self.is_uploading.write() = false;
    }

    // === Form state ===

    pub fn set_prompt(&self, prompt: &str) {
        *self.prompt.write() = prompt.to_string();
        self.persist_setting(PROMPT_KEY, prompt);
    }

    pub fn set_size(&self, size: ImageSize) {
        self.options.write().size = size;
        self.persist_setting(SIZE_KEY, size.as_str());
    }

    pub fn set_quality(&self, quality: ImageQuality) {
        self.options.write().quality = quality;
        self.persist_setting(QUALITY_KEY, quality.as_str());
    }

    pub fn set_style(&self, style: ImageStyle) {
        self.options.write().style = style;
        self.persist_setting(STYLE_KEY, style.as_str());
    }

    fn persist_setting(&self, key: &str, value: &str) {
        if let Err(e) = self.db.set_setting(key, value) {
            error!(key = key, error = %e, "Failed to persist image form state");
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.log.messages()
    }

    pub fn options(&self) -> ImageOptions {
        *self.options.read()
    }

    pub fn prompt(&self) -> String {
        self.prompt.read().clone()
    }

    pub fn is_generating(&self) -> bool {
        *self.is_generating.read()
    }

    pub fn is_uploading(&self) -> bool {
        *self.is_uploading.read()
    }
}

impl Clone for ImageController {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            options: Arc::clone(&self.options),
            prompt: Arc::clone(&self.prompt),
            is_generating: Arc::clone(&self.is_generating),
            is_uploading: Arc::clone(&self.is_uploading),
            db: self.db.clone(),
            api: self.api.clone(),
            session: self.session.clone(),
        }
    }
}

fn restored_setting<T: FromStr + Default>(db: &Database, key: &str) -> T {
    db.get_setting(key)
        .ok()
        .flatten()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Sender;
    use wiremock::matchers::{body_json, method, path};
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

    #[tokio::test]
    async fn test_generate_appends_prompt_and_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/image"))
            .and(body_json(serde_json::json!({
                "prompt": "a sunset",
                "size": "1024x1024",
                "quality": "standard",
                "style": "vivid",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "imageUrls": ["https://img.example/sunset.png"]
            })))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = configured_session(&db, &server).await;
        let image = ImageController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        image.generate("a sunset").await;

        let messages = image.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "Generate image: a sunset");
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].kind, MessageKind::Image);
        assert_eq!(messages[1].content, "Generated image for: a sunset");
        assert_eq!(
            messages[1].image_url.as_deref(),
            Some("https://img.example/sunset.png")
        );
        assert!(!image.is_generating());
        // Draft prompt is consumed by a successful generation
        assert_eq!(image.prompt(), "");
    }

    #[tokio::test]
    async fn test_generate_unconfigured_is_silent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/image"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = SessionSync::new(db.clone(), ApiClient::new(server.uri()).unwrap());
        let image = ImageController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        image.generate("a sunset").await;
        assert!(image.messages().is_empty());
    }

    #[tokio::test]
    async fn test_generate_failure_appends_apology_and_keeps_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/image"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = configured_session(&db, &server).await;
        let image = ImageController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        image.generate("a sunset").await;

        let last = image.messages().pop().unwrap();
        assert_eq!(last.content, GENERATION_FAILED_MESSAGE);
        assert_eq!(last.sender, Sender::Assistant);
        assert_eq!(last.prompt.as_deref(), Some("a sunset"));
        assert!(!image.is_generating());
        assert_eq!(image.prompt(), "a sunset");
    }

    #[tokio::test]
    async fn test_form_state_persists_and_restores() {
        let server = MockServer::start().await;
        let db = Database::open_in_memory().unwrap();
        let api = ApiClient::new(server.uri()).unwrap();
        let session = SessionSync::new(db.clone(), api.clone());

        let image = ImageController::new(db.clone(), api.clone(), session.clone());
        image.set_size(ImageSize::Landscape);
        image.set_quality(ImageQuality::Hd);
        image.set_style(ImageStyle::Natural);
        image.set_prompt("half-finished prompt");

        let restored = ImageController::new(db, api, session);
        assert_eq!(restored.options().size, ImageSize::Landscape);
        assert_eq!(restored.options().quality, ImageQuality::Hd);
        assert_eq!(restored.options().style, ImageStyle::Natural);
        assert_eq!(restored.prompt(), "half-finished prompt");
    }

    #[tokio::test]
    async fn test_garbage_stored_options_fall_back_to_defaults() {
        let server = MockServer::start().await;
        let db = Database::open_in_memory().unwrap();
        db.set_setting(SIZE_KEY, "2048x2048").unwrap();
        db.set_setting(QUALITY_KEY, "ultra").unwrap();

        let api = ApiClient::new(server.uri()).unwrap();
        let session = SessionSync::new(db.clone(), api.clone());
        let image = ImageController::new(db, api, session);

        assert_eq!(image.options().size, ImageSize::Square);
        assert_eq!(image.options().quality, ImageQuality::Standard);
    }

    #[tokio::test]
    async fn test_upload_appends_user_message_with_hosted_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload-image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Image uploaded and processed successfully",
                "fileName": "9f8e_photo.png",
                "imageUrls": ["https://img.example/variation.png"]
            })))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = configured_session(&db, &server).await;
        let image = ImageController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("photo.png");
        std::fs::write(&file_path, b"not really a png").unwrap();

        image.upload(&file_path, Some("make it watercolor")).await;

        let last = image.messages().pop().unwrap();
        assert_eq!(last.content, "Uploaded image: photo.png");
        assert_eq!(last.sender, Sender::User);
        assert_eq!(
            last.image_url.as_deref(),
            Some("https://img.example/variation.png")
        );
        assert_eq!(last.prompt.as_deref(), Some("make it watercolor"));
        assert!(!image.is_uploading());
    }

    #[tokio::test]
    async fn test_upload_failure_appends_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload-image"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let session = configured_session(&db, &server).await;
        let image = ImageController::new(db, ApiClient::new(server.uri()).unwrap(), session);

        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("photo.png");
        std::fs::write(&file_path, b"bytes").unwrap();

        image.upload(&file_path, None).await;

        let last = image.messages().pop().unwrap();
        assert_eq!(last.content, UPLOAD_FAILED_MESSAGE);
        assert_eq!(last.prompt.as_deref(), Some("Upload error"));
        assert!(!image.is_uploading());
    }
}
