//! Main workbench state container
//!
//! Owns the database, the API client, the session mirror and the three tab
//! controllers. The terminal shell is purely a renderer; all state flows
//! through here.

use parking_lot::RwLock;
use std::sync::Arc;

use banter_api::{ApiClient, ModelSelection, DEFAULT_CHAT_MODEL, DEFAULT_IMAGE_MODEL};
use banter_session::SessionSync;
use banter_storage::Database;
use banter_tabs::{ChatController, CodingController, ImageController};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

/// Provider credential and model selection, as last submitted or restored.
#[derive(Debug, Clone)]
struct ProviderConfig {
    configured: bool,
    api_key: String,
    chat_model: String,
    image_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            configured: false,
            api_key: String::new(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

/// Main workbench instance
///
/// Central state container for the whole application. Construction wires
/// the storage, API and session layers into the tab controllers; nothing
/// async happens until [`Workbench::initialize`].
pub struct Workbench {
    /// Database
    db: Database,
    /// API client (configuration endpoints; tabs hold their own clone)
    api: ApiClient,
    /// Session mirror
    session: SessionSync,
    /// Chat tab
    chat: ChatController,
    /// Image tab
    image: ImageController,
    /// Coding buddy tab
    coding: CodingController,
    provider: Arc<RwLock<ProviderConfig>>,
}

impl Workbench {
    /// Initialize a new workbench instance
    pub fn new(config: Config) -> Result<Self> {
        // Ensure data directory exists
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Open database
        let db = Database::open(&config.database_path)?;

        // A missing backend URL fails here, before anything is wired up
        let api = ApiClient::new(config.backend_url.clone())?;
        let session = SessionSync::new(db.clone(), api.clone());

        let chat = ChatController::new(db.clone(), api.clone(), session.clone());
        let image = ImageController::new(db.clone(), api.clone(), session.clone());
        let coding = CodingController::new(db.clone(), api.clone(), session.clone());

        Ok(Self {
            db,
            api,
            session,
            chat,
            image,
            coding,
            provider: Arc::new(RwLock::new(ProviderConfig::default())),
        })
    }

    /// Load or create the session record and adopt its provider config.
    ///
    /// A failure here leaves the workbench usable: the session mirror
    /// records the error, its mutators degrade to no-ops, and the
    /// controllers keep their configuration gates closed.
    pub async fn initialize(&self) -> Result<()> {
        self.session.initialize().await?;

        if let Some(record) = self.session.record() {
            let mut provider = self.provider.write();
            if record.is_configured() {
                provider.configured = true;
                provider.api_key = record.openai_api_key.clone().unwrap_or_default();
            }
            if let Some(model) = record.chat_model.filter(|m| !m.is_empty()) {
                provider.chat_model = model;
            }
            if let Some(model) = record.image_model.filter(|m| !m.is_empty()) {
                provider.image_model = model;
            }
        }

        info!("Workbench initialized");

        Ok(())
    }

    // === Configuration operations ===

    /// Submits the provider credential and model pair to the backend.
    /// Success flips the configured flag and mirrors the trio to the
    /// session record.
    pub async fn configure(
        &self,
        api_key: &str,
        chat_model: &str,
        image_model: &str,
    ) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(CoreError::Config("API key cannot be empty".to_string()));
        }

        self.api.configure(api_key, chat_model, image_model).await?;

        let snapshot = {
            let mut provider = self.provider.write();
            provider.configured = true;
            provider.api_key = api_key.to_string();
            provider.chat_model = chat_model.to_string();
            provider.image_model = image_model.to_string();
            provider.clone()
        };
        self.mirror_provider_config(&snapshot).await;

        info!(chat_model, image_model, "Backend configured");

        Ok(())
    }

    /// Form-encoded single-field model switch.
    pub async fn set_chat_model(&self, model: &str) -> Result<()> {
        self.api.set_chat_model(model).await?;

        let snapshot = {
            let mut provider = self.provider.write();
            provider.chat_model = model.to_string();
            provider.clone()
        };
        self.mirror_provider_config(&snapshot).await;

        info!(model, "Chat model selected");

        Ok(())
    }

    pub async fn set_image_model(&self, model: &str) -> Result<()> {
        self.api.set_image_model(model).await?;

        let snapshot = {
            let mut provider = self.provider.write();
            provider.image_model = model.to_string();
            provider.clone()
        };
        self.mirror_provider_config(&snapshot).await;

        info!(model, "Image model selected");

        Ok(())
    }

    /// The backend's view of the current model selection.
    pub async fn models(&self) -> Result<ModelSelection> {
        Ok(self.api.models().await?)
    }

    // Mirror writes are side effects; the session unit records failures and
    // no-ops without a session id.
    async fn mirror_provider_config(&self, provider: &ProviderConfig) {
        if provider.api_key.is_empty() {
            return;
        }

        if let Err(e) = self
            .session
            .save_openai_config(
                &provider.api_key,
                &provider.chat_model,
                &provider.image_model,
            )
            .await
        {
            debug!(error = %e, "Provider config not mirrored to session");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.read().configured
    }

    pub fn chat_model(&self) -> String {
        self.provider.read().chat_model.clone()
    }

    pub fn image_model(&self) -> String {
        self.provider.read().image_model.clone()
    }

    // === Sub-units ===

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn image(&self) -> &ImageController {
        &self.image
    }

    pub fn coding(&self) -> &CodingController {
        &self.coding
    }

    pub fn session(&self) -> &SessionSync {
        &self.session
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl Clone for Workbench {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            api: self.api.clone(),
            session: self.session.clone(),
            chat: self.chat.clone(),
            image: self.image.clone(),
            coding: self.coding.clone(),
            provider: Arc::clone(&self.provider),
        }
    }
}

// Implement std::io::Error conversion for fs operations
impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}
