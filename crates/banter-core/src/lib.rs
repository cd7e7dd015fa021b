//! Banter Core
//!
//! Central coordination layer for the Banter workbench. The terminal shell
//! renders; everything it renders lives here or below.

mod config;
mod error;
mod workbench;

pub use config::{Config, DATA_DIR_ENV};
pub use error::CoreError;
pub use workbench::Workbench;

// Re-export core components
pub use banter_api::{
    ApiClient, ApiError, CodingMetadata, GitHubUser, ModelSelection, Repository, SessionRecord,
    Upload, AVAILABLE_CHAT_MODELS, AVAILABLE_IMAGE_MODELS, BACKEND_URL_ENV, DEFAULT_CHAT_MODEL,
    DEFAULT_IMAGE_MODEL,
};
pub use banter_session::{SessionError, SessionSync};
pub use banter_storage::{Database, StorageError};
pub use banter_tabs::{
    ChatController, CodingController, CodingStatus, ImageController, ImageOptions, ImageQuality,
    ImageSize, ImageStyle, Message, MessageKind, MessageLog, Sender, TabKind,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
