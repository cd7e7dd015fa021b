//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] banter_storage::StorageError),

    #[error("API error: {0}")]
    Api(#[from] banter_api::ApiError),

    #[error("Session error: {0}")]
    Session(#[from] banter_session::SessionError),

    #[error("Configuration error: {0}")]
    Config(String),
}
