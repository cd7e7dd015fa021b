//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] banter_storage::StorageError),

    #[error("API error: {0}")]
    Api(#[from] banter_api::ApiError),
}
