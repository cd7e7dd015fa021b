//! API error types
//!
//! Three failure surfaces are kept distinct: the request never completed
//! (`Transport`), the backend answered non-2xx (`Status`), and the backend
//! answered 2xx with an error envelope (`Backend`). A response that parses
//! but doesn't carry the expected fields is a `Schema` error rather than a
//! silently-empty value.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Backend URL not configured")]
    BackendUrlMissing,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Backend(String),

    #[error("Unexpected response shape: {0}")]
    Schema(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),
}
