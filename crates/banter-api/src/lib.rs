//! Banter API client
//!
//! The only crate that talks HTTP. Wraps every backend endpoint in a typed
//! method on [`ApiClient`]: chat, image generation, uploads, GitHub
//! authentication, repository connection, and the per-field session store.
//!
//! Every method performs exactly one attempt. There is no retry, no backoff,
//! and no client-side timeout; failures are mapped to [`ApiError`] and left
//! for the caller to surface.

mod client;
mod error;
mod types;

pub use client::{ApiClient, CodingMetadata, BACKEND_URL_ENV};
pub use error::ApiError;
pub use types::{
    AgentReply, GeneratedImage, GitHubUser, ModelSelection, Repository, SessionRecord, Upload,
    AVAILABLE_CHAT_MODELS, AVAILABLE_IMAGE_MODELS, DEFAULT_CHAT_MODEL, DEFAULT_IMAGE_MODEL,
};

pub type Result<T> = std::result::Result<T, ApiError>;
