//! Banter tab controllers
//!
//! One self-contained controller per feature tab: chat, image generation,
//! and the repository-aware coding assistant. Each user action triggers at
//! most one network call; the response is appended to the tab's message log
//! as either the reply or an inline error message. No retries, no automatic
//! recovery beyond that. Busy flags are cleared on every outcome so a
//! failed call never wedges the UI.
//!
//! Message logs live in a local cache, never in the remote session store.

mod chat;
mod coding;
mod image;
mod message;
mod options;
mod state;

pub use chat::ChatController;
pub use coding::CodingController;
pub use image::ImageController;
pub use message::{Message, MessageKind, MessageLog, Sender};
pub use options::{ImageOptions, ImageQuality, ImageSize, ImageStyle};
pub use state::{CodingStatus, TabKind};
