//! Banter Storage Layer
//!
//! SQLite-based persistence for everything the workbench keeps on disk:
//! the cached session id, per-tab message logs, and form preferences.
//! The remote session store is never written from here.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
