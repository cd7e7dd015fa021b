//! Workbench configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use banter_api::BACKEND_URL_ENV;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "BANTER_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Base URL of the assistant backend
    pub backend_url: String,
}

impl Config {
    /// Builds a config rooted at `data_dir`. The backend URL comes from the
    /// environment; an empty value is rejected later by the API client, not
    /// here, so a config can be constructed and inspected before failing.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("banter.db"),
            backend_url: std::env::var(BACKEND_URL_ENV).unwrap_or_default(),
        }
    }

    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }

        dirs::data_local_dir()
            .map(|d| d.join("Banter"))
            .unwrap_or_else(|| PathBuf::from(".banter"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Simple dirs implementation for common directories
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
