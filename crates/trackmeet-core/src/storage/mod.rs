mod config;
pub mod database;

pub use config::{Config, SessionConfig};
pub use database::{Database, LeaderboardRow, StoredSession};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/trackmeet[-dev]/` based on TRACKMEET_ENV.
///
/// Set TRACKMEET_ENV=dev to use the development data directory, or
/// TRACKMEET_DATA_DIR to use an explicit directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("TRACKMEET_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TRACKMEET_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("trackmeet-dev")
            } else {
                base_dir.join("trackmeet")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
