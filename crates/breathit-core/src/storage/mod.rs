mod config;
pub mod database;

pub use config::{Config, CuesConfig, DisplayConfig, PracticeConfig};
pub use database::{Database, HistoryStats, SessionRecord};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/breathit[-dev]/` based on BREATHIT_ENV.
///
/// Set BREATHIT_ENV=dev to use the development data directory, or
/// BREATHIT_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("BREATHIT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BREATHIT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("breathit-dev")
            } else {
                base_dir.join("breathit")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
