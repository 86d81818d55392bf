//! `.env` loading helpers
//!
//! Credentials are read from the process environment. A `.env` file in the
//! working directory (or any parent) is loaded first when present; variables
//! already set in the environment win.

use std::path::{Path, PathBuf};

/// Load the nearest `.env` file, returning its path when one was found
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!("Failed to load .env file: {}", e);
            None
        }
    }
}

/// Load a specific env file
///
/// Returns `false` when the file does not exist or cannot be parsed.
pub fn load_dotenv_from(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => true,
        Err(e) => {
            if !e.not_found() {
                tracing::warn!("Failed to load {}: {}", path.display(), e);
            }
            false
        }
    }
}
