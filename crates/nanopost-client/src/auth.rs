//! Credentials for the forum and generation APIs
//!
//! Both bearer tokens come from the environment. A `.env` file in the working
//! directory (or next to the executable) is read first; variables that are
//! already set take precedence over the file.

use nanopost_core::{NanopostError, Result};
use std::env;
use std::path::PathBuf;

/// Bearer tokens for both remote APIs
#[derive(Clone)]
pub struct Credentials {
    pub forum_token: String,
    pub generation_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("forum_token", &"<redacted>")
            .field("generation_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read both tokens from the named environment variables
    ///
    /// Fails if either is missing or empty; the agent refuses to start
    /// without both.
    pub fn from_env(forum_var: &str, generation_var: &str) -> Result<Self> {
        Ok(Self {
            forum_token: require_var(forum_var)?,
            generation_token: require_var(generation_var)?,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(NanopostError::Auth(format!(
            "{} is required. Set it in the environment or in a .env file.",
            name
        ))),
    }
}

/// Load the first `.env` file found, without overriding existing variables
///
/// Returns the path that was loaded, if any.
pub fn load_env_file() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from(".env")];
    if let Some(exe_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        candidates.push(exe_dir.join(".env"));
    }

    for path in candidates {
        if path.is_file() {
            match dotenvy::from_path(&path) {
                Ok(()) => {
                    tracing::debug!("Loaded environment from {}", path.display());
                    return Some(path);
                }
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                }
            }
        }
    }
    None
}
