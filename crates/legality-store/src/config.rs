//! Client configuration loaded from `config.toml`.
//!
//! Resolution order, highest first:
//! 1. Command-line flag
//! 2. Environment variable
//! 3. `config.toml` in the client config directory
//! 4. Compiled default
//!
//! Only layers 3 and 4 live here; the binary applies 1 and 2 on top.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use legality_core::VisibilityWindow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub fix_review_window_days: u32,
    pub feedback_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 2000,
            fix_review_window_days: VisibilityWindow::DEFAULT_DAYS,
            feedback_limit: 100,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    pub const FILE_NAME: &'static str = "config.toml";

    /// Load `config.toml` from `dir`, falling back to defaults if it does not exist.
    pub fn load_from(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(Self::FILE_NAME);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let config: Self =
            toml::from_str(&raw).map_err(|source| StoreError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.api_url.trim().is_empty() {
            return Err(StoreError::Config("api_url must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(StoreError::Config("poll_interval_ms must be positive".into()));
        }
        if self.fix_review_window_days == 0 {
            return Err(StoreError::Config(
                "fix_review_window_days must be positive".into(),
            ));
        }
        if self.feedback_limit == 0 {
            return Err(StoreError::Config("feedback_limit must be positive".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn visibility_window(&self) -> VisibilityWindow {
        VisibilityWindow::days(self.fix_review_window_days)
    }
}

/// Platform config directory for the client, e.g. `~/.config/legality` on Linux.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("legality"))
        .unwrap_or_else(|| PathBuf::from(".legality"))
}
