//! Sync pipeline settings.
//!
//! Every field has a default matching the Notes app on current macOS, so an
//! absent config file is valid. Values are read from a JSON file:
//!
//! ```json
//! { "settle_delay_ms": 5000, "access_attempts": 5 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

const DEFAULT_APPLICATION_PATH: &str = "/System/Applications/Notes.app";
const DEFAULT_BUNDLE_ID: &str = "com.apple.Notes";
const DEFAULT_OSASCRIPT_PATH: &str = "/usr/bin/osascript";

/// Tunables for launching and querying the Notes application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Application bundle to launch before syncing
    pub application_path: PathBuf,
    /// Bundle identifier used to check that the app is running
    pub bundle_id: String,
    /// Script host executable
    pub osascript_path: PathBuf,
    /// Wait after launching before the first access probe
    pub settle_delay_ms: u64,
    /// Number of access probes before giving up
    pub access_attempts: u32,
    /// Wait between failed access probes
    pub access_retry_interval_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            application_path: PathBuf::from(DEFAULT_APPLICATION_PATH),
            bundle_id: DEFAULT_BUNDLE_ID.to_string(),
            osascript_path: PathBuf::from(DEFAULT_OSASCRIPT_PATH),
            settle_delay_ms: 2_000,
            access_attempts: 3,
            access_retry_interval_ms: 1_000,
        }
    }
}

impl SyncSettings {
    /// Load settings from a JSON file, falling back to defaults when absent
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!("Failed to read {}: {}", path.display(), error))
        })?;
        let settings = Self::parse(&raw)
            .map_err(|error| Error::Config(format!("{}: {}", path.display(), error)))?;
        Ok(settings)
    }

    /// Parse and validate settings from a JSON document
    pub fn parse(raw: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.access_attempts == 0 {
            return Err(Error::Config(
                "access_attempts must be at least 1".to_string(),
            ));
        }
        if normalize_text_option(Some(self.bundle_id.clone())).is_none() {
            return Err(Error::Config("bundle_id must not be empty".to_string()));
        }
        for (name, path) in [
            ("application_path", &self.application_path),
            ("osascript_path", &self.osascript_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Error::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub const fn access_retry_interval(&self) -> Duration {
        Duration::from_millis(self.access_retry_interval_ms)
    }
}
