//! # Client Configuration
//!
//! Settings come from a TOML file, then `ARCHER_*` environment variables
//! override individual keys. A missing file is fine; a file that does not
//! parse is a configuration error.
//!
//! ```toml
//! base_url = "https://grc.example.com/RSAarcher"
//! instance = "Production"
//! username = "svc-integration"
//! user_domain = ""
//! password = "..."
//! state_path = "archer-link.db"
//! metadata_cache_timeout_secs = 3600
//! ```

use crate::session::{Credentials, SessionRequest};
use archer_link_core::primitives::FIELD_METADATA_TIMEOUT_SECS;
use archer_link_core::{ArcherError, ContentId};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "archer-link.toml";
pub const DEFAULT_STATE_PATH: &str = "archer-link.db";

pub const ENV_BASE_URL: &str = "ARCHER_BASE_URL";
pub const ENV_INSTANCE: &str = "ARCHER_INSTANCE";
pub const ENV_USERNAME: &str = "ARCHER_USERNAME";
pub const ENV_USER_DOMAIN: &str = "ARCHER_USER_DOMAIN";
pub const ENV_PASSWORD: &str = "ARCHER_PASSWORD";

/// Resolved client settings.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub instance: Option<String>,
    pub username: Option<String>,
    pub user_domain: Option<String>,
    pub password: Option<String>,
    /// redb file holding the session token and the metadata cache.
    pub state_path: PathBuf,
    pub metadata_cache_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            instance: None,
            username: None,
            user_domain: None,
            password: None,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            metadata_cache_timeout_secs: FIELD_METADATA_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("instance", &self.instance)
            .field("username", &self.username)
            .field("user_domain", &self.user_domain)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("state_path", &self.state_path)
            .field("metadata_cache_timeout_secs", &self.metadata_cache_timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    /// Read `path` (defaults when absent) and apply the process environment.
    pub fn load(path: &Path) -> Result<Self, ArcherError> {
        let config = match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw).map_err(|e| match e {
                ArcherError::Configuration(msg) => {
                    ArcherError::Configuration(format!("{}: {msg}", path.display()))
                }
                other => other,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file; using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(ArcherError::Configuration(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Parse TOML text.
    pub fn from_toml(raw: &str) -> Result<Self, ArcherError> {
        toml::from_str(raw).map_err(|e| ArcherError::Configuration(e.to_string()))
    }

    /// Apply `ARCHER_*` overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let slots = [
            (ENV_BASE_URL, &mut self.base_url),
            (ENV_INSTANCE, &mut self.instance),
            (ENV_USERNAME, &mut self.username),
            (ENV_USER_DOMAIN, &mut self.user_domain),
            (ENV_PASSWORD, &mut self.password),
        ];
        for (name, slot) in slots {
            if let Some(value) = lookup(name) {
                *slot = Some(value);
            }
        }
        self
    }

    /// Login credentials, when both instance and username are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        let instance = self.instance.clone().filter(|s| !s.is_empty())?;
        let username = self.username.clone().filter(|s| !s.is_empty())?;
        Some(Credentials {
            instance,
            username,
            user_domain: self.user_domain.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
        })
    }

    /// Resolution input for `record_id`.
    #[must_use]
    pub fn session_request(&self, record_id: Option<ContentId>) -> SessionRequest {
        SessionRequest {
            base_url: self.base_url.clone(),
            credentials: self.credentials(),
            record_id,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
