//! # Ambient Session Detection
//!
//! A component hosted inside the platform borrows the host's authentication.
//! How the host exposes that context is not this crate's business: callers
//! inject an `AmbientSessionProvider` that either returns the context or
//! reports that the code is not hosted.

use archer_link_core::ContentId;

/// Context handed over by a hosting platform page.
#[derive(Clone, PartialEq, Eq)]
pub struct AmbientContext {
    /// Anti-forgery token of the host's authenticated session.
    pub csrf_token: String,
    /// Scheme, host and port of the hosting page, e.g. `https://grc.example.com`.
    pub page_origin: String,
    /// The host's configured application path, e.g. `/RSAarcher`.
    pub base_path: String,
    /// Record the host page is showing, if any.
    pub record_id: Option<ContentId>,
}

impl std::fmt::Debug for AmbientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientContext")
            .field("page_origin", &self.page_origin)
            .field("base_path", &self.base_path)
            .field("record_id", &self.record_id)
            .finish_non_exhaustive()
    }
}

impl AmbientContext {
    /// Page origin plus base path, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        let origin = self.page_origin.trim_end_matches('/');
        let path = self.base_path.trim_matches('/');
        if path.is_empty() {
            origin.to_string()
        } else {
            format!("{origin}/{path}")
        }
    }
}

/// Looks up an ambient host session.
pub trait AmbientSessionProvider: Send + Sync {
    /// `None` means "not hosted".
    fn ambient(&self) -> Option<AmbientContext>;
}

/// Provider for code that is never hosted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotHosted;

impl AmbientSessionProvider for NotHosted {
    fn ambient(&self) -> Option<AmbientContext> {
        None
    }
}

impl AmbientSessionProvider for AmbientContext {
    fn ambient(&self) -> Option<AmbientContext> {
        Some(self.clone())
    }
}

// =============================================================================
// ENVIRONMENT PROVIDER
// =============================================================================

pub const ENV_CSRF_TOKEN: &str = "ARCHER_CSRF_TOKEN";
pub const ENV_PAGE_ORIGIN: &str = "ARCHER_PAGE_ORIGIN";
pub const ENV_BASE_PATH: &str = "ARCHER_BASE_PATH";
pub const ENV_RECORD_ID: &str = "ARCHER_RECORD_ID";

/// Ambient context captured from `ARCHER_*` environment variables.
///
/// A launcher embedding the CLI in a host page exports the token and page
/// location; without a token the code is considered not hosted.
#[derive(Debug, Clone, Default)]
pub struct EnvAmbient {
    context: Option<AmbientContext>,
}

impl EnvAmbient {
    /// Capture from the process environment.
    pub fn detect() -> Self {
        Self::detect_with(|name| std::env::var(name).ok())
    }

    /// Capture using an arbitrary variable lookup.
    pub fn detect_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let context = non_empty(ENV_CSRF_TOKEN).and_then(|csrf_token| {
            let Some(page_origin) = non_empty(ENV_PAGE_ORIGIN) else {
                tracing::warn!(
                    event = "ambient_incomplete",
                    "{ENV_CSRF_TOKEN} is set without {ENV_PAGE_ORIGIN}; ignoring host session"
                );
                return None;
            };
            let record_id = non_empty(ENV_RECORD_ID).and_then(|raw| match raw.trim().parse() {
                Ok(id) => Some(ContentId(id)),
                Err(_) => {
                    tracing::warn!(
                        event = "ambient_record_invalid",
                        value = %raw,
                        "Ignoring record id"
                    );
                    None
                }
            });
            Some(AmbientContext {
                csrf_token,
                page_origin,
                base_path: non_empty(ENV_BASE_PATH).unwrap_or_default(),
                record_id,
            })
        });

        Self { context }
    }
}

impl AmbientSessionProvider for EnvAmbient {
    fn ambient(&self) -> Option<AmbientContext> {
        self.context.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================
