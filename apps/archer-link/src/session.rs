//! # Session Resolution
//!
//! A `Session` is the authenticated context every endpoint call runs in.
//!
//! ## Resolution Order
//!
//! 1. Ambient host session (Internal): borrow the host's token, no login.
//! 2. External session: reuse the stored token if the same server issued
//!    it, or log in and store the new one.
//! 3. Field metadata for the current record, through the change-aware
//!    cache keyed by the record's last-modified time.
//!
//! An HTTP 401 during step 3 discards the stored external token so the
//! next resolution logs in again.

use crate::ambient::AmbientSessionProvider;
use crate::client::{ApiRequest, ArcherClient, Authorization, filter_body};
use crate::{metadata, paths};
use archer_link_core::primitives::{
    FIELD_METADATA_CACHE, FIELD_METADATA_TIMEOUT_SECS, SESSION_TOKEN_KEY,
};
use archer_link_core::{
    ArcherError, ChangeAwareCache, ContentId, FieldId, FieldMapping, KeyValueStore, SessionInfo,
    ValidationMessage,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

// =============================================================================
// SESSION
// =============================================================================

/// How a session is authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionScope {
    /// Hosted inside the platform; never persists a token.
    Internal { csrf_token: String },
    /// Logged in from outside; the token lives in the session store.
    External { session_token: String },
}

impl SessionScope {
    /// Short label for logs and CLI output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Internal { .. } => "internal",
            Self::External { .. } => "external",
        }
    }
}

impl std::fmt::Debug for SessionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An authenticated context, optionally carrying the current record's
/// field mapping.
#[derive(Debug, Clone)]
pub struct Session {
    scope: SessionScope,
    base_url: String,
    record_id: Option<ContentId>,
    field_mapping: Option<FieldMapping>,
}

impl Session {
    /// Session borrowing a host's anti-forgery token.
    pub fn internal(
        csrf_token: impl Into<String>,
        base_url: impl Into<String>,
        record_id: Option<ContentId>,
    ) -> Self {
        Self {
            scope: SessionScope::Internal {
                csrf_token: csrf_token.into(),
            },
            base_url: base_url.into(),
            record_id,
            field_mapping: None,
        }
    }

    /// Session authenticated by a login token.
    pub fn external(
        session_token: impl Into<String>,
        base_url: impl Into<String>,
        record_id: Option<ContentId>,
    ) -> Self {
        Self {
            scope: SessionScope::External {
                session_token: session_token.into(),
            },
            base_url: base_url.into(),
            record_id,
            field_mapping: None,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self.scope, SessionScope::Internal { .. })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn record_id(&self) -> Option<ContentId> {
        self.record_id
    }

    /// Mapping for the current record; `None` for a new record or before
    /// resolution.
    #[must_use]
    pub fn field_mapping(&self) -> Option<&FieldMapping> {
        self.field_mapping.as_ref()
    }

    /// Field id for `alias` in the current record's mapping.
    pub fn field_id(&self, alias: &str) -> Result<FieldId, ArcherError> {
        let mapping = self.field_mapping.as_ref().ok_or_else(|| {
            ArcherError::Configuration(
                "session has no field mapping; resolve it with a saved record id".to_string(),
            )
        })?;
        mapping
            .id_for(alias)
            .ok_or_else(|| ArcherError::api(404, format!("unknown field alias '{alias}'")))
    }

    #[must_use]
    pub fn authorization(&self) -> Authorization {
        match &self.scope {
            SessionScope::Internal { csrf_token } => Authorization::Csrf(csrf_token.clone()),
            SessionScope::External { session_token } => {
                Authorization::SessionToken(session_token.clone())
            }
        }
    }

    /// Absolute URL for a path relative to the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        paths::join(&self.base_url, path)
    }

    /// Authenticated GET.
    #[must_use]
    pub fn get(&self, path: &str) -> ApiRequest {
        self.request(Method::GET, path)
    }

    /// Authenticated filtered GET, sent as a POST with a method override so
    /// the filter stays out of the URL.
    #[must_use]
    pub fn query(&self, path: &str, filter: &str) -> ApiRequest {
        self.request(Method::POST, path)
            .with_override(Method::GET)
            .with_body(filter_body(filter))
    }

    /// Authenticated POST with a JSON body.
    #[must_use]
    pub fn post(&self, path: &str, body: Value) -> ApiRequest {
        self.request(Method::POST, path).with_body(body)
    }

    /// Authenticated PUT with a JSON body.
    #[must_use]
    pub fn put(&self, path: &str, body: Value) -> ApiRequest {
        self.request(Method::PUT, path).with_body(body)
    }

    fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, self.url(path)).with_auth(self.authorization())
    }
}

// =============================================================================
// RESOLUTION INPUT
// =============================================================================

/// Login credentials for an external session.
#[derive(Clone, Default)]
pub struct Credentials {
    pub instance: String,
    pub username: String,
    pub user_domain: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("instance", &self.instance)
            .field("username", &self.username)
            .field("user_domain", &self.user_domain)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the caller knows when asking for a session.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    /// Required for an external session; ignored when hosted.
    pub base_url: Option<String>,
    /// Used only when no external token is stored.
    pub credentials: Option<Credentials>,
    /// Record whose field metadata should be resolved. Takes precedence
    /// over the host's record.
    pub record_id: Option<ContentId>,
}

// =============================================================================
// STORED TOKEN
// =============================================================================

/// External session token as persisted, bound to the server that issued it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub base_url: String,
    pub session_token: String,
}

impl StoredToken {
    pub fn new(base_url: &str, session_token: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            session_token: session_token.into(),
        }
    }

    /// Read the token from `store`. An entry that does not decode, or carries
    /// an empty token, reads as absent.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, ArcherError> {
        let Some(raw) = store.get(SESSION_TOKEN_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(stored) if !stored.session_token.is_empty() => Ok(Some(stored)),
            Ok(_) => Ok(None),
            Err(err) => {
                tracing::warn!(
                    event = "session_token_unreadable",
                    error = %err,
                    "Ignoring stored session token"
                );
                Ok(None)
            }
        }
    }

    /// Write the token to `store`, replacing any previous one.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), ArcherError> {
        let raw =
            serde_json::to_string(self).map_err(|e| ArcherError::Serialization(e.to_string()))?;
        store.set(SESSION_TOKEN_KEY, &raw)
    }

    /// True if the token was issued by the server at `base_url`.
    #[must_use]
    pub fn issued_by(&self, base_url: &str) -> bool {
        self.base_url == normalize_base_url(base_url)
    }
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("base_url", &self.base_url)
            .field("session_token", &"<redacted>")
            .finish()
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Establishes sessions and populates their field mapping.
pub struct SessionResolver {
    client: ArcherClient,
    ambient: Arc<dyn AmbientSessionProvider>,
    session_store: Arc<dyn KeyValueStore>,
    cache_store: Arc<dyn KeyValueStore>,
    metadata_timeout_secs: u64,
}

impl SessionResolver {
    /// `session_store` holds the external token; `cache_store` holds field
    /// metadata entries.
    pub fn new(
        client: ArcherClient,
        ambient: Arc<dyn AmbientSessionProvider>,
        session_store: Arc<dyn KeyValueStore>,
        cache_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            client,
            ambient,
            session_store,
            cache_store,
            metadata_timeout_secs: FIELD_METADATA_TIMEOUT_SECS,
        }
    }

    /// Override the metadata cache timeout. 0 forces a refresh.
    #[must_use]
    pub fn with_metadata_timeout(mut self, secs: u64) -> Self {
        self.metadata_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn client(&self) -> &ArcherClient {
        &self.client
    }

    /// Resolve a session and its field mapping.
    pub async fn resolve_session(&self, request: &SessionRequest) -> Result<Session, ArcherError> {
        let mut session = match self.ambient.ambient() {
            Some(context) => {
                let session = Session::internal(
                    context.csrf_token.clone(),
                    context.base_url(),
                    request.record_id.or(context.record_id),
                );
                tracing::info!(
                    event = "session_internal",
                    base_url = %session.base_url,
                    "Using host session"
                );
                session
            }
            None => self.establish_external(request).await?,
        };

        self.populate_field_mapping(&mut session).await?;
        Ok(session)
    }

    /// Attach field metadata for the session's record.
    ///
    /// A 401 from any call discards the stored external token before the
    /// error is returned.
    pub async fn populate_field_mapping(&self, session: &mut Session) -> Result<(), ArcherError> {
        let Some(record_id) = session.record_id.filter(|id| !id.is_new()) else {
            tracing::debug!(
                event = "metadata_skipped",
                "No saved record; field mapping left unset"
            );
            return Ok(());
        };

        match self.load_field_mapping(session, record_id).await {
            Ok(mapping) => {
                session.field_mapping = mapping;
                Ok(())
            }
            Err(err) => {
                if err.is_unauthorized() && !session.is_internal() {
                    tracing::warn!(
                        event = "session_expired",
                        record_id = %record_id,
                        "Discarding stored session token"
                    );
                    self.discard_token();
                }
                Err(err)
            }
        }
    }

    /// End an external session and drop its stored token. Internal sessions
    /// belong to the host and are left alone.
    pub async fn logout(&self, session: &Session) -> Result<(), ArcherError> {
        let SessionScope::External { session_token } = &session.scope else {
            return Ok(());
        };

        let result = self
            .client
            .execute(session.post(paths::LOGOUT, json!({ "Value": session_token })))
            .await;
        self.discard_token();
        result?;

        tracing::info!(event = "logout", base_url = %session.base_url, "Session ended");
        Ok(())
    }

    /// End the stored external session without logging in. Returns the base
    /// URL of the server logged out of, or `None` if no token was stored.
    pub async fn logout_stored(&self) -> Result<Option<String>, ArcherError> {
        let Some(stored) = StoredToken::load(self.session_store.as_ref())? else {
            // Drops an entry that did not decode.
            self.discard_token();
            return Ok(None);
        };

        let session = Session::external(stored.session_token, stored.base_url, None);
        self.logout(&session).await?;
        Ok(Some(session.base_url))
    }

    async fn establish_external(&self, request: &SessionRequest) -> Result<Session, ArcherError> {
        let base_url = request
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ArcherError::Configuration(
                    "base URL is required outside a hosted session".to_string(),
                )
            })?;

        match StoredToken::load(self.session_store.as_ref())? {
            Some(stored) if stored.issued_by(base_url) => {
                tracing::debug!(
                    event = "session_reused",
                    base_url = %base_url,
                    "Reusing stored session token"
                );
                return Ok(Session::external(stored.session_token, base_url, request.record_id));
            }
            Some(stored) => {
                tracing::info!(
                    event = "session_token_foreign",
                    stored_base_url = %stored.base_url,
                    base_url = %base_url,
                    "Stored session token belongs to another server"
                );
            }
            None => {}
        }

        let credentials = request.credentials.as_ref().ok_or_else(|| {
            ArcherError::Configuration("credentials are required to log in".to_string())
        })?;

        match self.login(base_url, credentials).await {
            Ok(info) => {
                StoredToken::new(base_url, info.session_token.as_str())
                    .save(self.session_store.as_ref())?;
                tracing::info!(
                    event = "login",
                    base_url = %base_url,
                    instance = %credentials.instance,
                    username = %credentials.username,
                    "Session established"
                );
                Ok(Session::external(info.session_token, base_url, request.record_id))
            }
            Err(err) => {
                tracing::warn!(
                    event = "login_failed",
                    base_url = %base_url,
                    error = %err,
                    "Login failed"
                );
                self.discard_token();
                Err(err)
            }
        }
    }

    async fn login(
        &self,
        base_url: &str,
        credentials: &Credentials,
    ) -> Result<SessionInfo, ArcherError> {
        let request = ApiRequest::new(Method::POST, paths::join(base_url, paths::LOGIN))
            .with_body(json!({
                "InstanceName": credentials.instance,
                "Username": credentials.username,
                "UserDomain": credentials.user_domain,
                "Password": credentials.password,
            }));

        match self.client.requested::<SessionInfo>(request, "session token").await {
            Err(ArcherError::Validation(messages)) => {
                Err(ArcherError::Authentication(login_rejection(&messages)))
            }
            other => other,
        }
    }

    async fn load_field_mapping(
        &self,
        session: &Session,
        record_id: ContentId,
    ) -> Result<Option<FieldMapping>, ArcherError> {
        let last_updated = metadata::fetch_last_updated(&self.client, session, record_id).await?;

        let mut cache = ChangeAwareCache::new(
            self.cache_store.as_ref(),
            FIELD_METADATA_CACHE,
            record_id,
            self.metadata_timeout_secs,
        );

        match cache.load::<FieldMapping>(Some(last_updated)) {
            Ok(Some(mapping)) if mapping.is_consistent() => {
                tracing::debug!(
                    event = "metadata_cache_hit",
                    key = cache.key(),
                    "Field mapping from cache"
                );
                return Ok(Some(mapping));
            }
            Ok(Some(_)) => {
                tracing::warn!(
                    event = "metadata_cache_inconsistent",
                    key = cache.key(),
                    "Ignoring cached field mapping"
                );
            }
            Ok(None) => {
                tracing::debug!(
                    event = "metadata_cache_miss",
                    key = cache.key(),
                    "Resolving field mapping"
                );
            }
            Err(err) => {
                tracing::warn!(
                    event = "metadata_cache_unreadable",
                    key = cache.key(),
                    error = %err,
                    "Treating cache entry as a miss"
                );
            }
        }

        let mapping =
            metadata::resolve_field_metadata(&self.client, session, Some(record_id)).await?;
        if let Some(mapping) = &mapping {
            if let Err(err) = cache.write(mapping, Some(last_updated)) {
                tracing::warn!(
                    event = "metadata_cache_write_failed",
                    key = cache.key(),
                    error = %err,
                    "Field mapping not cached"
                );
            }
        }
        Ok(mapping)
    }

    fn discard_token(&self) {
        if let Err(err) = self.session_store.delete(SESSION_TOKEN_KEY) {
            tracing::warn!(
                event = "token_delete_failed",
                error = %err,
                "Stored session token could not be removed"
            );
        }
    }
}

fn login_rejection(messages: &[ValidationMessage]) -> String {
    if messages.is_empty() {
        return "login rejected".to_string();
    }
    messages
        .iter()
        .map(ValidationMessage::summary)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// TESTS
// =============================================================================
