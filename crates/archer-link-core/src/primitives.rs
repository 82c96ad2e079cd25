//! # Fixed Constants
//!
//! Names and limits shared by the cache, the session resolver and the
//! durable store. These are compiled in and never read from configuration,
//! except where a caller passes an explicit override (the metadata timeout).

/// Logical cache name for field-alias metadata.
///
/// Cache entries are keyed as `<name>-<record-id>`, e.g. `FieldMeta-100`.
pub const FIELD_METADATA_CACHE: &str = "FieldMeta";

/// Default validity of a cached field mapping, in seconds.
///
/// Measured against the record's last-modified time, not the wall clock:
/// a mapping stays valid for up to an hour past the record's last change.
pub const FIELD_METADATA_TIMEOUT_SECS: u64 = 3600;

/// Session-store key holding the external session token as JSON
/// `{base_url, session_token}`, so a token is only reused with the server
/// that issued it.
pub const SESSION_TOKEN_KEY: &str = "archer.session-token";

/// redb table holding cache entries.
pub const CACHE_TABLE: &str = "cache";

/// redb table holding the external session token.
pub const SESSION_TABLE: &str = "session";
