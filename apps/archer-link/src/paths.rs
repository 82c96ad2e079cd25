//! # Endpoint Paths
//!
//! REST paths relative to a session's base URL.

pub const LOGIN: &str = "platformapi/core/security/login";
pub const LOGOUT: &str = "platformapi/core/security/logout";

/// `GET {CONTENT}/{id}` reads a record; `PUT {CONTENT}` saves one.
pub const CONTENT: &str = "platformapi/core/content";

/// Filtered GET (method override) returning a record's last-modified time.
pub const CONTENT_UPDATE_INFORMATION: &str = "platformapi/core/content/contentupdateinformation";

/// `GET {FIELD_DEFINITIONS_BY_LEVEL}/{level_id}`
pub const FIELD_DEFINITIONS_BY_LEVEL: &str = "platformapi/core/system/fielddefinition/level";

/// Filtered GET (method override) listing applications.
pub const APPLICATIONS: &str = "platformapi/core/system/application";

/// `GET {VALUES_LIST_FLAT}/{values_list_id}`
pub const VALUES_LIST_FLAT: &str = "platformapi/core/system/valueslistvalue/flat/valueslist";

/// Filtered GET (method override) for the most recent data-feed run.
pub const DATAFEED_RECENT: &str = "platformapi/core/datafeed/history/recent";

/// Join a base URL and a relative path with exactly one slash.
pub fn join(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
