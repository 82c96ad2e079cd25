//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the archer-link client:
//! - Platform identifiers (`ContentId`, `LevelId`, `FieldId`, `ValuesListId`)
//! - Domain validation messages (`ValidationMessage`)
//! - Error types (`ArcherError`) and their caller-facing payload
//!
//! ## Identifier Guarantees
//!
//! All identifiers:
//! - Are plain `u64` newtypes, serialized transparently
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Parse from JSON object keys, so `{"123": ...}` maps decode directly

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// PLATFORM IDENTIFIERS
// =============================================================================

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            Default,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw identifier value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

platform_id!(
    /// Identifier of a record (content) on the platform.
    ///
    /// `ContentId(0)` is what the host reports for a record that has not
    /// been saved yet.
    ContentId
);

platform_id!(
    /// Identifier of the container (application, questionnaire or sub-form
    /// level) that defines a record's field set.
    LevelId
);

platform_id!(
    /// Internal numeric identifier of a field definition.
    FieldId
);

platform_id!(
    /// Identifier of a values list backing a values-list field.
    ValuesListId
);

impl ContentId {
    /// True for the placeholder id of a new, unsaved record.
    #[must_use]
    pub const fn is_new(self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// VALIDATION MESSAGES
// =============================================================================

/// A domain-validation failure reported inside a response envelope.
///
/// The platform accepted the HTTP call but rejected the operation
/// (wrong field type, required field missing, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ValidationMessage {
    pub reason: Option<String>,
    pub severity: Option<i64>,
    pub description: Option<String>,
    pub errored_value: Option<serde_json::Value>,
    pub validator: Option<String>,
    pub resourced_message: Option<String>,
}

impl ValidationMessage {
    /// Best human-readable line for this message.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.resourced_message
            .as_deref()
            .or(self.description.as_deref())
            .or(self.reason.as_deref())
            .unwrap_or("unspecified validation failure")
    }
}

fn summarize(messages: &[ValidationMessage]) -> String {
    if messages.is_empty() {
        return "operation rejected without details".to_string();
    }
    messages
        .iter()
        .map(ValidationMessage::summary)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the archer-link client.
///
/// - No silent failures
/// - No automatic retries: every failure reaches the caller
/// - `Authentication` is the only variant that triggers a corrective
///   action (dropping the stored session token)
#[derive(Debug, Error)]
pub enum ArcherError {
    /// Required setup is missing (base URL, credentials, config file).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Login rejected or session expired (HTTP 401).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Non-success HTTP status, unreachable server (code 0), or a response
    /// that lacks the expected JSON shape.
    #[error("API error ({code}): {text}")]
    Api { code: u16, text: String },

    /// The platform accepted the call but rejected the domain operation.
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationMessage>),

    /// The durable key-value store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A cached payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ArcherError {
    /// Creates an Api error.
    pub fn api(code: u16, text: impl Into<String>) -> Self {
        Self::Api {
            code,
            text: text.into(),
        }
    }

    /// True when the failure means the session is no longer authorized.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// HTTP status associated with the failure, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication(_) => Some(401),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The `{code, text}` shape surfaced to callers.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            Self::Api { code, text } => ErrorPayload {
                code: *code,
                text: text.clone(),
            },
            other => ErrorPayload {
                code: other.status_code().unwrap_or(0),
                text: other.to_string(),
            },
        }
    }
}

/// Structured failure outcome: `{code, text}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: u16,
    pub text: String,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn new_record_placeholder() {
        assert!(ContentId(0).is_new());
        assert!(!ContentId(100).is_new());
    }

    #[test]
    fn ids_decode_from_object_keys() {
        let map: BTreeMap<FieldId, String> =
            serde_json::from_str(r#"{"12": "a", "3": "b"}"#).expect("decode");
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec![FieldId(3), FieldId(12)]);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&LevelId(42)).expect("encode");
        assert_eq!(json, "42");
    }

    #[test]
    fn validation_error_lists_messages() {
        let err = ArcherError::Validation(vec![
            ValidationMessage {
                description: Some("Field is required".to_string()),
                ..Default::default()
            },
            ValidationMessage {
                resourced_message: Some("Value out of range".to_string()),
                reason: Some("ignored".to_string()),
                ..Default::default()
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: Field is required; Value out of range"
        );
    }

    #[test]
    fn payload_keeps_api_code() {
        let payload = ArcherError::api(404, "not found").to_payload();
        assert_eq!(
            payload,
            ErrorPayload {
                code: 404,
                text: "not found".to_string()
            }
        );

        let auth = ArcherError::Authentication("expired".to_string()).to_payload();
        assert_eq!(auth.code, 401);
        assert!(ArcherError::Authentication(String::new()).is_unauthorized());
        assert!(!ArcherError::api(500, "boom").is_unauthorized());
    }

    #[test]
    fn validation_message_decodes_platform_shape() {
        let msg: ValidationMessage = serde_json::from_str(
            r#"{"Reason":"Validation","Severity":3,"Description":"Invalid value",
                "ErroredValue":7,"Validator":"NumericRange","ResourcedMessage":null}"#,
        )
        .expect("decode");
        assert_eq!(msg.severity, Some(3));
        assert_eq!(msg.summary(), "Invalid value");
        assert_eq!(msg.errored_value, Some(serde_json::json!(7)));
    }
}
