//! # Wire Types
//!
//! JSON structures exchanged with the platform REST API.
//!
//! Every `platformapi` response wraps its payload in an envelope:
//!
//! ```text
//! { "RequestedObject": {...}, "IsSuccessful": true, "ValidationMessages": [] }
//! ```
//!
//! List endpoints return a JSON array of envelopes.

use crate::{ArcherError, ContentId, FieldId, LevelId, ValidationMessage};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ENVELOPE
// =============================================================================

/// Standard platform response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope<T> {
    #[serde(default = "Option::default")]
    pub requested_object: Option<T>,
    #[serde(default)]
    pub is_successful: bool,
    #[serde(default)]
    pub validation_messages: Option<Vec<ValidationMessage>>,
}

impl<T> Envelope<T> {
    /// Unwrap the requested object.
    ///
    /// - `IsSuccessful == false` becomes `ArcherError::Validation`
    /// - a missing `RequestedObject` becomes `ArcherError::Api` carrying
    ///   the response's HTTP `status`
    pub fn into_requested(self, status: u16, context: &str) -> Result<T, ArcherError> {
        if !self.is_successful {
            return Err(ArcherError::Validation(
                self.validation_messages.unwrap_or_default(),
            ));
        }
        self.requested_object
            .ok_or_else(|| ArcherError::api(status, format!("response has no {context}")))
    }
}

// =============================================================================
// SECURITY
// =============================================================================

/// Successful login payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionInfo {
    pub session_token: String,
    #[serde(default)]
    pub user_id: Option<u64>,
}

// =============================================================================
// CONTENT
// =============================================================================

/// One field's value inside a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldContent {
    #[serde(rename = "Type", default)]
    pub field_type: u32,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub field_id: Option<FieldId>,
}

/// A record's content: its level and the fields materialized on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordContent {
    pub id: ContentId,
    pub level_id: LevelId,
    #[serde(default)]
    pub field_contents: BTreeMap<FieldId, FieldContent>,
}

impl RecordContent {
    /// Field ids actually present on this record.
    #[must_use]
    pub fn present_field_ids(&self) -> BTreeSet<FieldId> {
        self.field_contents.keys().copied().collect()
    }
}

/// Reference returned by a content save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentReference {
    pub id: ContentId,
}

/// Last-modified information for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentUpdateInformation {
    pub content_id: ContentId,
    pub last_updated: String,
}

// =============================================================================
// SYSTEM
// =============================================================================

/// A field definition on a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldDefinition {
    pub id: FieldId,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub field_type: u32,
    #[serde(default)]
    pub level_id: Option<LevelId>,
}

/// An application registered on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Application {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
}

/// Most recent run of a data feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataFeedRun {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// Parse a platform timestamp as UTC.
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00Z`, with offset) and the platform's
/// zone-less form (`2024-01-01T00:00:00.123`), which is taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// =============================================================================
// TESTS
// =============================================================================
