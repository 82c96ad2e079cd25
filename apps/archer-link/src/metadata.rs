//! # Field Metadata Resolution
//!
//! Builds a record's alias <-> id tables from two sequential calls: the
//! record content (which names the level) and the level's field
//! definitions.

use crate::client::ArcherClient;
use crate::paths;
use crate::session::Session;
use archer_link_core::{
    ArcherError, ContentId, ContentUpdateInformation, FieldDefinition, FieldMapping, LevelId,
    RecordContent, parse_timestamp,
};
use chrono::{DateTime, Utc};

/// Read a record's content.
pub async fn fetch_record_content(
    client: &ArcherClient,
    session: &Session,
    record_id: ContentId,
) -> Result<RecordContent, ArcherError> {
    let path = format!("{}/{record_id}", paths::CONTENT);
    client.requested(session.get(&path), "record content").await
}

/// Read every field definition on a level.
pub async fn fetch_field_definitions(
    client: &ArcherClient,
    session: &Session,
    level_id: LevelId,
) -> Result<Vec<FieldDefinition>, ArcherError> {
    let path = format!("{}/{level_id}", paths::FIELD_DEFINITIONS_BY_LEVEL);
    client
        .requested_list(session.get(&path), "field definition")
        .await
}

/// Server-side last-modified time of a record.
pub async fn fetch_last_updated(
    client: &ArcherClient,
    session: &Session,
    record_id: ContentId,
) -> Result<DateTime<Utc>, ArcherError> {
    let filter = format!("?$filter=ContentId eq {record_id}");
    let request = session.query(paths::CONTENT_UPDATE_INFORMATION, &filter);
    let info: ContentUpdateInformation = client
        .requested(request, "content update information")
        .await?;

    parse_timestamp(&info.last_updated).ok_or_else(|| {
        ArcherError::api(
            200,
            format!(
                "record {record_id} has an unreadable LastUpdated '{}'",
                info.last_updated
            ),
        )
    })
}

/// Resolve the alias <-> id tables for a record.
///
/// `None` or `ContentId(0)` is a new, unsaved record: the result is
/// `Ok(None)` and no request is made.
pub async fn resolve_field_metadata(
    client: &ArcherClient,
    session: &Session,
    record_id: Option<ContentId>,
) -> Result<Option<FieldMapping>, ArcherError> {
    let Some(record_id) = record_id.filter(|id| !id.is_new()) else {
        return Ok(None);
    };

    let content = fetch_record_content(client, session, record_id).await?;
    let definitions = fetch_field_definitions(client, session, content.level_id).await?;

    let present = content.present_field_ids();
    let mapping = FieldMapping::build(content.level_id, &present, &definitions);

    let unmapped = mapping.unmapped(&present);
    if !unmapped.is_empty() {
        tracing::warn!(
            event = "fields_unmapped",
            record_id = %record_id,
            level_id = %content.level_id,
            count = unmapped.len(),
            "Record fields without a usable alias were left out of the mapping"
        );
    }
    tracing::debug!(
        event = "metadata_resolved",
        record_id = %record_id,
        level_id = %content.level_id,
        fields = mapping.len(),
        "Field metadata resolved"
    );

    Ok(Some(mapping))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, envelope, external_session};
    use archer_link_core::FieldId;
    use serde_json::json;

    #[tokio::test]
    async fn new_record_makes_no_calls() {
        let transport = ScriptedTransport::new();
        let client = transport.client();
        let session = external_session("http://h");

        let none = resolve_field_metadata(&client, &session, None).await;
        let zero = resolve_field_metadata(&client, &session, Some(ContentId(0))).await;

        assert!(matches!(none, Ok(None)));
        assert!(matches!(zero, Ok(None)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn content_then_definitions() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            envelope(json!({
                "Id": 100, "LevelId": 55,
                "FieldContents": {
                    "301": {"Type": 1, "Value": "x", "FieldId": 301},
                    "309": {"Type": 1, "Value": null, "FieldId": 309}
                }
            })),
        );
        transport.respond(
            200,
            json!([
                {
                    "RequestedObject": {"Id": 301, "Alias": "Title", "Name": "Title", "Type": 1},
                    "IsSuccessful": true
                },
                {
                    "RequestedObject": {"Id": 302, "Alias": "Other", "Name": "Other", "Type": 1},
                    "IsSuccessful": true
                }
            ]),
        );
        let client = transport.client();
        let session = external_session("http://h");

        let mapping = resolve_field_metadata(&client, &session, Some(ContentId(100)))
            .await
            .expect("resolve")
            .expect("mapping");

        assert_eq!(mapping.level_id(), LevelId(55));
        assert_eq!(mapping.id_for("Title"), Some(FieldId(301)));
        assert_eq!(mapping.id_for("Other"), None);
        assert_eq!(mapping.len(), 1);

        let urls = transport.urls();
        assert_eq!(
            urls,
            vec![
                "http://h/platformapi/core/content/100".to_string(),
                "http://h/platformapi/core/system/fielddefinition/level/55".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failed_content_call_stops_resolution() {
        let transport = ScriptedTransport::new();
        transport.respond_text(404, "not found");
        let client = transport.client();
        let session = external_session("http://h");

        let result = resolve_field_metadata(&client, &session, Some(ContentId(7))).await;

        assert!(matches!(result, Err(ArcherError::Api { code: 404, .. })));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn missing_requested_object_is_api_error() {
        let transport = ScriptedTransport::new();
        transport.respond(200, json!({"IsSuccessful": true, "ValidationMessages": []}));
        let client = transport.client();
        let session = external_session("http://h");

        let result = resolve_field_metadata(&client, &session, Some(ContentId(7))).await;

        assert!(matches!(result, Err(ArcherError::Api { code: 200, .. })));
    }

    #[tokio::test]
    async fn last_updated_is_a_filtered_query() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            envelope(json!({"ContentId": 100, "LastUpdated": "2024-01-01T00:30:00"})),
        );
        let client = transport.client();
        let session = external_session("http://h");

        let at = fetch_last_updated(&client, &session, ContentId(100))
            .await
            .expect("last updated");

        assert_eq!(at, parse_timestamp("2024-01-01T00:30:00Z").expect("ts"));
        let request = transport.requests().pop().expect("request");
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.method_override, Some(reqwest::Method::GET));
        assert_eq!(
            request.body,
            Some(json!({"Value": "?$filter=ContentId eq 100"}))
        );
    }

    #[tokio::test]
    async fn unreadable_last_updated_is_api_error() {
        let transport = ScriptedTransport::new();
        transport.respond(200, envelope(json!({"ContentId": 1, "LastUpdated": "yesterday"})));
        let client = transport.client();
        let session = external_session("http://h");

        let result = fetch_last_updated(&client, &session, ContentId(1)).await;
        assert!(matches!(result, Err(ArcherError::Api { code: 200, .. })));
    }
}
