//! # Endpoint Glue
//!
//! Thin per-endpoint calls made with a resolved `Session`.
//!
//! Field reads and writes go through the session's alias mapping, so the
//! session must have been resolved with a saved record id, and only that
//! record can be addressed by alias.

use crate::client::ArcherClient;
use crate::session::Session;
use crate::{metadata, paths};
use archer_link_core::{
    Application, ArcherError, ContentId, ContentReference, DataFeedRun, FieldId, RecordContent,
    ValuesListId, ValuesListItem, ValuesListValue, enrich_values_list,
};
use futures::future::join_all;
use reqwest::Method;
use serde_json::{Value, json};

/// A result paired with the caller's correlation tag.
#[derive(Debug)]
pub struct Tagged<K, T> {
    pub tag: K,
    pub result: Result<T, ArcherError>,
}

impl ArcherClient {
    /// Read a record's content.
    pub async fn record_content(
        &self,
        session: &Session,
        record_id: ContentId,
    ) -> Result<RecordContent, ArcherError> {
        metadata::fetch_record_content(self, session, record_id).await
    }

    /// Current value of one field, by alias. A field the record does not
    /// carry reads as `null`.
    pub async fn field_value(
        &self,
        session: &Session,
        record_id: ContentId,
        alias: &str,
    ) -> Result<Value, ArcherError> {
        let field_id = mapped_field_id(session, record_id, alias)?;
        let content = self.record_content(session, record_id).await?;
        Ok(content
            .field_contents
            .get(&field_id)
            .map(|field| field.value.clone())
            .unwrap_or(Value::Null))
    }

    /// Read several fields concurrently. Each result comes back with the
    /// tag it was requested under, in request order.
    pub async fn fetch_field_values<K>(
        &self,
        session: &Session,
        record_id: ContentId,
        requests: Vec<(K, String)>,
    ) -> Vec<Tagged<K, Value>> {
        join_all(requests.into_iter().map(|(tag, alias)| async move {
            let result = self.field_value(session, record_id, &alias).await;
            Tagged { tag, result }
        }))
        .await
    }

    /// Write one field, by alias.
    ///
    /// The save payload needs the record's level id and the field's type,
    /// so the record is read first.
    pub async fn update_field_value(
        &self,
        session: &Session,
        record_id: ContentId,
        alias: &str,
        value: Value,
    ) -> Result<ContentId, ArcherError> {
        let field_id = mapped_field_id(session, record_id, alias)?;
        let content = self.record_content(session, record_id).await?;
        let field = content.field_contents.get(&field_id).ok_or_else(|| {
            ArcherError::api(
                404,
                format!("field '{alias}' ({field_id}) is not on record {record_id}"),
            )
        })?;

        let body = json!({
            "Content": {
                "Id": record_id,
                "LevelId": content.level_id,
                "FieldContents": {
                    (field_id.to_string()): {
                        "Type": field.field_type,
                        "Value": value,
                        "FieldId": field_id,
                    }
                }
            }
        });

        let saved: ContentReference = self
            .requested(session.put(paths::CONTENT, body), "content reference")
            .await?;
        tracing::info!(
            event = "field_updated",
            record_id = %saved.id,
            field_id = %field_id,
            "Field saved"
        );
        Ok(saved.id)
    }

    /// Applications visible to the session, ordered by name.
    pub async fn applications(&self, session: &Session) -> Result<Vec<Application>, ArcherError> {
        self.requested_list(
            session.query(paths::APPLICATIONS, "?$orderby=Name"),
            "application",
        )
        .await
    }

    /// A values list with parent names, ordering and position flags.
    pub async fn values_list(
        &self,
        session: &Session,
        values_list_id: ValuesListId,
    ) -> Result<Vec<ValuesListItem>, ArcherError> {
        let path = format!("{}/{values_list_id}", paths::VALUES_LIST_FLAT);
        let values: Vec<ValuesListValue> = self
            .requested_list(session.get(&path), "values list value")
            .await?;
        Ok(enrich_values_list(values))
    }

    /// Most recent run of a data feed.
    pub async fn datafeed_status(
        &self,
        session: &Session,
        guid: &str,
    ) -> Result<DataFeedRun, ArcherError> {
        let request = session
            .post(paths::DATAFEED_RECENT, json!({ "Guid": guid }))
            .with_override(Method::GET);
        self.requested(request, "data feed run").await
    }
}

/// Alias lookup for `record_id`. The session's mapping belongs to its own
/// record, whose level may differ from another record's.
fn mapped_field_id(
    session: &Session,
    record_id: ContentId,
    alias: &str,
) -> Result<FieldId, ArcherError> {
    if let Some(mapped) = session.record_id().filter(|mapped| *mapped != record_id) {
        return Err(ArcherError::Configuration(format!(
            "field aliases are mapped for record {mapped}, not record {record_id}"
        )));
    }
    session.field_id(alias)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::NotHosted;
    use crate::session::{SessionRequest, SessionResolver};
    use crate::testing::{ScriptedTransport, envelope};
    use crate::session::StoredToken;
    use archer_link_core::MemoryStore;
    use std::sync::Arc;

    fn content() -> Value {
        envelope(json!({
            "Id": 100, "LevelId": 55,
            "FieldContents": {
                "301": {"Type": 1, "Value": "Alpha", "FieldId": 301},
                "302": {"Type": 2, "Value": 42, "FieldId": 302}
            }
        }))
    }

    async fn mapped_session(transport: &ScriptedTransport) -> Session {
        transport.respond(
            200,
            envelope(json!({"ContentId": 100, "LastUpdated": "2024-01-01T00:00:00Z"})),
        );
        transport.respond(200, content());
        transport.respond(
            200,
            json!([
                {
                    "RequestedObject": {"Id": 301, "Alias": "Title", "Type": 1},
                    "IsSuccessful": true
                },
                {
                    "RequestedObject": {"Id": 302, "Alias": "Score", "Type": 2},
                    "IsSuccessful": true
                }
            ]),
        );
        let sessions = Arc::new(MemoryStore::new());
        StoredToken::new("http://grc", "tok")
            .save(sessions.as_ref())
            .expect("save");
        let resolver = SessionResolver::new(
            transport.client(),
            Arc::new(NotHosted),
            sessions,
            Arc::new(MemoryStore::new()),
        );
        resolver
            .resolve_session(&SessionRequest {
                base_url: Some("http://grc".to_string()),
                credentials: None,
                record_id: Some(ContentId(100)),
            })
            .await
            .expect("session")
    }

    #[tokio::test]
    async fn field_value_by_alias() {
        let transport = ScriptedTransport::new();
        let session = mapped_session(&transport).await;
        transport.respond(200, content());

        let value = transport
            .client()
            .field_value(&session, ContentId(100), "Score")
            .await
            .expect("value");

        assert_eq!(value, json!(42));
    }

    #[tokio::test]
    async fn unknown_alias_fails_without_request() {
        let transport = ScriptedTransport::new();
        let session = mapped_session(&transport).await;
        let before = transport.request_count();

        let result = transport
            .client()
            .field_value(&session, ContentId(100), "Nope")
            .await;

        assert!(matches!(result, Err(ArcherError::Api { code: 404, .. })));
        assert_eq!(transport.request_count(), before);
    }

    #[tokio::test]
    async fn other_record_is_rejected_without_request() {
        let transport = ScriptedTransport::new();
        let session = mapped_session(&transport).await;
        let before = transport.request_count();
        let client = transport.client();

        let read = client.field_value(&session, ContentId(200), "Title").await;
        let write = client
            .update_field_value(&session, ContentId(200), "Title", json!("Beta"))
            .await;

        assert!(matches!(read, Err(ArcherError::Configuration(_))));
        assert!(matches!(write, Err(ArcherError::Configuration(_))));
        assert_eq!(transport.request_count(), before);
    }

    #[tokio::test]
    async fn tagged_values_keep_request_order() {
        let transport = ScriptedTransport::new();
        let session = mapped_session(&transport).await;
        transport.respond(200, content());
        transport.respond(200, content());

        let results = transport
            .client()
            .fetch_field_values(
                &session,
                ContentId(100),
                vec![("a", "Title".to_string()), ("b", "Score".to_string())],
            )
            .await;

        let tags: Vec<&str> = results.iter().map(|t| t.tag).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(results[0].result.as_ref().expect("title"), &json!("Alpha"));
        assert_eq!(results[1].result.as_ref().expect("score"), &json!(42));
    }

    #[tokio::test]
    async fn update_reads_then_puts() {
        let transport = ScriptedTransport::new();
        let session = mapped_session(&transport).await;
        transport.respond(200, content());
        transport.respond(200, envelope(json!({"Id": 100})));

        let saved = transport
            .client()
            .update_field_value(&session, ContentId(100), "Title", json!("Beta"))
            .await
            .expect("saved");

        assert_eq!(saved, ContentId(100));
        let put = transport.requests().pop().expect("put");
        assert_eq!(put.method, Method::PUT);
        assert_eq!(put.url, "http://grc/platformapi/core/content");
        assert_eq!(
            put.body,
            Some(json!({
                "Content": {
                    "Id": 100, "LevelId": 55,
                    "FieldContents": {"301": {"Type": 1, "Value": "Beta", "FieldId": 301}}
                }
            }))
        );
    }

    #[tokio::test]
    async fn rejected_update_is_validation_error() {
        let transport = ScriptedTransport::new();
        let session = mapped_session(&transport).await;
        transport.respond(200, content());
        transport.respond(
            200,
            json!({
                "IsSuccessful": false,
                "ValidationMessages": [{
                    "Reason": "InvalidType",
                    "Severity": 3,
                    "Description": "Value is not numeric",
                    "ErroredValue": "abc",
                    "Validator": "NumericValidator",
                    "ResourcedMessage": "Score must be a number"
                }]
            }),
        );

        let result = transport
            .client()
            .update_field_value(&session, ContentId(100), "Score", json!("abc"))
            .await;

        let Err(ArcherError::Validation(messages)) = &result else {
            unreachable!("{result:?}");
        };
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].summary(), "Score must be a number");
        assert_eq!(messages[0].errored_value, Some(json!("abc")));
    }

    #[tokio::test]
    async fn values_list_is_enriched() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            json!([
                {
                    "RequestedObject": {"Id": 2, "Name": "Child", "ParentId": 1, "SortOrder": 1},
                    "IsSuccessful": true
                },
                {
                    "RequestedObject": {"Id": 1, "Name": "Root", "SortOrder": 1},
                    "IsSuccessful": true
                }
            ]),
        );
        let session = Session::external("t", "http://grc", None);

        let items = transport
            .client()
            .values_list(&session, ValuesListId(9))
            .await
            .expect("items");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Root");
        assert_eq!(items[1].parent_name.as_deref(), Some("Root"));
        assert_eq!(
            transport.urls(),
            vec!["http://grc/platformapi/core/system/valueslistvalue/flat/valueslist/9".to_string()]
        );
    }

    #[tokio::test]
    async fn datafeed_status_is_overridden_post() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            envelope(json!({"Status": 2, "StartTime": "2024-01-01T00:00:00", "Message": "ok"})),
        );
        let session = Session::external("t", "http://grc", None);

        let run = transport
            .client()
            .datafeed_status(&session, "feed-guid")
            .await
            .expect("run");

        assert_eq!(run.status, Some(2));
        let request = transport.requests().pop().expect("request");
        assert_eq!(request.method_override, Some(Method::GET));
        assert_eq!(request.body, Some(json!({"Guid": "feed-guid"})));
    }

    #[tokio::test]
    async fn applications_list() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            json!([{
                "RequestedObject": {"Id": 75, "Name": "Policies", "Alias": "Policies"},
                "IsSuccessful": true
            }]),
        );
        let session = Session::internal("csrf", "http://host", None);

        let apps = transport
            .client()
            .applications(&session)
            .await
            .expect("apps");

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "Policies");
    }
}
