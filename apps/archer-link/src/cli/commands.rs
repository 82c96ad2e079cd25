//! # CLI Command Implementations
//!
//! Every command except `logout` resolves a session first; the state file
//! keeps the external token and cached field metadata between invocations.

use archer_link::{
    ArcherClient, ClientConfig, EnvAmbient, ReqwestTransport, Session, SessionResolver,
};
use archer_link_core::primitives::{CACHE_TABLE, SESSION_TABLE};
use archer_link_core::{ArcherError, ContentId, RedbStore, ValuesListId};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything a command needs.
pub struct Context {
    config: ClientConfig,
    resolver: SessionResolver,
    record_id: Option<ContentId>,
    json_mode: bool,
}

impl Context {
    /// Load configuration and open the state file.
    pub fn open(
        config_path: &Path,
        record_id: Option<ContentId>,
        refresh: bool,
        json_mode: bool,
    ) -> Result<Self, ArcherError> {
        let config = ClientConfig::load(config_path)?;

        let cache = RedbStore::open(&config.state_path, CACHE_TABLE)?;
        let sessions = cache.table(SESSION_TABLE)?;
        let timeout = if refresh {
            0
        } else {
            config.metadata_cache_timeout_secs
        };

        let resolver = SessionResolver::new(
            ArcherClient::new(Arc::new(ReqwestTransport::new())),
            Arc::new(EnvAmbient::detect()),
            Arc::new(sessions),
            Arc::new(cache),
        )
        .with_metadata_timeout(timeout);

        Ok(Self {
            config,
            resolver,
            record_id,
            json_mode,
        })
    }

    async fn session(&self) -> Result<Session, ArcherError> {
        self.resolver
            .resolve_session(&self.config.session_request(self.record_id))
            .await
    }

    fn client(&self) -> &ArcherClient {
        self.resolver.client()
    }

    /// The saved record the session resolved metadata for.
    fn saved_record(session: &Session) -> Result<ContentId, ArcherError> {
        session
            .record_id()
            .filter(|id| !id.is_new())
            .ok_or_else(|| ArcherError::Configuration("--record is required".to_string()))
    }
}

fn print_json(output: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(output).unwrap_or_default()
    );
}

// =============================================================================
// SESSION COMMANDS
// =============================================================================

/// Resolve a session and summarize it.
pub async fn cmd_session(ctx: &Context) -> Result<(), ArcherError> {
    let session = ctx.session().await?;
    let mapping = session.field_mapping();

    if ctx.json_mode {
        print_json(&json!({
            "scope": session.scope().label(),
            "base_url": session.base_url(),
            "record_id": session.record_id(),
            "level_id": mapping.map(|m| m.level_id()),
            "field_count": mapping.map(|m| m.len()),
        }));
        return Ok(());
    }

    println!("Archer Session");
    println!("==============");
    println!("Scope:    {}", session.scope().label());
    println!("Base URL: {}", session.base_url());
    match (session.record_id(), mapping) {
        (Some(record), Some(mapping)) => {
            println!("Record:   {record}");
            println!("Level:    {}", mapping.level_id());
            println!("Fields:   {}", mapping.len());
        }
        _ => println!("Record:   (none)"),
    }
    Ok(())
}

/// End the stored external session. Never logs in.
pub async fn cmd_logout(ctx: &Context) -> Result<(), ArcherError> {
    let ended = ctx.resolver.logout_stored().await?;

    if ctx.json_mode {
        print_json(&json!({"logged_out": ended.is_some(), "base_url": ended}));
    } else if let Some(base_url) = ended {
        println!("Logged out of {base_url}");
    } else {
        println!("No stored session; nothing to log out");
    }
    Ok(())
}

// =============================================================================
// FIELD COMMANDS
// =============================================================================

/// Show the alias <-> id table of the record.
pub async fn cmd_fields(ctx: &Context) -> Result<(), ArcherError> {
    let session = ctx.session().await?;
    let record = Context::saved_record(&session)?;
    let mapping = session.field_mapping().ok_or_else(|| {
        ArcherError::Configuration(format!("no field metadata for record {record}"))
    })?;

    if ctx.json_mode {
        let fields: Vec<Value> = mapping
            .iter()
            .map(|(id, alias)| json!({"id": id, "alias": alias}))
            .collect();
        print_json(&json!({
            "record_id": record,
            "level_id": mapping.level_id(),
            "fields": fields,
        }));
        return Ok(());
    }

    println!("Record {record} (level {})", mapping.level_id());
    println!();
    for (id, alias) in mapping.iter() {
        println!("  {id:>8}  {alias}");
    }
    Ok(())
}

/// Read one field.
pub async fn cmd_get(ctx: &Context, alias: &str) -> Result<(), ArcherError> {
    let session = ctx.session().await?;
    let record = Context::saved_record(&session)?;
    let value = ctx.client().field_value(&session, record, alias).await?;

    if ctx.json_mode {
        print_json(&json!({"record_id": record, "alias": alias, "value": value}));
    } else {
        println!("{alias} = {value}");
    }
    Ok(())
}

/// Write one field.
pub async fn cmd_set(ctx: &Context, alias: &str, raw: &str) -> Result<(), ArcherError> {
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    let session = ctx.session().await?;
    let record = Context::saved_record(&session)?;
    let saved = ctx
        .client()
        .update_field_value(&session, record, alias, value)
        .await?;

    if ctx.json_mode {
        print_json(&json!({"record_id": saved, "alias": alias, "saved": true}));
    } else {
        println!("Saved {alias} on record {saved}");
    }
    Ok(())
}

// =============================================================================
// SYSTEM COMMANDS
// =============================================================================

/// List applications.
pub async fn cmd_apps(ctx: &Context) -> Result<(), ArcherError> {
    let session = ctx.session().await?;
    let apps = ctx.client().applications(&session).await?;

    if ctx.json_mode {
        print_json(&json!(apps));
        return Ok(());
    }

    for app in &apps {
        println!(
            "{:>8}  {}  {}",
            app.id,
            app.name,
            app.alias.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Show a values list.
pub async fn cmd_values_list(ctx: &Context, id: u64) -> Result<(), ArcherError> {
    let session = ctx.session().await?;
    let items = ctx
        .client()
        .values_list(&session, ValuesListId(id))
        .await?;

    if ctx.json_mode {
        print_json(&json!(items));
        return Ok(());
    }

    for item in &items {
        let indent = if item.is_root() { "" } else { "    " };
        println!("{indent}{:>3}. {} ({})", item.sort_order, item.name, item.id);
    }
    Ok(())
}

/// Show the most recent data-feed run.
pub async fn cmd_datafeed(ctx: &Context, guid: &str) -> Result<(), ArcherError> {
    let session = ctx.session().await?;
    let run = ctx.client().datafeed_status(&session, guid).await?;

    if ctx.json_mode {
        print_json(&json!(run));
        return Ok(());
    }

    println!("Data feed {guid}");
    println!("Status:  {}", run.status.map(|s| s.to_string()).unwrap_or_default());
    println!("Started: {}", run.start_time.as_deref().unwrap_or("-"));
    println!("Ended:   {}", run.end_time.as_deref().unwrap_or("-"));
    if let Some(message) = &run.message {
        println!("Message: {message}");
    }
    Ok(())
}
