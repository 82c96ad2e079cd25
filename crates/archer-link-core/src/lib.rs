//! # archer-link-core
//!
//! The session-independent logic of archer-link - THE LOGIC.
//!
//! This crate holds everything the client needs that does not touch the
//! network:
//! - `cache`: change-aware key/timeout cache over an abstract store
//! - `storage`: the `KeyValueStore` seam, with in-memory and redb backends
//! - `mapping`: alias <-> id tables for a level's fields
//! - `model`: platform wire types (envelope, content, definitions)
//! - `values_list`: two-level values-list enrichment
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - No logging: every failure is returned as `ArcherError`
//! - Persisted state is plain JSON text so any store can hold it

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod mapping;
pub mod model;
pub mod primitives;
pub mod storage;
pub mod types;
pub mod values_list;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ArcherError, ContentId, ErrorPayload, FieldId, LevelId, ValidationMessage, ValuesListId,
};

// =============================================================================
// RE-EXPORTS: Cache, Storage & Mapping
// =============================================================================

pub use cache::{CacheEntry, ChangeAwareCache};
pub use mapping::FieldMapping;
pub use storage::{KeyValueStore, MemoryStore, RedbStore};

// =============================================================================
// RE-EXPORTS: Wire Types
// =============================================================================

pub use model::{
    Application, ContentReference, ContentUpdateInformation, DataFeedRun, Envelope, FieldContent,
    FieldDefinition, RecordContent, SessionInfo, parse_timestamp,
};
pub use values_list::{ValuesListItem, ValuesListValue, enrich_values_list};
