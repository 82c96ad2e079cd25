//! # Field Mapping
//!
//! Bidirectional alias <-> id lookup tables for one level.
//!
//! ## Invariant
//!
//! `alias_to_id` and `id_to_alias` are exact inverses over the same key
//! domain: for every id `k` in `id_to_alias`, `alias_to_id[id_to_alias[k]]
//! == k`, and vice versa. `build` keeps the invariant by construction;
//! `is_consistent` re-checks it for mappings read back from a cache.

use crate::model::FieldDefinition;
use crate::{FieldId, LevelId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Alias <-> id tables for the fields materialized on a record's level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    level_id: LevelId,
    alias_to_id: BTreeMap<String, FieldId>,
    id_to_alias: BTreeMap<FieldId, String>,
}

impl FieldMapping {
    /// Build tables from a level's field definitions, restricted to the
    /// field ids present on the record.
    ///
    /// Definitions without an alias are ignored. When two definitions share
    /// an alias or an id, the first one wins.
    pub fn build<'a>(
        level_id: LevelId,
        present: &BTreeSet<FieldId>,
        definitions: impl IntoIterator<Item = &'a FieldDefinition>,
    ) -> Self {
        let mut alias_to_id = BTreeMap::new();
        let mut id_to_alias = BTreeMap::new();

        for definition in definitions {
            if !present.contains(&definition.id) || id_to_alias.contains_key(&definition.id) {
                continue;
            }
            let Some(alias) = definition
                .alias
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
            else {
                continue;
            };
            if alias_to_id.contains_key(alias) {
                continue;
            }
            alias_to_id.insert(alias.to_string(), definition.id);
            id_to_alias.insert(definition.id, alias.to_string());
        }

        Self {
            level_id,
            alias_to_id,
            id_to_alias,
        }
    }

    /// Level these fields belong to.
    #[must_use]
    pub fn level_id(&self) -> LevelId {
        self.level_id
    }

    /// Field id for an alias.
    #[must_use]
    pub fn id_for(&self, alias: &str) -> Option<FieldId> {
        self.alias_to_id.get(alias).copied()
    }

    /// Alias for a field id.
    #[must_use]
    pub fn alias_for(&self, id: FieldId) -> Option<&str> {
        self.id_to_alias.get(&id).map(String::as_str)
    }

    /// Number of mapped fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_alias.len()
    }

    /// True if no field is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_alias.is_empty()
    }

    /// `(id, alias)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &str)> {
        self.id_to_alias.iter().map(|(id, alias)| (*id, alias.as_str()))
    }

    /// Ids from `present` that did not make it into the tables.
    pub fn unmapped<'a>(&self, present: impl IntoIterator<Item = &'a FieldId>) -> Vec<FieldId> {
        present
            .into_iter()
            .filter(|id| !self.id_to_alias.contains_key(id))
            .copied()
            .collect()
    }

    /// Check that the two tables are exact inverses.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.alias_to_id.len() == self.id_to_alias.len()
            && self
                .id_to_alias
                .iter()
                .all(|(id, alias)| self.alias_to_id.get(alias) == Some(id))
    }
}

// =============================================================================
// TESTS
// =============================================================================
