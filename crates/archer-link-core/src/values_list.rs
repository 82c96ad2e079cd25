//! # Values Lists
//!
//! A values list is a two-level set of selectable named items: root items
//! and, optionally, children of a root. Deeper nesting is not modeled.
//!
//! The platform returns the list flat, each value pointing at its parent by
//! id. `enrich_values_list` resolves parent names, orders siblings and marks
//! the first and last item of each sibling group.

use crate::ValuesListId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value as returned by the flat values-list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValuesListValue {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub numeric_value: Option<f64>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub values_list_id: Option<ValuesListId>,
}

/// A values-list item with its parent resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuesListItem {
    pub name: String,
    pub id: u64,
    pub parent_name: Option<String>,
    pub parent_id: Option<u64>,
    pub description: Option<String>,
    pub numeric_value: Option<f64>,
    pub sort_order: i64,
    pub is_first: bool,
    pub is_last: bool,
}

impl ValuesListItem {
    /// Item with no parent name resolved and no position flags.
    #[must_use]
    pub fn from_value(value: ValuesListValue) -> Self {
        Self {
            name: value.name,
            id: value.id,
            parent_name: None,
            parent_id: value.parent_id,
            description: value.description,
            numeric_value: value.numeric_value,
            sort_order: value.sort_order.unwrap_or(0),
            is_first: false,
            is_last: false,
        }
    }

    pub fn set_parent_name(&mut self, name: impl Into<String>) {
        self.parent_name = Some(name.into());
    }

    pub fn set_sort_order(&mut self, sort_order: i64) {
        self.sort_order = sort_order;
    }

    pub fn set_position(&mut self, is_first: bool, is_last: bool) {
        self.is_first = is_first;
        self.is_last = is_last;
    }

    /// True for a top-level item.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Resolve parents and order a flat values list.
///
/// Output order: each root (by sort order, then name) followed by its
/// children (same ordering). Items whose parent is not in the list are
/// appended last, grouped by parent id. Sort orders are renumbered from 1
/// within each sibling group.
pub fn enrich_values_list(values: Vec<ValuesListValue>) -> Vec<ValuesListItem> {
    let names: BTreeMap<u64, String> = values.iter().map(|v| (v.id, v.name.clone())).collect();

    let mut groups: BTreeMap<Option<u64>, Vec<ValuesListItem>> = BTreeMap::new();
    for value in values {
        let mut item = ValuesListItem::from_value(value);
        if let Some(parent) = item.parent_id.and_then(|id| names.get(&id)) {
            item.set_parent_name(parent.clone());
        }
        groups.entry(item.parent_id).or_default().push(item);
    }

    for siblings in groups.values_mut() {
        siblings.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        let last = siblings.len().saturating_sub(1);
        for (index, item) in siblings.iter_mut().enumerate() {
            item.set_sort_order(index as i64 + 1);
            item.set_position(index == 0, index == last);
        }
    }

    let roots = groups.remove(&None).unwrap_or_default();
    let mut ordered = Vec::new();
    for root in roots {
        let children = groups.remove(&Some(root.id));
        ordered.push(root);
        ordered.extend(children.unwrap_or_default());
    }
    for orphans in groups.into_values() {
        ordered.extend(orphans);
    }
    ordered
}

// =============================================================================
// TESTS
// =============================================================================
