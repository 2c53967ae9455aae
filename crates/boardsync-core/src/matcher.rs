//! Matching destination items back to their source items.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::Item;

/// A destination item whose link value was already claimed by an earlier
/// item on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateLink {
    pub link_value: String,
    pub kept_item_id: String,
    pub dropped_item_id: String,
}

/// Link value (the source item's key) to destination item id.
///
/// Built once per run from the full destination page. When several
/// destination items carry the same link value the first one in board
/// order wins; the rest are recorded in [`MatchTable::duplicates`].
/// Destination items without a link value are not matched at all and are
/// listed in [`MatchTable::unlinked`].
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    entries: HashMap<String, String>,
    duplicates: Vec<DuplicateLink>,
    unlinked: Vec<String>,
}

impl MatchTable {
    pub fn build(destination_items: &[Item], link_column: &str) -> Self {
        let mut table = Self::default();

        for item in destination_items {
            let Some(link_value) = item.column_text(link_column) else {
                table.unlinked.push(item.id.clone());
                continue;
            };

            match table.entries.get(link_value) {
                Some(kept) => table.duplicates.push(DuplicateLink {
                    link_value: link_value.to_string(),
                    kept_item_id: kept.clone(),
                    dropped_item_id: item.id.clone(),
                }),
                None => {
                    table
                        .entries
                        .insert(link_value.to_string(), item.id.clone());
                }
            }
        }

        table
    }

    /// Destination item id for a source key.
    pub fn get(&self, link_value: &str) -> Option<&str> {
        self.entries.get(link_value).map(String::as_str)
    }

    /// Records a newly created destination item. An existing entry is kept.
    pub fn insert(&mut self, link_value: impl Into<String>, item_id: impl Into<String>) {
        self.entries
            .entry(link_value.into())
            .or_insert_with(|| item_id.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates(&self) -> &[DuplicateLink] {
        &self.duplicates
    }

    /// Ids of destination items with no link value.
    pub fn unlinked(&self) -> &[String] {
        &self.unlinked
    }
}
