//! Navigational index derived from the content store.
//!
//! - **by collection**: dated items, newest first, ties broken by identifier.
//!   Undated items are left out of the ordering; they stay reachable through
//!   the store.
//! - **by tag**: every tag mapped to the keys of the items carrying it. Tags
//!   are compared byte for byte, so `ML` and `ml` are different tags.
//!
//! Only ordered maps and sorted sequences are used, so the same store always
//! produces the same index.

use crate::content::{Collection, ItemKey};
use crate::store::ContentStore;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// A dated item's position in its collection's chronology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub date: NaiveDate,
    pub key: ItemKey,
}

/// Items of one calendar year, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearGroup<'a> {
    pub year: i32,
    pub entries: &'a [IndexEntry],
}

/// Chronological neighbours of an item within its collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbors<'a> {
    pub newer: Option<&'a ItemKey>,
    pub older: Option<&'a ItemKey>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct SiteIndex {
    by_collection: BTreeMap<Collection, Vec<IndexEntry>>,
    by_tag: BTreeMap<String, BTreeSet<ItemKey>>,
}

impl SiteIndex {
    /// Build the index in full from the store.
    pub fn build(store: &ContentStore) -> Self {
        let mut by_collection: BTreeMap<Collection, Vec<IndexEntry>> = BTreeMap::new();
        let mut by_tag: BTreeMap<String, BTreeSet<ItemKey>> = BTreeMap::new();

        for item in store.iter() {
            let entries = by_collection.entry(item.collection().clone()).or_default();
            if let Some(date) = item.date() {
                entries.push(IndexEntry {
                    date,
                    key: item.key(),
                });
            }
            for tag in item.tags() {
                by_tag.entry(tag.to_string()).or_default().insert(item.key());
            }
        }

        for entries in by_collection.values_mut() {
            entries.sort_by(|a, b| {
                (Reverse(a.date), &a.key.identifier).cmp(&(Reverse(b.date), &b.key.identifier))
            });
        }

        tracing::debug!(
            collections = by_collection.len(),
            tags = by_tag.len(),
            "built site index"
        );
        Self {
            by_collection,
            by_tag,
        }
    }

    /// Dated items of a collection, newest first.
    pub fn collection(&self, collection: &str) -> &[IndexEntry] {
        self.by_collection
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn collections(&self) -> impl Iterator<Item = (&Collection, &[IndexEntry])> {
        self.by_collection.iter().map(|(c, e)| (c, e.as_slice()))
    }

    pub fn tag(&self, tag: &str) -> Option<&BTreeSet<ItemKey>> {
        self.by_tag.get(tag)
    }

    /// Tags in sorted order with the items carrying them.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &BTreeSet<ItemKey>)> {
        self.by_tag.iter().map(|(t, keys)| (t.as_str(), keys))
    }

    /// Newer and older items around `key`. Undated items have no neighbours.
    pub fn neighbors(&self, key: &ItemKey) -> Neighbors<'_> {
        let entries = self.collection(key.collection.as_str());
        let Some(pos) = entries.iter().position(|e| &e.key == key) else {
            return Neighbors::default();
        };
        Neighbors {
            newer: pos.checked_sub(1).map(|i| &entries[i].key),
            older: entries.get(pos + 1).map(|e| &e.key),
        }
    }

    /// A collection's chronology grouped by year, newest year first.
    pub fn archive(&self, collection: &str) -> Vec<YearGroup<'_>> {
        self.collection(collection)
            .chunk_by(|a, b| a.date.year() == b.date.year())
            .map(|entries| YearGroup {
                year: entries[0].date.year(),
                entries,
            })
            .collect()
    }
}
