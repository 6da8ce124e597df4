//! In-memory content store for one build.
//!
//! Items are grouped by collection and kept in insertion order. The store is
//! append-only: [`ContentStore::add`] rejects a second item with the same
//! `(collection, identifier)` pair and there is no removal.

use crate::content::{Collection, ContentItem, ItemKey};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::slice;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(
        "duplicate identifier '{identifier}' in collection '{collection}': {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateIdentifier {
        collection: Collection,
        identifier: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Items of one collection, in insertion order.
///
/// Cloning the iterator restarts nothing and costs nothing; each clone walks
/// the same items independently.
pub type Items<'a> = slice::Iter<'a, ContentItem>;

#[derive(Debug, Default)]
pub struct ContentStore {
    collections: BTreeMap<Collection, Vec<ContentItem>>,
    positions: HashMap<ItemKey, usize>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, failing if its key is already taken.
    pub fn add(&mut self, item: ContentItem) -> Result<(), StoreError> {
        let key = item.key();
        let items = self.collections.entry(key.collection.clone()).or_default();
        if let Some(&pos) = self.positions.get(&key) {
            return Err(StoreError::DuplicateIdentifier {
                first: items[pos].source().to_path_buf(),
                second: item.source().to_path_buf(),
                collection: key.collection,
                identifier: key.identifier,
            });
        }
        self.positions.insert(key, items.len());
        items.push(item);
        Ok(())
    }

    /// All items of `collection`, in insertion order. Unknown collections
    /// yield nothing.
    pub fn all(&self, collection: &str) -> Items<'_> {
        self.collections
            .get(collection)
            .map(|items| items.iter())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&ContentItem> {
        let pos = *self.positions.get(key)?;
        self.collections.get(&key.collection)?.get(pos)
    }

    /// Collections holding at least one item, in name order.
    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.keys()
    }

    /// Every item: collections in name order, items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ContentItem> {
        self.collections.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
