//! Shared test utilities for the quire test suite.
//!
//! Provides item constructors, fixture setup, and lookup helpers that panic
//! with the available keys on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let store = store_with(vec![
//!     item("posts", "hello", "---\ntitle: Hello\ndate: 2025-01-01\n---\n"),
//!     item("pages", "about", "---\ntitle: About\n---\n"),
//! ]);
//!
//! let tmp = setup_fixtures();
//! let site = Site::load(tmp.path(), false).unwrap();
//! let post = find_item(&site.store, "posts", "2025-01-01-hello-world");
//! assert_eq!(post.title(), "Hello, World");
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::content::{self, Collection, ContentItem, ItemKey};
use crate::store::ContentStore;

// =========================================================================
// Item construction
// =========================================================================

/// Parse `text` as `_<collection>/<identifier>.md`. Panics on parse errors.
pub fn item(collection: &str, identifier: &str, text: &str) -> ContentItem {
    let relative = PathBuf::from(format!("{identifier}.md"));
    let source = Path::new(&format!("_{collection}")).join(&relative);
    content::parse_item(text, &source, &relative, Collection::new(collection))
        .unwrap_or_else(|e| panic!("test item '{collection}/{identifier}' failed to parse: {e}"))
}

/// A store holding `items`, added in order. Panics on duplicates.
pub fn store_with(items: Vec<ContentItem>) -> ContentStore {
    let mut store = ContentStore::new();
    for item in items {
        store.add(item).unwrap();
    }
    store
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Store lookups: panic with a clear message on miss
// =========================================================================

/// Find an item by collection and identifier. Panics if not found.
pub fn find_item<'a>(store: &'a ContentStore, collection: &str, identifier: &str) -> &'a ContentItem {
    let key = ItemKey::new(Collection::new(collection), identifier);
    store.get(&key).unwrap_or_else(|| {
        let keys: Vec<String> = store.iter().map(|i| i.key().to_string()).collect();
        panic!("item '{key}' not found. Available: {keys:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Collection names in store order.
pub fn collection_names(store: &ContentStore) -> Vec<&str> {
    store.collections().map(Collection::as_str).collect()
}

/// Identifiers of one collection in source order.
pub fn identifiers<'a>(store: &'a ContentStore, collection: &str) -> Vec<&'a str> {
    store.all(collection).map(ContentItem::identifier).collect()
}
