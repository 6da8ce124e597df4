//! Filesystem scanning into the content store.
//!
//! The first stage of the quire build pipeline. Walks every configured
//! collection directory, parses each Markdown source and adds the results to
//! a fresh [`ContentStore`].
//!
//! ## Directory Structure
//!
//! ```text
//! site/                            # Source root
//! ├── config.toml                  # Site configuration (optional)
//! ├── _pages/                      # collection "pages", root "/"
//! │   ├── about.md                 # permalink: /
//! │   └── cv.md
//! ├── _posts/                      # collection "posts", root "/posts/"
//! │   ├── 2025-01-01-hello.md
//! │   └── .draft-idea.md           # hidden = ignored
//! ├── _portfolio/
//! │   └── robots/
//! │       └── arm.md               # identifier "robots/arm"
//! └── _talks/
//! ```
//!
//! ## Rules
//!
//! - Files ending in `.md` or `.markdown` are content; everything else is
//!   ignored.
//! - Hidden files and directories (leading `.`) are skipped entirely.
//! - A configured collection whose directory does not exist is empty.
//! - Items with `published: false` are left out unless unpublished items are
//!   requested; they are reported in [`ScanResult::skipped`].
//!
//! ## Parallelism
//!
//! Sources are discovered in sorted order, then read and parsed on the rayon
//! pool. Results come back in discovery order and are added to the store on
//! the calling thread, so `add` never races and the first error reported is
//! always the first failing file in sorted order.

use crate::config::SiteConfig;
use crate::content::{self, Collection, ContentItem, ParseError};
use crate::store::{ContentStore, StoreError};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk collection directory")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

const CONTENT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Options that change what a scan keeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Keep items marked `published: false`.
    pub include_unpublished: bool,
}

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub collection: Collection,
    /// Path as reported to the user: relative to the source root.
    pub display_path: PathBuf,
    /// Path relative to the collection directory.
    pub relative: PathBuf,
    /// Path to read from.
    pub full_path: PathBuf,
}

/// Output of the scan stage.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub store: ContentStore,
    /// Unpublished items that were left out, by source path.
    pub skipped: Vec<PathBuf>,
}

/// Scan all collections under `root` into a new store.
pub fn scan(
    root: &Path,
    config: &SiteConfig,
    options: ScanOptions,
) -> Result<ScanResult, ScanError> {
    let sources = discover(root, config)?;
    tracing::info!(files = sources.len(), root = %root.display(), "discovered sources");

    let parsed: Vec<Result<ContentItem, ScanError>> = sources.par_iter().map(parse_source).collect();

    let mut result = ScanResult::default();
    for item in parsed {
        let item = item?;
        if !item.is_published() && !options.include_unpublished {
            tracing::warn!(source = %item.source().display(), "skipping unpublished item");
            result.skipped.push(item.source().to_path_buf());
            continue;
        }
        result.store.add(item)?;
    }
    Ok(result)
}

/// List every content file of every configured collection, in collection
/// name order and then path order.
pub fn discover(root: &Path, config: &SiteConfig) -> Result<Vec<SourceFile>, ScanError> {
    let mut sources = Vec::new();
    for (name, collection) in &config.collections {
        let dir = root.join(&collection.dir);
        if !dir.is_dir() {
            tracing::debug!(collection = %name, dir = %dir.display(), "collection directory missing");
            continue;
        }
        let walker = WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_content(entry.path()) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&dir)
                .unwrap_or(entry.path())
                .to_path_buf();
            tracing::debug!(collection = %name, file = %relative.display(), "found source");
            sources.push(SourceFile {
                collection: Collection::new(name.clone()),
                display_path: Path::new(&collection.dir).join(&relative),
                relative,
                full_path: entry.path().to_path_buf(),
            });
        }
    }
    Ok(sources)
}

fn parse_source(source: &SourceFile) -> Result<ContentItem, ScanError> {
    let text = fs::read_to_string(&source.full_path).map_err(|e| ScanError::Io {
        path: source.display_path.clone(),
        source: e,
    })?;
    Ok(content::parse_item(
        &text,
        &source.display_path,
        &source.relative,
        source.collection.clone(),
    )?)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_content(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| CONTENT_EXTENSIONS.contains(&ext.as_str()))
}
