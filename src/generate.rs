//! Writing the rendered site to disk.
//!
//! The last stage of the build. [`write_site`] receives every rendered
//! [`Document`] at once, so a failed build never reaches this module and
//! never leaves a half-written site behind.
//!
//! ## Output Structure
//!
//! ```text
//! _site/
//! ├── index.html                   # permalink: /
//! ├── cv/index.html                # _pages/cv.md
//! ├── about.html                   # redirect_from: /about.html
//! ├── posts/
//! │   ├── index.html               # archive page, permalink: /posts/
//! │   └── 2025-01-01-hello/
//! │       └── index.html
//! ├── tags/index.html
//! └── .quire-manifest.json         # output cache manifest
//! ```
//!
//! Unchanged files are skipped and files from earlier builds that are no
//! longer produced are pruned; see [`crate::cache`].

use crate::cache::{self, CacheStats, OutputManifest};
use crate::render::Document;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("output path escapes the output directory: {}", .0.display())]
    InvalidPath(PathBuf),
}

/// Result of writing a site.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub output_dir: PathBuf,
    pub stats: CacheStats,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> WriteError + '_ {
    move |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `documents` under `output_dir`.
///
/// With `use_cache`, files whose contents match the previous build are not
/// rewritten. Stale files from the previous build are removed either way.
pub fn write_site(
    documents: &[Document],
    output_dir: &Path,
    use_cache: bool,
) -> Result<WriteReport, WriteError> {
    fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;

    let previous = OutputManifest::load(output_dir);
    let mut current = OutputManifest::empty();
    let mut stats = CacheStats::default();

    for document in documents {
        let key = cache::manifest_key(&document.file)
            .ok_or_else(|| WriteError::InvalidPath(document.file.clone()))?;
        let hash = cache::hash_contents(document.contents.as_bytes());
        let target = output_dir.join(&document.file);

        if use_cache && previous.is_fresh(&key, &hash, output_dir) {
            tracing::debug!(file = %key, "unchanged");
            stats.skip();
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            fs::write(&target, &document.contents).map_err(io_error(&target))?;
            tracing::debug!(file = %key, "wrote");
            stats.write();
        }
        current.insert(key, hash);
    }

    for key in previous.stale(&current) {
        let target = output_dir.join(key);
        match fs::remove_file(&target) {
            Ok(()) => {
                tracing::info!(file = %key, "removed stale output");
                stats.remove();
                remove_empty_parents(&target, output_dir);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&target)(e)),
        }
    }

    let manifest_path = cache::manifest_path(output_dir);
    current.save(output_dir).map_err(io_error(&manifest_path))?;

    Ok(WriteReport {
        output_dir: output_dir.to_path_buf(),
        stats,
    })
}

/// Remove directories left empty by pruning, stopping at `root`.
fn remove_empty_parents(file: &Path, root: &Path) {
    let mut dir = file.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which ends the walk.
        if fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}
