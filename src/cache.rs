//! Output cache for incremental builds.
//!
//! Every build renders the whole site in memory; this module decides which of
//! the rendered files actually need to touch the disk. Rewriting unchanged
//! files is harmless but slow on large sites and makes every file look new to
//! rsync-style deploys, so the writer skips them.
//!
//! # Design
//!
//! The manifest maps each output file (relative path, `/`-separated) to the
//! SHA-256 of the contents the last build wrote there. A file is skipped when:
//!
//! 1. the manifest has an entry for its path with the same hash
//! 2. the file still exists on disk
//!
//! Hashing the rendered contents, not the source files, means a change to
//! configuration, theme or any item a page lists is picked up without
//! dependency tracking.
//!
//! ## Pruning
//!
//! Files recorded in the previous manifest but not produced by the current
//! build (a renamed post, a removed alias) are deleted. Files the generator
//! never wrote are left alone.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.quire-manifest.json`.
//!
//! ## Bypassing the cache
//!
//! `build --no-cache` rewrites every file. The previous manifest is still
//! read so stale files are pruned.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Name of the cache manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".quire-manifest.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// On-disk manifest mapping output paths to content hashes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct OutputManifest {
    pub version: u32,
    pub entries: BTreeMap<String, String>,
}

impl OutputManifest {
    /// Create an empty manifest (first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let path = manifest_path(output_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable output manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.without_foreign_keys(&path)
    }

    /// Drop entries whose key is not a plain relative path inside the output
    /// directory. Stale entries are deleted from disk, so a hand-edited
    /// `../file` or absolute key must never reach pruning.
    fn without_foreign_keys(mut self, path: &Path) -> Self {
        self.entries.retain(|key, _| {
            let valid = manifest_key(Path::new(key)).as_deref() == Some(key.as_str());
            if !valid {
                tracing::warn!(manifest = %path.display(), key = %key, "ignoring manifest entry outside the output directory");
            }
            valid
        });
        self
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Whether `key` was last written with `hash` and is still on disk.
    pub fn is_fresh(&self, key: &str, hash: &str, output_dir: &Path) -> bool {
        self.entries.get(key).is_some_and(|h| h == hash) && output_dir.join(key).is_file()
    }

    pub fn insert(&mut self, key: String, hash: String) {
        self.entries.insert(key, hash);
    }

    /// Paths recorded here but not in `current`.
    pub fn stale<'a>(&'a self, current: &'a OutputManifest) -> impl Iterator<Item = &'a str> {
        self.entries
            .keys()
            .filter(|key| !current.entries.contains_key(*key))
            .map(String::as_str)
    }
}

/// SHA-256 of rendered contents, returned as a hex string.
pub fn hash_contents(contents: &[u8]) -> String {
    format!("{:x}", Sha256::digest(contents))
}

/// Manifest key of an output file: its relative path with `/` separators.
///
/// Returns `None` for paths that would escape the output directory.
pub fn manifest_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub written: u32,
    pub unchanged: u32,
    pub removed: u32,
}

impl CacheStats {
    pub fn write(&mut self) {
        self.written += 1;
    }

    pub fn skip(&mut self) {
        self.unchanged += 1;
    }

    pub fn remove(&mut self) {
        self.removed += 1;
    }

    /// Files produced by this build, written or not.
    pub fn total(&self) -> u32 {
        self.written + self.unchanged
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unchanged > 0 {
            write!(
                f,
                "{} unchanged, {} written ({} total)",
                self.unchanged,
                self.written,
                self.total()
            )?;
        } else {
            write!(f, "{} written", self.written)?;
        }
        if self.removed > 0 {
            write!(f, ", {} removed", self.removed)?;
        }
        Ok(())
    }
}

/// Resolve the cache manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // OutputManifest basics
    // =========================================================================

    #[test]
    fn empty_manifest_has_no_entries() {
        let m = OutputManifest::empty();
        assert_eq!(m.version, MANIFEST_VERSION);
        assert!(m.entries.is_empty());
    }

    #[test]
    fn fresh_when_hash_matches_and_file_exists() {
        let tmp = TempDir::new().unwrap();
        let mut m = OutputManifest::empty();
        m.insert("about/index.html".into(), "abc".into());
        fs::create_dir_all(tmp.path().join("about")).unwrap();
        fs::write(tmp.path().join("about/index.html"), "x").unwrap();

        assert!(m.is_fresh("about/index.html", "abc", tmp.path()));
    }

    #[test]
    fn not_fresh_when_hash_differs() {
        let tmp = TempDir::new().unwrap();
        let mut m = OutputManifest::empty();
        m.insert("index.html".into(), "abc".into());
        fs::write(tmp.path().join("index.html"), "x").unwrap();

        assert!(!m.is_fresh("index.html", "def", tmp.path()));
    }

    #[test]
    fn not_fresh_when_file_deleted() {
        let tmp = TempDir::new().unwrap();
        let mut m = OutputManifest::empty();
        m.insert("gone.html".into(), "h".into());
        assert!(!m.is_fresh("gone.html", "h", tmp.path()));
    }

    #[test]
    fn stale_entries() {
        let mut previous = OutputManifest::empty();
        previous.insert("a.html".into(), "1".into());
        previous.insert("b.html".into(), "2".into());
        let mut current = OutputManifest::empty();
        current.insert("b.html".into(), "3".into());

        let stale: Vec<_> = previous.stale(&current).collect();
        assert_eq!(stale, vec!["a.html"]);
    }

    // =========================================================================
    // Save / Load roundtrip
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut m = OutputManifest::empty();
        m.insert("x.html".into(), "s1".into());
        m.insert("y/index.html".into(), "s2".into());

        m.save(tmp.path()).unwrap();
        let loaded = OutputManifest::load(tmp.path());

        assert_eq!(loaded, m);
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let m = OutputManifest::load(tmp.path());
        assert!(m.entries.is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(manifest_path(tmp.path()), "not json").unwrap();
        let m = OutputManifest::load(tmp.path());
        assert!(m.entries.is_empty());
    }

    #[test]
    fn load_drops_keys_outside_output_dir() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "entries": {{"../victim.txt": "a", "/etc/passwd": "b", "./x.html": "c", "ok/index.html": "d"}}}}"#,
            MANIFEST_VERSION
        );
        fs::write(manifest_path(tmp.path()), json).unwrap();
        let m = OutputManifest::load(tmp.path());
        let keys: Vec<&str> = m.entries.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["ok/index.html"]);
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "entries": {{"a.html": "h"}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(manifest_path(tmp.path()), json).unwrap();
        let m = OutputManifest::load(tmp.path());
        assert!(m.entries.is_empty());
    }

    // =========================================================================
    // Hashing and keys
    // =========================================================================

    #[test]
    fn hash_contents_deterministic() {
        let h1 = hash_contents(b"hello world");
        let h2 = hash_contents(b"hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex is 64 chars
        assert_ne!(h1, hash_contents(b"hello world!"));
    }

    #[test]
    fn manifest_key_uses_forward_slashes() {
        let path: PathBuf = ["posts", "hello", "index.html"].iter().collect();
        assert_eq!(manifest_key(&path).as_deref(), Some("posts/hello/index.html"));
    }

    #[test]
    fn manifest_key_rejects_escapes() {
        assert_eq!(manifest_key(Path::new("../outside.html")), None);
        assert_eq!(manifest_key(Path::new("/abs.html")), None);
        assert_eq!(manifest_key(Path::new("")), None);
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_unchanged() {
        let s = CacheStats {
            written: 2,
            unchanged: 5,
            removed: 0,
        };
        assert_eq!(format!("{}", s), "5 unchanged, 2 written (7 total)");
    }

    #[test]
    fn cache_stats_display_with_removed() {
        let s = CacheStats {
            written: 1,
            unchanged: 3,
            removed: 2,
        };
        assert_eq!(format!("{}", s), "3 unchanged, 1 written (4 total), 2 removed");
    }

    #[test]
    fn cache_stats_display_first_build() {
        let mut s = CacheStats::default();
        s.write();
        s.write();
        assert_eq!(format!("{}", s), "2 written");
    }
}
