//! Canonical URLs, redirect aliases and their output files.
//!
//! Every item gets exactly one canonical URL path:
//!
//! - its `permalink`, when the front matter sets one
//! - otherwise `<collection root><slugified identifier>/`, e.g.
//!   `_posts/2025-01-01-Hello World.md` → `/posts/2025-01-01-hello-world/`
//!
//! plus one alias per `redirect_from` entry. URL paths map to files in the
//! output directory:
//!
//! | URL path | Output file |
//! |----------|-------------|
//! | `/` | `index.html` |
//! | `/about/` | `about/index.html` |
//! | `/about` | `about/index.html` |
//! | `/feed.xml` | `feed.xml` |
//!
//! Collisions are checked on output files, so `/about` and `/about/` clash,
//! and so do `/cv.pdf` and `/cv.pdf/x/`: the first needs `cv.pdf` as a file,
//! the second as a directory.
//! Resolution is a pure function of the store and configuration: canonical
//! paths are claimed first in store order, then aliases, and the first clash
//! found is the one reported.

use crate::config::SiteConfig;
use crate::content::ItemKey;
use crate::slug;
use crate::store::ContentStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error(
        "path collision on {path}: {} ({first_kind}) and {} ({second_kind})",
        first.display(),
        second.display()
    )]
    PathCollision {
        path: String,
        first: PathBuf,
        first_kind: LinkKind,
        second: PathBuf,
        second_kind: LinkKind,
    },
}

/// Whether a URL path is an item's canonical location or a redirect to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Canonical,
    Alias,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkKind::Canonical => f.write_str("canonical"),
            LinkKind::Alias => f.write_str("alias"),
        }
    }
}

/// Resolved URL paths of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub canonical: String,
    pub aliases: Vec<String>,
}

/// Resolved links of every item in the store.
#[derive(Debug, Default)]
pub struct LinkTable {
    links: BTreeMap<ItemKey, ResolvedLink>,
}

impl LinkTable {
    pub fn get(&self, key: &ItemKey) -> Option<&ResolvedLink> {
        self.links.get(key)
    }

    /// Links ordered by item key.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemKey, &ResolvedLink)> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Output file for a URL path, relative to the output directory.
pub fn output_file(url_path: &str) -> PathBuf {
    let segments: Vec<&str> = url_path.split('/').filter(|s| !s.is_empty()).collect();
    let mut file: PathBuf = segments.iter().collect();
    let is_file = !url_path.ends_with('/')
        && segments
            .last()
            .is_some_and(|last| last.rsplit_once('.').is_some_and(|(stem, _)| !stem.is_empty()));
    if !is_file {
        file.push("index.html");
    }
    file
}

/// Canonical URL path for an item that sets no permalink.
pub fn derived_path(root: &str, identifier: &str) -> String {
    let slug = slug::slugify_identifier(identifier);
    if slug.is_empty() {
        root.to_string()
    } else {
        format!("{root}{slug}/")
    }
}

/// Resolve every item's canonical and alias paths.
pub fn resolve(store: &ContentStore, config: &SiteConfig) -> Result<LinkTable, LinkError> {
    let mut claims: BTreeMap<PathBuf, (&Path, LinkKind)> = BTreeMap::new();
    let mut links = BTreeMap::new();

    let items: Vec<_> = store.iter().collect();

    for item in &items {
        let canonical = match item.permalink() {
            Some(permalink) => permalink.to_string(),
            None => {
                let root = config.collection_root(item.collection().as_str());
                derived_path(&root, item.identifier())
            }
        };
        claim(&mut claims, &canonical, item.source(), LinkKind::Canonical)?;
        links.insert(
            item.key(),
            ResolvedLink {
                canonical,
                aliases: Vec::new(),
            },
        );
    }

    for item in &items {
        let aliases: Vec<String> = item
            .redirect_from()
            .into_iter()
            .map(str::to_string)
            .collect();
        for alias in &aliases {
            claim(&mut claims, alias, item.source(), LinkKind::Alias)?;
        }
        if let Some(link) = links.get_mut(&item.key()) {
            link.aliases = aliases;
        }
    }

    tracing::debug!(items = links.len(), files = claims.len(), "resolved links");
    Ok(LinkTable { links })
}

fn claim<'a>(
    claims: &mut BTreeMap<PathBuf, (&'a Path, LinkKind)>,
    url_path: &str,
    source: &'a Path,
    kind: LinkKind,
) -> Result<(), LinkError> {
    let file = output_file(url_path);
    let collision = |&(first, first_kind): &(&Path, LinkKind)| LinkError::PathCollision {
        path: url_path.to_string(),
        first: first.to_path_buf(),
        first_kind,
        second: source.to_path_buf(),
        second_kind: kind,
    };

    // A claimed file must not sit where another claim needs a directory,
    // in either order.
    if let Some(owner) = file.ancestors().skip(1).find_map(|dir| claims.get(dir)) {
        return Err(collision(owner));
    }
    if let Some((_, owner)) = claims
        .range::<Path, _>((Bound::Excluded(file.as_path()), Bound::Unbounded))
        .next()
        .filter(|(claimed, _)| claimed.starts_with(&file))
    {
        return Err(collision(owner));
    }

    match claims.entry(file) {
        Entry::Occupied(existing) => Err(collision(existing.get())),
        Entry::Vacant(slot) => {
            slot.insert((source, kind));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{item, store_with};

    fn key(collection: &str, identifier: &str) -> ItemKey {
        ItemKey::new(crate::content::Collection::new(collection), identifier)
    }

    // =========================================================================
    // output_file
    // =========================================================================

    #[test]
    fn output_file_root() {
        assert_eq!(output_file("/"), Path::new("index.html"));
    }

    #[test]
    fn output_file_directory() {
        assert_eq!(output_file("/about/"), Path::new("about/index.html"));
        assert_eq!(output_file("/about"), Path::new("about/index.html"));
    }

    #[test]
    fn output_file_with_extension() {
        assert_eq!(output_file("/about.html"), Path::new("about.html"));
        assert_eq!(output_file("/files/cv.pdf"), Path::new("files/cv.pdf"));
    }

    #[test]
    fn output_file_dotfile_is_directory() {
        assert_eq!(output_file("/.well-known"), Path::new(".well-known/index.html"));
    }

    #[test]
    fn output_file_collapses_double_slashes() {
        assert_eq!(output_file("//a//b/"), Path::new("a/b/index.html"));
    }

    // =========================================================================
    // resolve
    // =========================================================================

    #[test]
    fn derived_from_collection_root() {
        let store = store_with(vec![
            item("posts", "2025-01-01-Hello World", "---\ntitle: Hello\n---\n"),
            item("pages", "cv", "---\ntitle: CV\n---\n"),
            item("notes", "x", "---\ntitle: X\n---\n"),
        ]);
        let table = resolve(&store, &SiteConfig::default()).unwrap();

        let post = table.get(&key("posts", "2025-01-01-Hello World")).unwrap();
        assert_eq!(post.canonical, "/posts/2025-01-01-hello-world/");
        assert_eq!(table.get(&key("pages", "cv")).unwrap().canonical, "/cv/");
        assert_eq!(table.get(&key("notes", "x")).unwrap().canonical, "/notes/x/");
    }

    #[test]
    fn permalink_wins() {
        let store = store_with(vec![item(
            "pages",
            "about",
            "---\ntitle: About\npermalink: /\n---\n",
        )]);
        let table = resolve(&store, &SiteConfig::default()).unwrap();
        assert_eq!(table.get(&key("pages", "about")).unwrap().canonical, "/");
    }

    #[test]
    fn aliases_are_recorded() {
        let store = store_with(vec![item(
            "pages",
            "about",
            "---\ntitle: About\npermalink: /about/\nredirect_from: [/about.html, /bio/]\n---\n",
        )]);
        let table = resolve(&store, &SiteConfig::default()).unwrap();
        let link = table.get(&key("pages", "about")).unwrap();
        assert_eq!(link.aliases, vec!["/about.html", "/bio/"]);
    }

    #[test]
    fn same_permalink_collides() {
        let store = store_with(vec![
            item("pages", "a", "---\ntitle: A\npermalink: /same/\n---\n"),
            item("posts", "b", "---\ntitle: B\npermalink: /same/\n---\n"),
        ]);
        let err = resolve(&store, &SiteConfig::default()).unwrap_err();
        let LinkError::PathCollision {
            path,
            first,
            second,
            second_kind,
            ..
        } = err;
        assert_eq!(path, "/same/");
        assert_eq!(first, Path::new("_pages/a.md"));
        assert_eq!(second, Path::new("_posts/b.md"));
        assert_eq!(second_kind, LinkKind::Canonical);
    }

    #[test]
    fn trailing_slash_variants_collide() {
        let store = store_with(vec![
            item("pages", "a", "---\ntitle: A\npermalink: /x\n---\n"),
            item("pages", "b", "---\ntitle: B\npermalink: /x/\n---\n"),
        ]);
        assert!(resolve(&store, &SiteConfig::default()).is_err());
    }

    #[test]
    fn derived_and_explicit_collide() {
        let store = store_with(vec![
            item("posts", "hello", "---\ntitle: A\n---\n"),
            item("pages", "b", "---\ntitle: B\npermalink: /posts/hello/\n---\n"),
        ]);
        assert!(resolve(&store, &SiteConfig::default()).is_err());
    }

    #[test]
    fn alias_colliding_with_canonical() {
        // Canonical paths are claimed before any alias.
        let store = store_with(vec![
            item("pages", "a", "---\ntitle: A\nredirect_from: /posts/b/\n---\n"),
            item("posts", "b", "---\ntitle: B\n---\n"),
        ]);
        let LinkError::PathCollision {
            first_kind,
            second_kind,
            first,
            ..
        } = resolve(&store, &SiteConfig::default()).unwrap_err();
        assert_eq!(first_kind, LinkKind::Canonical);
        assert_eq!(second_kind, LinkKind::Alias);
        assert_eq!(first, Path::new("_posts/b.md"));
    }

    #[test]
    fn alias_colliding_with_alias() {
        let store = store_with(vec![
            item("pages", "a", "---\ntitle: A\nredirect_from: /old/\n---\n"),
            item("pages", "b", "---\ntitle: B\nredirect_from: /old/\n---\n"),
        ]);
        let LinkError::PathCollision {
            first_kind,
            second_kind,
            ..
        } = resolve(&store, &SiteConfig::default()).unwrap_err();
        assert_eq!(first_kind, LinkKind::Alias);
        assert_eq!(second_kind, LinkKind::Alias);
    }

    #[test]
    fn file_blocking_a_directory_collides() {
        let store = store_with(vec![
            item("pages", "a", "---\ntitle: A\npermalink: /cv.pdf/x/\n---\n"),
            item("pages", "b", "---\ntitle: B\npermalink: /cv.pdf\n---\n"),
        ]);
        let LinkError::PathCollision {
            path, first, second, ..
        } = resolve(&store, &SiteConfig::default()).unwrap_err();
        assert_eq!(path, "/cv.pdf");
        assert_eq!(first, Path::new("_pages/a.md"));
        assert_eq!(second, Path::new("_pages/b.md"));
    }

    #[test]
    fn directory_under_a_claimed_file_collides() {
        let store = store_with(vec![
            item("pages", "a", "---\ntitle: A\npermalink: /feed.xml\n---\n"),
            item("pages", "b", "---\ntitle: B\nredirect_from: /feed.xml/old/\n---\n"),
        ]);
        let LinkError::PathCollision {
            first_kind,
            second_kind,
            ..
        } = resolve(&store, &SiteConfig::default()).unwrap_err();
        assert_eq!(first_kind, LinkKind::Canonical);
        assert_eq!(second_kind, LinkKind::Alias);
    }

    #[test]
    fn sibling_names_sharing_a_prefix_do_not_collide() {
        let store = store_with(vec![
            item("pages", "a", "---\ntitle: A\npermalink: /cv.pdf\n---\n"),
            item("pages", "b", "---\ntitle: B\npermalink: /cv.pdf.bak/\n---\n"),
            item("pages", "c", "---\ntitle: C\npermalink: /cv/\n---\n"),
        ]);
        assert_eq!(resolve(&store, &SiteConfig::default()).unwrap().len(), 3);
    }

    #[test]
    fn resolve_is_deterministic() {
        let store = store_with(vec![
            item("posts", "b", "---\ntitle: B\n---\n"),
            item("posts", "a", "---\ntitle: A\nredirect_from: /old-a/\n---\n"),
        ]);
        let first: Vec<_> = resolve(&store, &SiteConfig::default())
            .unwrap()
            .iter()
            .map(|(k, l)| (k.clone(), l.clone()))
            .collect();
        let second: Vec<_> = resolve(&store, &SiteConfig::default())
            .unwrap()
            .iter()
            .map(|(k, l)| (k.clone(), l.clone()))
            .collect();
        assert_eq!(first, second);
    }
}
