//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Each item leads with
//! its positional index and title; the source file and URL are indented
//! context lines underneath. The output reads as a content inventory while
//! still letting users trace every entry back to a file.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Collections
//! 001 pages (2 items)
//!     001 About
//!         Source: _pages/about.md
//!         URL: /
//! 002 posts (1 item)
//!     001 Hello, World
//!         Source: _posts/2025-01-01-hello-world.md
//!         URL: /posts/2025-01-01-hello-world/
//!         Date: 2025-01-01
//!
//! Dated
//! posts
//!     001 2025-01-01 Hello, World
//!
//! Tags
//! 001 rust (1 item)
//!     posts/2025-01-01-hello-world
//!
//! Skipped (unpublished)
//!     _posts/2025-06-01-work-in-progress.md
//! ```
//!
//! ## Routes
//!
//! ```text
//! /                  → pages/about
//! /about.html        ⇢ /
//! /posts/2025-01-01-hello-world/ → posts/2025-01-01-hello-world
//! ```
//!
//! ## Build
//!
//! ```text
//! pages: 2 items
//! posts: 1 item
//! Cache: 3 unchanged, 1 written (4 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::content::ItemKey;
use crate::frontmatter::FrontMatter;
use crate::generate::WriteReport;
use crate::index::SiteIndex;
use crate::links::{LinkKind, ResolvedLink};
use crate::render::Document;
use crate::site::Site;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 item`, `3 items`.
fn count(n: usize) -> String {
    if n == 1 {
        "1 item".to_string()
    } else {
        format!("{n} items")
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Scan
// ============================================================================

/// Format the content inventory of a loaded site.
pub fn format_scan_output(site: &Site) -> Vec<String> {
    let mut lines = vec!["Collections".to_string()];

    for (i, collection) in site.store.collections().enumerate() {
        let items: Vec<_> = site.store.all(collection.as_str()).collect();
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            collection,
            count(items.len())
        ));
        for (j, item) in items.iter().enumerate() {
            lines.push(format!("{}{} {}", indent(1), format_index(j + 1), item.title()));
            lines.push(format!("{}Source: {}", indent(2), item.source().display()));
            if let Some(link) = site.links.get(&item.key()) {
                lines.push(format!("{}URL: {}", indent(2), link.canonical));
            }
            if let Some(date) = item.date() {
                lines.push(format!("{}Date: {}", indent(2), date));
            }
        }
    }

    let dated: Vec<_> = site
        .index
        .collections()
        .filter(|(_, entries)| !entries.is_empty())
        .collect();
    if !dated.is_empty() {
        lines.push(String::new());
        lines.push("Dated".to_string());
        for (collection, entries) in dated {
            lines.push(collection.to_string());
            for (i, entry) in entries.iter().enumerate() {
                let title = site.store.get(&entry.key).map_or("", |item| item.title());
                lines.push(format!(
                    "{}{} {} {}",
                    indent(1),
                    format_index(i + 1),
                    entry.date,
                    title
                ));
            }
        }
    }

    let tags: Vec<_> = site.index.tags().collect();
    if !tags.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        for (i, (tag, keys)) in tags.into_iter().enumerate() {
            lines.push(format!("{} {} ({})", format_index(i + 1), tag, count(keys.len())));
            for key in keys {
                lines.push(format!("{}{}", indent(1), key));
            }
        }
    }

    if !site.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped (unpublished)".to_string());
        for path in &site.skipped {
            lines.push(format!("{}{}", indent(1), path.display()));
        }
    }

    lines
}

pub fn print_scan_output(site: &Site) {
    print_lines(format_scan_output(site));
}

/// Machine-readable form of the scan inventory.
#[derive(Debug, Serialize)]
pub struct ScanManifest<'a> {
    pub items: Vec<ManifestItem<'a>>,
    pub index: &'a SiteIndex,
    pub skipped: &'a [PathBuf],
}

#[derive(Debug, Serialize)]
pub struct ManifestItem<'a> {
    pub key: ItemKey,
    pub source: &'a Path,
    pub title: &'a str,
    pub date: Option<NaiveDate>,
    pub tags: BTreeSet<&'a str>,
    pub published: bool,
    pub link: Option<&'a ResolvedLink>,
    pub metadata: &'a FrontMatter,
}

impl<'a> ScanManifest<'a> {
    pub fn new(site: &'a Site) -> Self {
        let items = site
            .store
            .iter()
            .map(|item| ManifestItem {
                key: item.key(),
                source: item.source(),
                title: item.title(),
                date: item.date(),
                tags: item.tags(),
                published: item.is_published(),
                link: site.links.get(&item.key()),
                metadata: item.metadata(),
            })
            .collect();
        Self {
            items,
            index: &site.index,
            skipped: &site.skipped,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

/// A single URL the build produces.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route<'a> {
    url: &'a str,
    kind: LinkKind,
    key: &'a ItemKey,
    target: &'a str,
}

/// Format every canonical and alias URL, sorted by URL.
///
/// Canonical paths point (`→`) at the item; aliases point (`⇢`) at the
/// canonical path they redirect to.
pub fn format_routes(site: &Site) -> Vec<String> {
    let mut routes = Vec::new();
    for (key, link) in site.links.iter() {
        routes.push(Route {
            url: &link.canonical,
            kind: LinkKind::Canonical,
            key,
            target: &link.canonical,
        });
        for alias in &link.aliases {
            routes.push(Route {
                url: alias,
                kind: LinkKind::Alias,
                key,
                target: &link.canonical,
            });
        }
    }
    routes.sort_by(|a, b| a.url.cmp(b.url));

    let width = routes.iter().map(|r| r.url.chars().count()).max().unwrap_or(0);
    routes
        .iter()
        .map(|route| match route.kind {
            LinkKind::Canonical => format!("{:<width$} → {}", route.url, route.key),
            LinkKind::Alias => format!("{:<width$} ⇢ {}", route.url, route.target),
        })
        .collect()
}

pub fn print_routes(site: &Site) {
    print_lines(format_routes(site));
}

// ============================================================================
// Build and check
// ============================================================================

fn collection_summary(site: &Site) -> Vec<String> {
    site.store
        .collections()
        .map(|c| format!("{}: {}", c, count(site.store.all(c.as_str()).len())))
        .collect()
}

/// Format the summary printed after a successful build.
pub fn format_build_output(site: &Site, report: &WriteReport) -> Vec<String> {
    let mut lines = collection_summary(site);
    if !site.skipped.is_empty() {
        lines.push(format!("skipped: {} unpublished", site.skipped.len()));
    }
    lines.push(format!("Cache: {}", report.stats));
    lines
}

pub fn print_build_output(site: &Site, report: &WriteReport) {
    print_lines(format_build_output(site, report));
}

/// Format the summary printed after a successful check.
pub fn format_check_output(site: &Site, documents: &[Document]) -> Vec<String> {
    let redirects = documents
        .iter()
        .filter(|d| d.kind == LinkKind::Alias)
        .count();
    let mut lines = collection_summary(site);
    lines.push(format!(
        "Rendered {} documents ({} pages, {} redirects); nothing written",
        documents.len(),
        documents.len() - redirects,
        redirects
    ));
    lines
}

pub fn print_check_output(site: &Site, documents: &[Document]) {
    print_lines(format_check_output(site, documents));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use crate::test_helpers::*;

    fn fixture_site() -> Site {
        let tmp = setup_fixtures();
        Site::load(tmp.path(), false).unwrap()
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_single_digit() {
        assert_eq!(format_index(1), "001");
    }

    #[test]
    fn format_index_triple_digit() {
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn count_pluralizes() {
        assert_eq!(count(0), "0 items");
        assert_eq!(count(1), "1 item");
        assert_eq!(count(2), "2 items");
    }

    // =========================================================================
    // Scan output
    // =========================================================================

    #[test]
    fn scan_output_lists_collections_in_order() {
        let site = fixture_site();
        let lines = format_scan_output(&site);
        let headers: Vec<&str> = lines
            .iter()
            .filter(|l| l.starts_with("00"))
            .map(String::as_str)
            .take(4)
            .collect();
        assert_eq!(
            headers,
            vec![
                "001 pages (4 items)",
                "002 portfolio (2 items)",
                "003 posts (3 items)",
                "004 talks (1 item)",
            ]
        );
    }

    #[test]
    fn scan_output_shows_source_and_url() {
        let site = fixture_site();
        let lines = format_scan_output(&site);
        let about = lines.iter().position(|l| l == "    001 About").unwrap();
        assert_eq!(lines[about + 1], "        Source: _pages/about.md");
        assert_eq!(lines[about + 2], "        URL: /");
    }

    #[test]
    fn scan_output_dated_newest_first() {
        let site = fixture_site();
        let lines = format_scan_output(&site);
        let posts = lines.iter().position(|l| l == "posts").unwrap();
        assert_eq!(lines[posts + 1], "    001 2025-03-14 Notes on Parsers");
        assert_eq!(lines[posts + 2], "    002 2025-01-01 Hello, World");
    }

    #[test]
    fn scan_output_lists_skipped() {
        let site = fixture_site();
        let lines = format_scan_output(&site);
        assert_eq!(lines.last().unwrap(), "    _posts/2025-06-01-work-in-progress.md");
    }

    #[test]
    fn scan_manifest_serializes() {
        let site = fixture_site();
        let json = serde_json::to_value(ScanManifest::new(&site)).unwrap();
        let items = json["items"].as_array().unwrap();
        assert_eq!(items.len(), site.store.len());
        let hello = items
            .iter()
            .find(|i| i["key"]["identifier"] == "2025-01-01-hello-world")
            .unwrap();
        assert_eq!(hello["date"], "2025-01-01");
        assert_eq!(hello["link"]["canonical"], "/posts/2025-01-01-hello-world/");
    }

    // =========================================================================
    // Routes
    // =========================================================================

    #[test]
    fn routes_sorted_and_marked() {
        let site = fixture_site();
        let lines = format_routes(&site);
        assert!(lines[0].starts_with("/ "));
        assert!(lines[0].ends_with("→ pages/about"));
        let alias = lines.iter().find(|l| l.starts_with("/about.html")).unwrap();
        assert!(alias.ends_with("⇢ /"));

        let urls: Vec<&str> = lines
            .iter()
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        let mut sorted = urls.clone();
        sorted.sort();
        assert_eq!(urls, sorted);
    }

    // =========================================================================
    // Build / check
    // =========================================================================

    #[test]
    fn build_output_reports_cache() {
        let site = fixture_site();
        let report = WriteReport {
            output_dir: PathBuf::from("_site"),
            stats: CacheStats {
                written: 1,
                unchanged: 3,
                removed: 0,
            },
        };
        let lines = format_build_output(&site, &report);
        assert_eq!(lines[0], "pages: 4 items");
        assert!(lines.contains(&"skipped: 1 unpublished".to_string()));
        assert_eq!(lines.last().unwrap(), "Cache: 3 unchanged, 1 written (4 total)");
    }

    #[test]
    fn check_output_counts_redirects() {
        let site = fixture_site();
        let theme = crate::theme::HtmlTheme::new(&site.config);
        let documents = site.render(&theme).unwrap();
        let lines = format_check_output(&site, &documents);
        let redirects: usize = site.links.iter().map(|(_, l)| l.aliases.len()).sum();
        assert_eq!(
            lines.last().unwrap(),
            &format!(
                "Rendered {} documents ({} pages, {} redirects); nothing written",
                documents.len(),
                site.store.len(),
                redirects
            )
        );
    }
}
