//! Render contexts and the template engine contract.
//!
//! The renderer does not produce markup itself. For every item it assembles a
//! [`RenderContext`] (site settings, the item's fields, resolved navigation
//! links, collection listings and the tag listing), checks that every variable
//! the chosen layout declares is present and non-null, and hands the context to
//! a [`TemplateEngine`]. Alias paths get a redirect document from the same
//! engine.
//!
//! ## Context shape
//!
//! Variables are addressed by dotted paths into the serialized context:
//!
//! ```text
//! site.title, site.description, site.author, site.url
//! page.identifier, page.collection, page.title, page.url, page.absolute_url,
//! page.date, page.tags, page.aliases, page.body, page.layout, page.meta.*
//! nav.newer.{title,url,date}, nav.older.{title,url,date}
//! collections.<name>.{root,items,archive}
//! tags[].{name,items}
//! ```
//!
//! Absent optional values serialize as `null`, so a layout that requires
//! `page.date` rejects undated items with [`RenderError::MissingRenderContext`].
//!
//! Rendering is all-or-nothing: [`render_site`] returns every document or the
//! first error in store order, and nothing is written until it returns.

use crate::config::SiteConfig;
use crate::content::{ContentItem, ItemKey};
use crate::frontmatter::FrontMatter;
use crate::index::SiteIndex;
use crate::links::{self, LinkKind, LinkTable, ResolvedLink};
use crate::store::ContentStore;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Error type engines return from [`TemplateEngine::render`].
pub type TemplateError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{}: layout '{layout}' requires '{variable}', which is missing", path.display())]
    MissingRenderContext {
        path: PathBuf,
        layout: String,
        variable: String,
    },
    #[error("{}: unknown layout '{layout}'", path.display())]
    UnknownLayout { path: PathBuf, layout: String },
    #[error("{}: no resolved link", path.display())]
    Unresolved { path: PathBuf },
    #[error("{}: template '{layout}' failed", path.display())]
    Template {
        path: PathBuf,
        layout: String,
        #[source]
        source: TemplateError,
    },
    #[error("failed to serialize render context")]
    Context(#[from] serde_json::Error),
}

/// A templating capability: turns a context of declared shape into markup.
///
/// Implementations must be shareable across the render worker pool.
pub trait TemplateEngine: Sync {
    /// Dotted context paths `layout` needs, or `None` if the engine has no
    /// such layout.
    fn required_variables(&self, layout: &str) -> Option<&[&'static str]>;

    /// Render a canonical document.
    fn render(&self, layout: &str, context: &RenderContext<'_>) -> Result<String, TemplateError>;

    /// Render a minimal document redirecting to `target`.
    fn render_redirect(&self, target: &str) -> String;
}

/// Site-wide settings exposed to templates.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
}

/// A link to another item, as used in listings and navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkContext {
    pub title: String,
    pub url: String,
    pub date: Option<NaiveDate>,
}

/// Dated items of one year.
#[derive(Debug, Clone, Serialize)]
pub struct YearListing {
    pub year: i32,
    pub items: Vec<LinkContext>,
}

/// Listing of one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionListing {
    pub root: String,
    /// Dated items newest first, then undated items in source order.
    pub items: Vec<LinkContext>,
    pub archive: Vec<YearListing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagListing {
    pub name: String,
    pub items: Vec<LinkContext>,
}

/// Parts of the context that are identical for every item. Built once per
/// render pass.
#[derive(Debug, Serialize)]
pub struct SharedContext {
    pub site: SiteContext,
    pub collections: BTreeMap<String, CollectionListing>,
    pub tags: Vec<TagListing>,
}

/// The item being rendered.
#[derive(Debug, Serialize)]
pub struct PageContext<'a> {
    pub identifier: &'a str,
    pub collection: &'a str,
    pub title: &'a str,
    pub url: &'a str,
    pub absolute_url: Option<String>,
    pub date: Option<NaiveDate>,
    pub tags: Vec<&'a str>,
    pub aliases: &'a [String],
    pub body: &'a str,
    pub layout: &'a str,
    pub meta: &'a FrontMatter,
}

#[derive(Debug, Default, Serialize)]
pub struct NavContext {
    pub newer: Option<LinkContext>,
    pub older: Option<LinkContext>,
}

/// Everything a template sees for one item.
#[derive(Debug, Serialize)]
pub struct RenderContext<'a> {
    pub site: &'a SiteContext,
    pub page: PageContext<'a>,
    pub nav: NavContext,
    pub collections: &'a BTreeMap<String, CollectionListing>,
    pub tags: &'a [TagListing],
}

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// URL path the document is served at.
    pub url: String,
    /// Output file relative to the output directory.
    pub file: PathBuf,
    pub kind: LinkKind,
    pub key: ItemKey,
    pub contents: String,
}

impl SharedContext {
    pub fn build(
        store: &ContentStore,
        links: &LinkTable,
        index: &SiteIndex,
        config: &SiteConfig,
    ) -> Self {
        let link_to = |key: &ItemKey| -> Option<LinkContext> {
            let item = store.get(key)?;
            let link = links.get(key)?;
            Some(link_context(item, link))
        };

        let mut collections = BTreeMap::new();
        for collection in store.collections() {
            let name = collection.as_str();
            let mut items: Vec<LinkContext> = index
                .collection(name)
                .iter()
                .filter_map(|entry| link_to(&entry.key))
                .collect();
            items.extend(
                store
                    .all(name)
                    .filter(|item| item.date().is_none())
                    .filter_map(|item| link_to(&item.key())),
            );
            let archive = index
                .archive(name)
                .into_iter()
                .map(|group| YearListing {
                    year: group.year,
                    items: group
                        .entries
                        .iter()
                        .filter_map(|entry| link_to(&entry.key))
                        .collect(),
                })
                .collect();
            collections.insert(
                name.to_string(),
                CollectionListing {
                    root: config.collection_root(name),
                    items,
                    archive,
                },
            );
        }

        let tags = index
            .tags()
            .map(|(name, keys)| TagListing {
                name: name.to_string(),
                items: keys.iter().filter_map(link_to).collect(),
            })
            .collect();

        Self {
            site: SiteContext {
                title: config.site.title.clone(),
                description: config.site.description.clone(),
                author: config.site.author.clone(),
                url: config.site.url.clone(),
            },
            collections,
            tags,
        }
    }
}

fn link_context(item: &ContentItem, link: &ResolvedLink) -> LinkContext {
    LinkContext {
        title: item.title().to_string(),
        url: link.canonical.clone(),
        date: item.date(),
    }
}

/// Assemble the render context of one item.
pub fn build_context<'a>(
    item: &'a ContentItem,
    link: &'a ResolvedLink,
    layout: &'a str,
    store: &ContentStore,
    links: &LinkTable,
    index: &SiteIndex,
    shared: &'a SharedContext,
) -> RenderContext<'a> {
    let neighbors = index.neighbors(&item.key());
    let nav_link = |key: Option<&ItemKey>| {
        let key = key?;
        Some(link_context(store.get(key)?, links.get(key)?))
    };
    let absolute_url = (!shared.site.url.is_empty())
        .then(|| format!("{}{}", shared.site.url.trim_end_matches('/'), link.canonical));

    RenderContext {
        site: &shared.site,
        page: PageContext {
            identifier: item.identifier(),
            collection: item.collection().as_str(),
            title: item.title(),
            url: &link.canonical,
            absolute_url,
            date: item.date(),
            tags: item.tags().into_iter().collect(),
            aliases: &link.aliases,
            body: item.body(),
            layout,
            meta: item.metadata(),
        },
        nav: NavContext {
            newer: nav_link(neighbors.newer),
            older: nav_link(neighbors.older),
        },
        collections: &shared.collections,
        tags: &shared.tags,
    }
}

/// Check every required dotted path is present and non-null in `context`.
///
/// Returns the first missing variable.
pub fn missing_variable<'v>(
    context: &serde_json::Value,
    required: &[&'v str],
) -> Option<&'v str> {
    required
        .iter()
        .copied()
        .find(|path| lookup(context, path).is_none_or(serde_json::Value::is_null))
}

fn lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        serde_json::Value::Object(map) => map.get(segment),
        serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    })
}

/// Render one item: its canonical document followed by one redirect per
/// alias.
pub fn render_item(
    item: &ContentItem,
    store: &ContentStore,
    links: &LinkTable,
    index: &SiteIndex,
    shared: &SharedContext,
    config: &SiteConfig,
    engine: &dyn TemplateEngine,
) -> Result<Vec<Document>, RenderError> {
    let path = item.source();
    let link = links.get(&item.key()).ok_or_else(|| RenderError::Unresolved {
        path: path.to_path_buf(),
    })?;
    let layout = item
        .layout()
        .unwrap_or_else(|| config.collection_layout(item.collection().as_str()));

    let required = engine
        .required_variables(layout)
        .ok_or_else(|| RenderError::UnknownLayout {
            path: path.to_path_buf(),
            layout: layout.to_string(),
        })?;

    let context = build_context(item, link, layout, store, links, index, shared);
    let value = serde_json::to_value(&context)?;
    if let Some(variable) = missing_variable(&value, required) {
        return Err(RenderError::MissingRenderContext {
            path: path.to_path_buf(),
            layout: layout.to_string(),
            variable: variable.to_string(),
        });
    }

    let contents = engine
        .render(layout, &context)
        .map_err(|source| RenderError::Template {
            path: path.to_path_buf(),
            layout: layout.to_string(),
            source,
        })?;

    let mut documents = Vec::with_capacity(1 + link.aliases.len());
    documents.push(document(&link.canonical, LinkKind::Canonical, item, contents));
    for alias in &link.aliases {
        let redirect = engine.render_redirect(&link.canonical);
        documents.push(document(alias, LinkKind::Alias, item, redirect));
    }
    Ok(documents)
}

fn document(url: &str, kind: LinkKind, item: &ContentItem, contents: String) -> Document {
    Document {
        url: url.to_string(),
        file: links::output_file(url),
        kind,
        key: item.key(),
        contents,
    }
}

/// Render every item of the store on the current rayon pool.
///
/// Documents come back in store order. If any item fails, the error of the
/// first failing item in store order is returned and no documents are.
pub fn render_site(
    store: &ContentStore,
    links: &LinkTable,
    index: &SiteIndex,
    config: &SiteConfig,
    engine: &dyn TemplateEngine,
) -> Result<Vec<Document>, RenderError> {
    let shared = SharedContext::build(store, links, index, config);
    let items: Vec<&ContentItem> = store.iter().collect();

    let results: Vec<Result<Vec<Document>, RenderError>> = items
        .par_iter()
        .map(|item| render_item(item, store, links, index, &shared, config, engine))
        .collect();

    let mut documents = Vec::new();
    for result in results {
        documents.extend(result?);
    }
    tracing::info!(documents = documents.len(), "rendered site");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{item, store_with};
    use std::path::Path;

    /// Engine with one layout per entry, rendering `layout:title`.
    struct StubEngine {
        layouts: Vec<(&'static str, Vec<&'static str>)>,
    }

    impl StubEngine {
        fn new() -> Self {
            Self {
                layouts: vec![
                    ("single", vec!["site.title", "page.title", "page.url"]),
                    ("post", vec!["page.title", "page.date"]),
                    ("broken", vec![]),
                ],
            }
        }
    }

    impl TemplateEngine for StubEngine {
        fn required_variables(&self, layout: &str) -> Option<&[&'static str]> {
            self.layouts
                .iter()
                .find(|(name, _)| *name == layout)
                .map(|(_, vars)| vars.as_slice())
        }

        fn render(&self, layout: &str, context: &RenderContext<'_>) -> Result<String, TemplateError> {
            if layout == "broken" {
                return Err("boom".into());
            }
            Ok(format!("{layout}:{}", context.page.title))
        }

        fn render_redirect(&self, target: &str) -> String {
            format!("redirect:{target}")
        }
    }

    fn render(store: &ContentStore) -> Result<Vec<Document>, RenderError> {
        let config = SiteConfig::default();
        let links = links::resolve(store, &config).unwrap();
        let index = SiteIndex::build(store);
        render_site(store, &links, &index, &config, &StubEngine::new())
    }

    #[test]
    fn renders_canonical_and_redirects() {
        let store = store_with(vec![item(
            "pages",
            "about",
            "---\ntitle: About\npermalink: /about/\nredirect_from: [/about.html, /bio/]\n---\n",
        )]);
        let docs = render(&store).unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].kind, LinkKind::Canonical);
        assert_eq!(docs[0].contents, "single:About");
        assert_eq!(docs[0].file, Path::new("about/index.html"));
        assert_eq!(docs[1].url, "/about.html");
        assert_eq!(docs[1].file, Path::new("about.html"));
        assert_eq!(docs[1].contents, "redirect:/about/");
        assert_eq!(docs[2].kind, LinkKind::Alias);
    }

    #[test]
    fn collection_layout_applies() {
        let store = store_with(vec![item(
            "posts",
            "hello",
            "---\ntitle: Hello\ndate: 2025-01-01\n---\nHi",
        )]);
        let docs = render(&store).unwrap();
        assert_eq!(docs[0].contents, "post:Hello");
    }

    #[test]
    fn missing_required_variable() {
        let store = store_with(vec![item("posts", "undated", "---\ntitle: U\n---\n")]);
        match render(&store).unwrap_err() {
            RenderError::MissingRenderContext {
                path,
                layout,
                variable,
            } => {
                assert_eq!(path, Path::new("_posts/undated.md"));
                assert_eq!(layout, "post");
                assert_eq!(variable, "page.date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_layout() {
        let store = store_with(vec![item(
            "pages",
            "x",
            "---\ntitle: X\nlayout: nonexistent\n---\n",
        )]);
        assert!(matches!(
            render(&store).unwrap_err(),
            RenderError::UnknownLayout { .. }
        ));
    }

    #[test]
    fn template_failure_keeps_source() {
        let store = store_with(vec![item("pages", "x", "---\ntitle: X\nlayout: broken\n---\n")]);
        let err = render(&store).unwrap_err();
        assert!(matches!(err, RenderError::Template { .. }));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn first_error_in_store_order_wins() {
        let store = store_with(vec![
            item("pages", "a", "---\ntitle: A\nlayout: nope\n---\n"),
            item("posts", "b", "---\ntitle: B\n---\n"),
        ]);
        assert!(matches!(
            render(&store).unwrap_err(),
            RenderError::UnknownLayout { .. }
        ));
    }

    #[test]
    fn documents_in_store_order() {
        let store = store_with(vec![
            item("talks", "t", "---\ntitle: T\n---\n"),
            item("pages", "p", "---\ntitle: P\n---\n"),
        ]);
        let docs = render(&store).unwrap();
        let urls: Vec<_> = docs.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(urls, vec!["/p/", "/talks/t/"]);
        let files: Vec<_> = docs.iter().map(|d| d.file.as_path()).collect();
        assert_eq!(
            files,
            vec![Path::new("p/index.html"), Path::new("talks/t/index.html")]
        );
    }

    // =========================================================================
    // Context assembly
    // =========================================================================

    #[test]
    fn context_carries_navigation_and_listings() {
        let store = store_with(vec![
            item("posts", "one", "---\ntitle: One\ndate: 2024-01-01\ntags: [a]\n---\n"),
            item("posts", "two", "---\ntitle: Two\ndate: 2025-01-01\ntags: [a, b]\n---\n"),
            item("posts", "draft", "---\ntitle: Draft\n---\n"),
        ]);
        let mut config = SiteConfig::default();
        config.site.url = "https://example.org/".to_string();
        let links = links::resolve(&store, &config).unwrap();
        let index = SiteIndex::build(&store);
        let shared = SharedContext::build(&store, &links, &index, &config);

        let one = store.all("posts").next().unwrap();
        let link = links.get(&one.key()).unwrap();
        let context = build_context(one, link, "post", &store, &links, &index, &shared);

        assert_eq!(context.page.url, "/posts/one/");
        assert_eq!(
            context.page.absolute_url.as_deref(),
            Some("https://example.org/posts/one/")
        );
        assert_eq!(context.nav.newer.as_ref().map(|l| l.title.as_str()), Some("Two"));
        assert!(context.nav.older.is_none());

        let posts = &context.collections["posts"];
        let titles: Vec<_> = posts.items.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Two", "One", "Draft"]);
        assert_eq!(posts.archive.len(), 2);

        let tag_names: Vec<_> = context.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["a", "b"]);
        assert_eq!(context.tags[0].items.len(), 2);
    }

    #[test]
    fn lookup_dotted_paths() {
        let value = serde_json::json!({
            "page": { "title": "T", "date": null, "meta": { "venue": "X" } },
            "tags": [{ "name": "a" }]
        });
        assert_eq!(missing_variable(&value, &["page.title", "page.meta.venue"]), None);
        assert_eq!(missing_variable(&value, &["page.date"]), Some("page.date"));
        assert_eq!(missing_variable(&value, &["page.nope"]), Some("page.nope"));
        assert_eq!(missing_variable(&value, &["tags.0.name"]), None);
        assert_eq!(missing_variable(&value, &["tags.1.name"]), Some("tags.1.name"));
    }
}
