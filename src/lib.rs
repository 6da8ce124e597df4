//! # Quire
//!
//! A minimal static site generator for personal academic and portfolio
//! sites. Markdown files with YAML front matter live in collection
//! directories (`_posts/`, `_pages/`, `_portfolio/`, `_talks/`); quire parses
//! them, works out every page's URL, builds date and tag indexes, and
//! renders the lot to plain HTML.
//!
//! # Architecture: Staged Pipeline
//!
//! ```text
//! 1. Scan     _<collection>/*.md  →  ContentStore   (parse + validate)
//! 2. Link     ContentStore        →  LinkTable      (canonical + alias paths)
//! 3. Index    ContentStore        →  SiteIndex      (dated order, tags)
//! 4. Render   all of the above    →  Vec<Document>  (in memory)
//! 5. Write    Vec<Document>       →  _site/         (incremental)
//! ```
//!
//! Every stage fails fast with the offending file in the error. Nothing is
//! written until every document has rendered, so a broken source file never
//! leaves a half-built site behind. [`site::Site`] strings the stages
//! together.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`frontmatter`] | Splits the `---` block from the body and converts YAML into typed values |
//! | [`content`] | `ContentItem`, item keys, field validation |
//! | [`slug`] | Identifiers from paths and ASCII URL slugs |
//! | [`store`] | The per-build content store, unique per `(collection, identifier)` |
//! | [`scan`] | Stage 1: walks collection directories in parallel |
//! | [`links`] | Stage 2: canonical paths, aliases, collision detection |
//! | [`index`] | Stage 3: per-collection chronology, tag index, neighbours |
//! | [`render`] | Stage 4: render contexts and the `TemplateEngine` trait |
//! | [`theme`] | The built-in maud HTML theme |
//! | [`generate`] | Stage 5: writes documents, prunes stale files |
//! | [`cache`] | Output manifest used to skip unchanged files |
//! | [`site`] | Runs the whole pipeline |
//! | [`config`] | `config.toml` loading, validation, merging, and CSS generation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Store Per Build
//!
//! The content store belongs to the [`site::Site`] value of a single build.
//! Nothing is global, so tests build as many sites side by side as they
//! like.
//!
//! ## Templates Behind a Trait
//!
//! The pipeline only knows [`render::TemplateEngine`]: a layout name maps to
//! a list of required context variables and a render function. The render
//! stage checks the required variables before calling the engine, so a post
//! without a date fails with a clear error instead of rendering a page with
//! a hole in it. [`theme::HtmlTheme`] is the built-in engine, written with
//! [Maud](https://maud.lambda.xyz/) so markup errors are compile errors.
//!
//! ## Collisions Are Errors
//!
//! Two items claiming one URL (by permalink, derived path or alias) abort
//! the build. Collisions are checked on output files, so `/a` and `/a/` are
//! the same path.
//!
//! ## Content-Hashed Output
//!
//! The writer compares SHA-256 hashes of rendered documents against the
//! previous build's manifest and leaves unchanged files alone, which keeps
//! rsync-style deploys small. See [`cache`].

pub mod cache;
pub mod config;
pub mod content;
pub mod frontmatter;
pub mod generate;
pub mod index;
pub mod links;
pub mod output;
pub mod render;
pub mod scan;
pub mod site;
pub mod slug;
pub mod store;
pub mod theme;

#[cfg(test)]
pub(crate) mod test_helpers;
