//! Built-in HTML theme.
//!
//! [`HtmlTheme`] is the default [`TemplateEngine`]. Markup comes from
//! [maud](https://maud.lambda.xyz/) templates compiled into the binary,
//! Markdown bodies go through `pulldown-cmark`, and the stylesheet (colors
//! from `config.toml` plus `static/style.css`) is inlined into every page.
//!
//! ## Layouts
//!
//! | Layout | Shows | Requires |
//! |--------|-------|----------|
//! | `single` | title and body | `page.title`, `page.body` |
//! | `post` | title, date, tags, body, newer/older links | + `page.date` |
//! | `archive` | body, then the collection named by `listing`, grouped by year | `page.meta.listing` |
//! | `tags` | body, then every tag with its items | `tags` |
//!
//! Tag links point at `/tags/#<anchor>` (see [`tag_anchor`]), so a site using tags wants a page with
//! `permalink: /tags/` and `layout: tags`. Collection links in the header
//! point at each collection root.

use crate::config::{self, SiteConfig};
use crate::render::{LinkContext, RenderContext, TemplateEngine, TemplateError};
use chrono::NaiveDate;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};

const CSS_STATIC: &str = include_str!("../static/style.css");

const LAYOUTS: &[(&str, &[&str])] = &[
    ("single", &["site.title", "page.title", "page.body"]),
    ("post", &["site.title", "page.title", "page.date", "page.body"]),
    ("archive", &["site.title", "page.title", "page.meta.listing"]),
    ("tags", &["site.title", "page.title", "tags"]),
];

/// The default HTML theme.
#[derive(Debug, Clone)]
pub struct HtmlTheme {
    css: String,
    /// Collections linked from the header: `(label, root)`.
    nav: Vec<(String, String)>,
}

impl HtmlTheme {
    pub fn new(config: &SiteConfig) -> Self {
        let color_css = config::generate_color_css(&config.colors);
        let nav = config
            .collections
            .iter()
            .filter(|(_, collection)| collection.root != "/")
            .map(|(name, collection)| (title_case(name), collection.root.clone()))
            .collect();
        Self {
            css: format!("{}\n\n{}", color_css, CSS_STATIC),
            nav,
        }
    }

    /// Layout names this theme provides.
    pub fn layouts(&self) -> impl Iterator<Item = &'static str> {
        LAYOUTS.iter().map(|(name, _)| *name)
    }
}

impl TemplateEngine for HtmlTheme {
    fn required_variables(&self, layout: &str) -> Option<&[&'static str]> {
        LAYOUTS
            .iter()
            .find(|(name, _)| *name == layout)
            .map(|(_, required)| *required)
    }

    fn render(&self, layout: &str, context: &RenderContext<'_>) -> Result<String, TemplateError> {
        let content = match layout {
            "single" => render_single(context),
            "post" => render_post(context),
            "archive" => render_archive(context)?,
            "tags" => render_tags(context),
            other => return Err(format!("layout '{other}' is not provided by the theme").into()),
        };
        let page = html! {
            (self.site_header(context))
            main class={ "layout-" (layout) } {
                (content)
            }
            (site_footer(context))
        };
        let title = if context.page.url == "/" {
            context.site.title.clone()
        } else {
            format!("{} | {}", context.page.title, context.site.title)
        };
        let canonical = context.page.absolute_url.as_deref();
        let head = Head {
            title: &title,
            description: &context.site.description,
            canonical,
            css: &self.css,
        };
        Ok(base_document(&head, page).into_string())
    }

    fn render_redirect(&self, target: &str) -> String {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    title { "Redirecting…" }
                    link rel="canonical" href=(target);
                    meta http-equiv="refresh" content={ "0; url=" (target) };
                    meta name="robots" content="noindex";
                }
                body {
                    p { "Redirecting to " a href=(target) { (target) } "." }
                }
            }
        }
        .into_string()
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Values for the document `<head>`.
struct Head<'a> {
    title: &'a str,
    description: &'a str,
    canonical: Option<&'a str>,
    css: &'a str,
}

/// Renders the base HTML document structure
fn base_document(page_head: &Head<'_>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (page_head.title) }
                @if !page_head.description.is_empty() {
                    meta name="description" content=(page_head.description);
                }
                @if let Some(url) = page_head.canonical {
                    link rel="canonical" href=(url);
                }
                style { (PreEscaped(page_head.css)) }
            }
            body {
                (content)
            }
        }
    }
}

impl HtmlTheme {
    /// Renders the site header with the site title and collection links
    fn site_header(&self, context: &RenderContext<'_>) -> Markup {
        let current = context.page.url;
        html! {
            header.site-header {
                a.site-title href="/" { (context.site.title) }
                nav.site-nav {
                    ul {
                        @for (label, root) in &self.nav {
                            @let is_current = current.starts_with(root.as_str());
                            li class=[is_current.then_some("current")] {
                                a href=(root) { (label) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn site_footer(context: &RenderContext<'_>) -> Markup {
    html! {
        footer.site-footer {
            @if !context.site.author.is_empty() {
                span { (context.site.author) }
            }
            @if !context.site.description.is_empty() {
                span.site-description { (context.site.description) }
            }
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn date_element(date: NaiveDate) -> Markup {
    html! {
        time datetime=(date.format("%Y-%m-%d").to_string()) { (format_date(date)) }
    }
}

fn tag_list<'a>(tags: impl IntoIterator<Item = &'a str>) -> Markup {
    html! {
        ul.tag-list {
            @for tag in tags {
                li { a href={ "/tags/#" (tag_anchor(tag)) } { (tag) } }
            }
        }
    }
}

/// Fragment id of a tag's section on the tags page.
///
/// Tags compare exactly, so the id must too: ASCII letters, digits, `-` and
/// `_` are kept as written and every other byte becomes `.XX` (uppercase
/// hex). `ML` → `tag-ML`, `Web Dev` → `tag-Web.20Dev`.
pub fn tag_anchor(tag: &str) -> String {
    let mut anchor = String::with_capacity(tag.len() + 4);
    anchor.push_str("tag-");
    for byte in tag.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            anchor.push(char::from(byte));
        } else {
            anchor.push_str(&format!(".{byte:02X}"));
        }
    }
    anchor
}

fn link_list(items: &[LinkContext]) -> Markup {
    html! {
        ul.item-list {
            @for item in items {
                li {
                    a href=(item.url) { (item.title) }
                    @if let Some(date) = item.date {
                        " " span.item-date { (date_element(date)) }
                    }
                }
            }
        }
    }
}

/// Convert a Markdown body to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut body_html = String::new();
    md_html::push_html(&mut body_html, parser);
    body_html
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Layouts
// ============================================================================

fn render_single(context: &RenderContext<'_>) -> Markup {
    html! {
        article.page {
            h1 { (context.page.title) }
            div.page-body { (PreEscaped(markdown_to_html(context.page.body))) }
        }
    }
}

fn render_post(context: &RenderContext<'_>) -> Markup {
    let page = &context.page;
    html! {
        article.post {
            header.post-header {
                h1 { (page.title) }
                @if let Some(date) = page.date {
                    p.post-date { (date_element(date)) }
                }
                @if !page.tags.is_empty() {
                    (tag_list(page.tags.iter().copied()))
                }
            }
            div.page-body { (PreEscaped(markdown_to_html(page.body))) }
        }
        @if context.nav.newer.is_some() || context.nav.older.is_some() {
            nav.post-nav {
                @if let Some(newer) = &context.nav.newer {
                    a.newer href=(newer.url) rel="prev" { "← " (newer.title) }
                }
                @if let Some(older) = &context.nav.older {
                    a.older href=(older.url) rel="next" { (older.title) " →" }
                }
            }
        }
    }
}

fn render_archive(context: &RenderContext<'_>) -> Result<Markup, TemplateError> {
    let name = context
        .page
        .meta
        .get_str("listing")
        .ok_or("'listing' must name a collection")?;
    let listing = context
        .collections
        .get(name)
        .ok_or_else(|| format!("no collection named '{name}'"))?;
    let undated: Vec<LinkContext> = listing
        .items
        .iter()
        .filter(|item| item.date.is_none())
        .cloned()
        .collect();

    Ok(html! {
        article.archive {
            h1 { (context.page.title) }
            div.page-body { (PreEscaped(markdown_to_html(context.page.body))) }
            @for group in &listing.archive {
                section.archive-year {
                    h2 id={ "y" (group.year) } { (group.year) }
                    (link_list(&group.items))
                }
            }
            @if !undated.is_empty() {
                section.archive-undated {
                    (link_list(&undated))
                }
            }
        }
    })
}

fn render_tags(context: &RenderContext<'_>) -> Markup {
    html! {
        article.tag-index {
            h1 { (context.page.title) }
            div.page-body { (PreEscaped(markdown_to_html(context.page.body))) }
            @if !context.tags.is_empty() {
                (tag_list(context.tags.iter().map(|t| t.name.as_str())))
            }
            @for tag in context.tags {
                section.tag-section id=(tag_anchor(&tag.name)) {
                    h2 { (tag.name) " " span.tag-count { "(" (tag.items.len()) ")" } }
                    (link_list(&tag.items))
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
