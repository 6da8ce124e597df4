//! Identifiers and URL slugs.
//!
//! An item's identifier comes from its path inside the collection directory:
//! the extension is dropped and directory components are joined with `/`.
//!
//! - `_posts/2025-01-01-hello.md` → `2025-01-01-hello`
//! - `_portfolio/robots/arm.md` → `robots/arm`
//!
//! Slugs are what derived permalinks are built from. Each `/`-separated
//! segment is transliterated to ASCII and reduced to `[a-z0-9-]`:
//!
//! - `2025-01-01-Hello World` → `2025-01-01-hello-world`
//! - `Café Ünïcode` → `cafe-unicode`
//! - `robots/Arm (v2)` → `robots/arm-v2`

use std::path::{Component, Path};

/// Derive an identifier from a path relative to the collection directory.
///
/// Returns `None` when the path has no file stem or a component is not
/// valid UTF-8.
pub fn identifier_from_path(relative: &Path) -> Option<String> {
    let stem = relative.file_stem()?.to_str()?;
    let mut segments = Vec::new();
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
    }
    segments.push(stem);
    Some(segments.join("/"))
}

/// Slugify a single path segment.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Slugify every `/`-separated segment of an identifier, dropping segments
/// that slugify to nothing.
pub fn slugify_identifier(identifier: &str) -> String {
    identifier
        .split('/')
        .map(slugify)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
