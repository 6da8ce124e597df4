//! Content items and the content item parser.
//!
//! [`parse_item`] turns one source file into a [`ContentItem`]: it splits the
//! front matter from the body, converts the YAML into typed values and
//! validates the fields the rest of the pipeline relies on.
//!
//! ## Recognised fields
//!
//! | Key | Shape | Default |
//! |-----|-------|---------|
//! | `title` | non-empty string | required |
//! | `date` | calendar date (`2025-01-01`, optionally with a time) | absent |
//! | `tags` | list of strings, or a single string | none |
//! | `permalink` | absolute path (`/about/`) | derived from collection + identifier |
//! | `redirect_from` | absolute path or list of them | none |
//! | `slug` | string without `/` | path-derived identifier |
//! | `layout` | string | collection layout |
//! | `published` | boolean | `true` |
//!
//! Every other key is kept as-is in [`ContentItem::metadata`] and handed to
//! templates untouched.

use crate::frontmatter::{self, DELIMITER, FrontMatter, FrontMatterError, FrontMatterValue};
use crate::slug;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{}: missing front matter (file must start with '{}')", path.display(), DELIMITER)]
    MissingFrontMatter { path: PathBuf },
    #[error("{}: malformed front matter: {reason}", path.display())]
    MalformedFrontMatter { path: PathBuf, reason: String },
    #[error("{}: invalid '{field}': {reason}", path.display())]
    Validation {
        path: PathBuf,
        field: String,
        reason: String,
    },
}

impl ParseError {
    /// The source file the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            ParseError::MissingFrontMatter { path }
            | ParseError::MalformedFrontMatter { path, .. }
            | ParseError::Validation { path, .. } => path,
        }
    }
}

/// Name of a content collection (`posts`, `pages`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Collection(String);

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Collection {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Collection {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Site-wide unique key of an item: identifiers are only unique within
/// their collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ItemKey {
    pub collection: Collection,
    pub identifier: String,
}

impl ItemKey {
    pub fn new(collection: Collection, identifier: impl Into<String>) -> Self {
        Self {
            collection,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.identifier)
    }
}

/// One parsed content file.
///
/// Constructed only by [`parse_item`], so the accessors below can rely on
/// validated front matter.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    identifier: String,
    collection: Collection,
    source: PathBuf,
    metadata: FrontMatter,
    body: String,
}

impl ContentItem {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.collection.clone(), self.identifier.clone())
    }

    /// Path of the file this item was parsed from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn metadata(&self) -> &FrontMatter {
        &self.metadata
    }

    /// Raw markdown body.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn title(&self) -> &str {
        self.metadata.get_str("title").unwrap_or_default()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self.metadata.get("date") {
            Some(FrontMatterValue::Date(date)) => Some(*date),
            _ => None,
        }
    }

    pub fn tags(&self) -> BTreeSet<&str> {
        string_list(self.metadata.get("tags")).collect()
    }

    pub fn permalink(&self) -> Option<&str> {
        self.metadata.get_str("permalink")
    }

    /// Alias paths, in front matter order.
    pub fn redirect_from(&self) -> Vec<&str> {
        string_list(self.metadata.get("redirect_from")).collect()
    }

    pub fn layout(&self) -> Option<&str> {
        self.metadata.get_str("layout")
    }

    pub fn is_published(&self) -> bool {
        self.metadata
            .get("published")
            .and_then(FrontMatterValue::as_bool)
            .unwrap_or(true)
    }

    /// Write the item back out in the source file format.
    ///
    /// Parsing the result with the same path and collection yields an equal
    /// item.
    pub fn to_source(&self) -> Result<String, serde_yaml::Error> {
        let yaml = self.metadata.to_yaml()?;
        Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{}", self.body))
    }
}

fn string_list(value: Option<&FrontMatterValue>) -> impl Iterator<Item = &str> {
    let items: Vec<&str> = match value {
        Some(FrontMatterValue::String(s)) => vec![s.as_str()],
        Some(FrontMatterValue::List(items)) => items.iter().map(String::as_str).collect(),
        _ => Vec::new(),
    };
    items.into_iter()
}

/// Parse one content file.
///
/// `relative` is the file's path inside its collection directory and
/// determines the identifier unless the front matter sets `slug`. `source`
/// is the path reported in errors.
pub fn parse_item(
    text: &str,
    source: &Path,
    relative: &Path,
    collection: Collection,
) -> Result<ContentItem, ParseError> {
    let split = frontmatter::split(text).map_err(|e| match e {
        FrontMatterError::Missing => ParseError::MissingFrontMatter {
            path: source.to_path_buf(),
        },
        other => ParseError::MalformedFrontMatter {
            path: source.to_path_buf(),
            reason: other.to_string(),
        },
    })?;
    let mut metadata =
        frontmatter::parse_yaml(split.yaml).map_err(|e| ParseError::MalformedFrontMatter {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;

    let invalid = |field: &str, reason: String| ParseError::Validation {
        path: source.to_path_buf(),
        field: field.to_string(),
        reason,
    };

    match metadata.get("title") {
        Some(FrontMatterValue::String(title)) if !title.trim().is_empty() => {}
        Some(FrontMatterValue::String(_)) => {
            return Err(invalid("title", "must not be empty".into()));
        }
        Some(other) => {
            return Err(invalid(
                "title",
                format!("expected a string, found {}", other.kind()),
            ));
        }
        None => return Err(invalid("title", "required field is missing".into())),
    }

    if let Some(value) = metadata.get("date") {
        let date = match value {
            FrontMatterValue::Date(date) => *date,
            FrontMatterValue::String(text) => parse_date(text).ok_or_else(|| {
                invalid("date", format!("'{text}' is not a valid calendar date"))
            })?,
            other => {
                return Err(invalid(
                    "date",
                    format!("expected a date, found {}", other.kind()),
                ));
            }
        };
        metadata.insert("date", FrontMatterValue::Date(date));
    }

    for field in ["tags", "redirect_from"] {
        match metadata.get(field) {
            None | Some(FrontMatterValue::String(_)) | Some(FrontMatterValue::List(_)) => {}
            Some(other) => {
                return Err(invalid(
                    field,
                    format!("expected a string or a list, found {}", other.kind()),
                ));
            }
        }
    }

    if let Some(value) = metadata.get("permalink") {
        let permalink = value
            .as_str()
            .ok_or_else(|| invalid("permalink", format!("expected a string, found {}", value.kind())))?;
        check_url_path(permalink).map_err(|reason| invalid("permalink", reason))?;
    }

    for alias in string_list(metadata.get("redirect_from")) {
        check_url_path(alias).map_err(|reason| invalid("redirect_from", reason))?;
    }

    if let Some(value) = metadata.get("layout")
        && value.as_str().is_none_or(|s| s.trim().is_empty())
    {
        return Err(invalid("layout", "expected a non-empty string".into()));
    }

    if let Some(value) = metadata.get("published")
        && value.as_bool().is_none()
    {
        return Err(invalid(
            "published",
            format!("expected a boolean, found {}", value.kind()),
        ));
    }

    let identifier = match metadata.get("slug") {
        Some(FrontMatterValue::String(slug)) if !slug.is_empty() && !slug.contains('/') => {
            slug.clone()
        }
        Some(_) => {
            return Err(invalid(
                "slug",
                "expected a non-empty string without '/'".into(),
            ));
        }
        None => slug::identifier_from_path(relative).ok_or_else(|| {
            invalid(
                "identifier",
                format!("cannot derive an identifier from '{}'", relative.display()),
            )
        })?,
    };

    Ok(ContentItem {
        identifier,
        collection,
        source: source.to_path_buf(),
        metadata,
        body: split.body.to_string(),
    })
}

/// Parse the date formats accepted in front matter, keeping the calendar
/// date as written.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|dt| dt.date())
}

/// Validate a site-absolute URL path such as `/posts/hello/`.
fn check_url_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("'{path}' must be an absolute path starting with '/'"));
    }
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(format!("'{path}' must not contain '.' or '..' segments"));
    }
    if path.contains(['?', '#', '\\']) || path.chars().any(char::is_whitespace) {
        return Err(format!(
            "'{path}' must not contain whitespace, '?', '#' or '\\'"
        ));
    }
    Ok(())
}
