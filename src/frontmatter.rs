//! Front matter splitting and typed front-matter values.
//!
//! A content file starts with a YAML block fenced by `---` lines:
//!
//! ```markdown
//! ---
//! title: "Hello"
//! date: 2025-01-01
//! tags: [a, b]
//! ---
//! Hi
//! ```
//!
//! [`split`] cuts the text at the first two delimiter lines; later `---`
//! lines belong to the body. The YAML is then converted from
//! `serde_yaml::Value` into [`FrontMatterValue`], a closed set of variants
//! that downstream validation can match exhaustively. YAML nulls are treated
//! as absent keys; sequences must hold scalars only.

use chrono::NaiveDate;
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

/// The fence line around front matter.
pub const DELIMITER: &str = "---";

/// Date format used when a date is written back out.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("file does not start with a '{}' line", DELIMITER)]
    Missing,
    #[error("no closing '{}' line", DELIMITER)]
    Unclosed,
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("front matter must be a mapping of keys to values")]
    NotMapping,
    #[error("unsupported value for '{key}': {reason}")]
    Unsupported { key: String, reason: String },
}

/// A front matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontMatterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    List(Vec<String>),
    Map(BTreeMap<String, FrontMatterValue>),
}

impl FrontMatterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontMatterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FrontMatterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FrontMatterValue::String(_) => "string",
            FrontMatterValue::Integer(_) => "integer",
            FrontMatterValue::Float(_) => "float",
            FrontMatterValue::Bool(_) => "boolean",
            FrontMatterValue::Date(_) => "date",
            FrontMatterValue::List(_) => "list",
            FrontMatterValue::Map(_) => "mapping",
        }
    }
}

impl Serialize for FrontMatterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FrontMatterValue::String(s) => serializer.serialize_str(s),
            FrontMatterValue::Integer(n) => serializer.serialize_i64(*n),
            FrontMatterValue::Float(n) => serializer.serialize_f64(*n),
            FrontMatterValue::Bool(b) => serializer.serialize_bool(*b),
            FrontMatterValue::Date(d) => {
                serializer.collect_str(&d.format(DATE_FORMAT))
            }
            FrontMatterValue::List(items) => serializer.collect_seq(items),
            FrontMatterValue::Map(map) => serializer.collect_map(map),
        }
    }
}

/// Parsed front matter: keys in sorted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter(BTreeMap<String, FrontMatterValue>);

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&FrontMatterValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FrontMatterValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FrontMatterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: FrontMatterValue) {
        self.0.insert(key.into(), value);
    }

    /// Serialize back to a YAML block (without delimiters).
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        if self.0.is_empty() {
            return Ok(String::new());
        }
        let yaml = serde_yaml::to_string(&self.0)?;
        Ok(match yaml.strip_prefix("---\n") {
            Some(rest) => rest.to_string(),
            None => yaml,
        })
    }
}

impl Serialize for FrontMatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Raw pieces of a content file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    /// YAML text between the delimiters, including its final newline.
    pub yaml: &'a str,
    /// Everything after the closing delimiter line, byte for byte.
    pub body: &'a str,
}

/// Split a content file into its front matter block and body.
pub fn split(text: &str) -> Result<Split<'_>, FrontMatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let (first, rest) = next_line(text);
    if !is_delimiter(first) {
        return Err(FrontMatterError::Missing);
    }
    let rest = rest.ok_or(FrontMatterError::Unclosed)?;

    let mut remaining = rest;
    loop {
        let (line, after) = next_line(remaining);
        if is_delimiter(line) {
            let yaml_len = rest.len() - remaining.len();
            return Ok(Split {
                yaml: &rest[..yaml_len],
                body: after.unwrap_or(""),
            });
        }
        remaining = after.ok_or(FrontMatterError::Unclosed)?;
    }
}

fn next_line(text: &str) -> (&str, Option<&str>) {
    match text.find('\n') {
        Some(pos) => (&text[..pos], Some(&text[pos + 1..])),
        None => (text, None),
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Parse a YAML block into [`FrontMatter`].
///
/// An empty block is an empty mapping.
pub fn parse_yaml(yaml: &str) -> Result<FrontMatter, FrontMatterError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let mapping = match value {
        serde_yaml::Value::Null => return Ok(FrontMatter::default()),
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => return Err(FrontMatterError::NotMapping),
    };
    Ok(FrontMatter(convert_mapping(mapping, "")?))
}

fn convert_mapping(
    mapping: serde_yaml::Mapping,
    prefix: &str,
) -> Result<BTreeMap<String, FrontMatterValue>, FrontMatterError> {
    let mut out = BTreeMap::new();
    for (key, value) in mapping {
        let key = scalar_to_string(&key).ok_or_else(|| FrontMatterError::Unsupported {
            key: format!("{prefix}<key>"),
            reason: "mapping keys must be scalars".into(),
        })?;
        let path = format!("{prefix}{key}");
        if let Some(value) = convert_value(value, &path)? {
            out.insert(key, value);
        }
    }
    Ok(out)
}

fn convert_value(
    value: serde_yaml::Value,
    path: &str,
) -> Result<Option<FrontMatterValue>, FrontMatterError> {
    use serde_yaml::Value;
    Ok(Some(match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => FrontMatterValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FrontMatterValue::Integer(i),
            None => FrontMatterValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => FrontMatterValue::String(s),
        Value::Sequence(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                if item.is_null() {
                    continue;
                }
                let text =
                    scalar_to_string(&item).ok_or_else(|| FrontMatterError::Unsupported {
                        key: path.to_string(),
                        reason: "list items must be scalars".into(),
                    })?;
                list.push(text);
            }
            FrontMatterValue::List(list)
        }
        Value::Mapping(mapping) => {
            FrontMatterValue::Map(convert_mapping(mapping, &format!("{path}."))?)
        }
        Value::Tagged(tagged) => return convert_value(tagged.value, path),
    }))
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
