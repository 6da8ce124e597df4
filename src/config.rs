//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; the user's `config.toml` in the source root is merged on
//! top of them key by key, so a config file only needs the values it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "My Site"
//! description = ""
//! author = ""
//! url = ""                  # Absolute base URL, e.g. "https://example.org"
//!
//! [collections.posts]
//! dir = "_posts"            # Directory under the source root
//! root = "/posts/"          # URL prefix for derived permalinks
//! layout = "post"           # Layout used when an item sets none
//!
//! [collections.pages]
//! dir = "_pages"
//! root = "/"
//! layout = "single"
//!
//! [build]
//! include_unpublished = false
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [colors.light]
//! background = "#ffffff"
//! # ...
//! ```
//!
//! ## Collections
//!
//! The stock config declares `posts`, `pages`, `portfolio` and `talks`.
//! Declaring a new `[collections.<name>]` table adds a collection; tables for
//! existing names override only the keys they set.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the configuration file in the source root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}", CONFIG_FILENAME)]
    Io(#[from] std::io::Error),
    #[error("invalid {}", CONFIG_FILENAME)]
    Toml(#[from] toml::de::Error),
    #[error("failed to serialize default config")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site-wide settings exposed to templates.
    pub site: SiteSettings,
    /// Content collections keyed by collection name.
    pub collections: BTreeMap<String, CollectionConfig>,
    /// Build behaviour.
    pub build: BuildConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let collections = [
            ("pages", "_pages", "/", "single"),
            ("portfolio", "_portfolio", "/portfolio/", "single"),
            ("posts", "_posts", "/posts/", "post"),
            ("talks", "_talks", "/talks/", "single"),
        ]
        .into_iter()
        .map(|(name, dir, root, layout)| {
            (
                name.to_string(),
                CollectionConfig {
                    dir: dir.to_string(),
                    root: root.to_string(),
                    layout: layout.to_string(),
                },
            )
        })
        .collect();

        Self {
            site: SiteSettings::default(),
            collections,
            build: BuildConfig::default(),
            processing: ProcessingConfig::default(),
            colors: ColorConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collections.is_empty() {
            return Err(ConfigError::Validation(
                "at least one collection must be configured".into(),
            ));
        }
        for (name, collection) in &self.collections {
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "collection name '{name}' must be non-empty and contain no '/'"
                )));
            }
            if collection.dir.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "collections.{name}.dir must not be empty"
                )));
            }
            if !collection.root.starts_with('/') || !collection.root.ends_with('/') {
                return Err(ConfigError::Validation(format!(
                    "collections.{name}.root must start and end with '/'"
                )));
            }
            if collection.layout.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "collections.{name}.layout must not be empty"
                )));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// URL prefix for items of `collection` that do not set a permalink.
    ///
    /// Collections missing from the config fall back to `/<name>/`.
    pub fn collection_root(&self, collection: &str) -> String {
        self.collections
            .get(collection)
            .map(|c| c.root.clone())
            .unwrap_or_else(|| format!("/{collection}/"))
    }

    /// Layout for items of `collection` that do not set one.
    pub fn collection_layout(&self, collection: &str) -> &str {
        self.collections
            .get(collection)
            .map(|c| c.layout.as_str())
            .unwrap_or(DEFAULT_LAYOUT)
    }
}

/// Layout used when neither the item nor its collection names one.
pub const DEFAULT_LAYOUT: &str = "single";

/// Site-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSettings {
    /// Site title, shown in the header and the document title.
    pub title: String,
    /// Short description used in the `<meta name="description">` tag.
    pub description: String,
    /// Author name.
    pub author: String,
    /// Absolute base URL without trailing slash. Empty means root-relative links.
    pub url: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            title: "My Site".to_string(),
            description: String::new(),
            author: String::new(),
            url: String::new(),
        }
    }
}

/// One content collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    /// Source directory, relative to the source root.
    pub dir: String,
    /// URL prefix for derived permalinks. Starts and ends with `/`.
    pub root: String,
    /// Layout used when an item sets none.
    #[serde(default = "default_layout")]
    pub layout: String,
}

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

/// Build behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Publish items marked `published: false`.
    pub include_unpublished: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel parse/render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    /// Light mode color scheme.
    pub light: ColorScheme,
    /// Dark mode color scheme.
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    pub text: String,
    /// Dates, tags, breadcrumbs.
    pub text_muted: String,
    pub border: String,
    pub link: String,
    pub link_hover: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#222222".to_string(),
            text_muted: "#6b6b6b".to_string(),
            border: "#e3e3e3".to_string(),
            link: "#1f5fa8".to_string(),
            link_hover: "#0b3d75".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#121212".to_string(),
            text: "#e6e6e6".to_string(),
            text_muted: "#9a9a9a".to_string(),
            border: "#333333".to_string(),
            link: "#8ab4f8".to_string(),
            link_hover: "#c3d9fb".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no config file exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given source root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Quire Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults; each key you set overrides the
# matching default. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
title = "My Site"
description = ""
author = ""
# Absolute base URL (no trailing slash). Leave empty for root-relative links.
url = ""

# ---------------------------------------------------------------------------
# Collections
# ---------------------------------------------------------------------------
# Each collection reads Markdown files from `dir` (recursively). Items that
# set no `permalink` are published under `root` + their slugified identifier.
# Add a [collections.<name>] table to declare another collection.
[collections.pages]
dir = "_pages"
root = "/"
layout = "single"

[collections.portfolio]
dir = "_portfolio"
root = "/portfolio/"
layout = "single"

[collections.posts]
dir = "_posts"
root = "/posts/"
layout = "post"

[collections.talks]
dir = "_talks"
root = "/talks/"
layout = "single"

# ---------------------------------------------------------------------------
# Build
# ---------------------------------------------------------------------------
[build]
# Publish items whose front matter says `published: false`.
include_unpublished = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel parse/render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#222222"
text_muted = "#6b6b6b"    # Dates, tags, breadcrumbs
border = "#e3e3e3"
link = "#1f5fa8"
link_hover = "#0b3d75"

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#121212"
text = "#e6e6e6"
text_muted = "#9a9a9a"
border = "#333333"
link = "#8ab4f8"
link_hover = "#c3d9fb"
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-border: {light_border};
    --color-link: {light_link};
    --color-link-hover: {light_link_hover};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-text: {dark_text};
        --color-text-muted: {dark_text_muted};
        --color-border: {dark_border};
        --color-link: {dark_link};
        --color-link-hover: {dark_link_hover};
    }}
}}"#,
        light_bg = colors.light.background,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_border = colors.light.border,
        light_link = colors.light.link,
        light_link_hover = colors.light.link_hover,
        dark_bg = colors.dark.background,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_border = colors.dark.border,
        dark_link = colors.dark.link,
        dark_link_hover = colors.dark.link_hover,
    )
}
