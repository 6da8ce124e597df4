//! The whole build pipeline behind one type.
//!
//! ```text
//! 1. Config    config.toml     →  SiteConfig
//! 2. Scan      _<collection>/  →  ContentStore
//! 3. Link      store           →  LinkTable    (canonical + alias paths)
//! 4. Index     store           →  SiteIndex    (dated order, tags)
//! 5. Render    all of the above →  Vec<Document>
//! 6. Write     documents       →  output dir
//! ```
//!
//! [`Site::load`] runs stages 1 to 4, which is everything `check`, `scan`
//! and `routes` need. [`Site::build`] adds rendering and writing. A failure
//! in any stage stops the pipeline before the output directory is touched.

use crate::config::{self, ConfigError, SiteConfig};
use crate::generate::{self, WriteError, WriteReport};
use crate::index::SiteIndex;
use crate::links::{self, LinkError, LinkTable};
use crate::render::{self, Document, RenderError, TemplateEngine};
use crate::scan::{self, ScanError, ScanOptions};
use crate::store::ContentStore;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// A loaded and resolved site, ready to render.
#[derive(Debug)]
pub struct Site {
    pub config: SiteConfig,
    pub store: ContentStore,
    pub links: LinkTable,
    pub index: SiteIndex,
    /// Unpublished sources left out of the store.
    pub skipped: Vec<PathBuf>,
}

impl Site {
    /// Load configuration and content from `source` and resolve links.
    ///
    /// Unpublished items are kept when `include_unpublished` is set or the
    /// config enables `build.include_unpublished`.
    pub fn load(source: &Path, include_unpublished: bool) -> Result<Self, BuildError> {
        let config = config::load_config(source)?;
        Self::load_with(source, config, include_unpublished)
    }

    /// Like [`Site::load`], with configuration the caller already loaded.
    pub fn load_with(
        source: &Path,
        config: SiteConfig,
        include_unpublished: bool,
    ) -> Result<Self, BuildError> {
        let options = ScanOptions {
            include_unpublished: include_unpublished || config.build.include_unpublished,
        };

        let scanned = scan::scan(source, &config, options)?;
        tracing::info!(
            items = scanned.store.len(),
            skipped = scanned.skipped.len(),
            "scanned content"
        );

        let links = links::resolve(&scanned.store, &config)?;
        tracing::info!(links = links.len(), "resolved links");

        let index = SiteIndex::build(&scanned.store);

        Ok(Self {
            config,
            store: scanned.store,
            links,
            index,
            skipped: scanned.skipped,
        })
    }

    /// Render every document without writing anything.
    pub fn render(&self, engine: &dyn TemplateEngine) -> Result<Vec<Document>, BuildError> {
        Ok(render::render_site(
            &self.store,
            &self.links,
            &self.index,
            &self.config,
            engine,
        )?)
    }

    /// Render the site and write it to `output_dir`.
    pub fn build(
        &self,
        output_dir: &Path,
        use_cache: bool,
        engine: &dyn TemplateEngine,
    ) -> Result<WriteReport, BuildError> {
        let documents = self.render(engine)?;
        let report = generate::write_site(&documents, output_dir, use_cache)?;
        tracing::info!(output = %output_dir.display(), stats = %report.stats, "wrote site");
        Ok(report)
    }
}
