use clap::{Parser, Subcommand};
use quire::site::Site;
use quire::theme::HtmlTheme;
use quire::{config, output};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Static site generator for personal sites and blogs")]
#[command(long_about = "\
Static site generator for personal sites and blogs

Markdown files with YAML front matter become HTML pages. Each collection
directory holds one kind of content.

Site structure:

  site/
  ├── config.toml                  # Site config (optional)
  ├── _pages/                      # → /<name>/ (or set permalink)
  │   ├── about.md                 # permalink: /
  │   └── cv.md                    # → /cv/
  ├── _posts/                      # → /posts/<name>/
  │   └── 2025-01-01-hello.md      # date: 2025-01-01 (required by the post layout)
  ├── _portfolio/                  # → /portfolio/<name>/
  └── _talks/                      # → /talks/<name>/

Front matter:
  title          required
  date           2025-01-01; orders posts, newest first
  tags           [a, b] or a single string
  permalink      explicit URL path, e.g. /about/
  redirect_from  old URL paths that redirect here
  layout         single, post, archive or tags
  published      false to leave the item out of the build

Run 'quire gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Site source directory
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "_site", global = true)]
    output: PathBuf,

    /// Include items marked `published: false`
    #[arg(long, global = true)]
    unpublished: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write the site
    Build {
        /// Rewrite every output file, even unchanged ones
        #[arg(long)]
        no_cache: bool,
    },
    /// Parse, link and render everything without writing
    Check,
    /// Show the content inventory
    Scan {
        /// Print a JSON manifest instead
        #[arg(long)]
        json: bool,
    },
    /// List every canonical and alias URL
    Routes,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Build { no_cache } => {
            let site = load(&cli.source, cli.unpublished)?;
            let theme = HtmlTheme::new(&site.config);
            let report = site.build(&cli.output, !no_cache, &theme)?;
            output::print_build_output(&site, &report);
            println!("==> Build complete: {}", report.output_dir.display());
        }
        Command::Check => {
            let site = load(&cli.source, cli.unpublished)?;
            let theme = HtmlTheme::new(&site.config);
            let documents = site.render(&theme)?;
            output::print_check_output(&site, &documents);
            println!("==> Site is valid");
        }
        Command::Scan { json } => {
            let site = load(&cli.source, cli.unpublished)?;
            if json {
                let manifest = output::ScanManifest::new(&site);
                println!("{}", serde_json::to_string_pretty(&manifest)?);
            } else {
                output::print_scan_output(&site);
            }
        }
        Command::Routes => {
            let site = load(&cli.source, cli.unpublished)?;
            output::print_routes(&site);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

fn load(source: &std::path::Path, unpublished: bool) -> Result<Site, Box<dyn Error>> {
    // Pool size lives in config.toml and must be set before scanning starts.
    let config = config::load_config(source)?;
    init_thread_pool(&config.processing);
    Ok(Site::load_with(source, config, unpublished)?)
}

/// `RUST_LOG` wins; otherwise the level follows `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
