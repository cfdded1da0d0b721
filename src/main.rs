//! aitoonic-sitemap is a CLI tool that derives the crawlable routes of the
//! Aitoonic directory from its content store.
//!
//! The tool has these commands:
//! 1. `routes` - Writes the prerender route module for the static-site build
//! 2. `serve` - Serves the XML sitemaps over HTTP
//! 3. `export` - Writes the XML sitemaps to a directory
//! 4. `verify` - Crawls a published sitemap and counts its URLs
//! 5. `check-routes` - Validates a generated route module

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use url::Url;

use aitoonic_sitemap::{
    StoreSource,
    constants::{
        DEFAULT_ROUTES_MODULE_PATH, DEFAULT_SITE_URL, SITE_URL_ENV_NAME, STORE_KEY_ENV_NAME,
        STORE_URL_ENV_NAME,
    },
    export::export_sitemaps,
    routes::{build_prerender_routes, fallback_routes, parse_routes_module, write_routes_module},
    server::{AppState, serve},
    sitemap::SitemapBuilder,
    verify::extract_sitemap_url_entries,
};

/// Prerender routes and XML sitemaps for the Aitoonic directory
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    store: StoreArgs,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,
}

#[derive(Args)]
struct StoreArgs {
    /// Path to a SQLite snapshot to read content from instead of the hosted store
    #[arg(long, global = true)]
    db: Option<String>,
    /// Hosted content store endpoint
    #[arg(long, env = STORE_URL_ENV_NAME, global = true)]
    store_url: Option<String>,
    /// Hosted content store API key
    #[arg(long, env = STORE_KEY_ENV_NAME, global = true, hide_env_values = true)]
    store_key: Option<String>,
    /// Public site URL used in sitemap locations
    #[arg(long, env = SITE_URL_ENV_NAME, global = true, default_value = DEFAULT_SITE_URL)]
    site_url: String,
}

impl StoreArgs {
    fn source(&self) -> Result<StoreSource, aitoonic_sitemap::store::StoreError> {
        StoreSource::resolve(
            self.db.as_deref(),
            self.store_url.as_deref(),
            self.store_key.as_deref(),
        )
    }

    fn builder(&self) -> Result<SitemapBuilder> {
        Url::parse(&self.site_url).map_err(|e| anyhow::anyhow!("Invalid site url: {}", e))?;
        Ok(SitemapBuilder::new(&self.site_url))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Write the prerender route module, falling back to static pages if the store is unavailable
    Routes {
        /// Path of the generated module
        #[arg(long, short, default_value = DEFAULT_ROUTES_MODULE_PATH)]
        output: PathBuf,
    },
    /// Serve XML sitemaps under /sitemap/{name}.xml
    Serve {
        /// Address to listen on
        #[arg(long, short, default_value = "0.0.0.0:8000")]
        addr: SocketAddr,
    },
    /// Write all XML sitemaps to a directory
    Export {
        /// Directory to write index.xml and the child sitemaps to
        output_dir: PathBuf,
    },
    /// Crawl a published sitemap (or index) and report the URLs it exposes
    Verify {
        /// The sitemap URL to read
        url: String,
    },
    /// Check that a generated route module contains every static page
    CheckRoutes {
        /// Path of the generated module
        #[arg(default_value = DEFAULT_ROUTES_MODULE_PATH)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    match cli.command {
        Command::Routes { output } => handle_routes_command(&cli.store, output).await,
        Command::Serve { addr } => {
            let store = cli.store.source()?.open()?;
            serve(addr, AppState::new(store, cli.store.builder()?.site_url())).await
        }
        Command::Export { output_dir } => {
            let store = cli.store.source()?.open()?;
            export_sitemaps(
                &cli.store.builder()?,
                store.as_ref(),
                &output_dir,
                chrono::Utc::now(),
            )
            .await
            .map(|_| ())
        }
        Command::Verify { url } => handle_verify_command(url).await,
        Command::CheckRoutes { file } => handle_check_routes_command(file),
    }
}

async fn handle_routes_command(store_args: &StoreArgs, output: PathBuf) -> Result<()> {
    match store_args.source().and_then(|source| source.open()) {
        Ok(store) => build_prerender_routes(store.as_ref(), &output)
            .await
            .map(|_| ()),
        Err(err) => {
            warn!("Content store unavailable, writing static routes only: {err}");
            write_routes_module(&output, &fallback_routes())
        }
    }
}

async fn handle_verify_command(url: String) -> Result<()> {
    let url = Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid sitemap url: {}", e))?;
    let entries = extract_sitemap_url_entries(url.as_str()).await?;

    if entries.is_empty() {
        bail!("No URLs discovered from {url}");
    }

    info!("Discovered {} URLs from {url}", entries.len());
    Ok(())
}

fn handle_check_routes_command(file: PathBuf) -> Result<()> {
    let source = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read route module: {}", file.display()))?;
    let routes = parse_routes_module(&source)?;

    let missing: Vec<String> = fallback_routes()
        .into_iter()
        .filter(|route| !routes.contains(route))
        .collect();
    if !missing.is_empty() {
        bail!("Route module is missing static pages: {}", missing.join(", "));
    }

    info!("{} contains {} routes", file.display(), routes.len());
    Ok(())
}
