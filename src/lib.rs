//! The aitoonic-sitemap library derives the crawlable URL space of the
//! Aitoonic directory from its content store: the route list handed to the
//! prerenderer and the XML sitemaps served to search engines.

use std::sync::Arc;

pub mod constants;
pub mod entities;
pub mod export;
pub mod routes;
pub mod server;
pub mod sitemap;
pub mod slug;
pub mod store;
pub mod verify;

use store::{ContentStore, RestStore, SqliteStore, StoreConfig, StoreError};

/// Where content is read from.
#[derive(Debug, Clone)]
pub enum StoreSource {
    /// A local SQLite snapshot file.
    Snapshot { path: String },
    /// The hosted store.
    Hosted(StoreConfig),
}

impl StoreSource {
    /// Resolves the source from command line settings. A snapshot path wins
    /// over hosted settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when no snapshot is given and the
    /// hosted settings are missing or invalid.
    pub fn resolve(
        db: Option<&str>,
        store_url: Option<&str>,
        store_key: Option<&str>,
    ) -> Result<Self, StoreError> {
        if let Some(path) = db {
            return Ok(StoreSource::Snapshot {
                path: path.to_owned(),
            });
        }

        match (store_url, store_key) {
            (Some(url), Some(key)) => Ok(StoreSource::Hosted(StoreConfig::parse(url, key)?)),
            _ => Err(StoreError::Unavailable(format!(
                "Neither --db nor {} and {} are set",
                constants::STORE_URL_ENV_NAME,
                constants::STORE_KEY_ENV_NAME
            ))),
        }
    }

    /// Opens a client for this source.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be opened or the HTTP client
    /// cannot be built.
    pub fn open(&self) -> Result<Arc<dyn ContentStore>, StoreError> {
        Ok(match self {
            StoreSource::Snapshot { path } => Arc::new(SqliteStore::new(path)?),
            StoreSource::Hosted(config) => Arc::new(RestStore::new(config.clone())?),
        })
    }
}

pub use export::export_sitemaps;
pub use routes::{build_prerender_routes, generate_static_routes};
pub use server::{AppState, router, serve};
pub use sitemap::{SitemapBuilder, SitemapKind};
pub use slug::{from_slug, matches_slug, to_slug};
pub use verify::extract_sitemap_url_entries;
