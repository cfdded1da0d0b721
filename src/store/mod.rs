//! The store module describes the content store the generator reads from:
//! a handful of collections queried with an optional projection, equality
//! filter, ordering and limit/offset. Two backends are provided, the hosted
//! REST store and a local SQLite snapshot.

pub mod rest;
pub mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::constants::{DEFAULT_STORE_TIMEOUT_SECS, STORE_KEY_ENV_NAME, STORE_URL_ENV_NAME};
use crate::entities::{Agent, Category, SearchTerm, Tool};

pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Errors surfaced by content store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or is not configured.
    #[error("Content store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with a non-success status.
    #[error("Content store returned {status} for {collection}: {body}")]
    Status {
        collection: Collection,
        status: u16,
        body: String,
    },

    /// Rows could not be decoded into entities.
    #[error("Unable to decode {collection} rows: {message}")]
    Decode {
        collection: Collection,
        message: String,
    },

    /// The query names a column the collection does not have.
    #[error("Unknown column {column:?} for {collection}")]
    InvalidQuery {
        collection: Collection,
        column: String,
    },

    /// Local snapshot failure.
    #[error("Snapshot database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// The collections the generator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Categories,
    Tools,
    Agents,
    SearchTerms,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Categories => "categories",
            Collection::Tools => "tools",
            Collection::Agents => "agents",
            Collection::SearchTerms => "search_terms",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Collection::Categories => &["id", "name", "description", "created_at"],
            Collection::Tools => &[
                "id",
                "name",
                "description",
                "url",
                "category_id",
                "created_at",
                "updated_at",
                "slug",
            ],
            Collection::Agents => &["id", "name", "description", "status", "created_at"],
            Collection::SearchTerms => &["term", "count", "created_at"],
        }
    }

    /// The column every row carries, even under a projection that omits it.
    pub fn key_column(self) -> &'static str {
        match self {
            Collection::SearchTerms => "term",
            _ => "name",
        }
    }

    /// Returns the column name if `collection` has it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidQuery`] for unknown columns.
    pub fn column(self, name: &str) -> Result<&'static str, StoreError> {
        self.columns()
            .iter()
            .copied()
            .find(|column| *column == name)
            .ok_or_else(|| StoreError::InvalidQuery {
                collection: self,
                column: name.to_owned(),
            })
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(&'static str, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

/// A read against one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Projection. Empty selects every column.
    pub columns: Vec<&'static str>,
    pub filter: Option<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &[&'static str]) -> Self {
        self.columns = columns.to_vec();
        self
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.filter = Some(Filter::Eq(column, value.into()));
        self
    }

    pub fn order_asc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            descending: false,
        });
        self
    }

    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Read access to the site content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn categories(&self, query: &Query) -> Result<Vec<Category>, StoreError>;
    async fn tools(&self, query: &Query) -> Result<Vec<Tool>, StoreError>;
    async fn agents(&self, query: &Query) -> Result<Vec<Agent>, StoreError>;
    async fn search_terms(&self, query: &Query) -> Result<Vec<SearchTerm>, StoreError>;
}

/// Connection settings for the hosted store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }

    /// Reads the endpoint and key from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when either variable is missing or
    /// the endpoint is not a valid URL.
    pub fn from_env() -> Result<Self, StoreError> {
        let endpoint = std::env::var(STORE_URL_ENV_NAME)
            .map_err(|e| StoreError::Unavailable(format!("{STORE_URL_ENV_NAME}: {e}")))?;
        let api_key = std::env::var(STORE_KEY_ENV_NAME)
            .map_err(|e| StoreError::Unavailable(format!("{STORE_KEY_ENV_NAME}: {e}")))?;

        Self::parse(&endpoint, &api_key)
    }

    /// Builds a config from raw settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the endpoint is not a valid URL
    /// or the key is empty.
    pub fn parse(endpoint: &str, api_key: &str) -> Result<Self, StoreError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StoreError::Unavailable(format!("Invalid store url {endpoint}: {e}")))?;
        if api_key.trim().is_empty() {
            return Err(StoreError::Unavailable("Empty store key".to_owned()));
        }

        Ok(Self::new(endpoint, api_key))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
