//! Hosted content store reached over its PostgREST-style HTTP interface.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::{Collection, ContentStore, Filter, Query, StoreConfig, StoreError};
use crate::entities::{Agent, Category, SearchTerm, Tool};

/// Client handle for the hosted store. Build one per process and share it.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    config: StoreConfig,
}

impl RestStore {
    /// Creates a store client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Builds the request URL for `query` against `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot carry a path or the query
    /// references unknown columns.
    pub fn request_url(&self, collection: Collection, query: &Query) -> Result<Url, StoreError> {
        let mut url = self.config.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::Unavailable(format!("Invalid store url {}", self.config.endpoint))
            })?
            .pop_if_empty()
            .extend(["rest", "v1", collection.table()]);

        let select = if query.columns.is_empty() {
            "*".to_owned()
        } else {
            query
                .columns
                .iter()
                .map(|column| collection.column(column))
                .collect::<Result<Vec<_>, _>>()?
                .join(",")
        };

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &select);

            if let Some(Filter::Eq(column, value)) = &query.filter {
                pairs.append_pair(collection.column(column)?, &format!("eq.{value}"));
            }

            if let Some(order) = &query.order {
                let direction = if order.descending { "desc" } else { "asc" };
                pairs.append_pair(
                    "order",
                    &format!("{}.{direction}", collection.column(order.column)?),
                );
            }

            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }

            if let Some(offset) = query.offset {
                pairs.append_pair("offset", &offset.to_string());
            }
        }

        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<T>, StoreError> {
        let url = self.request_url(collection, query)?;
        debug!("Querying {url}");

        let response = self
            .client
            .get(url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Status {
                collection,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| StoreError::Decode {
            collection,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ContentStore for RestStore {
    async fn categories(&self, query: &Query) -> Result<Vec<Category>, StoreError> {
        self.fetch(Collection::Categories, query).await
    }

    async fn tools(&self, query: &Query) -> Result<Vec<Tool>, StoreError> {
        self.fetch(Collection::Tools, query).await
    }

    async fn agents(&self, query: &Query) -> Result<Vec<Agent>, StoreError> {
        self.fetch(Collection::Agents, query).await
    }

    async fn search_terms(&self, query: &Query) -> Result<Vec<SearchTerm>, StoreError> {
        self.fetch(Collection::SearchTerms, query).await
    }
}
