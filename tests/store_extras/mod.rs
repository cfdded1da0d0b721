#![allow(dead_code)]

use std::sync::Mutex;

use aitoonic_sitemap::entities::{Agent, AgentStatus, Category, SearchTerm, Tool};
use aitoonic_sitemap::store::{Collection, ContentStore, Query, SqliteStore, StoreError};
use async_trait::async_trait;

/// A store that returns canned rows unfiltered, records every query and can
/// be told to fail for chosen collections.
#[derive(Default)]
pub(crate) struct FakeStore {
    pub categories: Vec<Category>,
    pub tools: Vec<Tool>,
    pub agents: Vec<Agent>,
    pub search_terms: Vec<SearchTerm>,
    pub failing: Vec<Collection>,
    pub queries: Mutex<Vec<(Collection, Query)>>,
}

impl FakeStore {
    pub fn unreachable() -> Self {
        Self {
            failing: vec![
                Collection::Categories,
                Collection::Tools,
                Collection::Agents,
                Collection::SearchTerms,
            ],
            ..Self::default()
        }
    }

    pub fn failing(collection: Collection) -> Self {
        Self {
            failing: vec![collection],
            ..Self::default()
        }
    }

    pub fn query_for(&self, collection: Collection) -> Option<Query> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .find(|(seen, _)| *seen == collection)
            .map(|(_, query)| query.clone())
    }

    fn answer<T: Clone>(
        &self,
        collection: Collection,
        query: &Query,
        rows: &[T],
    ) -> Result<Vec<T>, StoreError> {
        self.queries
            .lock()
            .unwrap()
            .push((collection, query.clone()));

        if self.failing.contains(&collection) {
            return Err(StoreError::Unavailable(format!(
                "connection refused while reading {collection}"
            )));
        }

        Ok(rows.to_vec())
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn categories(&self, query: &Query) -> Result<Vec<Category>, StoreError> {
        self.answer(Collection::Categories, query, &self.categories)
    }

    async fn tools(&self, query: &Query) -> Result<Vec<Tool>, StoreError> {
        self.answer(Collection::Tools, query, &self.tools)
    }

    async fn agents(&self, query: &Query) -> Result<Vec<Agent>, StoreError> {
        self.answer(Collection::Agents, query, &self.agents)
    }

    async fn search_terms(&self, query: &Query) -> Result<Vec<SearchTerm>, StoreError> {
        self.answer(Collection::SearchTerms, query, &self.search_terms)
    }
}

pub(crate) fn category(name: &str) -> Category {
    Category {
        id: None,
        name: name.to_owned(),
        description: None,
        created_at: Some("2023-12-01".parse().unwrap()),
    }
}

pub(crate) fn tool(name: &str, created_at: &str, updated_at: Option<&str>) -> Tool {
    Tool {
        id: None,
        name: name.to_owned(),
        description: None,
        url: Some("https://example.com".to_owned()),
        category_id: None,
        created_at: Some(created_at.parse().unwrap()),
        updated_at: updated_at.map(|stamp| stamp.parse().unwrap()),
        slug: None,
    }
}

pub(crate) fn agent(name: &str, status: AgentStatus, created_at: &str) -> Agent {
    Agent {
        id: None,
        name: name.to_owned(),
        description: None,
        status: Some(status),
        created_at: Some(created_at.parse().unwrap()),
    }
}

pub(crate) fn search_term(term: &str, count: i64, created_at: &str) -> SearchTerm {
    SearchTerm {
        term: term.to_owned(),
        count,
        created_at: Some(created_at.parse().unwrap()),
    }
}

/// The snapshot from the documented end-to-end example.
pub(crate) fn example_store() -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    store.insert_category(&category("Text Generation")).unwrap();
    store
        .insert_tool(&tool("GPT Writer", "2024-01-01", None))
        .unwrap();
    store
        .insert_agent(&agent("ContentGenius", AgentStatus::Active, "2024-02-01"))
        .unwrap();
    store
}
