//! Local SQLite snapshot of the content store, used for offline builds and
//! as a deterministic backend in tests.

use async_trait::async_trait;
use rusqlite::types::{FromSql, ToSqlOutput, Value};
use rusqlite::{Connection, Row, ToSql, params, params_from_iter};
use std::sync::{Arc, Mutex};

use super::{Collection, ContentStore, Filter, Query, StoreError};
use crate::entities::{Agent, AgentStatus, Category, EntityId, SearchTerm, Timestamp, Tool};

/// A content store backed by a SQLite file.
pub struct SqliteStore {
    /// The underlying SQLite connection wrapped in Arc<Mutex<>> to make it thread-safe
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a snapshot database at `database_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn new(database_path: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(database_path)?)
    }

    /// Creates an empty in-memory snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initializes the snapshot tables if they don't exist.
    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NULL,
                created_at TEXT NULL
            );
            CREATE TABLE IF NOT EXISTS tools (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NULL,
                url TEXT NULL,
                category_id INTEGER NULL,
                created_at TEXT NULL,
                updated_at TEXT NULL,
                slug TEXT NULL
            );
            CREATE TABLE IF NOT EXISTS agents (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NULL
            );
            CREATE TABLE IF NOT EXISTS search_terms (
                term TEXT PRIMARY KEY,
                count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NULL
            );",
        )?;

        Ok(())
    }

    /// Adds a category to the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        conn.execute(
            "INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id,
                category.name,
                category.description,
                category.created_at.map(|stamp| stamp.to_string()),
            ],
        )?;

        Ok(())
    }

    /// Adds a tool to the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn insert_tool(&self, tool: &Tool) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        conn.execute(
            "INSERT INTO tools (id, name, description, url, category_id, created_at, updated_at, slug)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tool.id,
                tool.name,
                tool.description,
                tool.url,
                tool.category_id,
                tool.created_at.map(|stamp| stamp.to_string()),
                tool.updated_at.map(|stamp| stamp.to_string()),
                tool.slug,
            ],
        )?;

        Ok(())
    }

    /// Adds an agent to the snapshot. Agents without a status are stored as active.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn insert_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        conn.execute(
            "INSERT INTO agents (id, name, description, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                agent.id,
                agent.name,
                agent.description,
                agent.status.unwrap_or(AgentStatus::Active).as_str(),
                agent.created_at.map(|stamp| stamp.to_string()),
            ],
        )?;

        Ok(())
    }

    /// Records a search term, replacing an existing entry with the same text.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned
    pub fn upsert_search_term(&self, term: &SearchTerm) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("Storage mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO search_terms (term, count, created_at) VALUES (?1, ?2, ?3)",
            params![
                term.term,
                term.count,
                term.created_at.map(|stamp| stamp.to_string()),
            ],
        )?;

        Ok(())
    }

    /// Runs `query` against `collection`, decoding each row with `map`.
    ///
    /// Only the projected columns are read, plus the collection's key column.
    /// Columns left out of the projection decode as absent.
    fn fetch<R, T>(
        &self,
        collection: Collection,
        query: &Query,
        map: impl Fn(&Row<'_>) -> rusqlite::Result<R>,
    ) -> Result<Vec<T>, StoreError>
    where
        T: TryFrom<R, Error = StoreError>,
    {
        let (sql, values) = select_sql(collection, query)?;

        let conn = self.conn.lock().expect("Storage mutex poisoned");
        let mut stmt = conn.prepare(&sql)?;
        let rows: Result<Vec<R>, rusqlite::Error> =
            stmt.query_map(params_from_iter(values), |row| map(row))?.collect();

        rows?.into_iter().map(T::try_from).collect()
    }
}

/// Columns read for `query`: everything for an empty projection, otherwise
/// the key column followed by the projected ones.
fn projection(collection: Collection, query: &Query) -> Result<Vec<&'static str>, StoreError> {
    if query.columns.is_empty() {
        return Ok(collection.columns().to_vec());
    }

    let mut columns = vec![collection.key_column()];
    for name in &query.columns {
        let column = collection.column(name)?;
        if !columns.contains(&column) {
            columns.push(column);
        }
    }

    Ok(columns)
}

fn select_sql(collection: Collection, query: &Query) -> Result<(String, Vec<String>), StoreError> {
    let mut sql = format!(
        "SELECT {} FROM {}",
        projection(collection, query)?.join(", "),
        collection.table()
    );
    let mut values = Vec::new();

    if let Some(Filter::Eq(column, value)) = &query.filter {
        sql.push_str(&format!(" WHERE {} = ?1", collection.column(column)?));
        values.push(value.clone());
    }

    if let Some(order) = &query.order {
        let direction = if order.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(
            " ORDER BY {} {direction}",
            collection.column(order.column)?
        ));
    }

    match (query.limit, query.offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }

    Ok((sql, values))
}

/// Reads `name` from `row`, or `None` when the column was not selected.
fn optional<T: FromSql>(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<T>> {
    match row.as_ref().column_index(name) {
        Ok(index) => row.get(index),
        Err(rusqlite::Error::InvalidColumnName(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl ToSql for EntityId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            EntityId::Number(id) => id.to_sql(),
            EntityId::Text(id) => id.to_sql(),
        }
    }
}

fn entity_id(collection: Collection, value: Option<Value>) -> Result<Option<EntityId>, StoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Integer(id)) => Ok(Some(EntityId::Number(id))),
        Some(Value::Text(id)) => Ok(Some(EntityId::Text(id))),
        Some(other) => Err(StoreError::Decode {
            collection,
            message: format!("Unsupported id value {other:?}"),
        }),
    }
}

fn timestamp(raw: Option<String>) -> Option<Timestamp> {
    raw.as_deref().and_then(Timestamp::parse_lenient)
}

/// Represents a category row as stored in the snapshot
#[derive(Debug)]
pub struct CategoryRow {
    pub id: Option<Value>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = StoreError;

    fn try_from(row: CategoryRow) -> Result<Self, StoreError> {
        Ok(Category {
            id: entity_id(Collection::Categories, row.id)?,
            name: row.name,
            description: row.description,
            created_at: timestamp(row.created_at),
        })
    }
}

/// Represents a tool row as stored in the snapshot
#[derive(Debug)]
pub struct ToolRow {
    pub id: Option<Value>,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub category_id: Option<Value>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub slug: Option<String>,
}

impl TryFrom<ToolRow> for Tool {
    type Error = StoreError;

    fn try_from(row: ToolRow) -> Result<Self, StoreError> {
        let collection = Collection::Tools;
        Ok(Tool {
            id: entity_id(collection, row.id)?,
            name: row.name,
            description: row.description,
            url: row.url,
            category_id: entity_id(collection, row.category_id)?,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
            slug: row.slug,
        })
    }
}

/// Represents an agent row as stored in the snapshot
#[derive(Debug)]
pub struct AgentRow {
    pub id: Option<Value>,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

impl TryFrom<AgentRow> for Agent {
    type Error = StoreError;

    fn try_from(row: AgentRow) -> Result<Self, StoreError> {
        let collection = Collection::Agents;
        let status = row
            .status
            .map(|status| status.parse::<AgentStatus>())
            .transpose()
            .map_err(|message| StoreError::Decode {
                collection,
                message,
            })?;

        Ok(Agent {
            id: entity_id(collection, row.id)?,
            name: row.name,
            description: row.description,
            status,
            created_at: timestamp(row.created_at),
        })
    }
}

/// Represents a search term row as stored in the snapshot
#[derive(Debug)]
pub struct SearchTermRow {
    pub term: String,
    pub count: Option<i64>,
    pub created_at: Option<String>,
}

impl TryFrom<SearchTermRow> for SearchTerm {
    type Error = StoreError;

    fn try_from(row: SearchTermRow) -> Result<Self, StoreError> {
        Ok(SearchTerm {
            term: row.term,
            count: row.count.unwrap_or_default(),
            created_at: timestamp(row.created_at),
        })
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn categories(&self, query: &Query) -> Result<Vec<Category>, StoreError> {
        self.fetch(Collection::Categories, query, |row| {
            Ok(CategoryRow {
                id: optional(row, "id")?,
                name: row.get("name")?,
                description: optional(row, "description")?,
                created_at: optional(row, "created_at")?,
            })
        })
    }

    async fn tools(&self, query: &Query) -> Result<Vec<Tool>, StoreError> {
        self.fetch(Collection::Tools, query, |row| {
            Ok(ToolRow {
                id: optional(row, "id")?,
                name: row.get("name")?,
                description: optional(row, "description")?,
                url: optional(row, "url")?,
                category_id: optional(row, "category_id")?,
                created_at: optional(row, "created_at")?,
                updated_at: optional(row, "updated_at")?,
                slug: optional(row, "slug")?,
            })
        })
    }

    async fn agents(&self, query: &Query) -> Result<Vec<Agent>, StoreError> {
        self.fetch(Collection::Agents, query, |row| {
            Ok(AgentRow {
                id: optional(row, "id")?,
                name: row.get("name")?,
                description: optional(row, "description")?,
                status: optional(row, "status")?,
                created_at: optional(row, "created_at")?,
            })
        })
    }

    async fn search_terms(&self, query: &Query) -> Result<Vec<SearchTerm>, StoreError> {
        self.fetch(Collection::SearchTerms, query, |row| {
            Ok(SearchTermRow {
                term: row.get("term")?,
                count: optional(row, "count")?,
                created_at: optional(row, "created_at")?,
            })
        })
    }
}
