//! Typed rows for the collections read from the content store.
//!
//! Every column other than the display name is optional so that projected
//! queries (`select=name,created_at`) decode into the same types as full rows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use log::warn;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Row identifier. The hosted store uses integers, snapshots may use text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(id) => write!(formatter, "{id}"),
            EntityId::Text(id) => formatter.write_str(id),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unrecognized timestamp: {0:?}")]
pub struct TimestampError(pub String);

/// A stored timestamp, kept at the precision the store returned it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Date(NaiveDate),
    Instant(DateTime<Utc>),
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
            return Ok(Timestamp::Instant(instant.with_timezone(&Utc)));
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
            if let Ok(instant) = DateTime::parse_from_str(value, format) {
                return Ok(Timestamp::Instant(instant.with_timezone(&Utc)));
            }
        }

        // Columns without a zone are UTC in the hosted store.
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(Timestamp::Instant(naive.and_utc()));
            }
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Timestamp::Date)
            .map_err(|_| TimestampError(value.to_owned()))
    }
}

impl Timestamp {
    /// Parses a stored value, treating an unreadable one as absent. A single
    /// bad row only loses its `lastmod`.
    pub fn parse_lenient(raw: &str) -> Option<Timestamp> {
        match raw.parse() {
            Ok(stamp) => Some(stamp),
            Err(err) => {
                warn!("Ignoring {err}");
                None
            }
        }
    }
}

/// `deserialize_with` helper for optional timestamp columns, see
/// [`Timestamp::parse_lenient`].
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Timestamp>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .as_deref()
        .and_then(Timestamp::parse_lenient))
}

impl fmt::Display for Timestamp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Date(date) => write!(formatter, "{}", date.format("%Y-%m-%d")),
            Timestamp::Instant(instant) => {
                formatter.write_str(&instant.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tool {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<Timestamp>,
    /// Stored slug. Not used for routes yet, names are slugified at read time.
    #[serde(default)]
    pub slug: Option<String>,
}

impl Tool {
    /// Last modification for sitemaps: the update time, else the creation time.
    pub fn lastmod(&self) -> Option<Timestamp> {
        self.updated_at.or(self.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "active" => Ok(AgentStatus::Active),
            "inactive" => Ok(AgentStatus::Inactive),
            _ => Err(format!("Invalid agent status: {input}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<AgentStatus>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<Timestamp>,
}

/// A recorded free-text query from the site search page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchTerm {
    pub term: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<Timestamp>,
}
