//! XML sitemap documents: the index and one urlset per entity type.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;

use crate::constants::{
    AGENT_CHANGEFREQ, AGENT_PRIORITY, CATEGORY_CHANGEFREQ, CATEGORY_PRIORITY, SEARCH_CHANGEFREQ,
    SEARCH_PRIORITY, SEARCH_TERM_LIMIT, STATIC_PAGES, TOOL_CHANGEFREQ, TOOL_PRIORITY,
};
use crate::entities::AgentStatus;
use crate::slug::to_slug;
use crate::store::{ContentStore, Query, StoreError};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Change frequency hint for sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

/// The documents the sitemap service can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    Index,
    Main,
    Tools,
    Categories,
    Agents,
    Search,
}

impl SitemapKind {
    /// Children listed by the index, in order. Comparison pages are pairs of
    /// tools with no backing table, so they have no sitemap.
    pub const CHILDREN: [SitemapKind; 5] = [
        SitemapKind::Main,
        SitemapKind::Tools,
        SitemapKind::Categories,
        SitemapKind::Agents,
        SitemapKind::Search,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SitemapKind::Index => "index",
            SitemapKind::Main => "main",
            SitemapKind::Tools => "tools",
            SitemapKind::Categories => "categories",
            SitemapKind::Agents => "agents",
            SitemapKind::Search => "search",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.xml", self.name())
    }
}

impl FromStr for SitemapKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.strip_suffix(".xml").unwrap_or(input) {
            "index" => Ok(SitemapKind::Index),
            "main" => Ok(SitemapKind::Main),
            "tools" => Ok(SitemapKind::Tools),
            "categories" => Ok(SitemapKind::Categories),
            "agents" => Ok(SitemapKind::Agents),
            "search" => Ok(SitemapKind::Search),
            _ => Err(format!("Unknown sitemap: {input}")),
        }
    }
}

/// Marks `urlencoding` escapes although browsers leave them bare in a path
/// segment.
const PATH_SEGMENT_MARKS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encodes `segment` the way `encodeURIComponent` does: everything
/// except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
pub fn encode_path_segment(segment: &str) -> String {
    PATH_SEGMENT_MARKS
        .iter()
        .fold(urlencoding::encode(segment).into_owned(), |encoded, (escape, mark)| {
            encoded.replace(escape, mark)
        })
}

/// A `<url>` entry of a urlset.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<ChangeFreq>,
    /// Priority (0.0 to 1.0).
    pub priority: Option<f32>,
}

/// A `<sitemap>` entry of a sitemap index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapRef {
    pub loc: String,
    pub lastmod: String,
}

/// Renders a `<urlset>` document.
pub fn render_urlset(urls: &[SitemapUrl]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push('\n');
    let _ = writeln!(xml, r#"<urlset xmlns="{SITEMAP_NAMESPACE}">"#);

    for url in urls {
        xml.push_str("  <url>\n");
        let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(&url.loc));

        if let Some(lastmod) = &url.lastmod {
            let _ = writeln!(xml, "    <lastmod>{}</lastmod>", escape_xml(lastmod));
        }

        if let Some(changefreq) = &url.changefreq {
            let _ = writeln!(xml, "    <changefreq>{}</changefreq>", changefreq.as_str());
        }

        if let Some(priority) = &url.priority {
            let _ = writeln!(xml, "    <priority>{priority:.1}</priority>");
        }

        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Renders a `<sitemapindex>` document.
pub fn render_index(sitemaps: &[SitemapRef]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push('\n');
    let _ = writeln!(xml, r#"<sitemapindex xmlns="{SITEMAP_NAMESPACE}">"#);

    for sitemap in sitemaps {
        xml.push_str("  <sitemap>\n");
        let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(&sitemap.loc));
        let _ = writeln!(xml, "    <lastmod>{}</lastmod>", escape_xml(&sitemap.lastmod));
        xml.push_str("  </sitemap>\n");
    }

    xml.push_str("</sitemapindex>\n");
    xml
}

/// Escape special XML characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Builds sitemap documents for a site from a content store.
#[derive(Debug, Clone)]
pub struct SitemapBuilder {
    site_url: String,
}

impl SitemapBuilder {
    pub fn new(site_url: &str) -> Self {
        Self {
            site_url: site_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    fn absolute(&self, path: &str) -> String {
        format!("{}{path}", self.site_url)
    }

    /// Public URL of a child sitemap.
    pub fn sitemap_url(&self, kind: SitemapKind) -> String {
        self.absolute(&format!("/sitemap/{}", kind.file_name()))
    }

    /// Produces the XML document for `kind`. `now` stamps the index entries.
    ///
    /// # Errors
    ///
    /// Returns the store error if the document's backing query fails.
    pub async fn build(
        &self,
        kind: SitemapKind,
        store: &dyn ContentStore,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let xml = match kind {
            SitemapKind::Index => render_index(&self.index_entries(now)),
            SitemapKind::Main => render_urlset(&self.main_urls()),
            SitemapKind::Tools => render_urlset(&self.tool_urls(store).await?),
            SitemapKind::Categories => render_urlset(&self.category_urls(store).await?),
            SitemapKind::Agents => render_urlset(&self.agent_urls(store).await?),
            SitemapKind::Search => render_urlset(&self.search_urls(store).await?),
        };

        debug!("Built {} sitemap ({} bytes)", kind.name(), xml.len());
        Ok(xml)
    }

    pub fn index_entries(&self, now: DateTime<Utc>) -> Vec<SitemapRef> {
        let lastmod = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        SitemapKind::CHILDREN
            .iter()
            .map(|kind| SitemapRef {
                loc: self.sitemap_url(*kind),
                lastmod: lastmod.clone(),
            })
            .collect()
    }

    pub fn main_urls(&self) -> Vec<SitemapUrl> {
        STATIC_PAGES
            .iter()
            .map(|page| SitemapUrl {
                loc: self.absolute(page.path),
                lastmod: None,
                changefreq: Some(page.changefreq),
                priority: Some(page.priority),
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns the store error if the tools query fails.
    pub async fn tool_urls(&self, store: &dyn ContentStore) -> Result<Vec<SitemapUrl>, StoreError> {
        let query = Query::new().select(&["name", "created_at", "updated_at"]);

        Ok(store
            .tools(&query)
            .await?
            .iter()
            .map(|tool| SitemapUrl {
                loc: self.absolute(&format!("/ai/{}", to_slug(&tool.name))),
                lastmod: tool.lastmod().map(|stamp| stamp.to_string()),
                changefreq: Some(TOOL_CHANGEFREQ),
                priority: Some(TOOL_PRIORITY),
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns the store error if the categories query fails.
    pub async fn category_urls(
        &self,
        store: &dyn ContentStore,
    ) -> Result<Vec<SitemapUrl>, StoreError> {
        let query = Query::new().select(&["name", "created_at"]);

        Ok(store
            .categories(&query)
            .await?
            .iter()
            .map(|category| SitemapUrl {
                loc: self.absolute(&format!("/category/{}", to_slug(&category.name))),
                lastmod: category.created_at.map(|stamp| stamp.to_string()),
                changefreq: Some(CATEGORY_CHANGEFREQ),
                priority: Some(CATEGORY_PRIORITY),
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns the store error if the agents query fails.
    pub async fn agent_urls(&self, store: &dyn ContentStore) -> Result<Vec<SitemapUrl>, StoreError> {
        let query = Query::new()
            .select(&["name", "created_at"])
            .eq("status", AgentStatus::Active.as_str());

        Ok(store
            .agents(&query)
            .await?
            .iter()
            .map(|agent| SitemapUrl {
                loc: self.absolute(&format!("/ai-agent/{}", to_slug(&agent.name))),
                lastmod: agent.created_at.map(|stamp| stamp.to_string()),
                changefreq: Some(AGENT_CHANGEFREQ),
                priority: Some(AGENT_PRIORITY),
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns the store error if the search terms query fails.
    pub async fn search_urls(
        &self,
        store: &dyn ContentStore,
    ) -> Result<Vec<SitemapUrl>, StoreError> {
        let query = Query::new()
            .select(&["term", "created_at"])
            .order_desc("count")
            .limit(SEARCH_TERM_LIMIT);

        Ok(store
            .search_terms(&query)
            .await?
            .iter()
            .map(|search| SitemapUrl {
                loc: self.absolute(&format!("/s/{}", encode_path_segment(&search.term))),
                lastmod: search.created_at.map(|stamp| stamp.to_string()),
                changefreq: Some(SEARCH_CHANGEFREQ),
                priority: Some(SEARCH_PRIORITY),
            })
            .collect())
    }
}
