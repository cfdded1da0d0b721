use std::collections::HashMap;
use std::sync::Arc;

use aitoonic_sitemap::entities::AgentStatus;
use aitoonic_sitemap::export::export_sitemaps;
use aitoonic_sitemap::server::{AppState, router};
use aitoonic_sitemap::sitemap::SitemapBuilder;
use aitoonic_sitemap::store::{Collection, ContentStore, SqliteStore};
use aitoonic_sitemap::verify::read_sitemap;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use spectral::prelude::*;
use tower::ServiceExt;

use crate::store_extras::{FakeStore, agent, example_store, search_term};

mod store_extras;

const SITE_URL: &str = "https://aitoonic.com";

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: String,
}

async fn request(store: impl ContentStore + 'static, method: Method, uri: &str) -> Reply {
    let app = router(AppState::new(Arc::new(store), SITE_URL));
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    Reply {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

async fn get(store: impl ContentStore + 'static, uri: &str) -> Reply {
    request(store, Method::GET, uri).await
}

/// Collapses indentation so documents compare as one line.
fn compact(xml: &str) -> String {
    xml.lines().map(str::trim).collect()
}

fn assert_common_headers(reply: &Reply) {
    assert_that(&reply.headers.get(header::CONTENT_TYPE).map(|v| v.as_bytes()))
        .is_equal_to(Some(&b"application/xml"[..]));
    assert_that(
        &reply
            .headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.as_bytes()),
    )
    .is_equal_to(Some(&b"*"[..]));
    assert_that(
        &reply
            .headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .map(|v| v.as_bytes()),
    )
    .is_equal_to(Some(&b"GET, OPTIONS"[..]));
}

#[tokio::test]
async fn index_lists_the_five_children() {
    let reply = get(FakeStore::default(), "/sitemap/index.xml").await;

    assert_that(&reply.status).is_equal_to(StatusCode::OK);
    assert_common_headers(&reply);

    let mut entries = HashMap::new();
    let nested = read_sitemap(reply.body.as_bytes(), &mut entries);
    assert_that(&nested).is_equal_to(vec![
        "https://aitoonic.com/sitemap/main.xml".to_owned(),
        "https://aitoonic.com/sitemap/tools.xml".to_owned(),
        "https://aitoonic.com/sitemap/categories.xml".to_owned(),
        "https://aitoonic.com/sitemap/agents.xml".to_owned(),
        "https://aitoonic.com/sitemap/search.xml".to_owned(),
    ]);
    assert!(!reply.body.contains("compare"));
    assert_that(&reply.body.matches("<lastmod>").count()).is_equal_to(5);
}

#[tokio::test]
async fn index_needs_no_store() {
    let reply = get(FakeStore::unreachable(), "/sitemap/index.xml").await;

    assert_that(&reply.status).is_equal_to(StatusCode::OK);
}

#[tokio::test]
async fn main_lists_static_pages() {
    let reply = get(FakeStore::unreachable(), "/sitemap/main.xml").await;

    assert_that(&reply.status).is_equal_to(StatusCode::OK);
    assert_that(&reply.body.matches("<url>").count()).is_equal_to(10);
    assert!(compact(&reply.body).contains(
        "<url><loc>https://aitoonic.com/</loc><changefreq>daily</changefreq><priority>1.0</priority></url>"
    ));
    assert!(compact(&reply.body).contains(
        "<url><loc>https://aitoonic.com/privacy</loc><changefreq>monthly</changefreq><priority>0.5</priority></url>"
    ));
}

#[tokio::test]
async fn tools_sitemap_matches_example() {
    let reply = get(example_store(), "/sitemap/tools.xml").await;

    assert_that(&reply.status).is_equal_to(StatusCode::OK);
    assert_common_headers(&reply);
    assert!(reply.body.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(compact(&reply.body).contains(
        "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"><url><loc>https://aitoonic.com/ai/gpt-writer</loc><lastmod>2024-01-01</lastmod><changefreq>weekly</changefreq><priority>0.9</priority></url></urlset>"
    ));
}

#[tokio::test]
async fn tools_lastmod_prefers_update_time() {
    let mut store = FakeStore::default();
    store.tools.push(store_extras::tool(
        "Image Studio",
        "2024-01-01",
        Some("2024-05-06T07:08:09Z"),
    ));

    let reply = get(store, "/sitemap/tools").await;

    assert!(reply.body.contains("<lastmod>2024-05-06T07:08:09Z</lastmod>"));
}

#[tokio::test]
async fn unreadable_dates_only_lose_lastmod() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.db");
    let path = path.to_str().unwrap();
    let store = SqliteStore::new(path).unwrap();
    rusqlite::Connection::open(path)
        .unwrap()
        .execute_batch(
            "INSERT INTO tools (name, created_at) VALUES ('GPT Writer', '2024-01-01'), ('Odd Tool', '01/02/2024');",
        )
        .unwrap();

    let reply = get(store, "/sitemap/tools.xml").await;
    let body = compact(&reply.body);

    assert_that(&reply.status).is_equal_to(StatusCode::OK);
    assert!(body.contains(
        "<url><loc>https://aitoonic.com/ai/odd-tool</loc><changefreq>weekly</changefreq><priority>0.9</priority></url>"
    ));
    assert!(body.contains("<loc>https://aitoonic.com/ai/gpt-writer</loc><lastmod>2024-01-01</lastmod>"));
}

#[tokio::test]
async fn categories_and_agents_use_slugs() {
    let categories = get(example_store(), "/sitemap/categories.xml").await;
    assert!(compact(&categories.body).contains(
        "<url><loc>https://aitoonic.com/category/text-generation</loc><lastmod>2023-12-01</lastmod><changefreq>weekly</changefreq><priority>0.8</priority></url>"
    ));

    let agents = get(example_store(), "/sitemap/agents.xml").await;
    assert!(compact(&agents.body).contains(
        "<url><loc>https://aitoonic.com/ai-agent/contentgenius</loc><lastmod>2024-02-01</lastmod><changefreq>weekly</changefreq><priority>0.8</priority></url>"
    ));
}

#[tokio::test]
async fn inactive_agents_are_not_listed() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .insert_agent(&agent("Helper", AgentStatus::Active, "2024-01-01"))
        .unwrap();
    store
        .insert_agent(&agent("Retired", AgentStatus::Inactive, "2024-01-01"))
        .unwrap();

    let reply = get(store, "/sitemap/agents.xml").await;

    assert!(reply.body.contains("/ai-agent/helper"));
    assert!(!reply.body.contains("/ai-agent/retired"));
}

#[tokio::test]
async fn search_terms_are_percent_encoded_by_popularity() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .upsert_search_term(&search_term("rare", 1, "2024-01-01"))
        .unwrap();
    store
        .upsert_search_term(&search_term("chat gpt & images", 40, "2024-03-01"))
        .unwrap();

    let reply = get(store, "/sitemap/search.xml").await;
    let body = compact(&reply.body);

    assert!(body.contains(
        "<url><loc>https://aitoonic.com/s/chat%20gpt%20%26%20images</loc><lastmod>2024-03-01</lastmod><changefreq>weekly</changefreq><priority>0.6</priority></url>"
    ));
    let popular = body.find("chat%20gpt").unwrap();
    let rare = body.find("/s/rare").unwrap();
    assert_that(&(popular < rare)).is_true();
}

#[tokio::test]
async fn search_terms_keep_unreserved_marks() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .upsert_search_term(&search_term("what's (new)!*", 3, "2024-05-01"))
        .unwrap();

    let reply = get(store, "/sitemap/search.xml").await;

    assert!(
        reply
            .body
            .contains("<loc>https://aitoonic.com/s/what&apos;s%20(new)!*</loc>")
    );

    let mut entries = HashMap::new();
    read_sitemap(reply.body.as_bytes(), &mut entries);
    assert_that(&entries.contains_key("https://aitoonic.com/s/what's%20(new)!*")).is_true();
}

#[tokio::test]
async fn search_query_is_capped() {
    let store = Arc::new(FakeStore::default());
    let builder = SitemapBuilder::new(SITE_URL);

    builder.search_urls(store.as_ref()).await.unwrap();

    let query = store.query_for(Collection::SearchTerms).unwrap();
    assert_that(&query.limit).is_equal_to(Some(1000));
    assert_that(&query.order.map(|order| (order.column, order.descending)))
        .is_equal_to(Some(("count", true)));
}

#[tokio::test]
async fn empty_collection_renders_empty_urlset() {
    let reply = get(SqliteStore::in_memory().unwrap(), "/sitemap/categories.xml").await;

    assert_that(&reply.status).is_equal_to(StatusCode::OK);
    assert!(!reply.body.contains("<url>"));
    assert!(reply.body.contains("</urlset>"));
}

#[tokio::test]
async fn unknown_sitemap_is_not_found() {
    for uri in ["/sitemap/compare.xml", "/sitemap/tools.json", "/robots.txt"] {
        let reply = get(FakeStore::default(), uri).await;

        assert_that(&reply.status).is_equal_to(StatusCode::NOT_FOUND);
        assert_that(&reply.body.as_str()).is_equal_to("Not found");
        assert_common_headers(&reply);
    }
}

#[tokio::test]
async fn options_short_circuits() {
    let store = FakeStore::unreachable();
    let reply = request(store, Method::OPTIONS, "/sitemap/index.xml").await;

    assert_that(&reply.status).is_equal_to(StatusCode::OK);
    assert_that(&reply.body.is_empty()).is_true();
    assert_common_headers(&reply);
}

#[tokio::test]
async fn options_outside_sitemaps_short_circuits() {
    for uri in ["/sitemap", "/sitemap/", "/"] {
        let reply = request(FakeStore::unreachable(), Method::OPTIONS, uri).await;

        assert_that(&reply.status).is_equal_to(StatusCode::OK);
        assert_that(&reply.body.is_empty()).is_true();
        assert_common_headers(&reply);
    }
}

#[tokio::test]
async fn other_methods_are_rejected_with_headers() {
    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let store = FakeStore::default();
        let reply = request(store, method, "/sitemap/index.xml").await;

        assert_that(&reply.status).is_equal_to(StatusCode::METHOD_NOT_ALLOWED);
        assert_common_headers(&reply);
    }
}

#[tokio::test]
async fn failing_query_is_a_server_error() {
    let reply = get(FakeStore::failing(Collection::Tools), "/sitemap/tools.xml").await;

    assert_that(&reply.status).is_equal_to(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!reply.body.contains("<urlset"));
    assert_common_headers(&reply);
}

#[tokio::test]
async fn served_urlset_reads_back() {
    let reply = get(example_store(), "/sitemap/agents.xml").await;

    let mut entries = HashMap::new();
    let nested = read_sitemap(reply.body.as_bytes(), &mut entries);

    assert_that(&nested).has_length(0);
    assert_that(&entries.contains_key("https://aitoonic.com/ai-agent/contentgenius")).is_true();
}

#[tokio::test]
async fn export_writes_every_document() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

    let written = export_sitemaps(
        &SitemapBuilder::new(SITE_URL),
        &example_store(),
        dir.path(),
        now,
    )
    .await
    .unwrap();

    let names: Vec<String> = written
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert_that(&names).is_equal_to(
        ["index", "main", "tools", "categories", "agents", "search"]
            .iter()
            .map(|name| format!("{name}.xml"))
            .collect::<Vec<_>>(),
    );

    let index = std::fs::read_to_string(dir.path().join("index.xml")).unwrap();
    assert!(index.contains("<lastmod>2025-01-02T03:04:05.000Z</lastmod>"));
}

#[tokio::test]
async fn export_stops_on_failure() {
    let dir = tempfile::tempdir().unwrap();

    let result = export_sitemaps(
        &SitemapBuilder::new(SITE_URL),
        &FakeStore::failing(Collection::Agents),
        dir.path(),
        Utc::now(),
    )
    .await;

    assert!(result.is_err());
    assert!(!dir.path().join("agents.xml").exists());
}
