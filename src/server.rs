//! HTTP surface of the sitemap service.
//!
//! `GET /sitemap/{name}.xml` renders one document per request straight from
//! the content store. Nothing is cached and failed queries are not retried.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use log::{error, info};
use tokio::net::TcpListener;

use crate::sitemap::{SitemapBuilder, SitemapKind};
use crate::store::ContentStore;

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const ALLOW_METHODS: &str = "GET, OPTIONS";

/// Shared state for sitemap handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub builder: SitemapBuilder,
}

impl AppState {
    pub fn new(store: Arc<dyn ContentStore>, site_url: &str) -> Self {
        Self {
            store,
            builder: SitemapBuilder::new(site_url),
        }
    }
}

/// Creates the sitemap router.
///
/// Methods other than GET and OPTIONS are answered with 405. OPTIONS is
/// accepted on any path.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/sitemap/{file}",
            get(sitemap)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(fallback)
        .with_state(Arc::new(state))
}

/// Headers every response carries.
fn with_headers(status: StatusCode, body: impl IntoResponse) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/xml")),
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOW_METHODS),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOW_HEADERS),
            ),
        ],
        body,
    )
        .into_response()
}

async fn preflight() -> Response {
    with_headers(StatusCode::OK, ())
}

async fn method_not_allowed() -> Response {
    with_headers(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        preflight().await
    } else {
        not_found()
    }
}

fn not_found() -> Response {
    with_headers(StatusCode::NOT_FOUND, "Not found")
}

async fn sitemap(State(state): State<Arc<AppState>>, Path(file): Path<String>) -> Response {
    let kind = match file.parse::<SitemapKind>() {
        Ok(kind) => kind,
        Err(_) => return not_found(),
    };

    match state
        .builder
        .build(kind, state.store.as_ref(), Utc::now())
        .await
    {
        Ok(xml) => with_headers(StatusCode::OK, xml),
        Err(err) => {
            error!("Error generating {} sitemap: {err}", kind.name());
            with_headers(StatusCode::INTERNAL_SERVER_ERROR, "Error generating sitemap")
        }
    }
}

/// Serves the sitemap router on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to bind {addr}"))?;

    info!(
        "Serving sitemaps for {} on http://{addr}/sitemap/index.xml",
        state.builder.site_url()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
        })
        .await
        .context("Sitemap server failed")
}
