//! The routes module enumerates every page the prerenderer should render and
//! writes the list as a JavaScript module for the static-site build.

use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::constants::{ROUTES_EXPORT_NAME, STATIC_PAGES, TOOL_ROUTE_LIMIT};
use crate::entities::AgentStatus;
use crate::slug::to_slug;
use crate::store::{ContentStore, Query, StoreError};

/// The fixed page paths, in the order they lead every route list.
pub fn fallback_routes() -> Vec<String> {
    STATIC_PAGES
        .iter()
        .map(|page| page.path.to_owned())
        .collect()
}

/// Enumerates all routes from `store`: static pages, then categories, tools
/// (first [`TOOL_ROUTE_LIMIT`] by name) and active agents, each by name.
///
/// # Errors
///
/// Returns the first store error raised by any of the three queries.
pub async fn try_generate_routes(store: &dyn ContentStore) -> Result<Vec<String>, StoreError> {
    let categories_query = Query::new().select(&["name"]).order_asc("name");
    let tools_query = Query::new()
        .select(&["name"])
        .order_asc("name")
        .limit(TOOL_ROUTE_LIMIT);
    let agents_query = Query::new()
        .select(&["name"])
        .eq("status", AgentStatus::Active.as_str())
        .order_asc("name");

    let (categories, tools, agents) = tokio::try_join!(
        store.categories(&categories_query),
        store.tools(&tools_query),
        store.agents(&agents_query),
    )?;

    let mut routes = fallback_routes();
    routes.reserve(categories.len() + tools.len() + agents.len());
    routes.extend(
        categories
            .iter()
            .map(|category| format!("/category/{}", to_slug(&category.name))),
    );
    routes.extend(
        tools
            .iter()
            .take(TOOL_ROUTE_LIMIT)
            .map(|tool| format!("/ai/{}", to_slug(&tool.name))),
    );
    routes.extend(
        agents
            .iter()
            .map(|agent| format!("/ai-agent/{}", to_slug(&agent.name))),
    );

    info!(
        "Generated {} routes ({} categories, {} tools, {} agents)",
        routes.len(),
        categories.len(),
        tools.len().min(TOOL_ROUTE_LIMIT),
        agents.len()
    );

    Ok(routes)
}

/// Like [`try_generate_routes`], but never fails: when the store cannot be
/// read the static page list is returned instead.
pub async fn generate_static_routes(store: &dyn ContentStore) -> Vec<String> {
    match try_generate_routes(store).await {
        Ok(routes) => routes,
        Err(err) => {
            warn!("Falling back to static routes: {err}");
            fallback_routes()
        }
    }
}

/// Writes `routes` as `export const routes = [...];` to `output_path`,
/// replacing any previous content.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_routes_module(output_path: &Path, routes: &[String]) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(output_path)
        .with_context(|| format!("Failed to open {}", output_path.display()))?;

    file.write_all(
        format!(
            "// Generated by aitoonic-sitemap. Do not edit.\nexport const {ROUTES_EXPORT_NAME} = {};\n",
            serde_json::to_string_pretty(routes)?
        )
        .as_bytes(),
    )?;

    Ok(())
}

/// Reads the route list back out of a module written by [`write_routes_module`].
///
/// # Errors
///
/// Returns an error if the export is missing or its array is not valid JSON.
pub fn parse_routes_module(source: &str) -> Result<Vec<String>> {
    let declaration = format!("export const {ROUTES_EXPORT_NAME} =");
    let start = source
        .find(&declaration)
        .context("Route export not found")?
        + declaration.len();
    let body = source
        .get(start..)
        .context("Route export is empty")?
        .trim()
        .trim_end_matches(';');

    serde_json::from_str(body).context("Route export is not a string array")
}

/// Generates routes from `store` and persists them to `output_path`.
/// Store failures degrade to the static list, only write failures are errors.
///
/// # Errors
///
/// Returns an error if the module cannot be written.
pub async fn build_prerender_routes(store: &dyn ContentStore, output_path: &Path) -> Result<Vec<String>> {
    let routes = generate_static_routes(store).await;
    write_routes_module(output_path, &routes)?;

    info!("Wrote {} routes to {}", routes.len(), output_path.display());
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_the_ten_static_pages() {
        let routes = fallback_routes();

        assert_eq!(routes.len(), 10);
        assert_eq!(routes.first().map(String::as_str), Some("/"));
        assert!(routes.contains(&"/privacy".to_owned()));
    }

    #[test]
    fn module_round_trips() {
        let routes = vec!["/".to_owned(), "/ai/gpt-writer".to_owned()];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/prerender-routes.js");

        write_routes_module(&path, &routes).unwrap();
        let source = fs::read_to_string(&path).unwrap();

        assert!(source.contains("export const routes = ["));
        assert_eq!(parse_routes_module(&source).unwrap(), routes);
    }

    #[test]
    fn rewrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.js");

        write_routes_module(&path, &fallback_routes()).unwrap();
        write_routes_module(&path, &["/".to_owned()]).unwrap();

        let source = fs::read_to_string(&path).unwrap();
        assert_eq!(parse_routes_module(&source).unwrap(), vec!["/".to_owned()]);
    }

    #[test]
    fn rejects_foreign_modules() {
        assert!(parse_routes_module("export default {}").is_err());
        assert!(parse_routes_module("export const routes = [1, 2];").is_err());
    }
}
