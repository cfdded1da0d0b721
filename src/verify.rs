//! The verify module crawls a published sitemap the way a search engine
//! would, to check that what the service emits is discoverable.

use std::collections::HashMap;

use anyhow::{Context, Result};
use log::{debug, warn};
use sitemap::{
    reader::{SiteMapEntity, SiteMapReader},
    structs::{Location, UrlEntry},
};

/// Extracts URL entries from a sitemap.
///
/// This function takes a sitemap URL and returns a `HashMap` containing the URL entries found in the sitemap.
/// It processes the sitemap and any nested sitemaps recursively.
///
/// # Arguments
///
/// * `sitemap_url` - A string slice that holds the URL of the sitemap to be processed.
///
/// # Returns
///
/// A `Result` containing a `HashMap` with the URL entries if successful, or an error if any operation fails.
///
/// # Errors
///
/// This function will return an error if there is a problem fetching a sitemap or it answers with a
/// non-success status.
pub async fn extract_sitemap_url_entries(sitemap_url: &str) -> Result<HashMap<String, UrlEntry>> {
    let mut entries = HashMap::new();
    let mut sitemaps_to_process = vec![sitemap_url.to_string()];
    let client = reqwest::Client::new();

    while let Some(current_sitemap) = sitemaps_to_process.pop() {
        debug!("Reading {current_sitemap}");
        let response = client
            .get(&current_sitemap)
            .send()
            .await
            .with_context(|| format!("Unable to fetch {current_sitemap}"))?
            .error_for_status()?;
        let content = response.bytes().await?;

        sitemaps_to_process.extend(read_sitemap(&content, &mut entries));
    }

    Ok(entries)
}

/// Collects `<url>` entries from one document into `entries` and returns the
/// nested sitemap locations it references.
pub fn read_sitemap(content: &[u8], entries: &mut HashMap<String, UrlEntry>) -> Vec<String> {
    let mut nested = Vec::new();

    for entity in SiteMapReader::new(content) {
        match entity {
            SiteMapEntity::Url(url_entry) => {
                if let Location::Url(ref url) = url_entry.loc {
                    entries.insert(url.to_string(), url_entry);
                }
            }
            SiteMapEntity::SiteMap(sitemap_entry) => {
                if let Location::Url(ref url) = sitemap_entry.loc {
                    nested.push(url.to_string());
                }
            }
            SiteMapEntity::Err(e) => warn!("Skipping malformed sitemap entry: {e:?}"),
        }
    }

    nested
}
