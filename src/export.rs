//! The export module writes the sitemap documents to disk, for hosts that
//! serve them as static files rather than through the live service.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sitemap::{SitemapBuilder, SitemapKind};
use crate::store::ContentStore;

/// Writes `index.xml` and every child sitemap into `output_dir`, replacing
/// existing files. Stops at the first document that cannot be built.
///
/// # Arguments
///
/// * `builder` - Sitemap builder for the public site URL
/// * `store` - Content store to read entities from
/// * `output_dir` - Directory the XML files are written to
/// * `now` - Timestamp for the index `lastmod` entries
///
/// # Returns
///
/// Returns the paths written, index first.
///
/// # Errors
///
/// Returns an error if:
/// * A store query fails
/// * The directory or a file cannot be written
pub async fn export_sitemaps(
    builder: &SitemapBuilder,
    store: &dyn ContentStore,
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(SitemapKind::CHILDREN.len() + 1);

    for kind in std::iter::once(SitemapKind::Index).chain(SitemapKind::CHILDREN) {
        let xml = builder
            .build(kind, store, now)
            .await
            .with_context(|| format!("Failed to build {} sitemap", kind.name()))?;

        let path = output_dir.join(kind.file_name());
        fs::write(&path, xml).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    info!("Exported {} sitemaps to {}", written.len(), output_dir.display());
    Ok(written)
}
