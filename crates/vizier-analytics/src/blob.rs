//! Blob storage for rendered charts.
//!
//! The store is an external collaborator: chart egress hands serialized chart
//! specs to it and receives a URL back. Store failure falls back to a fixed
//! placeholder URL rather than failing the whole response.

use std::fs;
use std::path::PathBuf;
use tracing::{debug, error};

use crate::viz::ChartSpec;

/// Opaque blob store: bytes in, URL out.
pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8], name: &str) -> anyhow::Result<String>;
}

/// Blob store writing under a local directory, returning `file://` URLs.
pub struct DirectoryBlobStore {
    root: PathBuf,
}

impl DirectoryBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for DirectoryBlobStore {
    fn put(&self, bytes: &[u8], name: &str) -> anyhow::Result<String> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        fs::write(&path, bytes)?;
        debug!("Stored blob at {:?}", path);
        Ok(format!("file://{}", path.display()))
    }
}

/// Store a chart spec, falling back to the placeholder URL on failure.
pub fn upload_chart(
    store: &dyn BlobStore,
    chart: &ChartSpec,
    name: &str,
    placeholder_url: &str,
) -> String {
    let payload = match serde_json::to_vec_pretty(chart) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to serialize chart for storage: {}", e);
            return placeholder_url.to_string();
        }
    };

    match store.put(&payload, name) {
        Ok(url) => url,
        Err(e) => {
            error!("Failed to store chart: {}", e);
            placeholder_url.to_string()
        }
    }
}
