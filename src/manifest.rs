//! Resource Manifest
//!
//! The externally supplied list of resources that make up the offline
//! application shell.

use std::path::Path;

use tracing::warn;
use url::Url;

use crate::error::{ProxyError, Result};

/// Resources pre-cached when no manifest file is configured.
const DEFAULT_ENTRIES: [&str; 5] = [
    "./",
    "./product-manager.html",
    "./manifest.json",
    "./icon-192.png",
    "./icon-512.png",
];

// == Resource Manifest ==
/// Ordered resource addresses, relative to the application base location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceManifest {
    entries: Vec<String>,
}

impl ResourceManifest {
    /// Builds a manifest, dropping blank entries.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(Into::into)
                .filter(|entry: &String| !entry.trim().is_empty())
                .collect(),
        }
    }

    /// Parses a JSON array of strings.
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<String> = serde_json::from_str(raw)
            .map_err(|e| ProxyError::Config(format!("invalid manifest: {}", e)))?;
        Ok(Self::new(entries))
    }

    /// Reads a JSON manifest file.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProxyError::Config(format!("cannot read manifest {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Resolve ==
    /// Resolves every entry against `base`, returning the resolved addresses
    /// and the entries that do not form a valid address. Rejected entries are
    /// logged here; callers treat them like any other failed entry.
    pub fn resolve(&self, base: &Url) -> (Vec<Url>, Vec<String>) {
        let mut resolved = Vec::with_capacity(self.entries.len());
        let mut rejected = Vec::new();
        for entry in &self.entries {
            match base.join(entry) {
                Ok(url) => resolved.push(url),
                Err(e) => {
                    warn!(entry = %entry, error = %e, "Skipping malformed manifest entry");
                    rejected.push(entry.clone());
                }
            }
        }
        (resolved, rejected)
    }
}

impl Default for ResourceManifest {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRIES)
    }
}
