//! Installer
//!
//! Populates a fresh generation from the resource manifest.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};
use url::Url;

use crate::cache::{CacheStorage, RequestKey};
use crate::error::{ProxyError, Result};
use crate::manifest::ResourceManifest;
use crate::network::{Network, ProxyRequest};

/// Outcome of one install pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Identities written into the generation
    pub cached: Vec<RequestKey>,
    /// Entries that could not be cached, with the reason
    pub failed: Vec<(String, String)>,
}

// == Installer ==
pub struct Installer {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    base: Url,
}

impl Installer {
    /// `base` is the location manifest entries are relative to.
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, base: Url) -> Self {
        Self {
            storage,
            network,
            base,
        }
    }

    // == Install ==
    /// Opens `generation_key` and attempts every manifest entry at once.
    ///
    /// Never fails as a whole: each entry succeeds or is logged and dropped
    /// on its own, and the report is returned once all of them settled.
    pub async fn install(&self, generation_key: &str, manifest: &ResourceManifest) -> InstallReport {
        if let Err(e) = self.storage.open(generation_key).await {
            warn!(generation = %generation_key, error = %e, "Failed to open generation");
        }
        info!(generation = %generation_key, entries = manifest.len(), "Cache opened for install");

        let mut report = InstallReport::default();

        // Entries that do not even resolve never reach the fan-out
        let (urls, rejected) = manifest.resolve(&self.base);
        report.failed.extend(
            rejected
                .into_iter()
                .map(|entry| (entry, "malformed address".to_string())),
        );

        let attempts = urls.into_iter().map(|url| async move {
            let outcome = self.cache_entry(generation_key, &url).await;
            (url, outcome)
        });

        for (url, outcome) in join_all(attempts).await {
            match outcome {
                Ok(key) => report.cached.push(key),
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to cache manifest entry");
                    report.failed.push((url.to_string(), e.to_string()));
                }
            }
        }

        info!(
            generation = %generation_key,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "Install finished"
        );
        report
    }

    /// Fetches one resource and stores it if the response is a success.
    async fn cache_entry(&self, generation_key: &str, url: &Url) -> Result<RequestKey> {
        let request = ProxyRequest::get(url.clone());
        let response = self.network.fetch(&request).await?;
        if !response.is_success() {
            return Err(ProxyError::Network(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let key = request.key();
        self.storage.put(generation_key, &key, response).await?;
        Ok(key)
    }
}
