//! Request Interceptor
//!
//! The per-request decision point. Classifies a request, picks a strategy,
//! runs it against the current generation, and always produces a response.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStorage, RequestKey, ResponseSnapshot};
use crate::network::{Network, ProxyRequest};

// == Strategy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Live fetch first; stored copy on failure
    NetworkFirst,
    /// Stored copy first; live fetch (and store) on a miss
    CacheFirst,
    /// Not storable: live fetch only
    NetworkOnly,
}

impl Strategy {
    /// Documents go network-first, other GETs cache-first, everything else
    /// bypasses the cache.
    pub fn classify(request: &ProxyRequest) -> Self {
        if !request.is_cacheable_method() {
            Strategy::NetworkOnly
        } else if request.is_document() {
            Strategy::NetworkFirst
        } else {
            Strategy::CacheFirst
        }
    }
}

// == Request Interceptor ==
pub struct RequestInterceptor {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    generation_key: String,
    offline_notice: String,
    stats: Mutex<CacheStats>,
}

impl RequestInterceptor {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        generation_key: impl Into<String>,
        offline_notice: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            network,
            generation_key: generation_key.into(),
            offline_notice: offline_notice.into(),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    pub fn generation_key(&self) -> &str {
        &self.generation_key
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.lock().await.clone()
    }

    // == Handle ==
    /// Answers a request. Never fails: the offline notice is the last resort.
    pub async fn handle(&self, request: ProxyRequest) -> ResponseSnapshot {
        let strategy = Strategy::classify(&request);
        debug!(method = %request.method, url = %request.url, ?strategy, "Intercepted request");

        match strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkOnly => self.network_only(request).await,
        }
    }

    async fn network_first(&self, request: ProxyRequest) -> ResponseSnapshot {
        let key = request.key();

        match self.fetch(&request).await {
            Some(response) => {
                if response.is_cacheable() {
                    // Copy taken before the caller gets the original
                    self.store(&key, response.snapshot()).await;
                } else {
                    self.stats.lock().await.record_skip();
                }
                response
            }
            None => match self.lookup(&key).await {
                Some(cached) => {
                    debug!(url = %key, "Network unavailable, serving stored document");
                    cached
                }
                None => self.offline().await,
            },
        }
    }

    async fn cache_first(&self, request: ProxyRequest) -> ResponseSnapshot {
        let key = request.key();

        if let Some(cached) = self.lookup(&key).await {
            return cached;
        }

        match self.fetch(&request).await {
            Some(response) => {
                if response.is_cacheable() {
                    self.store(&key, response.snapshot()).await;
                } else {
                    debug!(
                        url = %key,
                        status = response.status(),
                        kind = ?response.kind(),
                        redirected = response.redirected(),
                        "Response not eligible for caching"
                    );
                    self.stats.lock().await.record_skip();
                }
                response
            }
            None => self.offline().await,
        }
    }

    async fn network_only(&self, request: ProxyRequest) -> ResponseSnapshot {
        match self.fetch(&request).await {
            Some(response) => response,
            None => self.offline().await,
        }
    }

    // == Helpers ==
    /// Single live attempt; `None` on transport failure.
    async fn fetch(&self, request: &ProxyRequest) -> Option<ResponseSnapshot> {
        self.stats.lock().await.record_fetch();
        match self.network.fetch(request).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(url = %request.url, error = %e, "Network fetch failed");
                self.stats.lock().await.record_failure();
                None
            }
        }
    }

    /// Looks the identity up in the current generation. A storage error
    /// counts as a miss.
    async fn lookup(&self, key: &RequestKey) -> Option<ResponseSnapshot> {
        let found = match self.storage.match_request(&self.generation_key, key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(url = %key, error = %e, "Cache lookup failed");
                None
            }
        };

        let mut stats = self.stats.lock().await;
        if found.is_some() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
        found
    }

    /// Writes into the current generation. A failed write only costs the
    /// next request a network trip.
    async fn store(&self, key: &RequestKey, response: ResponseSnapshot) {
        match self.storage.put(&self.generation_key, key, response).await {
            Ok(()) => self.stats.lock().await.record_store(),
            Err(e) => warn!(url = %key, error = %e, "Cache write failed"),
        }
    }

    async fn offline(&self) -> ResponseSnapshot {
        self.stats.lock().await.record_offline();
        ResponseSnapshot::offline_notice(&self.offline_notice)
    }
}
