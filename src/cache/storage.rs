//! Cache Storage Module
//!
//! The named, generation-scoped store the proxy writes responses into. The
//! proxy holds no handle across operations: each call names the generation
//! it acts on.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{RequestKey, ResponseSnapshot};
use crate::error::Result;

// == Cache Storage Trait ==
/// Persistent key-value store of response snapshots, partitioned into named
/// generations.
///
/// Each single operation is atomic; nothing spans operations. Concurrent
/// writes to the same identity resolve last-write-wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens a generation, creating it empty if it does not exist yet.
    async fn open(&self, name: &str) -> Result<()>;

    /// Looks up a stored response. A missing generation is simply a miss.
    async fn match_request(&self, name: &str, key: &RequestKey)
        -> Result<Option<ResponseSnapshot>>;

    /// Stores a response, replacing any previous snapshot for the identity.
    /// The generation is created if needed.
    async fn put(&self, name: &str, key: &RequestKey, response: ResponseSnapshot) -> Result<()>;

    /// Deletes a whole generation. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Names of every generation in the store, across all namespaces.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Number of entries held by a generation (0 when absent).
    async fn entry_count(&self, name: &str) -> Result<usize>;
}

type Generation = HashMap<RequestKey, ResponseSnapshot>;

// == Memory Cache Storage ==
/// In-process storage, used when no cache directory is configured.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    generations: RwLock<BTreeMap<String, Generation>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<()> {
        let mut generations = self.generations.write().await;
        generations.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn match_request(
        &self,
        name: &str,
        key: &RequestKey,
    ) -> Result<Option<ResponseSnapshot>> {
        let generations = self.generations.read().await;
        Ok(generations
            .get(name)
            .and_then(|generation| generation.get(key))
            .map(ResponseSnapshot::snapshot))
    }

    async fn put(&self, name: &str, key: &RequestKey, response: ResponseSnapshot) -> Result<()> {
        let mut generations = self.generations.write().await;
        generations
            .entry(name.to_string())
            .or_default()
            .insert(key.clone(), response);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut generations = self.generations.write().await;
        Ok(generations.remove(name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let generations = self.generations.read().await;
        Ok(generations.keys().cloned().collect())
    }

    async fn entry_count(&self, name: &str) -> Result<usize> {
        let generations = self.generations.read().await;
        Ok(generations.get(name).map_or(0, HashMap::len))
    }
}
