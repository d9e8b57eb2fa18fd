//! Test doubles for the network and storage seams.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cache::{CacheStorage, MemoryCacheStorage, RequestKey, ResponseSnapshot};
use crate::error::{ProxyError, Result};
use crate::network::{Network, ProxyRequest};

/// Scripted network: known URLs answer with a canned response, failed or
/// unknown URLs produce a transport error. Every call is counted.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Option<ResponseSnapshot>>>,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: ResponseSnapshot) {
        self.routes.lock().unwrap().insert(url.to_string(), Some(response));
    }

    pub fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), None);
    }

    /// Drops every route, simulating a lost connection.
    pub fn go_offline(&self) {
        self.routes.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ResponseSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let routes = self.routes.lock().unwrap();
        match routes.get(request.url.as_str()) {
            Some(Some(response)) => Ok(response.snapshot()),
            _ => Err(ProxyError::Network(format!("unreachable: {}", request.url))),
        }
    }
}

/// Memory storage whose `delete` fails for chosen generations, and whose
/// `keys` can list generations that are already gone.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryCacheStorage,
    undeletable: Mutex<HashSet<String>>,
    vanished: Mutex<HashSet<String>>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_delete(&self, name: &str) {
        self.undeletable.lock().unwrap().insert(name.to_string());
    }

    /// Lists `name` in `keys` without storing it, as if another activation
    /// deleted it after enumeration.
    pub fn list_vanished(&self, name: &str) {
        self.vanished.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, name: &str) -> Result<()> {
        self.inner.open(name).await
    }

    async fn match_request(
        &self,
        name: &str,
        key: &RequestKey,
    ) -> Result<Option<ResponseSnapshot>> {
        self.inner.match_request(name, key).await
    }

    async fn put(&self, name: &str, key: &RequestKey, response: ResponseSnapshot) -> Result<()> {
        self.inner.put(name, key, response).await
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let refused = self.undeletable.lock().unwrap().contains(name);
        if refused {
            return Err(ProxyError::Storage(format!("{} is locked", name)));
        }
        self.inner.delete(name).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.inner.keys().await?;
        keys.extend(self.vanished.lock().unwrap().iter().cloned());
        keys.sort();
        Ok(keys)
    }

    async fn entry_count(&self, name: &str) -> Result<usize> {
        self.inner.entry_count(name).await
    }
}
