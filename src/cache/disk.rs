//! Disk Cache Storage
//!
//! Keeps generations on disk so the cached application shell survives a
//! restart. Layout:
//!
//! ```text
//! <root>/<hex(generation name)>/<sha256(key)>.entry
//! ```
//!
//! An entry file is one line of JSON metadata, a newline, then the raw body.
//! Publishing it is a single rename, so readers and concurrent writers only
//! ever see whole snapshots.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::cache::{CacheStorage, RequestKey, ResponseKind, ResponseSnapshot};
use crate::error::{ProxyError, Result};

/// File extension of published entries.
const ENTRY_EXTENSION: &str = "entry";

/// Everything about a snapshot except its body.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMeta {
    key: String,
    status: u16,
    headers: Vec<(String, String)>,
    kind: ResponseKind,
    redirected: bool,
    created_at: DateTime<Utc>,
}

// == Disk Cache Storage ==
/// File-backed [`CacheStorage`].
#[derive(Debug)]
pub struct DiskCacheStorage {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskCacheStorage {
    /// Uses `root` as the storage area, creating it if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Disk cache storage ready");
        Ok(Self {
            root,
            tmp_counter: AtomicU64::new(0),
        })
    }

    fn generation_dir(&self, name: &str) -> PathBuf {
        self.root.join(hex::encode(name.as_bytes()))
    }

    fn entry_path(&self, name: &str, key: &RequestKey) -> PathBuf {
        self.generation_dir(name)
            .join(format!("{}.{}", key.digest(), ENTRY_EXTENSION))
    }

    /// Writes through a temporary file so a reader never sees a torn file.
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), n));
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<()> {
        fs::create_dir_all(self.generation_dir(name)).await?;
        Ok(())
    }

    async fn match_request(
        &self,
        name: &str,
        key: &RequestKey,
    ) -> Result<Option<ResponseSnapshot>> {
        let raw = match fs::read(self.entry_path(name, key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (meta, body) = decode_entry(raw)?;
        if meta.key != key.as_str() {
            return Err(ProxyError::Storage(format!(
                "digest collision for {} in generation {}",
                key, name
            )));
        }

        Ok(Some(ResponseSnapshot::restore(
            meta.status,
            meta.headers,
            body,
            meta.kind,
            meta.redirected,
            meta.created_at,
        )))
    }

    async fn put(&self, name: &str, key: &RequestKey, response: ResponseSnapshot) -> Result<()> {
        fs::create_dir_all(self.generation_dir(name)).await?;

        let meta = SnapshotMeta {
            key: key.as_str().to_string(),
            status: response.status(),
            headers: response.headers().to_vec(),
            kind: response.kind(),
            redirected: response.redirected(),
            created_at: response.created_at(),
        };

        let mut contents = serde_json::to_vec(&meta)?;
        contents.push(b'\n');
        contents.extend_from_slice(response.body());

        self.write_atomic(&self.entry_path(name, key), &contents).await
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_dir_all(self.generation_dir(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let decoded = file_name
                .to_str()
                .and_then(|s| hex::decode(s).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok());
            match decoded {
                Some(name) => names.push(name),
                None => warn!(entry = ?file_name, "Ignoring foreign directory in cache root"),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn entry_count(&self, name: &str) -> Result<usize> {
        let mut dir = match fs::read_dir(self.generation_dir(name)).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut count = 0;
        while let Some(entry) = dir.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Splits an entry file into its metadata line and body.
fn decode_entry(raw: Vec<u8>) -> Result<(SnapshotMeta, Bytes)> {
    // Compact JSON never contains a raw newline
    let split = raw
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| ProxyError::Storage("entry file without metadata line".to_string()))?;
    let meta: SnapshotMeta = serde_json::from_slice(&raw[..split])?;
    let body = Bytes::from(raw).slice(split + 1..);
    Ok((meta, body))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use url::Url;

    fn key(path: &str) -> RequestKey {
        RequestKey::from_url(&Url::parse("http://localhost").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let response = ResponseSnapshot::new(
            200,
            vec![("content-type".into(), "application/json".into())],
            r#"{"name":"shell"}"#,
        );

        {
            let storage = DiskCacheStorage::new(dir.path()).await.unwrap();
            storage
                .put("app-v1", &key("/app/manifest.json"), response.snapshot())
                .await
                .unwrap();
        }

        let storage = DiskCacheStorage::new(dir.path()).await.unwrap();
        let found = storage
            .match_request("app-v1", &key("/app/manifest.json"))
            .await
            .unwrap();
        assert_eq!(found, Some(response));
    }

    #[tokio::test]
    async fn test_keys_round_trip_generation_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path()).await.unwrap();
        storage.open("app-v2").await.unwrap();
        storage.open("other app/v1").await.unwrap();

        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["app-v2".to_string(), "other app/v1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path()).await.unwrap();

        assert!(storage.match_request("app-v1", &key("/app/")).await.unwrap().is_none());
        assert_eq!(storage.entry_count("app-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_body_with_newlines_survives() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path()).await.unwrap();
        let body = "line one\nline two\n\n{\"json\": true}\n";

        storage
            .put("app-v1", &key("/app/"), ResponseSnapshot::new(200, vec![], body))
            .await
            .unwrap();

        let found = storage.match_request("app-v1", &key("/app/")).await.unwrap().unwrap();
        assert_eq!(found.body().as_ref(), body.as_bytes());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_never_mix_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(DiskCacheStorage::new(dir.path()).await.unwrap());
        let target = key("/app/app.js");

        for round in 0..50 {
            let writers: Vec<_> = (0..4)
                .map(|writer| {
                    let storage = storage.clone();
                    let target = target.clone();
                    tokio::spawn(async move {
                        let tag = format!("{}-{}", round, writer);
                        let response =
                            ResponseSnapshot::new(200, vec![("x-tag".into(), tag.clone())], tag);
                        storage.put("app-v1", &target, response).await.unwrap();
                    })
                })
                .collect();

            // Readers racing the writers see a whole snapshot or nothing
            let seen = storage.match_request("app-v1", &target).await.unwrap();
            if let Some(found) = seen {
                assert_eq!(found.header("x-tag").unwrap().as_bytes(), found.body().as_ref());
            }

            for writer in writers {
                writer.await.unwrap();
            }

            let found = storage.match_request("app-v1", &target).await.unwrap().unwrap();
            assert_eq!(
                found.header("x-tag").unwrap().as_bytes(),
                found.body().as_ref(),
                "headers and body come from different writes in round {}",
                round
            );
        }
        assert_eq!(storage.entry_count("app-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path()).await.unwrap();
        storage
            .put("app-v1", &key("/app/a.css"), ResponseSnapshot::new(200, vec![], "a"))
            .await
            .unwrap();
        storage
            .put("app-v1", &key("/app/b.css"), ResponseSnapshot::new(200, vec![], "b"))
            .await
            .unwrap();
        assert_eq!(storage.entry_count("app-v1").await.unwrap(), 2);

        assert!(storage.delete("app-v1").await.unwrap());
        assert!(!storage.delete("app-v1").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
