//! Lifecycle Task
//!
//! Runs install and activation in the background so the listener can accept
//! (pass-through) traffic while the generation is still being populated.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::lifecycle::LifecycleController;

/// Spawns the install → skip waiting → activate sequence.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_lifecycle_task(state.controller.clone());
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_lifecycle_task(controller: Arc<LifecycleController>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let generation = controller.generations().current_generation_key();
        info!(generation = %generation, "Starting lifecycle");

        let (installed, activated) = controller.run().await;

        info!(
            generation = %generation,
            cached = installed.cached.len(),
            failed = installed.failed.len(),
            deleted = activated.deleted.len(),
            "Generation active"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStorage, MemoryCacheStorage, ResponseSnapshot};
    use crate::lifecycle::{GenerationManager, LifecycleState};
    use crate::manifest::ResourceManifest;
    use crate::testing::FakeNetwork;
    use url::Url;

    fn controller(storage: Arc<MemoryCacheStorage>) -> Arc<LifecycleController> {
        let network = Arc::new(FakeNetwork::new());
        network.respond("http://localhost/app/", ResponseSnapshot::new(200, vec![], "shell"));
        Arc::new(LifecycleController::new(
            GenerationManager::new("app-", "v3"),
            ResourceManifest::new(["./"]),
            storage,
            network,
            Url::parse("http://localhost/app/").unwrap(),
            "offline",
        ))
    }

    #[tokio::test]
    async fn test_lifecycle_task_activates_generation() {
        let storage = Arc::new(MemoryCacheStorage::new());
        storage.open("app-v2").await.unwrap();
        let controller = controller(storage.clone());
        let mut clients = controller.subscribe();

        let handle = spawn_lifecycle_task(controller.clone());
        clients.changed().await.unwrap();
        handle.await.unwrap();

        assert_eq!(controller.state().await, LifecycleState::Active);
        assert_eq!(storage.keys().await.unwrap(), vec!["app-v3".to_string()]);
        assert_eq!(storage.entry_count("app-v3").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_task_can_be_aborted() {
        let controller = controller(Arc::new(MemoryCacheStorage::new()));

        let handle = spawn_lifecycle_task(controller);

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
