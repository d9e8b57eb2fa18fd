//! Lifecycle Controller
//!
//! Sequences install, take-over, cleanup of obsolete generations and client
//! claiming, and only exposes the interceptor once the generation is active.
//!
//! ```text
//! Installing -> Waiting -> Activating -> Active
//! ```

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use super::{GenerationManager, InstallReport, Installer};
use crate::cache::{CacheStats, CacheStorage, ResponseSnapshot};
use crate::error::Result;
use crate::interceptor::RequestInterceptor;
use crate::manifest::ResourceManifest;
use crate::network::{Network, ProxyRequest};

// == Lifecycle State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Populating the new generation
    Installing,
    /// Installed; older instances may still be in control
    Waiting,
    /// Removing obsolete generations
    Activating,
    /// Interceptor serves every request
    Active,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Installing => write!(f, "installing"),
            LifecycleState::Waiting => write!(f, "waiting"),
            LifecycleState::Activating => write!(f, "activating"),
            LifecycleState::Active => write!(f, "active"),
        }
    }
}

/// Outcome of one activation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Obsolete generations that were removed
    pub deleted: Vec<String>,
    /// Obsolete generations that could not be removed, with the reason
    pub failed: Vec<(String, String)>,
}

// == Lifecycle Controller ==
pub struct LifecycleController {
    generations: GenerationManager,
    manifest: ResourceManifest,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    installer: Installer,
    interceptor: RequestInterceptor,
    state: RwLock<LifecycleState>,
    /// Generation currently controlling clients; `None` until first claim
    clients: watch::Sender<Option<String>>,
}

impl LifecycleController {
    /// # Arguments
    /// * `generations` - Namespace and current version
    /// * `manifest` - Resources to pre-cache on install
    /// * `storage` - Shared generation store
    /// * `network` - Live fetcher
    /// * `base` - Location manifest entries are relative to
    /// * `offline_notice` - Body of the last-resort response
    pub fn new(
        generations: GenerationManager,
        manifest: ResourceManifest,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        base: Url,
        offline_notice: impl Into<String>,
    ) -> Self {
        let key = generations.current_generation_key();
        let installer = Installer::new(storage.clone(), network.clone(), base);
        let interceptor =
            RequestInterceptor::new(storage.clone(), network.clone(), key, offline_notice);
        let (clients, _) = watch::channel(None);

        Self {
            generations,
            manifest,
            storage,
            network,
            installer,
            interceptor,
            state: RwLock::new(LifecycleState::Installing),
            clients,
        }
    }

    pub fn generations(&self) -> &GenerationManager {
        &self.generations
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Moves to `next` only from one of the `from` states.
    async fn transition(&self, from: &[LifecycleState], next: LifecycleState) {
        let mut state = self.state.write().await;
        let previous = *state;
        if previous == next {
            return;
        }
        if !from.contains(&previous) {
            debug!(state = %previous, to = %next, "Transition not allowed, state kept");
            return;
        }
        info!(from = %previous, to = %next, "Lifecycle transition");
        *state = next;
    }

    pub async fn stats(&self) -> CacheStats {
        self.interceptor.stats().await
    }

    // == Install ==
    /// Populates the current generation. Always completes.
    ///
    /// A first install ends in `Waiting`. Once activation has started the
    /// state never moves back; a later install only refreshes entries.
    pub async fn install(&self) -> InstallReport {
        self.transition(&[LifecycleState::Waiting], LifecycleState::Installing)
            .await;
        let report = self
            .installer
            .install(&self.generations.current_generation_key(), &self.manifest)
            .await;
        self.transition(&[LifecycleState::Installing], LifecycleState::Waiting)
            .await;
        report
    }

    // == Skip Waiting ==
    /// Moves straight from `Waiting` to `Activating` instead of waiting for
    /// older instances to be closed.
    pub async fn skip_waiting(&self) {
        if self.state().await == LifecycleState::Waiting {
            info!("Skipping wait, taking over immediately");
        }
        self.transition(&[LifecycleState::Waiting], LifecycleState::Activating)
            .await;
    }

    // == Activate ==
    /// Deletes every obsolete generation in the namespace, then claims the
    /// open clients. Deletions run independently; a failed one is logged
    /// and never blocks the claim.
    ///
    /// Only acts once install has completed and waiting was skipped
    /// (`Activating`), or again when already `Active`. Earlier calls leave
    /// the store and the clients untouched.
    pub async fn activate(&self) -> ActivationReport {
        let state = self.state().await;
        if !matches!(state, LifecycleState::Activating | LifecycleState::Active) {
            warn!(state = %state, "Activation requested before install completed, ignoring");
            return ActivationReport::default();
        }

        // Enumeration completes before any deletion is issued
        let all_keys = match self.storage.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate generations, skipping cleanup");
                Vec::new()
            }
        };
        let obsolete = self.generations.obsolete_generations(&all_keys);

        let deletions = obsolete.into_iter().map(|name| async move {
            info!(generation = %name, "Deleting obsolete generation");
            let outcome = self.storage.delete(&name).await;
            (name, outcome)
        });

        let mut report = ActivationReport::default();
        for (name, outcome) in join_all(deletions).await {
            match outcome {
                Ok(true) => report.deleted.push(name),
                Ok(false) => debug!(generation = %name, "Obsolete generation already gone"),
                Err(e) => {
                    warn!(generation = %name, error = %e, "Failed to delete obsolete generation");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        self.claim_clients();
        self.transition(&[LifecycleState::Activating], LifecycleState::Active)
            .await;
        report
    }

    // == Run ==
    /// Full sequence for a fresh start or a detected update.
    pub async fn run(&self) -> (InstallReport, ActivationReport) {
        let installed = self.install().await;
        self.skip_waiting().await;
        let activated = self.activate().await;
        (installed, activated)
    }

    // == Clients ==
    /// Takes control of every open client. Issued once per activation.
    pub fn claim_clients(&self) {
        let key = self.generations.current_generation_key();
        info!(generation = %key, "Claiming clients");
        self.clients.send_replace(Some(key));
    }

    /// Generation controlling clients, if any has claimed them.
    pub fn controlling(&self) -> Option<String> {
        self.clients.borrow().clone()
    }

    /// Notified on every claim.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.clients.subscribe()
    }

    // == Handle ==
    /// Routes a request: through the interceptor once this generation has
    /// claimed clients, straight to the network before that.
    pub async fn handle(&self, request: ProxyRequest) -> Result<ResponseSnapshot> {
        if self.controlling().as_deref() == Some(self.interceptor.generation_key()) {
            return Ok(self.interceptor.handle(request).await);
        }
        self.network.fetch(&request).await
    }
}
