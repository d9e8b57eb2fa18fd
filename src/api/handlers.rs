//! API Handlers
//!
//! The catch-all proxy handler and the `/__offline` admin endpoints.

use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::{Request, State},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;
use url::Url;

use crate::cache::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::lifecycle::{GenerationManager, LifecycleController};
use crate::manifest::ResourceManifest;
use crate::models::{ActivationResponse, GenerationsResponse, HealthResponse, StatsResponse};
use crate::network::{HttpNetwork, Network, ProxyRequest, RequestMode};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle controller owning the interceptor
    pub controller: Arc<LifecycleController>,
    /// Upstream base location; request paths resolve against its origin
    pub base: Url,
    /// Largest request body accepted for forwarding
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(controller: LifecycleController, base: Url, max_body_bytes: usize) -> Self {
        Self {
            controller: Arc::new(controller),
            base,
            max_body_bytes,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Picks disk storage when a cache directory is configured, loads the
    /// manifest file if one is given, and talks to the upstream over HTTP.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let base = config.base_url()?;

        let storage: Arc<dyn CacheStorage> = match &config.cache_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "Using disk cache storage");
                Arc::new(DiskCacheStorage::new(dir).await?)
            }
            None => Arc::new(MemoryCacheStorage::new()),
        };

        let manifest = match &config.manifest_path {
            Some(path) => ResourceManifest::load(path).await?,
            None => ResourceManifest::default(),
        };

        let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(base.clone())?);

        let controller = LifecycleController::new(
            GenerationManager::new(&config.cache_prefix, &config.cache_version),
            manifest,
            storage,
            network,
            base.clone(),
            &config.offline_notice,
        );

        Ok(Self::new(controller, base, config.max_body_bytes))
    }

    /// Buffers an incoming request and resolves its address against the
    /// upstream origin. Absolute-form targets are kept as they are.
    pub async fn to_proxy_request(&self, request: Request) -> Result<ProxyRequest> {
        let (parts, body) = request.into_parts();

        let url = if parts.uri.scheme().is_some() {
            Url::parse(&parts.uri.to_string()).map_err(|e| {
                ProxyError::InvalidRequest(format!("bad target {}: {}", parts.uri, e))
            })?
        } else {
            // Path and query only: a leading `//` must not name another host
            let mut url = self.base.clone();
            url.set_path(parts.uri.path());
            url.set_query(parts.uri.query());
            url
        };

        let body = to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ProxyError::InvalidRequest(format!("unreadable body: {}", e)))?;

        Ok(ProxyRequest {
            mode: RequestMode::from_headers(&parts.headers),
            method: parts.method,
            url,
            headers: parts.headers,
            body,
        })
    }
}

/// Fallback handler: every request outside the admin prefix.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let request = state.to_proxy_request(request).await?;
    let response = state.controller.handle(request).await?;
    Ok(response.into_response())
}

/// Handler for GET /__offline/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let controller = &state.controller;
    Json(HealthResponse::healthy(
        controller.state().await,
        controller.generations().current_generation_key(),
        controller.controlling(),
    ))
}

/// Handler for GET /__offline/stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let controller = &state.controller;
    let stats = controller.stats().await;
    let entries = controller
        .storage()
        .entry_count(&controller.generations().current_generation_key())
        .await?;

    Ok(Json(StatsResponse::new(&stats, entries)))
}

/// Handler for GET /__offline/generations
pub async fn generations_handler(
    State(state): State<AppState>,
) -> Result<Json<GenerationsResponse>> {
    let generations = state.controller.generations();
    let all = state.controller.storage().keys().await?;
    let owned = generations.owned_generations(&all);

    Ok(Json(GenerationsResponse {
        prefix: generations.prefix().to_string(),
        current: generations.current_generation_key(),
        foreign: all.len() - owned.len(),
        generations: owned,
    }))
}

/// Handler for POST /__offline/activate
///
/// Re-runs activation; repeating it has no further effect on the store.
pub async fn activate_handler(State(state): State<AppState>) -> Json<ActivationResponse> {
    let report = state.controller.activate().await;
    Json(ActivationResponse::new(report, state.controller.state().await))
}
