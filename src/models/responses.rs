//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing admin response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::lifecycle::{ActivationReport, LifecycleState};

/// Response body for the health endpoint (GET /__offline/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current lifecycle state
    pub lifecycle: LifecycleState,
    /// Generation this instance serves from
    pub generation: String,
    /// Generation currently controlling clients, if any
    pub controlling: Option<String>,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(
        lifecycle: LifecycleState,
        generation: impl Into<String>,
        controlling: Option<String>,
    ) -> Self {
        Self {
            status: "healthy".to_string(),
            lifecycle,
            generation: generation.into(),
            controlling,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the stats endpoint (GET /__offline/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub network_fetches: u64,
    pub network_failures: u64,
    pub stored: u64,
    pub skipped: u64,
    pub offline_notices: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Entries held by the current generation
    pub entries: usize,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, entries: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            network_fetches: stats.network_fetches,
            network_failures: stats.network_failures,
            stored: stats.stored,
            skipped: stats.skipped,
            offline_notices: stats.offline_notices,
            hit_rate: stats.hit_rate(),
            entries,
        }
    }
}

/// Response body for the generations endpoint (GET /__offline/generations)
#[derive(Debug, Clone, Serialize)]
pub struct GenerationsResponse {
    /// Namespace prefix
    pub prefix: String,
    /// Current generation key
    pub current: String,
    /// Generations in this namespace, current included
    pub generations: Vec<String>,
    /// Number of generations belonging to other namespaces
    pub foreign: usize,
}

/// Response body for the activate endpoint (POST /__offline/activate)
#[derive(Debug, Clone, Serialize)]
pub struct ActivationResponse {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    pub lifecycle: LifecycleState,
}

impl ActivationResponse {
    pub fn new(report: ActivationReport, lifecycle: LifecycleState) -> Self {
        Self {
            deleted: report.deleted,
            failed: report.failed.into_iter().map(|(name, _)| name).collect(),
            lifecycle,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
