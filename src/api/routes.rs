//! API Routes
//!
//! Mounts the admin endpoints under `/__offline` and hands everything else
//! to the proxy handler.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    activate_handler, generations_handler, health_handler, proxy_handler, stats_handler, AppState,
};

/// Path prefix reserved for the admin API; never forwarded upstream.
pub const ADMIN_PREFIX: &str = "/__offline";

/// Creates the main router.
///
/// # Endpoints
/// - `GET /__offline/health` - Lifecycle state and controlling generation
/// - `GET /__offline/stats` - Interceptor statistics
/// - `GET /__offline/generations` - Generations in this namespace
/// - `POST /__offline/activate` - Re-run activation
/// - anything else - intercepted and proxied
///
/// # Middleware
/// - CORS on the admin API only; proxied responses keep upstream headers
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/generations", get(generations_handler))
        .route("/activate", post(activate_handler))
        .layer(cors);

    Router::new()
        .nest(ADMIN_PREFIX, admin)
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
