//! API Module
//!
//! The proxy entry point and the admin REST API.
//!
//! # Endpoints
//! - `GET /__offline/health` - Health and lifecycle state
//! - `GET /__offline/stats` - Interceptor statistics
//! - `GET /__offline/generations` - Generations in this namespace
//! - `POST /__offline/activate` - Re-run activation
//! - everything else - proxied through the lifecycle controller

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_router, ADMIN_PREFIX};
