//! Shell Cache - An offline caching proxy
//!
//! Pre-caches an application shell into a versioned cache generation, serves
//! documents network-first and assets cache-first, and removes obsolete
//! generations of the same application on activation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod manifest;
pub mod models;
pub mod network;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_lifecycle_task;
