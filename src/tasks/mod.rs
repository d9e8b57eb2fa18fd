//! Background Tasks Module
//!
//! Contains tasks that run alongside the server.
//!
//! # Tasks
//! - Lifecycle: installs the current generation, then activates it

mod lifecycle;

pub use lifecycle::spawn_lifecycle_task;
