//! Response models for the admin API
//!
//! This module defines the DTOs (Data Transfer Objects) serialized into the
//! bodies of `/__offline` responses.

pub mod responses;

// Re-export commonly used types
pub use responses::{
    ActivationResponse, ErrorResponse, GenerationsResponse, HealthResponse, StatsResponse,
};
