//! Network Module
//!
//! The live-fetch side of the proxy.

mod http;
mod request;

use async_trait::async_trait;

use crate::cache::ResponseSnapshot;
use crate::error::Result;

pub use http::HttpNetwork;
pub use request::{ProxyRequest, RequestMode};

// == Network Trait ==
/// Performs a single live fetch.
///
/// `Err` means no response was produced at all (transport failure). An HTTP
/// error status is still an `Ok` response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ResponseSnapshot>;
}
