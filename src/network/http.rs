//! Live network access through reqwest.

use async_trait::async_trait;
use reqwest::{redirect, Client};
use tracing::debug;
use url::Url;

use super::{Network, ProxyRequest};
use crate::cache::{is_hop_by_hop, ResponseKind, ResponseSnapshot};
use crate::error::Result;

// == HTTP Network ==
/// [`Network`] backed by a reqwest client.
///
/// Redirects are not followed: a 3xx goes back to the client as-is, which
/// also keeps it out of the cache. Each fetch is a single attempt.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: Client,
    /// Application origin; responses from anywhere else are opaque
    origin: Url,
}

impl HttpNetwork {
    pub fn new(origin: Url) -> Result<Self> {
        // The origin is reached directly, whatever proxy the environment names
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self { client, origin })
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ResponseSnapshot> {
        let mut headers = request.headers.clone();
        headers.remove(reqwest::header::HOST);
        headers.remove(reqwest::header::CONTENT_LENGTH);
        let hop_by_hop: Vec<_> = headers
            .keys()
            .filter(|name| is_hop_by_hop(name.as_str()))
            .cloned()
            .collect();
        for name in hop_by_hop {
            headers.remove(name);
        }

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let redirected = response.url() != &request.url;
        let kind = if self.is_same_origin(response.url()) {
            ResponseKind::Basic
        } else {
            ResponseKind::Opaque
        };
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        debug!(url = %request.url, status, ?kind, "Fetched from network");

        Ok(ResponseSnapshot::new(status, headers, body)
            .with_kind(kind)
            .with_redirected(redirected))
    }
}
