//! Cache Entry Module
//!
//! Defines the request identity and the immutable response snapshot stored
//! against it.

use std::fmt;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

// == Request Key ==
/// Identity of a cached request: its canonical absolute address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey(String);

impl RequestKey {
    /// Builds the identity for a URL. Fragments never reach the network, so
    /// they are not part of the identity either.
    pub fn from_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable, filesystem-safe digest of the identity.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Response Kind ==
/// Where a response came from, as far as its readability is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response; status and body are fully visible
    Basic,
    /// Cross-origin response that passed a CORS check
    Cors,
    /// Cross-origin response whose status and body cannot be inspected
    Opaque,
    /// Synthetic error response
    Error,
}

// == Response Snapshot ==
/// Immutable copy of a response's status, headers and body.
///
/// A snapshot is never mutated after construction; a cache update replaces
/// the whole snapshot. The body is reference counted, so [`snapshot`]
/// hands out independent copies without re-reading anything.
///
/// [`snapshot`]: ResponseSnapshot::snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    kind: ResponseKind,
    redirected: bool,
    created_at: DateTime<Utc>,
}

impl ResponseSnapshot {
    // == Constructor ==
    /// Creates a basic, non-redirected snapshot.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            kind: ResponseKind::Basic,
            redirected: false,
            created_at: Utc::now(),
        }
    }

    /// Plain-text 200 response used when neither cache nor network answers.
    pub fn offline_notice(text: &str) -> Self {
        Self::new(
            200,
            vec![(
                header::CONTENT_TYPE.as_str().to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            Bytes::copy_from_slice(text.as_bytes()),
        )
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_redirected(mut self, redirected: bool) -> Self {
        self.redirected = redirected;
        self
    }

    /// Restores a snapshot exactly as it was taken, timestamp included.
    pub(crate) fn restore(
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
        kind: ResponseKind,
        redirected: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            kind,
            redirected,
            created_at,
        }
    }

    // == Snapshot ==
    /// Returns an independent copy of this response.
    ///
    /// Each consumer (the cache writer, the caller) must take its own copy
    /// before either one starts consuming; a copy handed to one consumer is
    /// never handed to another.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    // == Accessors ==
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn redirected(&self) -> bool {
        self.redirected
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    // == Cacheable ==
    /// Whether the cache-first path may store this response: exactly 200,
    /// same-origin, and not the product of a redirect.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic && !self.redirected
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ResponseSnapshot {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            // Framing is recomputed for the buffered body
            if is_hop_by_hop(name) || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        response
    }
}

/// Connection-scoped headers that must not be forwarded or replayed.
pub fn is_hop_by_hop(name: &str) -> bool {
    const HOP_BY_HOP: [&str; 8] = [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
    ];
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}
