//! Intercepted request model.

use axum::{
    body::Bytes,
    http::{HeaderMap, Method},
};
use url::Url;

use crate::cache::RequestKey;

// == Request Mode ==
/// How the client issued the request, as reported by fetch metadata headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level page load
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
}

impl RequestMode {
    /// Reads `Sec-Fetch-Mode`, falling back to `Sec-Fetch-Dest: document`
    /// for clients that only send the destination.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_ascii_lowercase)
        };

        match header("sec-fetch-mode").as_deref() {
            Some("navigate") => RequestMode::Navigate,
            Some("cors") => RequestMode::Cors,
            Some("no-cors") => RequestMode::NoCors,
            Some("same-origin") => RequestMode::SameOrigin,
            _ if header("sec-fetch-dest").as_deref() == Some("document") => RequestMode::Navigate,
            _ => RequestMode::SameOrigin,
        }
    }
}

// == Proxy Request ==
/// A fully buffered request travelling through the proxy.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub mode: RequestMode,
}

impl ProxyRequest {
    /// Plain GET, as issued by the installer for manifest entries.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            mode: RequestMode::NoCors,
        }
    }

    /// GET issued as a top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::from_url(&self.url)
    }

    /// Returns an independent copy for a second consumer; see
    /// [`ResponseSnapshot::snapshot`](crate::cache::ResponseSnapshot::snapshot).
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Only GET responses may be stored.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET
    }

    /// Navigation mode decides; the `.html` extension is only a fallback for
    /// clients that send no fetch metadata.
    pub fn is_document(&self) -> bool {
        if self.mode == RequestMode::Navigate {
            return true;
        }
        let path = self.url.path().to_ascii_lowercase();
        path.ends_with(".html") || path.ends_with(".htm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_mode_from_sec_fetch_mode() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        assert_eq!(RequestMode::from_headers(&headers), RequestMode::Navigate);

        headers.insert("sec-fetch-mode", HeaderValue::from_static("no-cors"));
        assert_eq!(RequestMode::from_headers(&headers), RequestMode::NoCors);
    }

    #[test]
    fn test_mode_from_document_destination() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        assert_eq!(RequestMode::from_headers(&headers), RequestMode::Navigate);
    }

    #[test]
    fn test_mode_defaults_to_same_origin() {
        assert_eq!(RequestMode::from_headers(&HeaderMap::new()), RequestMode::SameOrigin);
    }

    #[test]
    fn test_navigation_is_document_regardless_of_path() {
        let request = ProxyRequest::navigate(url("http://localhost/app/"));
        assert!(request.is_document());
    }

    #[test]
    fn test_html_extension_is_document() {
        let request = ProxyRequest::get(url("http://localhost/app/product-manager.html"));
        assert!(request.is_document());
    }

    #[test]
    fn test_html_substring_elsewhere_is_not_document() {
        let request = ProxyRequest::get(url("http://localhost/app/.html-assets/logo.png"));
        assert!(!request.is_document());

        let request = ProxyRequest::get(url("http://localhost/app/view?page=a.html"));
        assert!(!request.is_document());
    }

    #[test]
    fn test_only_get_is_cacheable() {
        let mut request = ProxyRequest::get(url("http://localhost/app/"));
        assert!(request.is_cacheable_method());
        request.method = Method::POST;
        assert!(!request.is_cacheable_method());
    }
}
