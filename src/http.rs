//! Request and response values passed between the worker and its capabilities.

use bytes::Bytes;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Request URL, either absolute or origin-relative.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Bytes>,
}

impl Request {
    /// Creates a GET request for `url`.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a request with the given method and no headers or body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a navigation request (one that accepts HTML).
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::get(url).with_accept("text/html,application/xhtml+xml,*/*;q=0.8")
    }

    /// Sets the `Accept` header.
    #[must_use]
    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.headers.insert(ACCEPT, HeaderValue::from_static(accept));
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns true if the `Accept` header mentions `text/html`.
    #[must_use]
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }

    /// Returns the path component of the URL, without query or fragment.
    #[must_use]
    pub fn path(&self) -> String {
        if let Ok(url) = Url::parse(&self.url) {
            return url.path().to_string();
        }
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }

    /// Returns the key this request is cached under.
    ///
    /// Relative URLs and absolute URLs on `origin` are keyed by path plus
    /// query, so `https://host/a?b` and `/a?b` share an entry. URLs on any
    /// other origin keep their full form and never collide with the app's.
    #[must_use]
    pub fn cache_key(&self, origin: &str) -> String {
        let Ok(mut url) = Url::parse(&self.url) else {
            let without_fragment = self.url.split('#').next().unwrap_or_default();
            return if without_fragment.starts_with('/') {
                without_fragment.to_string()
            } else {
                format!("/{without_fragment}")
            };
        };

        let same_origin = Url::parse(origin).is_ok_and(|o| o.origin() == url.origin());
        if !same_origin {
            url.set_fragment(None);
            return url.into();
        }
        match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        }
    }
}

/// A response, either from the network or from a cache generation.
///
/// Bodies are reference-counted, so cloning a response to store it in a
/// cache while also returning it is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl Response {
    /// Creates a response with the given status and body.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Creates a `200 OK` response.
    #[must_use]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://reports.example";

    #[test]
    fn cache_key_normalizes_same_origin_urls() {
        assert_eq!(
            Request::get("https://reports.example/static/app.js?v=3").cache_key(ORIGIN),
            "/static/app.js?v=3"
        );
        assert_eq!(
            Request::get("/static/app.js?v=3").cache_key(ORIGIN),
            "/static/app.js?v=3"
        );
        assert_eq!(Request::get("https://reports.example").cache_key(ORIGIN), "/");
        assert_eq!(Request::get("dashboard#top").cache_key(ORIGIN), "/dashboard");
    }

    #[test]
    fn cache_key_keeps_foreign_origins_apart() {
        assert_eq!(
            Request::get("https://cdn.other.example/").cache_key(ORIGIN),
            "https://cdn.other.example/"
        );
        assert_eq!(
            Request::get("https://cdn.other.example/lib.js?v=2#x").cache_key(ORIGIN),
            "https://cdn.other.example/lib.js?v=2"
        );
        // Same host, different scheme is a different origin.
        assert_eq!(
            Request::get("http://reports.example/").cache_key(ORIGIN),
            "http://reports.example/"
        );
        assert_ne!(
            Request::get("https://cdn.other.example/").cache_key(ORIGIN),
            Request::get("/").cache_key(ORIGIN)
        );
    }

    #[test]
    fn path_strips_query() {
        assert_eq!(Request::get("/api/reports?page=2").path(), "/api/reports");
        assert_eq!(
            Request::get("https://reports.example/uploads/a.pdf").path(),
            "/uploads/a.pdf"
        );
        assert_eq!(Request::get("dashboard#top").path(), "/dashboard");
    }

    #[test]
    fn accepts_html_reads_accept_header() {
        assert!(Request::navigate("/dashboard").accepts_html());
        assert!(!Request::get("/dashboard").accepts_html());
        assert!(
            !Request::get("/data")
                .with_accept("application/json")
                .accepts_html()
        );
    }

    #[test]
    fn success_statuses() {
        assert!(Response::ok("x").is_success());
        assert!(Response::new(StatusCode::NO_CONTENT, "").is_success());
        assert!(!Response::new(StatusCode::NOT_FOUND, "").is_success());
        assert!(!Response::new(StatusCode::INTERNAL_SERVER_ERROR, "").is_success());
    }
}
