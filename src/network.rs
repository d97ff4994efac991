//! Network capability used by the worker to reach the origin.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::{Error, Result};
use crate::http::{Request, Response};

/// Abstraction over outbound fetches.
///
/// An `Err` means no response arrived at all (offline, DNS, reset). HTTP
/// error statuses are returned as `Ok` responses.
#[async_trait]
pub trait Network: Send + Sync {
    /// Performs the request.
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Network implementation backed by `reqwest`, resolving origin-relative
/// URLs against a fixed origin.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: Url,
}

impl HttpNetwork {
    /// Creates a network bound to `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not a valid absolute URL or the
    /// HTTP client cannot be built.
    pub fn new(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin).map_err(|e| Error::Network(format!("{origin}: {e}")))?;
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, origin })
    }

    /// Returns the origin requests are resolved against.
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolves a request URL against the origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be joined onto the origin.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.origin
            .join(url)
            .map_err(|e| Error::Network(format!("{url}: {e}")))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let url = self.resolve(&request.url)?;
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_urls_against_origin() {
        let network = HttpNetwork::new("https://reports.example/").unwrap();
        assert_eq!(
            network.resolve("/static/app.js?v=1").unwrap().as_str(),
            "https://reports.example/static/app.js?v=1"
        );
        assert_eq!(
            network.resolve("https://cdn.example/x").unwrap().as_str(),
            "https://cdn.example/x"
        );
    }

    #[test]
    fn rejects_relative_origin() {
        assert!(matches!(
            HttpNetwork::new("/not-an-origin"),
            Err(Error::Network(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_origin_is_a_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let network = HttpNetwork::new("http://127.0.0.1:9/").unwrap();
        let err = network.fetch(&Request::get("/")).await.unwrap_err();
        assert!(err.is_network());
    }
}
