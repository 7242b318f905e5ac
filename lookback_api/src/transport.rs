//! The request/response exchange used by [`Client`](crate::Client).
//!
//! The client never touches the network itself. It hands a fully built
//! [`HttpRequest`] to a [`Transport`] and interprets the returned
//! [`HttpResponse`]. [`ReqwestTransport`] is the default implementation.

use std::future::Future;
use std::time::Duration;

pub use reqwest::Method;
use url::Url;

/// Failure raised by a transport. Passed through to callers unchanged.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Request timeout for the default transport.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully built request, ready to send.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Status code and raw body of a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs a single request/response exchange.
///
/// Implementations own connection handling, TLS and any socket-level
/// retries. A returned error ends the query that issued the request.
pub trait Transport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// [`Transport`] backed by `reqwest`.
///
/// Builds a fresh `reqwest::Client` with a 30-second timeout for each request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let timeout = self.timeout;
        async move {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| {
                    tracing::error!("Failed to build HTTP client: {}", e);
                    e
                })?;

            let mut builder = client.request(request.method, request.url);
            for (name, value) in request.headers {
                builder = builder.header(name, value);
            }

            let resp = builder.body(request.body).send().await.map_err(|e| {
                tracing::error!("Failed to send request: {}", e);
                e
            })?;

            let status = resp.status().as_u16();
            let body = resp.bytes().await.map_err(|e| {
                tracing::error!("Failed to read response body: {}", e);
                e
            })?;

            Ok::<_, TransportError>(HttpResponse {
                status,
                body: body.to_vec(),
            })
        }
    }
}
