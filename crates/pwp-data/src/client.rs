//! Network fetch seam and its HTTP implementation.

use async_trait::async_trait;
use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderValue;
use pwp_core::{Credentials, Request, Response, WorkerError};
use url::Url;

use crate::timeout::TimeoutConfig;

/// Error type for fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Body error: {0}")]
    Body(String),
}

impl From<FetchError> for WorkerError {
    fn from(err: FetchError) -> Self {
        WorkerError::NetworkUnreachable(err.to_string())
    }
}

/// The default network path.
///
/// Like the browser `fetch`, any HTTP status resolves to a `Response`;
/// only transport failures are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// reqwest-backed fetcher.
///
/// Credentials are modelled as a cookie header attached according to the
/// request's `Credentials` mode: always for `Include`, only for the
/// configured origin for `SameOrigin`, never for `Omit`.
pub struct HttpFetcher {
    client: reqwest::Client,
    cookie: Option<HeaderValue>,
    credential_origin: Option<Url>,
}

impl HttpFetcher {
    /// Create a fetcher with the given timeouts.
    pub fn new(timeout: &TimeoutConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.connect)
            .timeout(timeout.total)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            client,
            cookie: None,
            credential_origin: None,
        })
    }

    /// Cookie header sent with credentialed requests.
    pub fn with_cookie(mut self, cookie: HeaderValue) -> Self {
        self.cookie = Some(cookie);
        self
    }

    /// Origin considered "same origin" for `Credentials::SameOrigin`.
    pub fn with_credential_origin(mut self, origin: Url) -> Self {
        self.credential_origin = Some(origin);
        self
    }

    fn sends_credentials(&self, request: &Request) -> bool {
        match request.credentials() {
            Credentials::Include => true,
            Credentials::Omit => false,
            Credentials::SameOrigin => self
                .credential_origin
                .as_ref()
                .is_some_and(|o| o.origin() == request.url().origin()),
        }
    }

    fn outbound_headers(&self, request: &Request) -> http::HeaderMap {
        let mut headers = request.headers().clone();
        if self.sends_credentials(request) {
            if let Some(cookie) = &self.cookie {
                if !headers.contains_key(COOKIE) {
                    headers.insert(COOKIE, cookie.clone());
                }
            }
        } else {
            headers.remove(COOKIE);
            headers.remove(AUTHORIZATION);
        }
        headers
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Bodies are read in full; callers cache and stream whole responses.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let response = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(self.outbound_headers(request))
            .body(request.body().clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            status = status.as_u16(),
            bytes = body.len(),
            "fetched"
        );

        Ok(Response::from_parts(status, headers, body))
    }
}

fn classify_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if err.is_connect() {
        FetchError::Connection(err.to_string())
    } else {
        FetchError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&TimeoutConfig::default())
            .unwrap()
            .with_cookie(HeaderValue::from_static("wordpress_logged_in=abc"))
            .with_credential_origin(Url::parse("http://localhost:8080/").unwrap())
    }

    fn request(url: &str, credentials: Credentials) -> Request {
        Request::parse(Method::GET, url)
            .unwrap()
            .with_credentials(credentials)
    }

    #[test]
    fn test_include_attaches_cookie() {
        let headers = fetcher().outbound_headers(&request("http://cdn.test/a.js", Credentials::Include));
        assert_eq!(headers.get(COOKIE).unwrap(), "wordpress_logged_in=abc");
    }

    #[test]
    fn test_same_origin_only_for_configured_origin() {
        let fetcher = fetcher();
        let local = fetcher.outbound_headers(&request(
            "http://localhost:8080/header.php",
            Credentials::SameOrigin,
        ));
        let remote = fetcher.outbound_headers(&request("http://cdn.test/a.js", Credentials::SameOrigin));

        assert!(local.contains_key(COOKIE));
        assert!(!remote.contains_key(COOKIE));
    }

    #[test]
    fn test_omit_strips_credentials() {
        let request = request("http://localhost:8080/", Credentials::Omit)
            .with_header(COOKIE, HeaderValue::from_static("a=b"))
            .with_header(AUTHORIZATION, HeaderValue::from_static("Basic eA=="));
        let headers = fetcher().outbound_headers(&request);
        assert!(!headers.contains_key(COOKIE));
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_fetch_error_maps_to_network_unreachable() {
        let err: WorkerError = FetchError::Connection("refused".into()).into();
        assert!(matches!(err, WorkerError::NetworkUnreachable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let fetcher = HttpFetcher::new(&TimeoutConfig::from_total(std::time::Duration::from_secs(2))).unwrap();
        let result = fetcher
            .fetch(&request("http://127.0.0.1:9/", Credentials::Omit))
            .await;
        assert!(result.is_err());
    }
}
