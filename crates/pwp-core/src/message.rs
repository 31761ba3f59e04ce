//! Request and response values passed through the worker.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ETAG, LOCATION};
use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::WorkerError;

/// Whether cookies and other credentials travel with an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Send credentials to the same origin only.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// An outbound read or write operation.
///
/// Requests are immutable once built; the `with_*` methods consume and
/// return a new value.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    referrer: Option<Url>,
    credentials: Credentials,
}

impl Request {
    /// Create a request with an empty body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            referrer: None,
            credentials: Credentials::default(),
        }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request with a body.
    pub fn post(url: Url, body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    /// Parse a locator and create a request for it.
    pub fn parse(method: Method, url: &str) -> Result<Self, WorkerError> {
        let url = Url::parse(url)
            .map_err(|e| WorkerError::InvalidRequest(format!("{}: {}", url, e)))?;
        Ok(Self::new(method, url))
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the referring page.
    pub fn with_referrer(mut self, referrer: Url) -> Self {
        self.referrer = Some(referrer);
        self
    }

    /// Set the credentials mode.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Copy of this request with a query parameter appended to its locator.
    pub fn with_query_param(&self, name: &str, value: &str) -> Self {
        let mut request = self.clone();
        request.url.query_pairs_mut().append_pair(name, value);
        request
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The locator used as the cache key.
    pub fn locator(&self) -> &str {
        self.url.as_str()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn referrer(&self) -> Option<&Url> {
        self.referrer.as_ref()
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<Cow<'_, str>> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Whether a query parameter is present, with any value.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.url.query_pairs().any(|(k, _)| k == name)
    }
}

/// The result of resolving a request.
///
/// The body is fully buffered, so cloning is cheap and the cache path and
/// the client path can each consume their own copy.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create an empty response with a status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Assemble a response from its parts.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Create a `200 OK` response with a body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// Create a `302 Found` response pointing at `location`.
    pub fn redirect(location: &str) -> Result<Self, WorkerError> {
        let value = HeaderValue::from_str(location)
            .map_err(|e| WorkerError::InvalidRequest(format!("bad location {}: {}", location, e)))?;
        Ok(Self::new(StatusCode::FOUND).with_header(LOCATION, value))
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the `ETag` identity marker.
    pub fn with_etag(self, etag: &str) -> Self {
        match HeaderValue::from_str(etag) {
            Ok(value) => self.with_header(ETAG, value),
            Err(_) => self,
        }
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// The identity marker (`ETag`), if the origin supplied one.
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|v| v.to_str().ok())
    }

    /// The `Location` header of a redirect.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }
}

/// Serializable form of a `Request`, used by durable queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequest {
    pub method: String,
    pub url: Url,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Base64-encoded body.
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<Url>,
    #[serde(default)]
    pub credentials: Credentials,
}

impl From<&Request> for StoredRequest {
    fn from(request: &Request) -> Self {
        Self {
            method: request.method.as_str().to_string(),
            url: request.url.clone(),
            headers: header_pairs(&request.headers),
            body: BASE64.encode(&request.body),
            referrer: request.referrer.clone(),
            credentials: request.credentials,
        }
    }
}

impl TryFrom<StoredRequest> for Request {
    type Error = WorkerError;

    fn try_from(stored: StoredRequest) -> Result<Self, Self::Error> {
        let method = Method::from_bytes(stored.method.as_bytes())
            .map_err(|e| WorkerError::InvalidRequest(format!("method {}: {}", stored.method, e)))?;
        let body = BASE64
            .decode(stored.body.as_bytes())
            .map_err(|e| WorkerError::InvalidRequest(format!("body: {}", e)))?;

        Ok(Self {
            method,
            url: stored.url,
            headers: header_map(&stored.headers)?,
            body: Bytes::from(body),
            referrer: stored.referrer,
            credentials: stored.credentials,
        })
    }
}

/// Flatten a header map into name/value pairs. Non-UTF-8 values are dropped.
pub fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// Rebuild a header map from name/value pairs.
pub fn header_map(pairs: &[(String, String)]) -> Result<HeaderMap, WorkerError> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| WorkerError::InvalidRequest(format!("header {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| WorkerError::InvalidRequest(format!("header {}: {}", name, e)))?;
        headers.append(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_query_param_lookup() {
        let request = Request::get(url("http://localhost/post?fragment=true&x=1"));
        assert_eq!(request.query_param("fragment").as_deref(), Some("true"));
        assert!(request.has_query_param("x"));
        assert!(!request.has_query_param("y"));
    }

    #[test]
    fn test_with_query_param_keeps_original() {
        let request = Request::get(url("http://localhost/hello/?p=2"));
        let fragment = request.with_query_param("fragment", "true");

        assert_eq!(fragment.locator(), "http://localhost/hello/?p=2&fragment=true");
        assert_eq!(request.locator(), "http://localhost/hello/?p=2");
    }

    #[test]
    fn test_response_etag() {
        let response = Response::ok("body").with_etag("\"v1\"");
        assert_eq!(response.etag(), Some("\"v1\""));
        assert!(Response::ok("body").etag().is_none());
    }

    #[test]
    fn test_redirect_sets_location() {
        let response = Response::redirect("/hello-world/").unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some("/hello-world/"));
    }

    #[test]
    fn test_stored_request_restores_all_parts() {
        let request = Request::post(url("http://localhost/wp-comments-post.php"), "comment=hi")
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .with_referrer(url("http://localhost/hello-world/"))
            .with_credentials(Credentials::Include);

        let stored = StoredRequest::from(&request);
        let json = serde_json::to_string(&stored).unwrap();
        let restored: StoredRequest = serde_json::from_str(&json).unwrap();
        let restored = Request::try_from(restored).unwrap();

        assert_eq!(*restored.method(), Method::POST);
        assert_eq!(restored.locator(), request.locator());
        assert_eq!(restored.body().as_ref(), b"comment=hi");
        assert_eq!(
            restored.headers().get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(restored.referrer().unwrap().path(), "/hello-world/");
        assert_eq!(restored.credentials(), Credentials::Include);
    }

    #[test]
    fn test_stored_request_rejects_bad_body() {
        let stored = StoredRequest {
            method: "POST".into(),
            url: url("http://localhost/"),
            headers: Vec::new(),
            body: "not base64!".into(),
            referrer: None,
            credentials: Credentials::Omit,
        };
        assert!(matches!(
            Request::try_from(stored),
            Err(WorkerError::InvalidRequest(_))
        ));
    }
}
