//! Responses with streamed bodies.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};

use crate::body::BodyStream;
use crate::error::ComposeError;

/// Content type of composed pages.
pub const HTML_UTF8: &str = "text/html; charset=utf-8";

/// A response whose body is produced while it is being read.
#[derive(Debug)]
pub struct StreamingResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BodyStream,
}

impl StreamingResponse {
    pub fn new(status: StatusCode, body: BodyStream) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// A `200 OK` HTML page.
    pub fn html(body: BodyStream) -> Self {
        let mut response = Self::new(StatusCode::OK, body);
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(HTML_UTF8));
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Split into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, BodyStream) {
        (self.status, self.headers, self.body)
    }

    pub fn into_body(self) -> BodyStream {
        self.body
    }

    /// Read the whole body.
    pub async fn collect(self) -> Result<Bytes, ComposeError> {
        self.body.collect_bytes().await
    }
}
