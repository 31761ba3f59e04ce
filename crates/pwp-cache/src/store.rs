//! Cache store traits and the persisted entry format.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use http::StatusCode;
use pwp_core::{header_map, header_pairs, Response};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;

/// A keyed response store.
///
/// At most one entry per key; `put` overwrites. Concurrent writers race
/// and the last write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the response stored under `key`.
    async fn match_key(&self, key: &CacheKey) -> CacheResult<Option<Response>>;

    /// Store `response` under `key`, replacing any previous entry.
    async fn put(&self, key: &CacheKey, response: Response) -> CacheResult<()>;

    /// Remove the entry under `key`. Returns whether one existed.
    async fn delete(&self, key: &CacheKey) -> CacheResult<bool>;

    /// All keys currently stored.
    async fn keys(&self) -> CacheResult<Vec<CacheKey>>;
}

/// Opens named cache stores. Opening the same name twice yields the same entries.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheStore>>;

    /// Names of the caches that exist.
    async fn names(&self) -> CacheResult<Vec<String>>;
}

/// Persisted form of a cached response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Locator the entry is stored under.
    pub key: CacheKey,
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Base64-encoded body.
    pub body: String,
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Capture a response for storage.
    pub fn capture(key: &CacheKey, response: &Response) -> Self {
        Self {
            key: key.clone(),
            status: response.status().as_u16(),
            headers: header_pairs(response.headers()),
            body: BASE64.encode(response.body()),
            stored_at: Utc::now(),
        }
    }

    /// Rebuild the response.
    pub fn into_response(self) -> CacheResult<Response> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| CacheError::Serialization(format!("status {}: {}", self.status, e)))?;
        let headers =
            header_map(&self.headers).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let body = BASE64
            .decode(self.body.as_bytes())
            .map_err(|e| CacheError::Serialization(format!("body: {}", e)))?;
        Ok(Response::from_parts(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_cached_response_restores_response() {
        let key = CacheKey::new(&Url::parse("http://localhost/lazy.css").unwrap());
        let response = Response::ok("body { color: red }").with_etag("\"abc\"");

        let json = serde_json::to_string(&CachedResponse::capture(&key, &response)).unwrap();
        let restored: CachedResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.key, key);

        let restored = restored.into_response().unwrap();
        assert_eq!(restored.status(), StatusCode::OK);
        assert_eq!(restored.etag(), Some("\"abc\""));
        assert_eq!(restored.body().as_ref(), b"body { color: red }");
    }

    #[test]
    fn test_cached_response_rejects_bad_status() {
        let entry = CachedResponse {
            key: CacheKey::new(&Url::parse("http://localhost/").unwrap()),
            status: 1000,
            headers: Vec::new(),
            body: String::new(),
            stored_at: Utc::now(),
        };
        assert!(matches!(entry.into_response(), Err(CacheError::Serialization(_))));
    }
}
