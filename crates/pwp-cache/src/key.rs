//! Cache key derivation.

use pwp_core::Request;
use serde::{Deserialize, Serialize};
use url::Url;

/// Key of a cache entry: the request locator without its `#fragment`.
///
/// Query parameters are part of the key, so `/?fragment=true` and `/` are
/// distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a locator.
    pub fn new(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url.into())
    }

    /// Key for a request.
    pub fn for_request(request: &Request) -> Self {
        Self::new(request.url())
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_key_drops_url_fragment() {
        let url = Url::parse("http://localhost/post/#comments").unwrap();
        assert_eq!(CacheKey::new(&url).as_str(), "http://localhost/post/");
    }

    #[test]
    fn test_key_keeps_query() {
        let request = Request::parse(Method::GET, "http://localhost/?fragment=true").unwrap();
        let plain = Request::parse(Method::GET, "http://localhost/").unwrap();
        assert_ne!(CacheKey::for_request(&request), CacheKey::for_request(&plain));
    }
}
