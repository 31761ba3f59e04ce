//! Install-time bulk seeding.

use futures::future::try_join_all;
use pwp_core::{Credentials, Request};
use pwp_data::Fetcher;

use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;
use crate::store::CacheStore;

/// Fetch every request and store the responses.
///
/// All-or-nothing: if any fetch fails or returns a non-2xx status, nothing
/// is stored and the error names the first failing locator. Requests are
/// sent with credentials included.
pub async fn add_all(
    store: &dyn CacheStore,
    fetcher: &dyn Fetcher,
    requests: Vec<Request>,
) -> CacheResult<usize> {
    let fetches = requests.into_iter().map(|request| async move {
        let request = request.with_credentials(Credentials::Include);
        let response = fetcher.fetch(&request).await.map_err(|e| CacheError::Precache {
            url: request.locator().to_string(),
            reason: e.to_string(),
        })?;
        if !response.is_ok() {
            return Err(CacheError::Precache {
                url: request.locator().to_string(),
                reason: format!("status {}", response.status()),
            });
        }
        Ok((CacheKey::for_request(&request), response))
    });

    let responses = try_join_all(fetches).await?;
    let count = responses.len();
    for (key, response) in responses {
        store.put(&key, response).await?;
    }

    tracing::info!(entries = count, "precache complete");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCacheStore;
    use http::{Method, StatusCode};
    use pwp_core::Response;
    use pwp_data::ScriptedFetcher;

    fn get(url: &str) -> Request {
        Request::parse(Method::GET, url).unwrap()
    }

    #[tokio::test]
    async fn test_add_all_stores_every_response() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("http://localhost/lazy.css", Response::ok("css"));
        fetcher.respond("http://localhost/scripts/router.js", Response::ok("js"));
        let store = MemoryCacheStore::new();

        let count = add_all(
            &store,
            &fetcher,
            vec![get("http://localhost/lazy.css"), get("http://localhost/scripts/router.js")],
        )
        .await
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_add_all_is_all_or_nothing() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("http://localhost/lazy.css", Response::ok("css"));
        fetcher.respond(
            "http://localhost/missing.js",
            Response::new(StatusCode::NOT_FOUND),
        );
        let store = MemoryCacheStore::new();

        let err = add_all(
            &store,
            &fetcher,
            vec![get("http://localhost/lazy.css"), get("http://localhost/missing.js")],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CacheError::Precache { ref url, .. } if url == "http://localhost/missing.js"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_all_fails_when_offline() {
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let store = MemoryCacheStore::new();

        let result = add_all(&store, &fetcher, vec![get("http://localhost/lazy.css")]).await;
        assert!(result.is_err());
        assert!(store.is_empty());
    }
}
