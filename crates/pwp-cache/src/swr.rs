//! Stale-while-revalidate fetch strategy.
//!
//! Every request starts a network fetch and a cache lookup at the same time.
//! The caller gets the cached response as soon as the lookup hits, or the
//! network response on a miss. Independently, once both sides settle, the
//! network response replaces the cache entry and observers are told when
//! its `ETag` differs from what was cached.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use pwp_core::{Credentials, KeepAlive, Request, Response, WorkerError};
use pwp_data::Fetcher;
use pwp_observability::WorkerMetrics;

use crate::headers::{header_names, CacheStatus};
use crate::key::CacheKey;
use crate::notify::{ChangeBroadcaster, ChangeNotification};
use crate::store::CacheStore;

type SharedLookup = Shared<BoxFuture<'static, Option<Response>>>;

/// Serve-from-cache-then-refresh strategy over one cache store.
#[derive(Clone)]
pub struct StaleWhileRevalidate {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    broadcaster: ChangeBroadcaster,
    metrics: Arc<WorkerMetrics>,
}

impl StaleWhileRevalidate {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        broadcaster: ChangeBroadcaster,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            store,
            fetcher,
            broadcaster,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn broadcaster(&self) -> &ChangeBroadcaster {
        &self.broadcaster
    }

    /// Resolve `request` from cache or network.
    ///
    /// The refresh is registered on `keep_alive` and keeps running after
    /// this returns. Fails with `NoResponseAvailable` only when the cache
    /// has no entry and the network fetch failed.
    pub async fn handle(
        &self,
        request: &Request,
        keep_alive: &KeepAlive,
    ) -> Result<Response, WorkerError> {
        let request = request.clone().with_credentials(Credentials::Include);
        let key = CacheKey::for_request(&request);

        let network = self.start_fetch(request.clone());
        let cached = self.start_lookup(key.clone());

        keep_alive.wait_until(self.clone().revalidate(key, network.clone(), cached.clone()));

        if let Some(hit) = cached.await {
            self.metrics.record_cache_hit();
            tracing::debug!(url = %request.url(), "cache hit");
            return Ok(tag_status(hit, CacheStatus::Hit));
        }

        self.metrics.record_cache_miss();
        if let Some(fresh) = network.await {
            tracing::debug!(url = %request.url(), status = fresh.status().as_u16(), "cache miss, served from network");
            return Ok(tag_status(fresh, CacheStatus::Miss));
        }

        self.metrics.record_no_response();
        tracing::warn!(url = %request.url(), "neither network nor cache had a response");
        Err(WorkerError::no_response(request.locator()))
    }

    fn start_fetch(&self, request: Request) -> SharedLookup {
        let fetcher = self.fetcher.clone();
        let metrics = self.metrics.clone();
        let task = tokio::spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) => Some(response),
                Err(e) => {
                    metrics.record_network_failure();
                    tracing::debug!(url = %request.url(), error = %e, "network fetch failed");
                    None
                }
            }
        });
        async move { task.await.ok().flatten() }.boxed().shared()
    }

    fn start_lookup(&self, key: CacheKey) -> SharedLookup {
        let store = self.store.clone();
        let task = tokio::spawn(async move {
            match store.match_key(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "cache lookup failed, treating as miss");
                    None
                }
            }
        });
        async move { task.await.ok().flatten() }.boxed().shared()
    }

    async fn revalidate(self, key: CacheKey, network: SharedLookup, cached: SharedLookup) {
        let fresh = network.await;
        let stale = cached.await;

        if let (Some(fresh), Some(stale)) = (&fresh, &stale) {
            if fresh.etag() != stale.etag() {
                self.metrics.record_change_notification();
                self.broadcaster
                    .broadcast(ChangeNotification::resource_update(key.as_str()));
            }
        }

        let Some(fresh) = fresh else {
            return;
        };
        if fresh.status() == StatusCode::PARTIAL_CONTENT {
            tracing::debug!(key = %key, "partial response not cached");
            return;
        }
        match self.store.put(&key, fresh).await {
            Ok(()) => self.metrics.record_cache_write(),
            Err(e) => tracing::warn!(key = %key, error = %e, "cache write failed"),
        }
    }
}

fn tag_status(response: Response, status: CacheStatus) -> Response {
    response.with_header(
        HeaderName::from_static(header_names::X_CACHE_STATUS),
        HeaderValue::from_static(status.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::memory::MemoryCacheStore;
    use http::Method;
    use pwp_data::ScriptedFetcher;
    use tokio::sync::broadcast::error::TryRecvError;

    const URL: &str = "http://localhost/header.php?fragment=true";

    struct Harness {
        store: Arc<MemoryCacheStore>,
        fetcher: Arc<ScriptedFetcher>,
        metrics: Arc<WorkerMetrics>,
        swr: StaleWhileRevalidate,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryCacheStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let metrics = Arc::new(WorkerMetrics::new());
        let swr = StaleWhileRevalidate::new(
            store.clone(),
            fetcher.clone(),
            ChangeBroadcaster::new(),
            metrics.clone(),
        );
        Harness {
            store,
            fetcher,
            metrics,
            swr,
        }
    }

    fn request() -> Request {
        Request::parse(Method::GET, URL).unwrap()
    }

    fn key() -> CacheKey {
        CacheKey::for_request(&request())
    }

    fn cache_status(response: &Response) -> &str {
        response
            .headers()
            .get(header_names::X_CACHE_STATUS)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_miss_serves_network_and_fills_cache() {
        let h = harness();
        h.fetcher.respond(URL, Response::ok("<header>").with_etag("\"v1\""));
        let keep_alive = KeepAlive::new();

        let response = h.swr.handle(&request(), &keep_alive).await.unwrap();
        assert_eq!(response.body().as_ref(), b"<header>");
        assert_eq!(cache_status(&response), "MISS");

        keep_alive.settle().await;
        let stored = h.store.match_key(&key()).await.unwrap().unwrap();
        assert_eq!(stored.etag(), Some("\"v1\""));
        assert!(stored.headers().get(header_names::X_CACHE_STATUS).is_none());

        let snapshot = h.metrics.snapshot();
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_writes, 1);
    }

    #[tokio::test]
    async fn test_hit_returns_without_waiting_for_network() {
        let h = harness();
        h.store.put(&key(), Response::ok("cached")).await.unwrap();
        h.fetcher.hang(URL);
        let keep_alive = KeepAlive::new();

        let response = tokio::time::timeout(
            Duration::from_secs(1),
            h.swr.handle(&request(), &keep_alive),
        )
        .await
        .expect("cache hit should not wait for the network")
        .unwrap();

        assert_eq!(response.body().as_ref(), b"cached");
        assert_eq!(cache_status(&response), "HIT");
        assert_eq!(keep_alive.pending(), 1);
    }

    #[tokio::test]
    async fn test_changed_etag_notifies_once_and_refreshes() {
        let h = harness();
        h.store
            .put(&key(), Response::ok("old").with_etag("\"a\""))
            .await
            .unwrap();
        h.fetcher.respond(URL, Response::ok("new").with_etag("\"b\""));
        let mut observer = h.swr.broadcaster().subscribe();
        let keep_alive = KeepAlive::new();

        let response = h.swr.handle(&request(), &keep_alive).await.unwrap();
        assert_eq!(response.body().as_ref(), b"old");
        keep_alive.settle().await;

        let notification = observer.try_recv().unwrap();
        assert_eq!(notification, ChangeNotification::resource_update(URL));
        assert!(matches!(observer.try_recv(), Err(TryRecvError::Empty)));

        let stored = h.store.match_key(&key()).await.unwrap().unwrap();
        assert_eq!(stored.body().as_ref(), b"new");
        assert_eq!(h.metrics.snapshot().change_notifications, 1);
    }

    #[tokio::test]
    async fn test_same_etag_does_not_notify() {
        let h = harness();
        h.store
            .put(&key(), Response::ok("old").with_etag("\"a\""))
            .await
            .unwrap();
        h.fetcher.respond(URL, Response::ok("old").with_etag("\"a\""));
        let mut observer = h.swr.broadcaster().subscribe();
        let keep_alive = KeepAlive::new();

        h.swr.handle(&request(), &keep_alive).await.unwrap();
        keep_alive.settle().await;

        assert!(matches!(observer.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(h.metrics.snapshot().cache_writes, 1);
    }

    #[tokio::test]
    async fn test_missing_etags() {
        // Both missing compare equal; one missing counts as a change.
        let h = harness();
        h.store.put(&key(), Response::ok("old")).await.unwrap();
        h.fetcher.respond(URL, Response::ok("new"));
        let mut observer = h.swr.broadcaster().subscribe();

        let keep_alive = KeepAlive::new();
        h.swr.handle(&request(), &keep_alive).await.unwrap();
        keep_alive.settle().await;
        assert!(matches!(observer.try_recv(), Err(TryRecvError::Empty)));

        h.fetcher.respond(URL, Response::ok("newer").with_etag("\"c\""));
        let keep_alive = KeepAlive::new();
        h.swr.handle(&request(), &keep_alive).await.unwrap();
        keep_alive.settle().await;
        assert!(observer.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_offline_serves_cache_and_keeps_entry() {
        let h = harness();
        h.store
            .put(&key(), Response::ok("cached").with_etag("\"a\""))
            .await
            .unwrap();
        h.fetcher.set_offline(true);
        let keep_alive = KeepAlive::new();

        let response = h.swr.handle(&request(), &keep_alive).await.unwrap();
        keep_alive.settle().await;

        assert_eq!(response.body().as_ref(), b"cached");
        let stored = h.store.match_key(&key()).await.unwrap().unwrap();
        assert_eq!(stored.etag(), Some("\"a\""));
        assert_eq!(h.metrics.snapshot().network_failures, 1);
    }

    #[tokio::test]
    async fn test_no_cache_and_no_network_fails() {
        let h = harness();
        h.fetcher.fail(URL);
        let keep_alive = KeepAlive::new();

        let err = h.swr.handle(&request(), &keep_alive).await.unwrap_err();
        keep_alive.settle().await;

        assert!(matches!(err, WorkerError::NoResponseAvailable { ref url } if url == URL));
        assert!(h.store.is_empty());
        assert_eq!(h.metrics.snapshot().no_response, 1);
    }

    #[tokio::test]
    async fn test_error_status_is_served_and_cached() {
        let h = harness();
        h.fetcher.respond(URL, Response::new(StatusCode::NOT_FOUND));
        let keep_alive = KeepAlive::new();

        let response = h.swr.handle(&request(), &keep_alive).await.unwrap();
        keep_alive.settle().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_partial_content_is_not_cached() {
        let h = harness();
        h.fetcher.respond(URL, Response::new(StatusCode::PARTIAL_CONTENT));
        let keep_alive = KeepAlive::new();

        h.swr.handle(&request(), &keep_alive).await.unwrap();
        keep_alive.settle().await;

        assert!(h.store.is_empty());
    }
}
