//! Deferral of write requests.

use std::sync::Arc;

use pwp_core::{KeepAlive, Request, Response, WorkerError};
use pwp_observability::WorkerMetrics;

use crate::queue::SubmissionQueue;
use crate::registry::SyncRegistry;

/// Answers a write with a redirect back to the referring page and queues
/// the write for replay.
#[derive(Clone)]
pub struct DeferralCoordinator {
    queue: Arc<dyn SubmissionQueue>,
    registry: Arc<dyn SyncRegistry>,
    sync_tag: String,
    metrics: Arc<WorkerMetrics>,
}

impl DeferralCoordinator {
    pub fn new(
        queue: Arc<dyn SubmissionQueue>,
        registry: Arc<dyn SyncRegistry>,
        sync_tag: impl Into<String>,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            queue,
            registry,
            sync_tag: sync_tag.into(),
            metrics,
        }
    }

    /// Respond with `302 Found` to the referrer's path (`/` without one).
    ///
    /// Queueing and sync registration run on `keep_alive`; the redirect does
    /// not wait for them.
    pub fn defer(&self, request: &Request, keep_alive: &KeepAlive) -> Result<Response, WorkerError> {
        let location = request.referrer().map(|r| r.path()).unwrap_or("/");
        let redirect = Response::redirect(location)?;

        let coordinator = self.clone();
        let request = request.clone();
        keep_alive.wait_until(async move {
            let entry = match coordinator.queue.enqueue(&request).await {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::error!(url = %request.url(), error = %e, "failed to queue submission");
                    return;
                }
            };
            coordinator.metrics.record_deferred_submission();
            tracing::info!(id = %entry.id, url = %request.url(), "submission deferred");

            if let Err(e) = coordinator.registry.register(&coordinator.sync_tag).await {
                tracing::error!(tag = %coordinator.sync_tag, error = %e, "failed to register sync");
            }
        });

        Ok(redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryQueue;
    use crate::registry::RecordingRegistry;
    use http::{Method, StatusCode};
    use url::Url;

    struct Harness {
        queue: Arc<MemoryQueue>,
        registry: Arc<RecordingRegistry>,
        coordinator: DeferralCoordinator,
    }

    fn harness() -> Harness {
        let queue = Arc::new(MemoryQueue::new());
        let registry = Arc::new(RecordingRegistry::new());
        let coordinator = DeferralCoordinator::new(
            queue.clone(),
            registry.clone(),
            "comment-sync",
            Arc::new(WorkerMetrics::new()),
        );
        Harness {
            queue,
            registry,
            coordinator,
        }
    }

    fn comment() -> Request {
        Request::parse(Method::POST, "http://localhost/wp-comments-post.php")
            .unwrap()
            .with_body("comment=hello&comment_post_ID=1")
    }

    #[tokio::test]
    async fn test_redirects_to_referrer_path_and_queues() {
        let h = harness();
        let request = comment()
            .with_referrer(Url::parse("http://localhost/2017/hello-world/?replytocom=3#respond").unwrap());
        let keep_alive = KeepAlive::new();

        let response = h.coordinator.defer(&request, &keep_alive).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some("/2017/hello-world/"));

        keep_alive.settle().await;
        let entries = h.queue.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].to_request().unwrap().body().as_ref(),
            b"comment=hello&comment_post_ID=1"
        );
        assert_eq!(h.registry.pending(), vec!["comment-sync"]);
    }

    #[tokio::test]
    async fn test_missing_referrer_redirects_to_root() {
        let h = harness();
        let keep_alive = KeepAlive::new();

        let response = h.coordinator.defer(&comment(), &keep_alive).unwrap();
        keep_alive.settle().await;

        assert_eq!(response.location(), Some("/"));
        assert_eq!(h.queue.count_pending().await.unwrap(), 1);
    }
}
