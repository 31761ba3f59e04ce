//! Fragment composition.

use std::sync::Arc;

use pwp_cache::StaleWhileRevalidate;
use pwp_core::{KeepAlive, Request, Response, WorkerError};
use pwp_observability::WorkerMetrics;
use tokio::task::JoinHandle;

use crate::body::{body_channel, BodyWriter, DEFAULT_BODY_BUFFER};
use crate::error::ComposeError;
use crate::plan::{FragmentPlan, FragmentSlot};
use crate::response::StreamingResponse;

/// Builds full pages from header, page body and footer fragments.
///
/// All three fragments are resolved concurrently through the
/// stale-while-revalidate strategy, but their bodies reach the output
/// strictly in header, page, footer order. Fragment statuses and headers
/// are dropped; the page is always a `200 OK` HTML response.
#[derive(Clone)]
pub struct FragmentComposer {
    swr: StaleWhileRevalidate,
    metrics: Arc<WorkerMetrics>,
}

impl FragmentComposer {
    pub fn new(swr: StaleWhileRevalidate, metrics: Arc<WorkerMetrics>) -> Self {
        Self { swr, metrics }
    }

    /// Start composing and return the streamed page immediately.
    ///
    /// The writing task runs on `keep_alive`. If a fragment cannot be
    /// resolved, the body ends with `ComposeError::FragmentUnavailable`
    /// after the fragments already written.
    pub fn compose(&self, plan: FragmentPlan, keep_alive: &KeepAlive) -> StreamingResponse {
        let resolutions: Vec<_> = plan
            .parts()
            .map(|(slot, request)| (slot, self.resolve(request.clone(), keep_alive)))
            .collect();

        let (writer, body) = body_channel(DEFAULT_BODY_BUFFER);
        let metrics = self.metrics.clone();
        let page = plan.page.url().clone();
        keep_alive.wait_until(async move {
            match pipe_in_order(resolutions, writer).await {
                Ok(bytes) => {
                    metrics.record_composed_page();
                    tracing::debug!(url = %page, bytes, "page composed");
                }
                Err(e) => tracing::error!(url = %page, error = %e, "page composition failed"),
            }
        });

        StreamingResponse::html(body)
    }

    fn resolve(
        &self,
        request: Request,
        keep_alive: &KeepAlive,
    ) -> JoinHandle<Result<Response, WorkerError>> {
        let swr = self.swr.clone();
        let keep_alive = keep_alive.clone();
        tokio::spawn(async move { swr.handle(&request, &keep_alive).await })
    }
}

async fn pipe_in_order(
    resolutions: Vec<(FragmentSlot, JoinHandle<Result<Response, WorkerError>>)>,
    mut writer: BodyWriter,
) -> Result<usize, ComposeError> {
    for (slot, resolution) in resolutions {
        let err = match resolution.await {
            Ok(Ok(response)) => {
                writer.write(response.into_body()).await?;
                continue;
            }
            Ok(Err(e)) => ComposeError::FragmentUnavailable {
                slot,
                reason: e.to_string(),
            },
            Err(e) => ComposeError::Aborted(e.to_string()),
        };
        writer.abort(err.clone()).await?;
        return Err(err);
    }
    writer.close().await?;
    Ok(writer.bytes_written())
}
