//! The worker: lifecycle and event dispatch.

use std::sync::Arc;

use parking_lot::RwLock;
use pwp_cache::{
    add_all, CacheKey, CacheStorage, ChangeBroadcaster, ChangeNotification, StaleWhileRevalidate,
};
use pwp_core::{EventContext, Request, Response, WorkerConfig, WorkerError, WorkerPhase};
use pwp_data::Fetcher;
use pwp_observability::{MetricsSnapshot, WorkerMetrics};
use pwp_streaming::{FragmentComposer, FragmentPlan, StreamingResponse};
use pwp_sync::{DeferralCoordinator, DrainReport, RetryTrigger, SubmissionQueue, SyncRegistry};
use tokio::sync::broadcast;

use crate::classify::{RequestClass, RequestClassifier};

/// Host-provided facilities the worker runs on.
#[derive(Clone)]
pub struct WorkerParts {
    /// The network path.
    pub fetcher: Arc<dyn Fetcher>,
    /// Named response caches.
    pub storage: Arc<dyn CacheStorage>,
    /// Durable queue for deferred submissions.
    pub queue: Arc<dyn SubmissionQueue>,
    /// The host's scheduling facility.
    pub registry: Arc<dyn SyncRegistry>,
}

/// What the host should do with an intercepted request.
#[derive(Debug)]
pub enum Dispatch {
    /// Answer with this response.
    Respond(Response),
    /// Answer with this streamed page.
    Stream(StreamingResponse),
    /// Not intercepted; send the request to the network unmodified.
    Network(Request),
}

/// Request interception worker.
pub struct Worker {
    config: WorkerConfig,
    classifier: RequestClassifier,
    fetcher: Arc<dyn Fetcher>,
    swr: StaleWhileRevalidate,
    composer: FragmentComposer,
    deferral: DeferralCoordinator,
    trigger: RetryTrigger,
    metrics: Arc<WorkerMetrics>,
    phase: RwLock<WorkerPhase>,
}

impl Worker {
    /// Build a worker and open its cache.
    pub async fn new(config: WorkerConfig, parts: WorkerParts) -> Result<Self, WorkerError> {
        config.validate()?;
        let classifier = RequestClassifier::new(&config)?;
        let store = parts.storage.open(&config.cache_name).await?;
        let metrics = Arc::new(WorkerMetrics::new());

        let swr = StaleWhileRevalidate::new(
            store,
            parts.fetcher.clone(),
            ChangeBroadcaster::new(),
            metrics.clone(),
        );
        let composer = FragmentComposer::new(swr.clone(), metrics.clone());
        let deferral = DeferralCoordinator::new(
            parts.queue.clone(),
            parts.registry,
            config.sync_tag.clone(),
            metrics.clone(),
        );
        let trigger = RetryTrigger::new(parts.queue, parts.fetcher.clone(), &config, metrics.clone());

        Ok(Self {
            config,
            classifier,
            fetcher: parts.fetcher,
            swr,
            composer,
            deferral,
            trigger,
            metrics,
            phase: RwLock::new(WorkerPhase::Parsed),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn phase(&self) -> WorkerPhase {
        *self.phase.read()
    }

    /// Seed the cache with the precache list, then skip waiting.
    ///
    /// All-or-nothing: if any locator cannot be fetched with an OK status
    /// the worker becomes `Redundant` and nothing is cached.
    pub async fn install(&self) -> Result<usize, WorkerError> {
        self.set_phase(WorkerPhase::Installing);

        let requests = match self.config.precache_urls() {
            Ok(urls) => urls.into_iter().map(Request::get).collect(),
            Err(e) => {
                self.set_phase(WorkerPhase::Redundant);
                return Err(e);
            }
        };

        match add_all(self.swr.store().as_ref(), self.fetcher.as_ref(), requests).await {
            Ok(count) => {
                self.set_phase(WorkerPhase::Installed);
                tracing::info!(cache = %self.config.cache_name, entries = count, "installed, skipping wait");
                Ok(count)
            }
            Err(e) => {
                self.set_phase(WorkerPhase::Redundant);
                tracing::error!(error = %e, "install failed");
                Err(e.into())
            }
        }
    }

    /// Resume a worker installed by an earlier process.
    ///
    /// Succeeds without fetching when every precache locator is already in
    /// the cache. Returns whether the worker is now `Installed`.
    pub async fn restore(&self) -> Result<bool, WorkerError> {
        let store = self.swr.store();
        for url in self.config.precache_urls()? {
            if store.match_key(&CacheKey::new(&url)).await?.is_none() {
                tracing::debug!(url = %url, "precache entry missing, install required");
                return Ok(false);
            }
        }
        self.set_phase(WorkerPhase::Installed);
        tracing::info!(cache = %self.config.cache_name, "restored installed worker");
        Ok(true)
    }

    /// Take control of every client.
    pub fn activate(&self) -> Result<(), WorkerError> {
        let mut phase = self.phase.write();
        match *phase {
            WorkerPhase::Installed | WorkerPhase::Activated => {
                *phase = WorkerPhase::Activated;
                tracing::info!("activated, clients claimed");
                Ok(())
            }
            other => Err(WorkerError::Lifecycle(format!(
                "cannot activate a worker that is {}",
                other
            ))),
        }
    }

    /// Classify a request without handling it.
    pub fn classify(&self, request: &Request) -> RequestClass {
        self.classifier.classify(request)
    }

    /// Handle an intercepted request.
    ///
    /// Detached work (cache refresh, page writing, queueing) is registered on
    /// `ctx.keep_alive`.
    pub async fn handle_fetch(
        &self,
        request: Request,
        ctx: &EventContext,
    ) -> Result<Dispatch, WorkerError> {
        if !self.phase().handles_fetches() {
            return Ok(Dispatch::Network(request));
        }

        let class = self.classifier.classify(&request);
        tracing::debug!(
            event_id = %ctx.event_id,
            method = %request.method(),
            url = %request.url(),
            class = %class,
            "fetch"
        );

        match class {
            RequestClass::DeferredWrite => {
                let response = self.deferral.defer(&request, &ctx.keep_alive)?;
                Ok(Dispatch::Respond(response))
            }
            RequestClass::Bypass => Ok(Dispatch::Network(request)),
            RequestClass::Fragment | RequestClass::Asset => {
                let response = self.swr.handle(&request, &ctx.keep_alive).await?;
                Ok(Dispatch::Respond(response))
            }
            RequestClass::FullPageNavigation => {
                let plan = FragmentPlan::for_navigation(&self.config, &request)?;
                Ok(Dispatch::Stream(self.composer.compose(plan, &ctx.keep_alive)))
            }
        }
    }

    /// Send a request to the network unmodified.
    pub async fn forward(&self, request: &Request) -> Result<Response, WorkerError> {
        Ok(self.fetcher.fetch(request).await?)
    }

    /// Handle a scheduler signal.
    ///
    /// The scheduler should signal again later unless the report is complete.
    pub async fn handle_sync(&self, tag: &str) -> Result<DrainReport, WorkerError> {
        self.trigger.handle_signal(tag).await
    }

    /// Connect a client to `resource_update` notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.swr.broadcaster().subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn set_phase(&self, phase: WorkerPhase) {
        *self.phase.write() = phase;
        tracing::debug!(phase = %phase, "worker phase");
    }
}
