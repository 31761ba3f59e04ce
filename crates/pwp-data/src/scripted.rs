//! Scripted in-memory fetcher for tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pwp_core::{Request, Response};

use crate::client::{FetchError, Fetcher};

#[derive(Debug, Clone)]
enum Outcome {
    Respond(Response),
    Fail,
    Hang,
}

#[derive(Debug, Clone)]
struct Route {
    outcome: Outcome,
    delay: Duration,
}

/// Fetcher answering from a table of scripted outcomes keyed by locator.
///
/// Unscripted locators fail as if the network were down.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Route>>,
    failing_bodies: Mutex<HashSet<Vec<u8>>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn respond(&self, url: &str, response: Response) {
        self.respond_after(url, response, Duration::ZERO);
    }

    /// Answer `url` with `response` after `delay`.
    pub fn respond_after(&self, url: &str, response: Response, delay: Duration) {
        self.route(url, Outcome::Respond(response), delay);
    }

    /// Fail every fetch of `url`.
    pub fn fail(&self, url: &str) {
        self.route(url, Outcome::Fail, Duration::ZERO);
    }

    /// Fail `url` after `delay`.
    pub fn fail_after(&self, url: &str, delay: Duration) {
        self.route(url, Outcome::Fail, delay);
    }

    /// Never resolve fetches of `url`.
    pub fn hang(&self, url: &str) {
        self.route(url, Outcome::Hang, Duration::ZERO);
    }

    /// Fail any request whose body equals `body`, whatever its locator.
    pub fn fail_when_body(&self, body: &[u8]) {
        self.failing_bodies.lock().insert(body.to_vec());
    }

    /// Stop failing requests with `body`.
    pub fn clear_failing_bodies(&self) {
        self.failing_bodies.lock().clear();
    }

    /// Fail every request while offline.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    /// Locators fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// How many times `url` was fetched.
    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == url).count()
    }

    fn route(&self, url: &str, outcome: Outcome, delay: Duration) {
        self.routes
            .lock()
            .insert(url.to_string(), Route { outcome, delay });
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.calls.lock().push(request.locator().to_string());

        if *self.offline.lock() {
            return Err(FetchError::Connection("offline".to_string()));
        }
        if self.failing_bodies.lock().contains(request.body().as_ref()) {
            return Err(FetchError::Connection("scripted body failure".to_string()));
        }

        let route = self.routes.lock().get(request.locator()).cloned();
        let Some(route) = route else {
            return Err(FetchError::Connection(format!(
                "no route for {}",
                request.locator()
            )));
        };

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }

        match route.outcome {
            Outcome::Respond(response) => Ok(response),
            Outcome::Fail => Err(FetchError::Connection("scripted failure".to_string())),
            Outcome::Hang => std::future::pending().await,
        }
    }
}
