use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;

use crate::client::CrawlApi;
use crate::data_models::{CrawlRequest, CrawlResult};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Submitting,
    Success,
    Error,
}

/// What the form renders: where the current submission is, and its outcome.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RequestState {
    pub phase: Phase,
    pub progress: u8,
    pub request_id: Option<String>,
    pub result: Option<CrawlResult>,
    pub error: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for RequestState {
    fn default() -> Self {
        RequestState {
            phase: Phase::Idle,
            progress: 0,
            request_id: None,
            result: None,
            error: None,
            finished_at: None,
        }
    }
}

impl RequestState {
    fn submitting(request_id: String) -> Self {
        RequestState {
            phase: Phase::Submitting,
            request_id: Some(request_id),
            ..RequestState::default()
        }
    }

    fn owned_by(&self, request_id: &str) -> bool {
        self.request_id.as_deref() == Some(request_id)
    }

    pub fn is_pending(&self) -> bool {
        self.phase == Phase::Submitting
    }

    fn succeed(&mut self, result: CrawlResult) {
        self.phase = Phase::Success;
        self.progress = 100;
        self.result = Some(result);
        self.error = None;
        self.finished_at = Some(Utc::now());
    }

    fn fail(&mut self, notice: String) {
        self.phase = Phase::Error;
        self.progress = 0;
        self.result = None;
        self.error = Some(notice);
        self.finished_at = Some(Utc::now());
    }
}

/// Cosmetic progress: `step` every `tick`, never past `cap`.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSettings {
    pub tick: Duration,
    pub step: u8,
    pub cap: u8,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        ProgressSettings {
            tick: Duration::from_millis(500),
            step: 10,
            cap: 90,
        }
    }
}

/// Owns the request lifecycle for one form.
///
/// Each submission runs under its own cancellation token. Submitting again
/// cancels the previous token, and every state write checks the request id, so
/// only the latest submission can reach a terminal state.
pub struct Session<C> {
    client: Arc<C>,
    progress: ProgressSettings,
    state: Arc<Mutex<RequestState>>,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl<C: CrawlApi> Session<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self::with_progress(client, ProgressSettings::default())
    }

    pub fn with_progress(client: Arc<C>, progress: ProgressSettings) -> Self {
        Session {
            client,
            progress: ProgressSettings {
                cap: progress.cap.min(99),
                ..progress
            },
            state: Arc::new(Mutex::new(RequestState::default())),
            in_flight: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> RequestState {
        lock(&self.state).clone()
    }

    /// Starts a crawl, replacing any submission still in flight.
    ///
    /// The returned handle resolves once this submission has settled or been
    /// superseded; callers that only poll [`Session::snapshot`] can drop it.
    pub fn submit(&self, request: CrawlRequest) -> JoinHandle<()> {
        self.submit_tracked(request).1
    }

    /// Like [`Session::submit`], also returning the id this submission owns
    /// the state under.
    pub fn submit_tracked(&self, request: CrawlRequest) -> (String, JoinHandle<()>) {
        let request_id = nanoid!();
        let token = CancellationToken::new();

        {
            // token swap and state claim happen under one lock; order is in_flight, then state
            let mut in_flight = lock(&self.in_flight);
            if let Some(previous) = in_flight.replace(token.clone()) {
                if !previous.is_cancelled() {
                    log::info!("superseding in-flight crawl with {request_id}");
                }
                previous.cancel();
            }
            *lock(&self.state) = RequestState::submitting(request_id.clone());
        }
        log::info!("crawl {request_id} submitted for {}", request.url);

        let ticker = spawn_ticker(
            self.state.clone(),
            request_id.clone(),
            self.progress,
            token.child_token(),
        );
        let client = self.client.clone();
        let state = self.state.clone();

        let task_id = request_id.clone();
        let handle = tokio::spawn(async move {
            let request_id = task_id;
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                res = client.crawl(&request) => Some(res),
            };

            // stops the ticker before we write the final progress
            token.cancel();
            if let Err(e) = ticker.await {
                log::warn!("progress ticker for {request_id} ended abnormally: {e}");
            }

            let Some(outcome) = outcome else {
                log::info!("crawl {request_id} cancelled");
                return;
            };

            let mut state = lock(&state);
            if !state.owned_by(&request_id) {
                log::info!("discarding stale result for crawl {request_id}");
                return;
            }
            match outcome {
                Ok(result) => {
                    log::info!("crawl {request_id} succeeded");
                    state.succeed(result);
                }
                Err(e) => {
                    log::error!("crawl {request_id} failed, error: {:#}", e);
                    state.fail(e.user_message());
                }
            }
        });

        (request_id, handle)
    }

    /// Cancels the in-flight submission, if any, and returns to idle.
    pub fn cancel(&self) {
        let mut in_flight = lock(&self.in_flight);
        if let Some(token) = in_flight.take() {
            token.cancel();
        }
        let mut state = lock(&self.state);
        if state.is_pending() {
            *state = RequestState::default();
        }
    }
}

impl<C> Drop for Session<C> {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.in_flight).take() {
            token.cancel();
        }
    }
}

fn spawn_ticker(
    state: Arc<Mutex<RequestState>>,
    request_id: String,
    settings: ProgressSettings,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + settings.tick, settings.tick);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticks.tick() => {
                    let mut state = lock(&state);
                    if !state.owned_by(&request_id) || !state.is_pending() {
                        break;
                    }
                    state.progress = state.progress.saturating_add(settings.step).min(settings.cap);
                }
            }
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
