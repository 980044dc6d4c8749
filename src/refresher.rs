//! Periodic background fetch with a safe handoff to the render loop.
//!
//! Each [`Refresher`] owns one named OS thread. A cycle runs the fetch, publishes a fresh
//! value into its [`SharedSlot`], then waits on the [`CancellationToken`] until the next
//! cycle is due. Failures are logged and swallowed, and the slot keeps its stale value.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::slot::SharedSlot;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request rejected with HTTP status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] json::Error),

    #[error("missing or invalid {0:?} value")]
    Field(&'static str),

    #[error("image feed is empty")]
    EmptyFeed,

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Update<T> {
    /// A new value to publish.
    Fresh(T),
    /// Nothing new since the last publish.
    Unchanged,
    /// A value this fetch depends on is not there yet. Retried after
    /// [`Schedule::pending_retry`] instead of the full interval.
    Pending,
}

pub trait Fetch: Send + 'static {
    type Output: Send + 'static;

    fn fetch(&mut self) -> Result<Update<Self::Output>, FetchError>;
}

impl<T, F> Fetch for F
where
    F: FnMut() -> Result<Update<T>, FetchError> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn fetch(&mut self) -> Result<Update<T>, FetchError> {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    pub initial_delay: Duration,
    pub pending_retry: Duration,
}

impl Schedule {
    const DEFAULT_PENDING_RETRY: Duration = Duration::from_secs(5);

    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            initial_delay: Duration::ZERO,
            pending_retry: interval.min(Self::DEFAULT_PENDING_RETRY),
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_pending_retry(mut self, retry: Duration) -> Self {
        self.pending_retry = retry;
        self
    }
}

/// What a single cycle did to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Published(u64),
    Unchanged,
    Pending,
    Failed,
}

/// Run one fetch and publish its result. Errors are logged here and never reach the
/// caller.
pub fn run_cycle<F: Fetch>(name: &str, fetcher: &mut F, slot: &SharedSlot<F::Output>) -> Cycle {
    match fetcher.fetch() {
        Ok(Update::Fresh(value)) => {
            let version = slot.publish(value);
            debug!("{}: published version {}", name, version);
            Cycle::Published(version)
        }
        Ok(Update::Unchanged) => {
            debug!("{}: unchanged", name);
            Cycle::Unchanged
        }
        Ok(Update::Pending) => {
            debug!("{}: waiting for input", name);
            Cycle::Pending
        }
        Err(e) => {
            warn!("{}: fetch failed: {}", name, e);
            Cycle::Failed
        }
    }
}

pub struct Refresher {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl Refresher {
    pub fn spawn<F: Fetch>(
        name: impl Into<String>,
        mut fetcher: F,
        slot: Arc<SharedSlot<F::Output>>,
        schedule: Schedule,
        token: CancellationToken,
    ) -> io::Result<Self> {
        let name = name.into();
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(&thread_name, &mut fetcher, &slot, schedule, &token))?;

        Ok(Self {
            name,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the thread to exit. Only returns promptly once the token is cancelled.
    pub fn join(mut self) {
        self.join_thread();
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("{}: refresher thread panicked", self.name);
            }
        }
    }
}

fn run<F: Fetch>(
    name: &str,
    fetcher: &mut F,
    slot: &SharedSlot<F::Output>,
    schedule: Schedule,
    token: &CancellationToken,
) {
    info!("{}: started, refreshing every {:?}", name, schedule.interval);

    if !schedule.initial_delay.is_zero() && token.wait_timeout(schedule.initial_delay) {
        info!("{}: stopped", name);
        return;
    }

    while !token.is_cancelled() {
        let pause = match run_cycle(name, fetcher, slot) {
            Cycle::Pending => schedule.pending_retry,
            _ => schedule.interval,
        };
        if token.wait_timeout(pause) {
            break;
        }
    }

    info!("{}: stopped", name);
}

/// All refreshers of the application, sharing one token. Dropping the set cancels the
/// token and joins every thread.
pub struct RefresherSet {
    token: CancellationToken,
    refreshers: Vec<Refresher>,
}

impl RefresherSet {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            refreshers: Vec::new(),
        }
    }

    pub fn spawn<F: Fetch>(
        &mut self,
        name: &str,
        fetcher: F,
        slot: Arc<SharedSlot<F::Output>>,
        schedule: Schedule,
    ) -> io::Result<()> {
        let refresher = Refresher::spawn(name, fetcher, slot, schedule, self.token.clone())?;
        self.refreshers.push(refresher);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.refreshers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refreshers.is_empty()
    }

    pub fn shutdown(self) {
        // Drop does the work.
    }
}

impl Drop for RefresherSet {
    fn drop(&mut self) {
        self.token.cancel();
        for mut refresher in self.refreshers.drain(..) {
            refresher.join_thread();
        }
    }
}
