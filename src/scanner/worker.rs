//! WorkerHost - Off-thread annotation
//!
//! A dedicated thread owns an `Annotator`; callers talk to it through a
//! `WorkerHandle` by message passing. Every request carries a correlation id
//! and its own reply channel, and the caller waits at most `timeout` for the
//! answer. A timed-out request surfaces as `AnnotateError::Timeout`; the
//! worker is told to abandon the search through its cancellation token.
//!
//! The worker drains its queue strictly in order, so a search sent after a
//! build always observes that build.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::collector::{Annotation, Annotator};
use super::config::MatchingConfig;
use super::role::RoleRegistry;
use super::segment::{IcuWordSegmenter, WordSegmenter};
use crate::error::{AnnotateError, Result};

/// Default round-trip timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Messages
// =============================================================================

/// Requests accepted by the worker thread
pub enum WorkerRequest {
    Build {
        id: u64,
        registry: RoleRegistry,
        reply: Sender<WorkerResponse>,
    },
    Search {
        id: u64,
        text: String,
        config: MatchingConfig,
        cancel: CancellationToken,
        reply: Sender<WorkerResponse>,
    },
    Shutdown,
}

/// Responses produced by the worker thread
#[derive(Debug)]
pub enum WorkerResponse {
    Built { id: u64, version: u64, rebuilt: bool },
    Matches { id: u64, version: Option<u64>, annotation: Annotation },
    Failed { id: u64, error: AnnotateError },
}

impl WorkerResponse {
    pub fn id(&self) -> u64 {
        match self {
            WorkerResponse::Built { id, .. }
            | WorkerResponse::Matches { id, .. }
            | WorkerResponse::Failed { id, .. } => *id,
        }
    }
}

/// Answer to a build request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOutcome {
    pub id: u64,
    pub version: u64,
    pub rebuilt: bool,
}

/// Answer to a search request
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub id: u64,
    /// Registry version the search ran against (`None` before any build)
    pub version: Option<u64>,
    pub annotation: Annotation,
}

// =============================================================================
// Worker loop
// =============================================================================

fn run_worker<S: WordSegmenter>(mut annotator: Annotator<S>, requests: Receiver<WorkerRequest>) {
    while let Ok(request) = requests.recv() {
        match request {
            WorkerRequest::Build { id, registry, reply } => {
                let response = match annotator.rebuild(&registry) {
                    Ok(rebuilt) => WorkerResponse::Built {
                        id,
                        version: registry.version(),
                        rebuilt,
                    },
                    Err(error) => {
                        warn!(id, error = %error, "worker rebuild failed");
                        WorkerResponse::Failed { id, error }
                    }
                };
                // Caller may have timed out and gone away
                let _ = reply.send(response);
            }
            WorkerRequest::Search {
                id,
                text,
                config,
                cancel,
                reply,
            } => {
                let annotation = annotator.collect(&text, &config, &cancel);
                let _ = reply.send(WorkerResponse::Matches {
                    id,
                    version: annotator.version(),
                    annotation,
                });
            }
            WorkerRequest::Shutdown => break,
        }
    }
    debug!("annotation worker stopped");
}

// =============================================================================
// WorkerHandle
// =============================================================================

/// Caller side of the worker thread. Dropping it stops the worker.
pub struct WorkerHandle {
    requests: Sender<WorkerRequest>,
    next_id: AtomicU64,
    timeout: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    /// Start a worker with the default segmenter and timeout
    pub fn spawn() -> Result<Self> {
        Self::spawn_with(IcuWordSegmenter::new(), DEFAULT_TIMEOUT)
    }

    pub fn spawn_with_timeout(timeout: Duration) -> Result<Self> {
        Self::spawn_with(IcuWordSegmenter::new(), timeout)
    }

    pub fn spawn_with<S>(segmenter: S, timeout: Duration) -> Result<Self>
    where
        S: WordSegmenter + 'static,
    {
        let (tx, rx) = unbounded();
        let annotator = Annotator::with_segmenter(segmenter);
        let thread = thread::Builder::new()
            .name("rolescan-worker".to_string())
            .spawn(move || run_worker(annotator, rx))
            .map_err(|e| AnnotateError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            requests: tx,
            next_id: AtomicU64::new(1),
            timeout,
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Round-trip limit for requests sent from now on
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Replace the worker's index. A no-op on the worker when the version is
    /// unchanged.
    pub fn build(&self, registry: RoleRegistry) -> Result<BuildOutcome> {
        let id = self.next_id();
        let (reply, response) = bounded(1);
        self.requests
            .send(WorkerRequest::Build { id, registry, reply })
            .map_err(|_| AnnotateError::WorkerDisconnected)?;

        match self.await_response(id, &response)? {
            WorkerResponse::Built { id, version, rebuilt } => Ok(BuildOutcome { id, version, rebuilt }),
            WorkerResponse::Failed { error, .. } => Err(error),
            WorkerResponse::Matches { .. } => Err(AnnotateError::WorkerDisconnected),
        }
    }

    /// Annotate `text` against the most recent build
    pub fn search(&self, text: impl Into<String>, config: MatchingConfig) -> Result<SearchOutcome> {
        self.search_with_cancel(text, config, CancellationToken::new())
    }

    /// Like `search`, with a caller-owned cancellation token. The token is
    /// cancelled when the request times out.
    pub fn search_with_cancel(
        &self,
        text: impl Into<String>,
        config: MatchingConfig,
        cancel: CancellationToken,
    ) -> Result<SearchOutcome> {
        let id = self.next_id();
        let (reply, response) = bounded(1);
        self.requests
            .send(WorkerRequest::Search {
                id,
                text: text.into(),
                config,
                cancel: cancel.clone(),
                reply,
            })
            .map_err(|_| AnnotateError::WorkerDisconnected)?;

        let outcome = self.await_response(id, &response);
        if matches!(outcome, Err(AnnotateError::Timeout { .. })) {
            cancel.cancel();
        }

        match outcome? {
            WorkerResponse::Matches { id, version, annotation } => Ok(SearchOutcome { id, version, annotation }),
            WorkerResponse::Failed { error, .. } => Err(error),
            WorkerResponse::Built { .. } => Err(AnnotateError::WorkerDisconnected),
        }
    }

    fn await_response(&self, id: u64, response: &Receiver<WorkerResponse>) -> Result<WorkerResponse> {
        match response.recv_timeout(self.timeout) {
            Ok(resp) => {
                debug_assert_eq!(resp.id(), id);
                Ok(resp)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(id, timeout_ms = self.timeout.as_millis() as u64, "worker request timed out");
                Err(AnnotateError::Timeout { id })
            }
            Err(RecvTimeoutError::Disconnected) => Err(AnnotateError::WorkerDisconnected),
        }
    }

    /// Stop the worker and wait for it. Later requests fail with
    /// `WorkerDisconnected`.
    pub fn shutdown(&self) {
        let _ = self.requests.send(WorkerRequest::Shutdown);
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                warn!("annotation worker panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
