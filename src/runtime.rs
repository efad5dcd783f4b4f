//! Single-writer governance runtime.
//!
//! `ZeroPoint` already serializes calls inside one process. The runtime adds
//! a single named worker fed by a bounded queue, so callers on many threads
//! can hand requests off without blocking on the store mutex, and a full
//! queue surfaces as back-pressure instead of an unbounded backlog.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::entry::{Entry, EntryId};
use crate::error::{RuntimeError, ZeroPointError, ZeroPointResult};
use crate::simulation::{DigitalTwin, SimulationReport, SimulationRequest};
use crate::store::{
    PromotionOutcome, Reaffirmation, ReaffirmOutcome, SearchQuery, StoreStats, WriteOutcome, WriteRequest,
    ZeroPoint,
};

/// A request routed through the runtime.
#[derive(Debug, Clone)]
pub enum GovernanceRequest {
    Write(WriteRequest),
    Read { entry_id: EntryId, requester: String },
    Search { query: SearchQuery, requester: String },
    MarkReviewed { entry_id: EntryId, reviewer: String },
    Reaffirm { entry_id: EntryId, reaffirmation: Reaffirmation },
    Promote { entry_id: EntryId, promoter: String },
    Stats,
    Simulate(SimulationRequest),
}

impl GovernanceRequest {
    const fn name(&self) -> &'static str {
        match self {
            Self::Write(_) => "write",
            Self::Read { .. } => "read",
            Self::Search { .. } => "search",
            Self::MarkReviewed { .. } => "mark_reviewed",
            Self::Reaffirm { .. } => "reaffirm",
            Self::Promote { .. } => "promote",
            Self::Stats => "stats",
            Self::Simulate(_) => "simulate",
        }
    }
}

/// The answer to a [`GovernanceRequest`], variant for variant.
#[derive(Debug, Clone)]
pub enum GovernanceResponse {
    Write(WriteOutcome),
    Read(Option<Entry>),
    Search(Vec<Entry>),
    MarkReviewed(bool),
    Reaffirm(ReaffirmOutcome),
    Promote(PromotionOutcome),
    Stats(StoreStats),
    Simulate(Box<SimulationReport>),
}

type Reply = ZeroPointResult<GovernanceResponse>;

enum Job {
    Execute {
        request: GovernanceRequest,
        reply: Sender<Reply>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        reply: Sender<()>,
    },
}

fn dispatch(store: &ZeroPoint, twin: &DigitalTwin, request: GovernanceRequest) -> Reply {
    Ok(match request {
        GovernanceRequest::Write(req) => GovernanceResponse::Write(store.write(req)?),
        GovernanceRequest::Read { entry_id, requester } => {
            GovernanceResponse::Read(store.read(&entry_id, &requester)?)
        }
        GovernanceRequest::Search { query, requester } => {
            GovernanceResponse::Search(store.search(&query, &requester)?)
        }
        GovernanceRequest::MarkReviewed { entry_id, reviewer } => {
            GovernanceResponse::MarkReviewed(store.mark_reviewed(&entry_id, &reviewer)?)
        }
        GovernanceRequest::Reaffirm { entry_id, reaffirmation } => {
            GovernanceResponse::Reaffirm(store.reaffirm(&entry_id, reaffirmation)?)
        }
        GovernanceRequest::Promote { entry_id, promoter } => {
            GovernanceResponse::Promote(store.promote_to_canon(&entry_id, &promoter)?)
        }
        GovernanceRequest::Stats => GovernanceResponse::Stats(store.stats()?),
        GovernanceRequest::Simulate(req) => GovernanceResponse::Simulate(Box::new(twin.simulate(req)?)),
    })
}

/// Handle returned by [`GovernanceRuntime::submit`].
#[derive(Debug)]
pub struct Ticket {
    request: &'static str,
    rx: Receiver<Reply>,
}

impl Ticket {
    /// Name of the submitted request kind.
    #[must_use]
    pub const fn request(&self) -> &'static str {
        self.request
    }

    /// Waits for the worker's answer.
    pub fn join(self) -> Reply {
        self.rx
            .recv()
            .map_err(|_| ZeroPointError::Runtime(RuntimeError::Disconnected))?
    }

    /// Waits for the worker's answer, up to `timeout`.
    pub fn join_timeout(self, timeout: Duration) -> Reply {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ZeroPointError::Runtime(RuntimeError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => ZeroPointError::Runtime(RuntimeError::Disconnected),
        })?
    }
}

/// One worker, one bounded queue, in front of a store and a twin.
pub struct GovernanceRuntime {
    store: Arc<ZeroPoint>,
    twin: Arc<DigitalTwin>,
    tx: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    queue_capacity: usize,
}

impl std::fmt::Debug for GovernanceRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceRuntime")
            .field("queue_capacity", &self.queue_capacity)
            .field("running", &self.tx.is_some())
            .finish_non_exhaustive()
    }
}

impl GovernanceRuntime {
    /// Spawn the worker.
    ///
    /// # Errors
    /// Invalid `config`, or the OS refusing to spawn the thread.
    pub fn start(store: Arc<ZeroPoint>, twin: Arc<DigitalTwin>, config: RuntimeConfig) -> ZeroPointResult<Self> {
        let config = config.validate()?;
        let (tx, rx) = bounded::<Job>(config.queue_capacity);

        let worker_store = Arc::clone(&store);
        let worker_twin = Arc::clone(&twin);
        let worker = thread::Builder::new()
            .name("zeropoint-governance".to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    match job {
                        Job::Execute { request, reply } => {
                            let name = request.name();
                            let result = dispatch(&worker_store, &worker_twin, request);
                            if reply.send(result).is_err() {
                                debug!(request = name, "ticket dropped before reply");
                            }
                        }

                        #[cfg(test)]
                        Job::Sleep { duration, reply } => {
                            thread::sleep(duration);
                            let _ = reply.send(());
                        }
                    }
                }
            })
            .map_err(|e| ZeroPointError::internal(format!("failed to spawn governance worker: {e}")))?;

        Ok(Self {
            store,
            twin,
            tx: Some(tx),
            worker: Some(worker),
            queue_capacity: config.queue_capacity,
        })
    }

    fn try_submit(&self, job: Job) -> ZeroPointResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or(ZeroPointError::Runtime(RuntimeError::Disconnected))?;
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ZeroPointError::Runtime(RuntimeError::QueueFull {
                capacity: self.queue_capacity,
            })),
            Err(TrySendError::Disconnected(_)) => Err(ZeroPointError::Runtime(RuntimeError::Disconnected)),
        }
    }

    /// Queue a request without waiting for it.
    ///
    /// # Errors
    /// `RuntimeError::QueueFull` when the queue is at capacity (retryable).
    pub fn submit(&self, request: GovernanceRequest) -> ZeroPointResult<Ticket> {
        let name = request.name();
        let (reply, rx) = bounded::<Reply>(1);
        self.try_submit(Job::Execute { request, reply })?;
        Ok(Ticket { request: name, rx })
    }

    /// Queue a request and wait for the answer.
    pub fn execute(&self, request: GovernanceRequest) -> Reply {
        self.submit(request)?.join()
    }

    /// Governed write through the worker.
    pub fn write(&self, request: WriteRequest) -> ZeroPointResult<WriteOutcome> {
        match self.execute(GovernanceRequest::Write(request))? {
            GovernanceResponse::Write(outcome) => Ok(outcome),
            _ => Err(RuntimeError::UnexpectedResponse { expected: "write" }.into()),
        }
    }

    /// Simulation through the worker.
    pub fn simulate(&self, request: SimulationRequest) -> ZeroPointResult<SimulationReport> {
        match self.execute(GovernanceRequest::Simulate(request))? {
            GovernanceResponse::Simulate(report) => Ok(*report),
            _ => Err(RuntimeError::UnexpectedResponse { expected: "simulate" }.into()),
        }
    }

    /// The store behind the worker.
    #[must_use]
    pub fn store(&self) -> &ZeroPoint {
        &self.store
    }

    /// The twin behind the worker.
    #[must_use]
    pub fn twin(&self) -> &DigitalTwin {
        &self.twin
    }

    /// Stop accepting work, drain queued requests, and join the worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the channel lets the worker drain the queue and exit.
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    #[cfg(test)]
    fn submit_sleep(&self, duration: Duration) -> ZeroPointResult<Receiver<()>> {
        let (reply, rx) = bounded::<()>(1);
        self.try_submit(Job::Sleep { duration, reply })?;
        Ok(rx)
    }
}

impl Drop for GovernanceRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TwinConfig;
    use crate::confidence::ConfidenceLevel;
    use crate::entry::MemoryKind;

    fn runtime(capacity: usize) -> GovernanceRuntime {
        GovernanceRuntime::start(
            Arc::new(ZeroPoint::in_memory()),
            Arc::new(DigitalTwin::new(TwinConfig::default()).unwrap()),
            RuntimeConfig {
                queue_capacity: capacity,
            },
        )
        .unwrap()
    }

    fn governed(content: &str) -> WriteRequest {
        WriteRequest::new(content, MemoryKind::Insight)
            .source("notes")
            .author("AGENT")
            .confidence(ConfidenceLevel::Medium)
            .evidence(2)
    }

    #[test]
    fn test_write_through_worker_lands_in_store() {
        let rt = runtime(8);
        let outcome = rt.write(governed("queued claim")).unwrap();
        let id = outcome.entry_id().unwrap().clone();
        assert!(rt.store().get(&id).unwrap().is_some());
    }

    #[test]
    fn test_full_queue_is_retryable_back_pressure() {
        let rt = runtime(1);
        let sleeping = rt.submit_sleep(Duration::from_millis(200)).unwrap();
        // The worker holds the sleep job; this one fills the single slot.
        let mut queued = None;
        let mut saw_full = false;
        for _ in 0..3 {
            match rt.submit(GovernanceRequest::Stats) {
                Ok(ticket) => queued = Some(ticket),
                Err(err) => {
                    assert!(matches!(err, ZeroPointError::Runtime(RuntimeError::QueueFull { capacity: 1 })));
                    assert!(err.is_retryable());
                    saw_full = true;
                    break;
                }
            }
        }
        assert!(saw_full);
        sleeping.recv_timeout(Duration::from_secs(2)).unwrap();
        if let Some(ticket) = queued {
            assert!(matches!(ticket.join().unwrap(), GovernanceResponse::Stats(_)));
        }
    }

    #[test]
    fn test_join_timeout_reports_timeout() {
        let rt = runtime(4);
        let _sleeping = rt.submit_sleep(Duration::from_millis(200)).unwrap();
        let ticket = rt.submit(GovernanceRequest::Stats).unwrap();
        let err = ticket.join_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, ZeroPointError::Runtime(RuntimeError::Timeout { duration_ms: 10 })));
    }

    #[test]
    fn test_join_reports_disconnected_when_reply_dropped() {
        let (tx, rx) = bounded::<Reply>(1);
        drop(tx);
        let ticket = Ticket { request: "stats", rx };
        let err = ticket.join().unwrap_err();
        assert!(matches!(err, ZeroPointError::Runtime(RuntimeError::Disconnected)));
    }

    #[test]
    fn test_shutdown_drains_queued_requests() {
        let rt = runtime(16);
        let store_handle = Arc::clone(&rt.store);
        let _sleeping = rt.submit_sleep(Duration::from_millis(50)).unwrap();
        let tickets: Vec<_> = (0..5)
            .map(|i| rt.submit(GovernanceRequest::Write(governed(&format!("claim {i}")))).unwrap())
            .collect();
        rt.shutdown();

        assert_eq!(store_handle.len().unwrap(), 5);
        for ticket in tickets {
            assert!(matches!(ticket.join().unwrap(), GovernanceResponse::Write(ref o) if o.is_accepted()));
        }
    }
}
