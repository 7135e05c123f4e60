use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::SendError, UnboundedSender};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs emission jobs on a later turn than the one that scheduled them.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, job: Job);

    /// Runs queued jobs inline, for schedulers that hold them until asked.
    fn run_pending(&self) -> usize {
        0
    }
}

/// Spawns jobs onto the ambient tokio runtime.
///
/// Outside a runtime, jobs go to a single `profilr-emit` worker thread that
/// runs them one at a time in the order they were scheduled.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, job: Job) {
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { job() });
            }
            Err(_) => {
                if let Err(SendError(job)) = emit_worker().send(job) {
                    warn!("emission worker unavailable, running job inline");
                    job();
                }
            }
        }
    }
}

static EMIT_WORKER: OnceLock<UnboundedSender<Job>> = OnceLock::new();

fn emit_worker() -> &'static UnboundedSender<Job> {
    EMIT_WORKER.get_or_init(|| {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let spawned = std::thread::Builder::new()
            .name("profilr-emit".to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job();
                }
            });
        match spawned {
            Ok(_) => debug!("no tokio runtime, started emission worker"),
            // The receiver went down with the closure, so every send fails
            // and jobs run inline.
            Err(e) => error!("failed to spawn emission worker: {}", e),
        }
        tx
    })
}

/// Explicit FIFO of jobs, drained by [`DeferredQueue::run_pending`].
#[derive(Clone, Default)]
pub struct DeferredQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scheduler for DeferredQueue {
    fn schedule(&self, job: Job) {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(job);
    }

    /// Runs the jobs queued so far. Jobs they enqueue wait for the next call.
    fn run_pending(&self) -> usize {
        let batch = std::mem::take(&mut *self.jobs.lock().unwrap_or_else(PoisonError::into_inner));
        let ran = batch.len();
        for job in batch {
            job();
        }
        ran
    }
}

/// Counts scheduled-but-unfinished emissions so callers can wait for them.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub(crate) fn begin(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }

    pub(crate) fn pending(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Released when its job finishes or is dropped without running.
pub(crate) struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}
