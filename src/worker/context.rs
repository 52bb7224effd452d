//! Dedicated serialized execution contexts.
//!
//! A [`WorkerContext`] is one worker thread draining a FIFO queue. Every
//! job posted to the same context executes in submission order; jobs on
//! different contexts have no ordering relationship. The worker thread
//! records its context identity in a thread-local so callers can detect
//! "already on this context" and run inline instead of enqueueing.
//!
//! Dropping a context (releasing it) closes the queue: already-queued
//! work still drains, the thread then exits on its own. A released
//! context is never reused; the owner creates a fresh one on next need.

use crate::error::{ProbeFlowError, Result};
use crossbeam_channel::{unbounded, Sender};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a serialized execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_CONTEXT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

/// The context the calling thread is executing on, if any.
pub fn current_context() -> Option<ContextId> {
    CURRENT_CONTEXT.with(Cell::get)
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A lazily-created, serialized execution context: one dedicated worker
/// thread, one FIFO queue.
pub struct WorkerContext {
    id: ContextId,
    tx: Sender<Job>,
}

impl WorkerContext {
    /// Spawn the worker thread and open the queue.
    pub fn new(label: &str) -> Result<Self> {
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = unbounded::<Job>();
        let thread_label = label.to_string();

        std::thread::Builder::new()
            .name(format!("probeflow-{label}"))
            .spawn(move || {
                CURRENT_CONTEXT.with(|current| current.set(Some(id)));
                tracing::debug!(context = %thread_label, "worker context started");
                // Drains until every sender is dropped, then exits: a
                // release never cancels already-queued work.
                for job in rx {
                    job();
                }
                tracing::debug!(context = %thread_label, "worker context exiting");
            })?;

        Ok(Self { id, tx })
    }

    /// This context's identity.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Whether the calling thread is already executing on this context.
    pub fn is_current(&self) -> bool {
        current_context() == Some(self.id)
    }

    /// Enqueue a job for serialized execution. Non-blocking.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.tx
            .send(Box::new(job))
            .map_err(|_| ProbeFlowError::Channel("worker context queue closed".to_string()))
    }
}
