//! Execution isolation for long-running units of work.
//!
//! Every unit of work self-declares whether it is long-running. Short
//! units execute synchronously on the caller. Long-running units get a
//! dedicated [`WorkerContext`], created lazily on first invocation and
//! released explicitly, and [`ActionRunner::run_now`] marshals the
//! invocation onto it unless the caller is already executing there, in
//! which case it runs inline (re-entrant calls never hand off again, so
//! they cannot deadlock on their own queue).
//!
//! This is what lets a slow step (an I/O-bound flush, a sensor
//! finalization) run without blocking whichever context triggered it,
//! while keeping everything submitted to one unit strictly ordered.

pub mod context;

pub use context::{current_context, ContextId, WorkerContext};

use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A unit of work with a self-declared execution profile.
///
/// Long-running actions execute only on their own worker context, so
/// `execute` is never entered from two threads at once; state lives in
/// interior mutability (atomics, mutexed fields) as needed.
pub trait Action: Send + Sync {
    /// Whether invocations must be isolated from the caller's context.
    fn is_long_running(&self) -> bool {
        false
    }

    /// Perform the work.
    fn execute(&self);
}

/// Drives an [`Action`], owning its serialized context when the action
/// is long-running.
pub struct ActionRunner {
    label: String,
    long_running: bool,
    action: Arc<dyn Action>,
    /// Lazily-created context slot. The mutex makes concurrent first
    /// invocations race safely to exactly one context.
    context: Mutex<Option<WorkerContext>>,
}

impl ActionRunner {
    pub fn new(label: impl Into<String>, action: impl Action + 'static) -> Self {
        let long_running = action.is_long_running();
        Self {
            label: label.into(),
            long_running,
            action: Arc::new(action),
            context: Mutex::new(None),
        }
    }

    /// Execute the action: synchronously on the caller for short units
    /// and re-entrant calls, enqueued (returning before the work
    /// completes) otherwise.
    pub fn run_now(&self) -> Result<()> {
        if !self.long_running {
            self.action.execute();
            return Ok(());
        }

        let is_current = {
            let mut slot = lock(&self.context);
            if slot.is_none() {
                *slot = Some(WorkerContext::new(&self.label)?);
            }
            match slot.as_ref() {
                Some(ctx) if ctx.is_current() => true,
                Some(ctx) => {
                    let action = Arc::clone(&self.action);
                    ctx.post(move || action.execute())?;
                    false
                }
                None => false,
            }
        };
        if is_current {
            self.action.execute();
        }
        Ok(())
    }

    /// Release the dedicated context. Already-queued invocations still
    /// run; the next `run_now` creates a fresh context.
    pub fn release(&self) {
        if lock(&self.context).take().is_some() {
            tracing::debug!(action = %self.label, "worker context released");
        }
    }

    /// Whether a dedicated context currently exists.
    pub fn has_context(&self) -> bool {
        lock(&self.context).is_some()
    }

    /// The identity of the current context, if one exists.
    pub fn context_id(&self) -> Option<ContextId> {
        lock(&self.context).as_ref().map(WorkerContext::id)
    }
}
