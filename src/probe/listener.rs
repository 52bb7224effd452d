//! Listener registration against probes and pipelines.
//!
//! A listener is an opaque callback target. Identity is `Arc` pointer
//! identity: registering the same `Arc` twice is a no-op with respect to
//! the demand count, mirrored by idempotent unregistration.
//!
//! Callbacks run on whatever thread emitted the value, with no probe
//! lock held. A callback that needs to drive the *same* probe's
//! lifecycle (e.g. unsubscribe on a sentinel value) should hand that
//! call off to a [`crate::worker::WorkerContext`] rather than call back
//! synchronously.

use crate::types::ProbeOutput;
use serde_json::Value;
use std::sync::Arc;

/// Callback target registered against a probe or pipeline.
pub trait DataListener: Send + Sync {
    /// A value was produced upstream.
    fn on_data(&self, output: &ProbeOutput);

    /// The stream completed: the producing probe disabled. The optional
    /// checkpoint lets a consumer flush and release its own resources.
    fn on_completed(&self, identity: &str, checkpoint: Option<&Value>) {
        let _ = (identity, checkpoint);
    }
}

/// Listener identity comparison (pointer identity).
pub fn listener_eq(a: &Arc<dyn DataListener>, b: &Arc<dyn DataListener>) -> bool {
    Arc::ptr_eq(a, b)
}

/// Adapter turning a closure into a [`DataListener`].
pub struct FnListener<F>
where
    F: Fn(&ProbeOutput) + Send + Sync,
{
    callback: F,
}

impl<F> FnListener<F>
where
    F: Fn(&ProbeOutput) + Send + Sync,
{
    /// Wrap a closure as a listener, ready for registration.
    pub fn new(callback: F) -> Arc<Self> {
        Arc::new(Self { callback })
    }
}

impl<F> DataListener for FnListener<F>
where
    F: Fn(&ProbeOutput) + Send + Sync,
{
    fn on_data(&self, output: &ProbeOutput) {
        (self.callback)(output);
    }
}
