//! Probe abstraction and shared lifecycle management.
//!
//! A probe is a shared, configurable unit that produces values to
//! registered listeners. The [`Probe`] trait carries the four lifecycle
//! hooks; [`ProbeHandle`] wraps a probe instance with the state machine,
//! demand-counted listener set, and fan-out. Consumers never hold a
//! probe directly; they hold a [`SharedProbe`] borrowed from the
//! instance cache.
//!
//! # Lifecycle hooks
//!
//! - `on_enable` / `on_disable`: acquire and release the underlying
//!   resource (a sensor handle, a feed subscription).
//! - `on_start` / `on_stop`: begin and end active production.
//!
//! Each hook runs exactly once per boundary crossing, no matter how many
//! listeners are registered; the handle drives them from demand.

pub mod handle;
pub mod listener;

#[cfg(feature = "mock-probe")]
pub mod mock;

pub use handle::{Emitter, ProbeHandle, SharedProbe};
pub use listener::{listener_eq, DataListener, FnListener};

#[cfg(feature = "mock-probe")]
pub use mock::MockProbe;

use crate::config::Configurable;
use crate::error::Result;
use crate::types::RetentionPolicy;
use serde_json::Value;

/// Context passed to probe lifecycle hooks.
pub struct ProbeContext<'a> {
    /// Emission handle for this probe. Long-lived producers clone it.
    pub emitter: &'a Emitter,
}

/// A shared, lifecycle-managed unit that produces values.
///
/// Implementations are constructed by a zero-argument factory registered
/// in the [`crate::registry::TypeRegistry`], then configured through the
/// [`Configurable`] schema. All hooks have no-op defaults; a probe only
/// overrides the boundaries it cares about.
pub trait Probe: Configurable + Send {
    /// Runtime type name. Doubles as the emission identity.
    fn type_name(&self) -> &'static str;

    /// Resource policy once the demand count returns to zero.
    fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::DisableImmediately
    }

    /// Optional checkpoint attached to the terminal completed signal.
    fn checkpoint(&self) -> Option<Value> {
        None
    }

    /// Acquire the underlying resource. A failure leaves the probe
    /// disabled and propagates to the caller that triggered the
    /// transition.
    fn on_enable(&mut self, ctx: &mut ProbeContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Begin active production of values.
    fn on_start(&mut self, ctx: &mut ProbeContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// End active production. Errors are logged, never propagated.
    fn on_stop(&mut self, ctx: &mut ProbeContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Release the underlying resource. Errors are logged, never
    /// propagated; the state machine still reaches `Disabled`.
    fn on_disable(&mut self, ctx: &mut ProbeContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}
