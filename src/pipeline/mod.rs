//! Composable pipelines over probes.
//!
//! A pipeline node wraps exactly one upstream source (a probe or
//! another pipeline) and exposes the same start/stop/listener contract
//! outward, optionally filtering values on the way through:
//!
//! ```text
//! [probe] ──► [PipelineNode (filter)] ──► [PipelineNode] ──► listeners
//!        └──► [sibling PipelineNode] ──► ...
//! ```
//!
//! # Design
//!
//! - **Same primitive**: a [`PipelineNode`] is itself a [`Probe`];
//!   wrapping it in a [`crate::probe::ProbeHandle`] reuses the demand
//!   counting, idempotence, and fan-out of the component state machine.
//! - **Install-once wiring**: `on_start` installs one forwarding
//!   listener on the upstream, guarded by a wired flag; repeated starts
//!   never double-register.
//! - **Depth-first propagation**: starting a chain head drives demand
//!   down to the producing probe; teardown propagates back up as each
//!   node withdraws its forwarding listener.

pub mod filter;
pub mod node;

pub use filter::{Filter, FnFilter};
pub use node::PipelineNode;

use crate::error::Result;
use crate::probe::{DataListener, ProbeHandle};
use std::sync::Arc;

/// The listener-registration contract shared by probes and pipelines.
///
/// Anything implementing this can sit upstream of a pipeline node.
pub trait DataSource: Send + Sync {
    /// Emission identity of this source.
    fn identity(&self) -> &str;

    /// Register a listener; first registration activates the source.
    fn add_listener(&self, listener: Arc<dyn DataListener>) -> Result<()>;

    /// Unregister a listener; last removal deactivates the source.
    fn remove_listener(&self, listener: &Arc<dyn DataListener>);
}

impl DataSource for ProbeHandle {
    fn identity(&self) -> &str {
        ProbeHandle::identity(self)
    }

    fn add_listener(&self, listener: Arc<dyn DataListener>) -> Result<()> {
        ProbeHandle::add_listener(self, listener)
    }

    fn remove_listener(&self, listener: &Arc<dyn DataListener>) {
        ProbeHandle::remove_listener(self, listener)
    }
}
