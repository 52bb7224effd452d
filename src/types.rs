//! Core data types for the probeflow runtime
//!
//! This module contains the fundamental data structures used throughout
//! the crate for representing probe output, lifecycle state, and
//! emission statistics.
//!
//! # Main Types
//!
//! - [`ProbeState`] - The three-state probe lifecycle (Disabled/Enabled/Running)
//! - [`ProbeOutput`] - A single emitted value: identity, payload, timestamp
//! - [`RetentionPolicy`] - What happens to resources after the last listener leaves
//! - [`EmitStats`] - Running counters for a probe's emission activity
//!
//! # Lifecycle
//!
//! A probe moves `Disabled → Enabled → Running → Enabled → Disabled`.
//! `Running` is reachable only from `Enabled`; `Disabled` is the initial
//! and terminal state. The transitions are driven by demand (listener
//! registration), not called directly by producers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProbeState {
    /// No underlying resources held. Initial and terminal state.
    #[default]
    Disabled,
    /// Underlying resources acquired, not producing values.
    Enabled,
    /// Actively producing values. Implies resources are held.
    Running,
}

impl ProbeState {
    /// Returns true if underlying resources are currently held
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ProbeState::Disabled)
    }

    /// Returns true if the probe is actively producing values
    pub fn is_running(&self) -> bool {
        matches!(self, ProbeState::Running)
    }
}

impl std::fmt::Display for ProbeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeState::Disabled => write!(f, "disabled"),
            ProbeState::Enabled => write!(f, "enabled"),
            ProbeState::Running => write!(f, "running"),
        }
    }
}

/// What a shared probe does with its resources once its demand count
/// returns to zero.
///
/// The stop transition always runs when the last listener leaves; this
/// policy only decides whether disable follows immediately. The runtime
/// owns no timers, so a delayed disable is driven by whoever schedules
/// calls into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RetentionPolicy {
    /// Stop, then release resources right away.
    #[default]
    DisableImmediately,
    /// Stop, but hold resources in `Enabled` until an explicit `disable`.
    RetainEnabled,
}

/// A single value emitted by a probe to its listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutput {
    /// Identity of the emitting probe (runtime type name)
    pub identity: String,
    /// The produced payload
    pub payload: Value,
    /// Wall-clock time of emission
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutput {
    /// Create an output stamped with the current time
    pub fn new(identity: impl Into<String>, payload: Value) -> Self {
        Self {
            identity: identity.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Running counters for a probe's emission activity
///
/// Tracks how many values were fanned out, how many were dropped because
/// the probe was not running, and how many completed signals were sent.
#[derive(Debug, Clone, Default)]
pub struct EmitStats {
    /// Values delivered to at least the fan-out stage
    pub emitted: u64,
    /// Values dropped because the probe was not running
    pub dropped: u64,
    /// Terminal completed signals sent (one per disable)
    pub completed_signals: u64,
}

impl EmitStats {
    /// Record a delivered emission
    pub fn record_emit(&mut self) {
        self.emitted += 1;
    }

    /// Record a value dropped while inactive
    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    /// Record a completed signal
    pub fn record_completed(&mut self) {
        self.completed_signals += 1;
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
