//! Shared probe handle: the lifecycle state machine and fan-out.
//!
//! A [`ProbeHandle`] owns one probe instance and everything shared about
//! it: the three-state lifecycle, the demand-counted listener set, and
//! the [`Emitter`] that fans produced values out to listeners.
//!
//! # Demand-based multiplexing
//!
//! The first listener added triggers enable (if needed) and start; the
//! last listener removed triggers stop and, policy permitting, disable.
//! The transition hooks run exactly once per boundary crossing no matter
//! how many listeners are registered, so N consumers never open the
//! underlying resource N times.
//!
//! # Locking
//!
//! Two locks, always acquired lifecycle-first: the lifecycle mutex
//! serializes state transitions and demand changes; the listener mutex
//! guards only the membership vector. Neither is held across a listener
//! callback; emission snapshots the listener set and invokes callbacks
//! lock-free.

use crate::error::{ProbeFlowError, Result, ResultExt};
use crate::probe::listener::{listener_eq, DataListener};
use crate::probe::{Probe, ProbeContext};
use crate::registry::ProbeDescriptor;
use crate::types::{EmitStats, ProbeOutput, ProbeState, RetentionPolicy};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// How consumers hold a probe: shared, never copied.
pub type SharedProbe = Arc<ProbeHandle>;

/// Lock helper that survives poisoning: a panicked listener callback on
/// another thread must not wedge the whole graph.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The parts shared between a handle and its emitters.
struct FanOut {
    identity: String,
    listeners: Mutex<Vec<Arc<dyn DataListener>>>,
    stats: Mutex<EmitStats>,
    /// Mirrors `state.is_running()` for lock-free emission checks.
    running: AtomicBool,
}

impl FanOut {
    fn snapshot(&self) -> Vec<Arc<dyn DataListener>> {
        lock(&self.listeners).clone()
    }
}

/// Emission handle for a probe. Cheap to clone; producers running on
/// their own threads keep a clone.
#[derive(Clone)]
pub struct Emitter {
    fan_out: Arc<FanOut>,
}

impl Emitter {
    /// Identity stamped onto emitted outputs.
    pub fn identity(&self) -> &str {
        &self.fan_out.identity
    }

    /// Emit a payload to every registered listener, stamped with this
    /// probe's identity and the current time. Dropped (and counted) if
    /// the probe is not running.
    pub fn emit(&self, payload: Value) {
        if !self.fan_out.running.load(Ordering::SeqCst) {
            lock(&self.fan_out.stats).record_drop();
            return;
        }
        let output = ProbeOutput::new(self.fan_out.identity.clone(), payload);
        lock(&self.fan_out.stats).record_emit();
        for listener in self.fan_out.snapshot() {
            listener.on_data(&output);
        }
    }

    /// Forward an output produced elsewhere, preserving its identity and
    /// timestamp. Used by pipeline nodes relaying upstream values.
    pub fn forward(&self, output: ProbeOutput) {
        if !self.fan_out.running.load(Ordering::SeqCst) {
            lock(&self.fan_out.stats).record_drop();
            return;
        }
        lock(&self.fan_out.stats).record_emit();
        for listener in self.fan_out.snapshot() {
            listener.on_data(&output);
        }
    }

    /// Relay an upstream completed signal to this probe's listeners.
    pub fn forward_completed(&self, identity: &str, checkpoint: Option<&Value>) {
        for listener in self.fan_out.snapshot() {
            listener.on_completed(identity, checkpoint);
        }
    }

    fn complete(&self, checkpoint: Option<Value>) {
        lock(&self.fan_out.stats).record_completed();
        for listener in self.fan_out.snapshot() {
            listener.on_completed(&self.fan_out.identity, checkpoint.as_ref());
        }
    }
}

struct Lifecycle {
    state: ProbeState,
    probe: Box<dyn Probe>,
}

/// A shared probe instance with its lifecycle state machine.
pub struct ProbeHandle {
    descriptor: ProbeDescriptor,
    lifecycle: Mutex<Lifecycle>,
    emitter: Emitter,
}

impl std::fmt::Debug for ProbeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeHandle")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state())
            .field("demand", &self.demand())
            .finish()
    }
}

impl ProbeHandle {
    /// Wrap a constructed, configured probe under a descriptor. This is
    /// how the instance cache creates handles.
    pub fn new(descriptor: ProbeDescriptor, probe: Box<dyn Probe>) -> SharedProbe {
        let fan_out = Arc::new(FanOut {
            identity: descriptor.runtime_type.clone(),
            listeners: Mutex::new(Vec::new()),
            stats: Mutex::new(EmitStats::default()),
            running: AtomicBool::new(false),
        });
        Arc::new(Self {
            descriptor,
            lifecycle: Mutex::new(Lifecycle {
                state: ProbeState::Disabled,
                probe,
            }),
            emitter: Emitter { fan_out },
        })
    }

    /// Wrap a programmatically built probe (no configuration document);
    /// the descriptor is synthesized from the type name and the handle
    /// is not cached anywhere.
    pub fn wrap(probe: impl Probe + 'static) -> SharedProbe {
        let descriptor = ProbeDescriptor::direct(probe.type_name());
        Self::new(descriptor, Box::new(probe))
    }

    /// The identity key this instance was cached under.
    pub fn descriptor(&self) -> &ProbeDescriptor {
        &self.descriptor
    }

    /// Runtime type name, also the emission identity.
    pub fn identity(&self) -> &str {
        self.emitter.identity()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProbeState {
        lock(&self.lifecycle).state
    }

    /// Number of currently registered listeners.
    pub fn demand(&self) -> usize {
        lock(&self.emitter.fan_out.listeners).len()
    }

    /// Snapshot of the emission counters.
    pub fn stats(&self) -> EmitStats {
        lock(&self.emitter.fan_out.stats).clone()
    }

    /// The emission handle for this probe.
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    /// Run a closure against the inner probe instance. Intended for
    /// inspection; holds the lifecycle lock for the duration.
    pub fn with_probe<R>(&self, f: impl FnOnce(&dyn Probe) -> R) -> R {
        let lc = lock(&self.lifecycle);
        f(lc.probe.as_ref())
    }

    // ── Lifecycle operations ──

    /// Acquire underlying resources. No-op unless `Disabled`.
    pub fn enable(&self) -> Result<()> {
        let mut lc = lock(&self.lifecycle);
        self.do_enable(&mut lc)
    }

    /// Begin producing values, enabling first if necessary. No-op if
    /// already `Running`.
    pub fn start(&self) -> Result<()> {
        let mut lc = lock(&self.lifecycle);
        self.do_start(&mut lc)
    }

    /// End production. No-op unless `Running`. Hook errors are logged.
    pub fn stop(&self) {
        let mut lc = lock(&self.lifecycle);
        self.do_stop(&mut lc);
    }

    /// Release underlying resources, stopping first if necessary. No-op
    /// if already `Disabled`. Emits the terminal completed signal.
    pub fn disable(&self) {
        let completed = {
            let mut lc = lock(&self.lifecycle);
            self.do_disable(&mut lc)
        };
        if let Some(checkpoint) = completed {
            self.emitter.complete(checkpoint);
        }
    }

    // ── Demand-counted listener registration ──

    /// Register a listener. Idempotent per listener identity. The first
    /// registration drives the probe to `Running`; on transition failure
    /// the listener is not registered and the error propagates.
    pub fn add_listener(&self, listener: Arc<dyn DataListener>) -> Result<()> {
        let mut lc = lock(&self.lifecycle);
        let was_empty = {
            let mut listeners = lock(&self.emitter.fan_out.listeners);
            if listeners.iter().any(|l| listener_eq(l, &listener)) {
                return Ok(());
            }
            let was_empty = listeners.is_empty();
            listeners.push(Arc::clone(&listener));
            was_empty
        };
        if was_empty {
            if let Err(e) = self.do_start(&mut lc) {
                let mut listeners = lock(&self.emitter.fan_out.listeners);
                listeners.retain(|l| !listener_eq(l, &listener));
                return Err(e);
            }
        }
        Ok(())
    }

    /// Unregister a listener. Idempotent. Removing the last listener
    /// stops the probe and, per its retention policy, disables it.
    pub fn remove_listener(&self, listener: &Arc<dyn DataListener>) {
        let completed = {
            let mut lc = lock(&self.lifecycle);
            let now_empty = {
                let mut listeners = lock(&self.emitter.fan_out.listeners);
                let before = listeners.len();
                listeners.retain(|l| !listener_eq(l, listener));
                if listeners.len() == before {
                    return;
                }
                listeners.is_empty()
            };
            if !now_empty {
                return;
            }
            self.do_stop(&mut lc);
            match lc.probe.retention() {
                RetentionPolicy::DisableImmediately => self.do_disable(&mut lc),
                RetentionPolicy::RetainEnabled => None,
            }
        };
        if let Some(checkpoint) = completed {
            self.emitter.complete(checkpoint);
        }
    }

    // ── Transitions (lifecycle lock held) ──

    fn do_enable(&self, lc: &mut Lifecycle) -> Result<()> {
        if lc.state.is_enabled() {
            return Ok(());
        }
        let mut ctx = ProbeContext {
            emitter: &self.emitter,
        };
        lc.probe
            .on_enable(&mut ctx)
            .map_err(|e| ProbeFlowError::ResourceAcquisition {
                probe: self.identity().to_string(),
                message: e.to_string(),
            })?;
        lc.state = ProbeState::Enabled;
        tracing::debug!(probe = %self.identity(), "enabled");
        Ok(())
    }

    fn do_start(&self, lc: &mut Lifecycle) -> Result<()> {
        if lc.state.is_running() {
            return Ok(());
        }
        self.do_enable(lc)?;
        // Flip the flag first so values emitted from within on_start are
        // delivered, not dropped.
        self.emitter.fan_out.running.store(true, Ordering::SeqCst);
        let mut ctx = ProbeContext {
            emitter: &self.emitter,
        };
        if let Err(e) = lc.probe.on_start(&mut ctx) {
            self.emitter.fan_out.running.store(false, Ordering::SeqCst);
            return Err(e).with_context(|| format!("failed to start '{}'", self.identity()));
        }
        lc.state = ProbeState::Running;
        tracing::debug!(probe = %self.identity(), "started");
        Ok(())
    }

    fn do_stop(&self, lc: &mut Lifecycle) {
        if !lc.state.is_running() {
            return;
        }
        let mut ctx = ProbeContext {
            emitter: &self.emitter,
        };
        if let Err(e) = lc.probe.on_stop(&mut ctx) {
            tracing::warn!(probe = %self.identity(), error = %e, "stop hook failed; state advancing");
        }
        self.emitter.fan_out.running.store(false, Ordering::SeqCst);
        lc.state = ProbeState::Enabled;
        tracing::debug!(probe = %self.identity(), "stopped");
    }

    /// Returns `Some(checkpoint)` when a disable transition actually ran,
    /// so the caller can fire the completed signal after unlocking.
    fn do_disable(&self, lc: &mut Lifecycle) -> Option<Option<Value>> {
        if lc.state == ProbeState::Disabled {
            return None;
        }
        self.do_stop(lc);
        let mut ctx = ProbeContext {
            emitter: &self.emitter,
        };
        if let Err(e) = lc.probe.on_disable(&mut ctx) {
            tracing::warn!(probe = %self.identity(), error = %e, "disable hook failed; state advancing");
        }
        lc.state = ProbeState::Disabled;
        tracing::debug!(probe = %self.identity(), "disabled");
        Some(lc.probe.checkpoint())
    }
}
