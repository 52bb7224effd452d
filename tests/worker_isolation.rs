//! Integration tests for execution isolation.
//!
//! These tests validate the worker-context contract end to end:
//! - Long-running work never blocks the triggering thread
//! - Strict FIFO within one context, none across contexts
//! - Release semantics: queued work drains, fresh context on next need

mod common;

use probeflow::{Action, ActionRunner, WorkerContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(check: impl Fn() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not reached in time");
}

struct SlowFlush {
    long_running: bool,
    flushed: Arc<AtomicUsize>,
}

impl Action for SlowFlush {
    fn is_long_running(&self) -> bool {
        self.long_running
    }

    fn execute(&self) {
        thread::sleep(Duration::from_millis(40));
        self.flushed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_long_running_hand_off_is_non_blocking() {
    let flushed = Arc::new(AtomicUsize::new(0));
    let runner = ActionRunner::new(
        "flush",
        SlowFlush {
            long_running: true,
            flushed: Arc::clone(&flushed),
        },
    );

    let before = Instant::now();
    runner.run_now().unwrap();
    assert!(
        before.elapsed() < Duration::from_millis(40),
        "hand-off returned before the work completed"
    );
    assert_eq!(flushed.load(Ordering::SeqCst), 0);

    wait_until(|| flushed.load(Ordering::SeqCst) == 1);
}

#[test]
fn test_short_unit_blocks_the_caller() {
    let flushed = Arc::new(AtomicUsize::new(0));
    let runner = ActionRunner::new(
        "inline-flush",
        SlowFlush {
            long_running: false,
            flushed: Arc::clone(&flushed),
        },
    );

    runner.run_now().unwrap();
    assert_eq!(flushed.load(Ordering::SeqCst), 1, "work done before return");
    assert!(!runner.has_context());
}

#[test]
fn test_submission_order_is_execution_order() {
    let ctx = WorkerContext::new("fifo").unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..50 {
        let order = Arc::clone(&order);
        ctx.post(move || order.lock().unwrap().push(i)).unwrap();
    }

    wait_until(|| order.lock().unwrap().len() == 50);
    assert_eq!(*order.lock().unwrap(), (0..50).collect::<Vec<_>>());
}

#[test]
fn test_contexts_run_in_parallel() {
    let a = WorkerContext::new("parallel-a").unwrap();
    let b = WorkerContext::new("parallel-b").unwrap();
    let done = Arc::new(AtomicUsize::new(0));

    for ctx in [&a, &b] {
        let done = Arc::clone(&done);
        ctx.post(move || {
            thread::sleep(Duration::from_millis(50));
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    let before = Instant::now();
    wait_until(|| done.load(Ordering::SeqCst) == 2);
    // Serialized execution would need ~100ms.
    assert!(before.elapsed() < Duration::from_millis(95));
}

#[test]
fn test_release_does_not_cancel_queued_work() {
    let flushed = Arc::new(AtomicUsize::new(0));
    let runner = Arc::new(ActionRunner::new(
        "drain",
        SlowFlush {
            long_running: true,
            flushed: Arc::clone(&flushed),
        },
    ));

    for _ in 0..3 {
        runner.run_now().unwrap();
    }
    runner.release();
    assert!(!runner.has_context());

    // Everything queued before the release still runs.
    wait_until(|| flushed.load(Ordering::SeqCst) == 3);

    // The next invocation builds a fresh context.
    runner.run_now().unwrap();
    assert!(runner.has_context());
    wait_until(|| flushed.load(Ordering::SeqCst) == 4);
}

#[test]
fn test_listener_hand_off_keeps_emission_cheap() {
    use common::probes::{test_runtime, TransitionCounters, PULSE};
    use probeflow::{DataListener, FnListener};

    let runtime = test_runtime(TransitionCounters::new());
    let probe = runtime.resolve_str(r#"{"@type":"sensor.pulse"}"#, PULSE).unwrap();

    let flushed = Arc::new(AtomicUsize::new(0));
    let runner = Arc::new(ActionRunner::new(
        "archive",
        SlowFlush {
            long_running: true,
            flushed: Arc::clone(&flushed),
        },
    ));

    // The listener only hands off; the slow archive step runs on the
    // action's own context, never on the emitting thread.
    let hand_off = Arc::clone(&runner);
    let listener: Arc<dyn DataListener> = FnListener::new(move |_| {
        hand_off.run_now().unwrap();
    });
    probe.add_listener(listener).unwrap();

    let before = Instant::now();
    probe.emitter().emit(serde_json::json!(1));
    assert!(before.elapsed() < Duration::from_millis(40));

    wait_until(|| flushed.load(Ordering::SeqCst) == 2);
}
