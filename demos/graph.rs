//! End-to-end demo: build a probe graph from a JSON document.
//!
//! Run with: cargo run --example graph --features mock-probe

use anyhow::Result;
use probeflow::probe::mock::{self, MockCounters, MOCK_TYPE};
use probeflow::{DataListener, FnListener, PipelineNode, ProbeRuntime};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,probeflow=debug")),
        )
        .init();

    let counters = MockCounters::new();
    let mut runtime = ProbeRuntime::new();
    mock::register(runtime.registry_mut(), Arc::clone(&counters))?;
    runtime
        .registry_mut()
        .register("probe", "pipeline.passthrough", || Box::new(PipelineNode::new()));
    runtime.registry_mut().add_variant("probe", MOCK_TYPE)?;

    // One document: a wrapping stage over a configured mock sensor,
    // which itself embeds a nested source.
    let head = runtime.resolve_str(
        r#"{
            "@type": "pipeline.passthrough",
            "upstream": {
                "@type": "mock.probe",
                "value": 7,
                "source": {"@type": "mock.probe", "value": 3}
            }
        }"#,
        "probe",
    )?;

    tracing::info!(instances = runtime.live_count(), "graph resolved");

    let listener: Arc<dyn DataListener> = FnListener::new(|output| {
        println!("[{}] {} @ {}", output.identity, output.payload, output.timestamp);
    });

    // First listener drives the whole chain to Running.
    head.add_listener(Arc::clone(&listener))?;

    // Second resolution of an equivalent document (different key order,
    // nested type left to the default) reuses the cached instances.
    let before = runtime.live_count();
    runtime.resolve_str(
        r#"{"@type": "mock.probe", "source": {"value": 3}, "value": 7}"#,
        MOCK_TYPE,
    )?;
    tracing::info!(
        shared = runtime.live_count() == before,
        "equivalent configuration reuses the cached sensor"
    );

    // Last listener removal tears the chain down again.
    head.remove_listener(&listener);
    tracing::info!(
        enables = counters.enables.load(Ordering::SeqCst),
        disables = counters.disables.load(Ordering::SeqCst),
        "resource opened and closed exactly once"
    );

    runtime.shutdown();
    Ok(())
}
