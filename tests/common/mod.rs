//! Shared helpers for integration tests.

#![allow(dead_code)] // Each integration binary uses a subset of helpers.

pub mod probes;

use probeflow::{DataListener, ProbeOutput};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Listener that records everything it sees.
#[derive(Default)]
pub struct CollectingListener {
    outputs: Mutex<Vec<ProbeOutput>>,
    completions: Mutex<Vec<(String, Option<Value>)>>,
}

impl CollectingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.outputs
            .lock()
            .unwrap()
            .iter()
            .map(|o| o.payload.clone())
            .collect()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.lock().unwrap().len()
    }

    pub fn identities(&self) -> Vec<String> {
        self.outputs
            .lock()
            .unwrap()
            .iter()
            .map(|o| o.identity.clone())
            .collect()
    }

    pub fn completions(&self) -> Vec<(String, Option<Value>)> {
        self.completions.lock().unwrap().clone()
    }
}

impl DataListener for CollectingListener {
    fn on_data(&self, output: &ProbeOutput) {
        self.outputs.lock().unwrap().push(output.clone());
    }

    fn on_completed(&self, identity: &str, checkpoint: Option<&Value>) {
        self.completions
            .lock()
            .unwrap()
            .push((identity.to_string(), checkpoint.cloned()));
    }
}
