//! Error handling for the probeflow runtime
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate. Construction-time errors (`MalformedConfig`,
//! `UnresolvableType`) abort graph building for the affected subtree;
//! runtime errors (`ResourceAcquisition`) propagate to whichever caller
//! triggered the transition; teardown errors are logged, never propagated.

use thiserror::Error;

/// Main error type for probeflow operations
#[derive(Error, Debug)]
pub enum ProbeFlowError {
    /// The configuration document is not structurally valid
    #[error("Malformed configuration: {0}")]
    MalformedConfig(String),

    /// The type discriminator is missing/unknown and no usable default exists
    #[error("Unresolvable type for base '{base}': {message}")]
    UnresolvableType { base: String, message: String },

    /// A probe failed to acquire its underlying resource on enable
    #[error("Resource acquisition failed for '{probe}': {message}")]
    ResourceAcquisition { probe: String, message: String },

    /// A probe failed to release a resource. Best-effort: logged by the
    /// state machine, surfaced only through transition hooks.
    #[error("Teardown failed for '{probe}': {message}")]
    Teardown { probe: String, message: String },

    /// Errors related to listener or worker channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors related to a probe's own operation while producing values
    #[error("Probe error: {0}")]
    Probe(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProbeFlowError>,
    },
}

impl ProbeFlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProbeFlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for an unresolvable-type error
    pub fn unresolvable(base: impl Into<String>, message: impl Into<String>) -> Self {
        ProbeFlowError::UnresolvableType {
            base: base.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for probeflow operations
pub type Result<T> = std::result::Result<T, ProbeFlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
