//! Filtering between a pipeline node's upstream and its output.
//!
//! A filter maps each upstream output to zero or one outputs. When a
//! node has no filter configured, values pass through unchanged.

use crate::types::ProbeOutput;

/// Maps an upstream output to zero or one downstream outputs.
pub trait Filter: Send + Sync {
    /// Return `None` to drop the value, or a (possibly transformed)
    /// output to forward.
    fn apply(&self, output: &ProbeOutput) -> Option<ProbeOutput>;
}

/// Adapter turning a closure into a [`Filter`].
pub struct FnFilter<F>
where
    F: Fn(&ProbeOutput) -> Option<ProbeOutput> + Send + Sync,
{
    function: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&ProbeOutput) -> Option<ProbeOutput> + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> Filter for FnFilter<F>
where
    F: Fn(&ProbeOutput) -> Option<ProbeOutput> + Send + Sync,
{
    fn apply(&self, output: &ProbeOutput) -> Option<ProbeOutput> {
        (self.function)(output)
    }
}
