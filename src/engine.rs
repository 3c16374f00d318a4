//! Transform engines: where plans come from and how they are applied.
//!
//! The binding never runs butterflies itself. It asks a [`TransformEngine`]
//! for a context sized to the input, applies it to one column at a time and
//! hands it back. [`ButterflyEngine`] is the in-process default; tests can
//! substitute any other implementation, such as
//! [`ReferenceEngine`](crate::reference::ReferenceEngine).

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::config::TransformConfig;
use crate::error::{Result, WhtError};
use crate::plan::{PlanNode, WhtPlan};

/// Source of transform execution contexts.
///
/// A context is acquired once per call, shared read-only by every column of
/// that call, and released before the call returns. Contexts must be `Sync`
/// so that columns may be transformed in parallel.
pub trait TransformEngine: Sync {
    /// Execution context for one transform size.
    type Context: Sync;

    /// Builds or fetches the context for vectors of length 2^`log2_len`.
    ///
    /// Returns `None` when the engine cannot supply one.
    fn acquire(&self, log2_len: u32) -> Option<Self::Context>;

    /// Applies the unnormalized transform to `buffer` in place.
    ///
    /// Fails with [`WhtError::InvalidDimension`] when `buffer.len()` is not
    /// the length the context was acquired for.
    fn apply(&self, context: &Self::Context, buffer: &mut [f64]) -> Result<()>;

    /// Frees whatever the engine holds for `context`.
    fn release(&self, context: Self::Context) {
        drop(context);
    }
}

/// In-process engine that factors every size into butterfly codelets on demand.
#[derive(Clone, Debug)]
pub struct ButterflyEngine {
    max_codelet_log2: u32,
    max_log2_len: u32,
    trees: HashMap<u32, PlanNode>,
}

impl ButterflyEngine {
    /// Engine with the default configuration.
    pub fn new() -> Self {
        Self::from_config(&TransformConfig::default())
    }

    /// Engine using the codelet size and size limit of `config`.
    pub fn from_config(config: &TransformConfig) -> Self {
        Self {
            max_codelet_log2: config.max_codelet_log2,
            max_log2_len: config.max_log2_len,
            trees: HashMap::new(),
        }
    }

    /// Uses `tree` instead of the default factorization for its size.
    ///
    /// The tree is validated here, so a bad override fails at setup rather
    /// than at the first transform of that size.
    pub fn with_tree(mut self, tree: PlanNode) -> Result<Self> {
        tree.validate()?;
        self.trees.insert(tree.log2_len(), tree);
        Ok(self)
    }

    /// Parses and installs a tree in `split[...]` / `small[k]` notation.
    pub fn with_tree_str(self, tree: &str) -> Result<Self> {
        let tree: PlanNode = tree.parse()?;
        self.with_tree(tree)
    }

    /// Builds the plan for 2^`log2_len` without the size limit check.
    pub fn plan(&self, log2_len: u32) -> Result<WhtPlan> {
        match self.trees.get(&log2_len) {
            Some(tree) => WhtPlan::from_tree(tree.clone()),
            None => WhtPlan::new(log2_len, self.max_codelet_log2),
        }
    }

    pub fn max_log2_len(&self) -> u32 {
        self.max_log2_len
    }
}

impl Default for ButterflyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformEngine for ButterflyEngine {
    type Context = WhtPlan;

    fn acquire(&self, log2_len: u32) -> Option<WhtPlan> {
        if log2_len > self.max_log2_len {
            warn!(
                log2_len,
                max_log2_len = self.max_log2_len,
                "transform size above configured limit"
            );
            return None;
        }

        match self.plan(log2_len) {
            Ok(plan) => {
                debug!(log2_len, tree = %plan.tree(), "built transform plan");
                Some(plan)
            }
            Err(err) => {
                warn!(log2_len, error = %err, "could not build transform plan");
                None
            }
        }
    }

    fn apply(&self, context: &WhtPlan, buffer: &mut [f64]) -> Result<()> {
        context.apply(buffer)
    }

    fn release(&self, context: WhtPlan) {
        trace!(log2_len = context.log2_len(), "released transform plan");
    }
}
