//! Tuning knobs for plan construction and column scheduling.

use crate::error::{Result, WhtError};
use crate::plan::{MAX_CODELET_LOG2, MAX_PLAN_LOG2};

/// How the per-column loop is scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// One column after another on the calling thread.
    Sequential,
    /// Columns spread over the rayon pool once there are at least
    /// `min_columns` of them.
    Columns { min_columns: usize },
}

/// Configuration for [`TransformBinding`](crate::binding::TransformBinding)
/// and [`ButterflyEngine`](crate::engine::ButterflyEngine).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformConfig {
    /// Largest codelet the default factorization uses, as log2 of its length.
    pub max_codelet_log2: u32,
    /// Largest transform the engine will plan, as log2 of the column length.
    pub max_log2_len: u32,
    /// Column scheduling.
    pub parallel: ParallelPolicy,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_codelet_log2: MAX_CODELET_LOG2,
            max_log2_len: 30,
            parallel: ParallelPolicy::Columns { min_columns: 64 },
        }
    }
}

impl TransformConfig {
    /// Everything on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel: ParallelPolicy::Sequential,
            ..Self::default()
        }
    }

    /// Parallelizes from the second column on; for wide batches of short
    /// columns.
    pub fn throughput() -> Self {
        Self {
            parallel: ParallelPolicy::Columns { min_columns: 2 },
            ..Self::default()
        }
    }

    /// Checks every field is in its supported range.
    pub fn validate(&self) -> Result<()> {
        if self.max_codelet_log2 == 0 || self.max_codelet_log2 > MAX_CODELET_LOG2 {
            return Err(WhtError::InvalidConfig(format!(
                "max_codelet_log2 must be in 1..={}, got {}",
                MAX_CODELET_LOG2, self.max_codelet_log2
            )));
        }
        if self.max_log2_len > MAX_PLAN_LOG2 {
            return Err(WhtError::InvalidConfig(format!(
                "max_log2_len must be at most {}, got {}",
                MAX_PLAN_LOG2, self.max_log2_len
            )));
        }
        if let ParallelPolicy::Columns { min_columns: 0 } = self.parallel {
            return Err(WhtError::InvalidConfig(
                "parallel min_columns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `columns` columns should go through the parallel path.
    pub fn parallel_for(&self, columns: usize) -> bool {
        match self.parallel {
            ParallelPolicy::Sequential => false,
            ParallelPolicy::Columns { min_columns } => columns >= min_columns,
        }
    }
}
