//! Dense reference transform.
//!
//! Multiplies by the Sylvester-ordered Hadamard matrix directly, in O(n²).
//! Too slow for real inputs; it exists so fast plans and whole-binding
//! behavior can be checked against the textbook definition.

use crate::engine::TransformEngine;
use crate::error::{Result, WhtError};

/// Entry `(row, col)` of the unnormalized Hadamard matrix: `(-1)^popcount(row & col)`.
#[inline]
pub fn hadamard_entry(row: usize, col: usize) -> f64 {
    if (row & col).count_ones() % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// `H · x` for the Hadamard matrix `H` of order `x.len()`.
///
/// # Panics
/// If `x.len()` is not a power of two.
pub fn reference_transform(x: &[f64]) -> Vec<f64> {
    assert!(
        x.len().is_power_of_two(),
        "Hadamard transform requires power-of-2 length, got {}",
        x.len()
    );
    (0..x.len())
        .map(|row| {
            x.iter()
                .enumerate()
                .map(|(col, &value)| hadamard_entry(row, col) * value)
                .sum()
        })
        .collect()
}

/// Engine backed by [`reference_transform`].
///
/// Refuses sizes above `max_log2_len` so tests can also exercise the
/// plan-unavailable path.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceEngine {
    pub max_log2_len: u32,
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self { max_log2_len: 12 }
    }
}

impl TransformEngine for ReferenceEngine {
    type Context = u32;

    fn acquire(&self, log2_len: u32) -> Option<u32> {
        (log2_len <= self.max_log2_len).then_some(log2_len)
    }

    fn apply(&self, context: &u32, buffer: &mut [f64]) -> Result<()> {
        let expected = 1usize << *context;
        if buffer.len() != expected {
            return Err(WhtError::InvalidDimension {
                expected,
                got: buffer.len(),
            });
        }
        let out = reference_transform(buffer);
        buffer.copy_from_slice(&out);
        Ok(())
    }
}
