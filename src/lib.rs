//! Fast Walsh-Hadamard transform over the columns of a matrix.
//!
//! [`transform`] takes an `M x N` matrix whose column length `M` is a power
//! of two and returns the unnormalized Walsh-Hadamard transform of every
//! column. A single `1 x N` row is treated as one column and comes back as
//! `N x 1`. The transform itself is supplied by a [`TransformEngine`]; the
//! default [`ButterflyEngine`] builds butterfly plans in process.
//!
//! ```
//! use walsh_hadamard::{transform, Matrix};
//!
//! let input = Matrix::column_vector(vec![1.0, 1.0, 1.0, 1.0]);
//! let output = transform(&input).unwrap();
//! assert_eq!(output.as_slice(), &[4.0, 0.0, 0.0, 0.0]);
//! ```

pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod matrix;
pub mod plan;
pub mod reference;

pub use binding::{TransformBinding, TransformShape};
pub use config::{ParallelPolicy, TransformConfig};
pub use engine::{ButterflyEngine, TransformEngine};
pub use error::{ErrorKind, Result, WhtError};
pub use matrix::{Layout, Matrix};
pub use plan::{PlanNode, WhtPlan};
pub use reference::ReferenceEngine;

/// Transforms every column of `input` with the default engine and settings.
///
/// The result is unnormalized: `transform(transform(x)) == M * x` for a
/// column length `M`.
pub fn transform(input: &Matrix) -> Result<Matrix> {
    TransformBinding::new().transform(input)
}
