//! Matrix-level binding around a [`TransformEngine`].
//!
//! A call validates the argument, acquires one context sized to the column
//! length, transforms every column with it and releases it again. Nothing
//! survives the call: no plan, no buffer, no global state.

use std::mem::ManuallyDrop;

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::config::TransformConfig;
use crate::engine::{ButterflyEngine, TransformEngine};
use crate::error::{Result, WhtError};
use crate::matrix::Matrix;

/// Number of input arguments a call takes.
pub const EXPECTED_INPUTS: usize = 1;

/// Largest number of outputs a call can produce.
pub const MAX_OUTPUTS: usize = 1;

/// Validated geometry of one transform call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransformShape {
    /// Rows of the input as given.
    pub rows: usize,
    /// Columns of the input as given.
    pub cols: usize,
    /// Length of each transformed vector (2^`log2_len`).
    pub len: usize,
    /// Number of vectors transformed.
    pub columns: usize,
    /// Base-2 logarithm of `len`.
    pub log2_len: u32,
    /// The input was a single row, read as one column.
    pub row_vector: bool,
}

impl TransformShape {
    /// Validates a `rows x cols` argument
    ///
    /// # Validation Order
    /// 1. Empty or `1x1` input is not a matrix
    /// 2. A single row with more than one column is sized by its column count
    /// 3. The transform length must be exactly 2^d
    pub fn validate(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 || (rows == 1 && cols == 1) {
            return Err(WhtError::NotAMatrix { rows, cols });
        }

        let row_vector = rows == 1 && cols > 1;
        let (len, columns) = if row_vector { (cols, 1) } else { (rows, cols) };

        let log2_len = len.ilog2();
        if 1usize << log2_len != len {
            return Err(WhtError::NotPowerOfTwo { rows: len });
        }

        Ok(Self {
            rows,
            cols,
            len,
            columns,
            log2_len,
            row_vector,
        })
    }

    /// Shape of the result: `(rows, cols)`, or a single column for a row vector.
    pub fn output_dims(&self) -> (usize, usize) {
        if self.row_vector {
            (self.cols, 1)
        } else {
            (self.rows, self.cols)
        }
    }
}

/// Hands the context back to its engine when dropped, including on unwind.
struct ContextGuard<'e, E: TransformEngine> {
    engine: &'e E,
    context: ManuallyDrop<E::Context>,
}

impl<'e, E: TransformEngine> ContextGuard<'e, E> {
    fn acquire(engine: &'e E, log2_len: u32) -> Result<Self> {
        match engine.acquire(log2_len) {
            Some(context) => Ok(Self {
                engine,
                context: ManuallyDrop::new(context),
            }),
            None => {
                warn!(log2_len, "transform engine has no plan for this size");
                Err(WhtError::PlanUnavailable { log2_len })
            }
        }
    }

    fn context(&self) -> &E::Context {
        &self.context
    }
}

impl<E: TransformEngine> Drop for ContextGuard<'_, E> {
    fn drop(&mut self) {
        // SAFETY: the context is taken exactly once, here, and the guard is
        // never touched again.
        let context = unsafe { ManuallyDrop::take(&mut self.context) };
        self.engine.release(context);
    }
}

/// Column-wise Walsh-Hadamard transform of matrices.
///
/// The transform is unnormalized: applying it twice to a column of length
/// 2^d multiplies that column by 2^d.
#[derive(Clone, Debug)]
pub struct TransformBinding<E: TransformEngine = ButterflyEngine> {
    engine: E,
    config: TransformConfig,
}

impl TransformBinding<ButterflyEngine> {
    /// Binding over the in-process butterfly engine with default settings.
    pub fn new() -> Self {
        let config = TransformConfig::default();
        Self {
            engine: ButterflyEngine::from_config(&config),
            config,
        }
    }

    /// Binding over the in-process butterfly engine configured by `config`.
    pub fn with_config(config: TransformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: ButterflyEngine::from_config(&config),
            config,
        })
    }
}

impl Default for TransformBinding<ButterflyEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: TransformEngine> TransformBinding<E> {
    /// Binding over a caller-supplied engine.
    pub fn with_engine(engine: E, config: TransformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Host-style entry point with explicit argument counts.
    ///
    /// Takes exactly one input and produces the single result for up to one
    /// requested output. Counts are checked before anything else.
    pub fn call(&self, inputs: &[Matrix], nargout: usize) -> Result<Vec<Matrix>> {
        if inputs.len() != EXPECTED_INPUTS {
            return Err(WhtError::ArgumentCount {
                expected: EXPECTED_INPUTS,
                got: inputs.len(),
            });
        }
        if nargout > MAX_OUTPUTS {
            return Err(WhtError::TooManyOutputs {
                requested: nargout,
                max: MAX_OUTPUTS,
            });
        }

        Ok(vec![self.transform(&inputs[0])?])
    }

    /// Transforms every column of `input`
    ///
    /// # Returns
    /// * `Result<Matrix>` - Transformed matrix in the input's layout, shaped
    ///   `(rows, cols)`, or `(cols, 1)` when the input is a single row
    ///
    /// # Error Conditions
    /// - `NotAMatrix` for empty or `1x1` input
    /// - `NotPowerOfTwo` when the column length is not 2^d
    /// - `PlanUnavailable` when the engine has no context for 2^d
    /// - any error the engine reports while applying a column
    #[instrument(skip_all, fields(rows = input.rows(), cols = input.cols()))]
    pub fn transform(&self, input: &Matrix) -> Result<Matrix> {
        let shape = TransformShape::validate(input.rows(), input.cols())?;
        let guard = ContextGuard::acquire(&self.engine, shape.log2_len)?;

        let parallel = self.config.parallel_for(shape.columns);
        debug!(
            log2_len = shape.log2_len,
            columns = shape.columns,
            row_vector = shape.row_vector,
            parallel,
            "transforming columns"
        );

        if parallel {
            self.transform_parallel(guard.context(), input, &shape)
        } else {
            self.transform_sequential(guard.context(), input, &shape)
        }
    }

    fn transform_sequential(
        &self,
        context: &E::Context,
        input: &Matrix,
        shape: &TransformShape,
    ) -> Result<Matrix> {
        let (out_rows, out_cols) = shape.output_dims();
        let mut output = Matrix::zeros(out_rows, out_cols, input.layout());
        let mut scratch = vec![0.0; shape.len];

        for col in 0..shape.columns {
            read_source_column(input, shape, col, &mut scratch)?;
            self.engine.apply(context, &mut scratch)?;
            output.write_column(col, &scratch)?;
        }

        Ok(output)
    }

    fn transform_parallel(
        &self,
        context: &E::Context,
        input: &Matrix,
        shape: &TransformShape,
    ) -> Result<Matrix> {
        let (out_rows, out_cols) = shape.output_dims();
        let mut data = vec![0.0; shape.len * shape.columns];

        // Column-major chunks are disjoint, so each one is its own scratch.
        data.par_chunks_mut(shape.len)
            .enumerate()
            .try_for_each(|(col, column)| -> Result<()> {
                read_source_column(input, shape, col, column)?;
                self.engine.apply(context, column)
            })?;

        Ok(Matrix::from_column_major(out_rows, out_cols, data)?.into_layout(input.layout()))
    }
}

// A 1xN row is contiguous in either layout; read it whole as the only column.
fn read_source_column(
    input: &Matrix,
    shape: &TransformShape,
    col: usize,
    dst: &mut [f64],
) -> Result<()> {
    if shape.row_vector {
        dst.copy_from_slice(input.as_slice());
        Ok(())
    } else {
        input.read_column(col, dst)
    }
}
