//! C ABI for host numeric environments.
//!
//! Buffers are column-major, the convention of the hosts this is meant to be
//! loaded into. Errors come back as [`WhtStatus`] codes; the host turns them
//! into its own exception with [`wht_status_message`]. Panics are caught and
//! never unwind into the host.

use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::debug;

use crate::binding::TransformBinding;
use crate::error::{ErrorKind, WhtError};
use crate::matrix::Matrix;

/// Status codes returned across the C boundary.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WhtStatus {
    Ok = 0,
    ArgumentCount = 1,
    NotAMatrix = 2,
    NotPowerOfTwo = 3,
    PlanUnavailable = 4,
    InvalidArgument = 5,
    Panic = 6,
}

impl WhtStatus {
    /// Maps a raw status back to the enum; unknown values become `InvalidArgument`.
    pub fn from_code(code: c_int) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::ArgumentCount,
            2 => Self::NotAMatrix,
            3 => Self::NotPowerOfTwo,
            4 => Self::PlanUnavailable,
            6 => Self::Panic,
            _ => Self::InvalidArgument,
        }
    }

    // NUL-terminated so the pointer can be handed to C as is.
    fn message(self) -> &'static [u8] {
        match self {
            Self::Ok => b"Success.\0",
            Self::ArgumentCount => b"Wrong number of input or output arguments.\0",
            Self::NotAMatrix => b"Input argument must be a matrix.\0",
            Self::NotPowerOfTwo => b"Input argument must be a matrix with dimension 2^n.\0",
            Self::PlanUnavailable => b"Could not build a transform plan for this size.\0",
            Self::InvalidArgument => b"Invalid argument.\0",
            Self::Panic => b"Internal error in the transform.\0",
        }
    }
}

impl From<&WhtError> for WhtStatus {
    fn from(err: &WhtError) -> Self {
        match err {
            WhtError::NotAMatrix { .. } => Self::NotAMatrix,
            WhtError::NotPowerOfTwo { .. } => Self::NotPowerOfTwo,
            _ => match err.kind() {
                ErrorKind::ArgumentCount => Self::ArgumentCount,
                ErrorKind::Resource => Self::PlanUnavailable,
                ErrorKind::Shape | ErrorKind::Configuration => Self::InvalidArgument,
            },
        }
    }
}

/// Walsh-Hadamard transform of every column of a column-major matrix.
///
/// On success writes `rows * cols` values to `output` and the result shape to
/// `out_rows` / `out_cols`, and returns `0`. A `1 x n` row comes back as an
/// `n x 1` column. On failure nothing is written and a [`WhtStatus`] code is
/// returned.
///
/// # Safety
/// `input` must be valid for `rows * cols` reads, `output` for `rows * cols`
/// writes, and `out_rows` / `out_cols` for one write each. Null pointers are
/// rejected with `InvalidArgument`.
#[no_mangle]
pub unsafe extern "C" fn wht_transform_f64(
    input: *const f64,
    rows: usize,
    cols: usize,
    output: *mut f64,
    out_rows: *mut usize,
    out_cols: *mut usize,
) -> c_int {
    if input.is_null() || output.is_null() || out_rows.is_null() || out_cols.is_null() {
        return WhtStatus::InvalidArgument as c_int;
    }
    let Some(len) = rows.checked_mul(cols) else {
        return WhtStatus::InvalidArgument as c_int;
    };

    // SAFETY: caller guarantees `input` is valid for `len` reads.
    let data = unsafe { std::slice::from_raw_parts(input, len) }.to_vec();

    let result = catch_unwind(AssertUnwindSafe(|| {
        let matrix = Matrix::from_column_major(rows, cols, data)?;
        TransformBinding::new().transform(&matrix)
    }));

    match result {
        Ok(Ok(matrix)) => {
            let values = matrix.as_slice();
            // SAFETY: the result holds exactly `len` values; caller guarantees
            // `output` is valid for that many writes and the shape pointers for one.
            unsafe {
                std::ptr::copy_nonoverlapping(values.as_ptr(), output, values.len());
                *out_rows = matrix.rows();
                *out_cols = matrix.cols();
            }
            WhtStatus::Ok as c_int
        }
        Ok(Err(err)) => {
            debug!(error = %err, "transform rejected at C boundary");
            WhtStatus::from(&err) as c_int
        }
        Err(_) => WhtStatus::Panic as c_int,
    }
}

/// Static, NUL-terminated description of a status code. Never null.
#[no_mangle]
pub extern "C" fn wht_status_message(status: c_int) -> *const c_char {
    WhtStatus::from_code(status).message().as_ptr() as *const c_char
}
