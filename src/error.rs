use thiserror::Error;

/// Broad category of a [`WhtError`], used by host surfaces to pick a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong number of inputs or outputs for the call.
    ArgumentCount,
    /// The matrix argument has an unusable shape.
    Shape,
    /// The transform engine could not supply a plan.
    Resource,
    /// A plan tree or configuration value is malformed.
    Configuration,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WhtError {
    #[error("Wrong number of input arguments: expected {expected}, got {got}")]
    ArgumentCount {
        expected: usize,
        got: usize,
    },

    #[error("Too many output arguments: requested {requested}, at most {max} supported")]
    TooManyOutputs {
        requested: usize,
        max: usize,
    },

    #[error("Input argument must be a matrix, got {rows}x{cols}")]
    NotAMatrix {
        rows: usize,
        cols: usize,
    },

    #[error("Input argument must be a matrix with dimension 2^n, got {rows} rows")]
    NotPowerOfTwo { rows: usize },

    #[error("Invalid dimension: expected {expected}, got {got}")]
    InvalidDimension {
        expected: usize,
        got: usize,
    },

    #[error("Transform plan unavailable for size 2^{log2_len}")]
    PlanUnavailable { log2_len: u32 },

    #[error("Invalid plan tree: {0}")]
    InvalidPlan(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WhtError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArgumentCount { .. } | Self::TooManyOutputs { .. } => ErrorKind::ArgumentCount,
            Self::NotAMatrix { .. } | Self::NotPowerOfTwo { .. } | Self::InvalidDimension { .. } => {
                ErrorKind::Shape
            }
            Self::PlanUnavailable { .. } => ErrorKind::Resource,
            Self::InvalidPlan(_) | Self::InvalidConfig(_) => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, WhtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            WhtError::ArgumentCount { expected: 1, got: 2 }.kind(),
            ErrorKind::ArgumentCount
        );
        assert_eq!(
            WhtError::TooManyOutputs { requested: 2, max: 1 }.kind(),
            ErrorKind::ArgumentCount
        );
        assert_eq!(WhtError::NotAMatrix { rows: 1, cols: 1 }.kind(), ErrorKind::Shape);
        assert_eq!(WhtError::NotPowerOfTwo { rows: 6 }.kind(), ErrorKind::Shape);
        assert_eq!(WhtError::PlanUnavailable { log2_len: 3 }.kind(), ErrorKind::Resource);
        assert_eq!(
            WhtError::InvalidPlan("split[]".to_string()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_error_messages() {
        let err = WhtError::NotPowerOfTwo { rows: 6 };
        assert_eq!(
            err.to_string(),
            "Input argument must be a matrix with dimension 2^n, got 6 rows"
        );

        let err = WhtError::PlanUnavailable { log2_len: 12 };
        assert_eq!(err.to_string(), "Transform plan unavailable for size 2^12");
    }
}
