use thiserror::Error;

/// Errors surfaced by the matrix facade and its backends.
///
/// Every variant propagates synchronously to the immediate caller; the crate
/// performs no recovery, no retry, and no default-value substitution.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// An element access was out of the matrix bounds.
    #[error("index {index} out of range for a {rows}x{cols} matrix")]
    IndexOutOfRange {
        index: String,
        rows: usize,
        cols: usize,
    },

    /// Operand shapes are incompatible with the requested operation.
    #[error("shape mismatch: {context} (left is {left_rows}x{left_cols}, right is {right_rows}x{right_cols})")]
    ShapeMismatch {
        context: &'static str,
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    /// The active backend does not implement the requested operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Binary operation between matrices of different backend identities.
    #[error("operations between matrices with different backends not yet supported")]
    UnsupportedBackendMix,

    /// A native decomposition could not produce a valid factorization.
    #[error("decomposition failed: {0}")]
    DecompositionFailed(String),

    /// A serialized buffer could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),
}

impl MatrixError {
    pub(crate) fn out_of_range_flat(index: usize, rows: usize, cols: usize) -> Self {
        MatrixError::IndexOutOfRange {
            index: index.to_string(),
            rows,
            cols,
        }
    }

    pub(crate) fn out_of_range(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        MatrixError::IndexOutOfRange {
            index: format!("({row}, {col})"),
            rows,
            cols,
        }
    }
}

pub type Result<T> = std::result::Result<T, MatrixError>;
