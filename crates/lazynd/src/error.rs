//! Error types surfaced by graph construction, indexing, and realization.

use thiserror::Error;

/// Reasons an index expression cannot be applied to a shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("too many indices: {terms} terms for an array with {ndim} dimensions")]
    TooManyTerms { terms: usize, ndim: usize },
    #[error("index {index} is out of bounds for axis {axis} with size {len}")]
    OutOfRange { axis: usize, index: isize, len: usize },
    #[error("slice step cannot be zero (axis {axis})")]
    ZeroStep { axis: usize },
    #[error("an index expression can only have a single ellipsis")]
    MultipleEllipsis,
    #[error("selection covers {actual} axes, expected {expected}")]
    RankMismatch { expected: usize, actual: usize },
}

/// Failure raised by the lazy array engine.
///
/// Shape and index problems are reported when the offending node is built; only
/// [`ArrayError::Read`] and [`ArrayError::SourceShape`] can come out of a realization.
#[derive(Debug, Error)]
pub enum ArrayError {
    #[error("shape mismatch: operands with shapes {lhs:?} and {rhs:?} cannot be broadcast together")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },
    #[error("invalid index: {0}")]
    InvalidIndex(#[from] IndexError),
    #[error("unsupported operation '{0}'")]
    UnsupportedOperation(String),
    #[error("source reports ndim {ndim} but shape {shape:?}")]
    InconsistentSource { ndim: usize, shape: Vec<usize> },
    #[error("source read returned shape {actual:?}, expected {expected:?}")]
    SourceShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("dense array error: {0}")]
    Dense(#[from] ndarray::ShapeError),
    #[error(transparent)]
    Read(anyhow::Error),
}

impl ArrayError {
    pub(crate) fn shape_mismatch(lhs: &[usize], rhs: &[usize]) -> Self {
        ArrayError::ShapeMismatch {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// Returns the index failure when this error came from an invalid index expression.
    pub fn as_index_error(&self) -> Option<&IndexError> {
        match self {
            ArrayError::InvalidIndex(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience alias for results returned by the engine.
pub type Result<T, E = ArrayError> = std::result::Result<T, E>;
