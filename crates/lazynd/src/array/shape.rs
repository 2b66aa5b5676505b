//! Lightweight wrapper for array shapes and broadcasting bookkeeping.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{ArrayError, Result};

/// Stores the logical dimensions of an array. A rank-0 shape describes a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    /// Constructs a new shape from the provided dimensions.
    pub fn new<D: AsRef<[usize]>>(dims: D) -> Self {
        Shape {
            dims: SmallVec::from_slice(dims.as_ref()),
        }
    }

    /// The rank-0 shape of a scalar.
    pub fn scalar() -> Self {
        Shape::default()
    }

    /// Borrow the raw dimension slice for downstream calculations.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the rank (number of axes) of the shape.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Computes the total number of elements implied by the shape.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Reports whether the shape holds zero elements.
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    /// Broadcasts two shapes together, see [`broadcast_shapes`].
    pub fn broadcast(&self, other: &Shape) -> Result<Shape> {
        broadcast_shapes(self, other)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims)
    }
}

impl PartialEq<[usize]> for Shape {
    fn eq(&self, other: &[usize]) -> bool {
        self.dims() == other
    }
}

impl<const N: usize> PartialEq<[usize; N]> for Shape {
    fn eq(&self, other: &[usize; N]) -> bool {
        self.dims() == other.as_slice()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims.as_slice())
    }
}

/// Computes the elementwise broadcast of two shapes.
///
/// Trailing axes are aligned; a missing leading axis behaves like size 1. Each aligned pair must
/// be equal or contain a 1, and the result takes the other size (so `1` against `0` gives `0`).
pub fn broadcast_shapes(lhs: &Shape, rhs: &Shape) -> Result<Shape> {
    let rank = lhs.rank().max(rhs.rank());
    let mut dims = SmallVec::<[usize; 4]>::with_capacity(rank);
    for axis in 0..rank {
        let l = leading_padded(lhs, rank, axis);
        let r = leading_padded(rhs, rank, axis);
        let dim = match (l, r) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => return Err(ArrayError::shape_mismatch(lhs.dims(), rhs.dims())),
        };
        dims.push(dim);
    }
    Ok(Shape { dims })
}

/// Size of `axis` when `shape` is left-padded with ones up to `rank`.
fn leading_padded(shape: &Shape, rank: usize, axis: usize) -> usize {
    let offset = rank - shape.rank();
    if axis < offset {
        1
    } else {
        shape.dims()[axis - offset]
    }
}
