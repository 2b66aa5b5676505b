//! Functional entry points for building and evaluating lazy graphs.
//!
//! The free functions mirror the methods on [`LazyArray`]; [`LazyArrayOps`] adds the
//! elementwise operations as methods so expressions chain as `a.add(&b)?.index(..)?`.

use std::sync::Arc;

use crate::array::{DenseArray, LazyArray};
use crate::error::Result;
use crate::index::IndexExpr;
use crate::node::BinaryOp;
use crate::realize::Realizer;
use crate::source::ArraySource;

/// Wraps a source without reading it.
pub fn adapter<S: ArraySource + 'static>(source: Arc<S>) -> Result<LazyArray> {
    LazyArray::from_source(source)
}

pub fn add(lhs: &LazyArray, rhs: &LazyArray) -> Result<LazyArray> {
    elementwise(BinaryOp::Add, lhs, rhs)
}

pub fn sub(lhs: &LazyArray, rhs: &LazyArray) -> Result<LazyArray> {
    elementwise(BinaryOp::Sub, lhs, rhs)
}

pub fn mul(lhs: &LazyArray, rhs: &LazyArray) -> Result<LazyArray> {
    elementwise(BinaryOp::Mul, lhs, rhs)
}

pub fn maximum(lhs: &LazyArray, rhs: &LazyArray) -> Result<LazyArray> {
    elementwise(BinaryOp::Maximum, lhs, rhs)
}

pub fn minimum(lhs: &LazyArray, rhs: &LazyArray) -> Result<LazyArray> {
    elementwise(BinaryOp::Minimum, lhs, rhs)
}

/// Builds an elementwise node; fails with `ShapeMismatch` when the shapes do not broadcast.
pub fn elementwise(op: BinaryOp, lhs: &LazyArray, rhs: &LazyArray) -> Result<LazyArray> {
    lhs.elementwise(op, rhs)
}

/// Like [`elementwise`], with the operation given by name (`"add"`, `"subtract"`, ...).
///
/// Unknown names fail with `UnsupportedOperation`.
pub fn elementwise_by_name(op: &str, lhs: &LazyArray, rhs: &LazyArray) -> Result<LazyArray> {
    elementwise(op.parse()?, lhs, rhs)
}

pub fn index(array: &LazyArray, expr: impl Into<IndexExpr>) -> Result<LazyArray> {
    array.index(expr)
}

pub fn realize(array: &LazyArray) -> Result<DenseArray> {
    array.realize()
}

/// Sequential or parallel realization with an explicit [`Realizer`].
pub fn realize_with(array: &LazyArray, realizer: &Realizer) -> Result<DenseArray> {
    realizer.realize(array)
}

/// Elementwise arithmetic as methods on lazy arrays.
pub trait LazyArrayOps: Sized {
    /// Lazy `self + rhs` with broadcasting.
    fn add(&self, rhs: &Self) -> Result<Self>;
    /// Lazy `self - rhs` with broadcasting.
    fn sub(&self, rhs: &Self) -> Result<Self>;
    fn mul(&self, rhs: &Self) -> Result<Self>;
    /// Elementwise maximum; NaN wins for floating dtypes.
    fn maximum(&self, rhs: &Self) -> Result<Self>;
    /// Elementwise minimum; NaN wins for floating dtypes.
    fn minimum(&self, rhs: &Self) -> Result<Self>;
}

impl LazyArrayOps for LazyArray {
    fn add(&self, rhs: &Self) -> Result<Self> {
        self.elementwise(BinaryOp::Add, rhs)
    }

    fn sub(&self, rhs: &Self) -> Result<Self> {
        self.elementwise(BinaryOp::Sub, rhs)
    }

    fn mul(&self, rhs: &Self) -> Result<Self> {
        self.elementwise(BinaryOp::Mul, rhs)
    }

    fn maximum(&self, rhs: &Self) -> Result<Self> {
        self.elementwise(BinaryOp::Maximum, rhs)
    }

    fn minimum(&self, rhs: &Self) -> Result<Self> {
        self.elementwise(BinaryOp::Minimum, rhs)
    }
}
