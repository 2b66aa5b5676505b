//! The node protocol every deferred operation implements.
//!
//! Nodes are immutable: shape and dtype are computed once when the node is built, indexing
//! returns a new node, and realization leaves the node untouched. Only
//! [`ArrayNode::realize`] may read source data.

mod adapter;
mod elementwise;

use std::fmt;

use crate::array::{DType, DenseArray, LazyArray, Shape};
use crate::error::Result;
use crate::index::Selection;
use crate::realize::Realizer;

pub use adapter::SourceAdapter;
pub use elementwise::{BinaryOp, ElementwiseNode};

/// Capability set of a lazy array node.
pub trait ArrayNode: fmt::Debug + Send + Sync {
    /// Short name of the node kind, used in logs and `Display` output.
    fn kind(&self) -> &'static str;

    fn dtype(&self) -> DType;

    fn shape(&self) -> &Shape;

    fn ndim(&self) -> usize {
        self.shape().rank()
    }

    /// Returns a node restricted to `selection`.
    ///
    /// `selection` has already been validated against [`ArrayNode::shape`]. Implementations
    /// must stay symbolic: no source reads.
    fn select(&self, selection: &Selection) -> Result<LazyArray>;

    /// Computes the dense value of the node, reading whatever sources it depends on.
    fn realize(&self, realizer: &Realizer) -> Result<DenseArray>;
}
