use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::array::{DType, DenseArray, Shape};
use crate::error::Result;
use crate::index::{IndexExpr, Selection};
use crate::node::{ArrayNode, BinaryOp, ElementwiseNode, SourceAdapter};
use crate::realize::Realizer;
use crate::source::ArraySource;

/// Cheap-to-clone handle to a node of the deferred graph.
///
/// Every operation on a `LazyArray` returns a new handle and leaves the receiver untouched;
/// handles share their subgraphs, so building large expressions never copies data.
#[derive(Clone)]
pub struct LazyArray {
    node: Arc<dyn ArrayNode>,
}

impl LazyArray {
    /// Wraps `source` in a [`SourceAdapter`]. The source is not read.
    pub fn from_source<S: ArraySource + 'static>(source: Arc<S>) -> Result<Self> {
        let adapter = SourceAdapter::new(source)?;
        Ok(LazyArray::from_node(adapter))
    }

    /// Wraps an in-memory array as a source.
    pub fn from_dense(dense: DenseArray) -> Self {
        let shape = Shape::new(dense.shape());
        LazyArray::from_node(SourceAdapter::trusted(Arc::new(dense), shape))
    }

    pub fn from_node<N: ArrayNode + 'static>(node: N) -> Self {
        LazyArray {
            node: Arc::new(node),
        }
    }

    pub fn from_arc(node: Arc<dyn ArrayNode>) -> Self {
        LazyArray { node }
    }

    pub fn node(&self) -> &dyn ArrayNode {
        self.node.as_ref()
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn dtype(&self) -> DType {
        self.node.dtype()
    }

    pub fn shape(&self) -> &Shape {
        self.node.shape()
    }

    pub fn ndim(&self) -> usize {
        self.node.ndim()
    }

    /// Number of elements the array would hold once realized.
    pub fn len(&self) -> usize {
        self.shape().num_elements()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies an index expression, returning a new lazy array.
    ///
    /// The expression is validated against the current shape immediately, so out-of-range
    /// indices and zero steps fail here rather than at realization.
    pub fn index(&self, expr: impl Into<IndexExpr>) -> Result<LazyArray> {
        let expr = expr.into();
        let selection = expr.resolve(self.shape().dims())?;
        let indexed = self.node.select(&selection)?;
        trace!(
            "indexed {} {} with {} -> {}",
            self.kind(),
            self.shape(),
            expr,
            indexed.shape()
        );
        Ok(indexed)
    }

    /// Applies an already resolved selection.
    pub fn select(&self, selection: &Selection) -> Result<LazyArray> {
        selection.check(self.shape().dims())?;
        self.node.select(selection)
    }

    /// Builds `op(self, rhs)` with broadcasting and dtype promotion.
    pub fn elementwise(&self, op: BinaryOp, rhs: &LazyArray) -> Result<LazyArray> {
        let node = ElementwiseNode::new(op, self.clone(), rhs.clone())?;
        Ok(LazyArray::from_node(node))
    }

    /// Realizes the array with a [`Realizer`] configured from the environment.
    pub fn realize(&self) -> Result<DenseArray> {
        Realizer::from_env().realize(self)
    }

    pub fn realize_with(&self, realizer: &Realizer) -> Result<DenseArray> {
        realizer.realize(self)
    }
}

impl fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.node, f)
    }
}

impl fmt::Display for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LazyArray<{}>(shape={}, dtype={})",
            self.kind(),
            self.shape(),
            self.dtype()
        )
    }
}

impl From<DenseArray> for LazyArray {
    fn from(dense: DenseArray) -> Self {
        LazyArray::from_dense(dense)
    }
}
