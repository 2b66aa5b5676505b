//! Turns a lazy graph into a dense array.

use std::time::Instant;

use log::{debug, trace};

use crate::array::{DenseArray, LazyArray};
use crate::env;
use crate::error::{ArrayError, Result};
use crate::node::ArrayNode;

/// Evaluates lazy arrays.
///
/// Each call to [`Realizer::realize`] walks the graph once and reads every contributing source
/// element exactly once. Nothing is cached between calls, so realizing the same array twice
/// reads its sources twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct Realizer {
    parallel: bool,
}

impl Realizer {
    /// Sequential realizer.
    pub fn new() -> Self {
        Realizer::default()
    }

    /// Realizer configured by `LAZYND_PARALLEL`.
    pub fn from_env() -> Self {
        Realizer {
            parallel: env::parallel_enabled(),
        }
    }

    /// Evaluate the two operands of binary nodes concurrently on the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn realize(&self, array: &LazyArray) -> Result<DenseArray> {
        let started = Instant::now();
        let dense = self.realize_node(array.node())?;
        debug!(
            "realized {} in {:.3} ms",
            array,
            started.elapsed().as_secs_f64() * 1e3
        );
        Ok(dense)
    }

    /// Realizes one node and checks the result against its declared metadata.
    pub(crate) fn realize_node(&self, node: &dyn ArrayNode) -> Result<DenseArray> {
        trace!("realizing {} node {}", node.kind(), node.shape());
        let dense = node.realize(self)?;
        if dense.shape() != node.shape().dims() {
            return Err(ArrayError::SourceShape {
                expected: node.shape().dims().to_vec(),
                actual: dense.shape().to_vec(),
            });
        }
        Ok(dense.into_dtype(node.dtype()))
    }

    pub(crate) fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        if self.parallel {
            rayon::join(a, b)
        } else {
            (a(), b())
        }
    }
}
