//! Leaf node wrapping an externally supplied [`ArraySource`].

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};

use super::ArrayNode;
use crate::array::{DType, DenseArray, LazyArray, Shape};
use crate::error::{ArrayError, Result};
use crate::index::Selection;
use crate::realize::Realizer;
use crate::source::ArraySource;

/// Deferred read of a view into a source.
///
/// The adapter shares the source (it is never copied) and carries the composed view selected
/// so far. Indexing an adapter folds the new selection into that view, so a chain of indexing
/// calls still realizes with a single read.
pub struct SourceAdapter {
    source: Arc<dyn ArraySource>,
    source_shape: Shape,
    dtype: DType,
    view: Selection,
    shape: Shape,
}

impl SourceAdapter {
    /// Wraps `source`, caching its shape and dtype.
    pub fn new(source: Arc<dyn ArraySource>) -> Result<Self> {
        let ndim = source.ndim();
        let source_shape = Shape::new(source.shape());
        if ndim != source_shape.rank() {
            return Err(ArrayError::InconsistentSource {
                ndim,
                shape: source_shape.dims().to_vec(),
            });
        }
        Ok(Self::trusted(source, source_shape))
    }

    /// Wraps a source whose metadata is known to be consistent.
    pub(crate) fn trusted(source: Arc<dyn ArraySource>, source_shape: Shape) -> Self {
        let dtype = source.dtype();
        SourceAdapter {
            view: Selection::full(source_shape.dims()),
            shape: source_shape.clone(),
            source,
            source_shape,
            dtype,
        }
    }

    /// Shape of the wrapped source, as opposed to the shape of this view.
    pub fn source_shape(&self) -> &Shape {
        &self.source_shape
    }

    /// Composed selection that realization will read.
    pub fn view(&self) -> &Selection {
        &self.view
    }
}

impl fmt::Debug for SourceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceAdapter")
            .field("source_shape", &self.source_shape.dims())
            .field("dtype", &self.dtype)
            .field("view", &format_args!("{}", self.view))
            .field("shape", &self.shape.dims())
            .finish()
    }
}

impl ArrayNode for SourceAdapter {
    fn kind(&self) -> &'static str {
        "source"
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn select(&self, selection: &Selection) -> Result<LazyArray> {
        let view = self.view.compose(selection)?;
        trace!("source view {} + {} -> {}", self.view, selection, view);
        Ok(LazyArray::from_node(SourceAdapter {
            source: Arc::clone(&self.source),
            source_shape: self.source_shape.clone(),
            dtype: self.dtype,
            shape: view.shape(),
            view,
        }))
    }

    fn realize(&self, _realizer: &Realizer) -> Result<DenseArray> {
        debug!(
            "reading {} elements from source {} at {}",
            self.shape.num_elements(),
            self.source_shape,
            self.view
        );
        let data = self.source.read(&self.view).map_err(ArrayError::Read)?;
        if data.shape() != self.shape.dims() {
            return Err(ArrayError::SourceShape {
                expected: self.shape.dims().to_vec(),
                actual: data.shape().to_vec(),
            });
        }
        if data.dtype() != self.dtype {
            trace!("casting source data from {} to {}", data.dtype(), self.dtype);
        }
        Ok(data.into_dtype(self.dtype))
    }
}
