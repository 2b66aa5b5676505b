//! The data-provider boundary of the engine.

use crate::array::{DType, DenseArray};
use crate::index::Selection;

/// Array-like object whose data lives outside the engine, such as a file or remote store.
///
/// `dtype` and `shape` are metadata and must be cheap; the engine caches them when a source is
/// wrapped and never calls `read` before realization. `read` receives a normalized
/// [`Selection`] already validated against `shape` and must return exactly the selected
/// elements, with integer-selected axes removed. Errors are propagated to the caller of
/// `realize` unchanged.
pub trait ArraySource: Send + Sync {
    fn dtype(&self) -> DType;

    fn shape(&self) -> &[usize];

    fn ndim(&self) -> usize {
        self.shape().len()
    }

    fn read(&self, selection: &Selection) -> anyhow::Result<DenseArray>;
}

impl ArraySource for DenseArray {
    fn dtype(&self) -> DType {
        DenseArray::dtype(self)
    }

    fn shape(&self) -> &[usize] {
        DenseArray::shape(self)
    }

    fn read(&self, selection: &Selection) -> anyhow::Result<DenseArray> {
        Ok(self.select(selection)?)
    }
}
