//! Lazy, composable N-dimensional arrays.
//!
//! Elementwise arithmetic and indexing on a [`LazyArray`] only build a deferred graph; the
//! wrapped [`ArraySource`]s are not read until [`LazyArray::realize`] is called, and then only
//! the elements the final result depends on are requested.
//!
//! ```rust,ignore
//! use lazynd::{DenseArray, LazyArray, LazyArrayOps};
//!
//! let a = LazyArray::from_dense(DenseArray::from_shape_vec(&[500, 30, 40], data_a)?);
//! let b = LazyArray::from_dense(DenseArray::from_shape_vec(&[500, 30, 40], data_b)?);
//! let c = a.add(&b)?.index(3..6)?; // nothing read yet
//! let dense = c.realize()?;          // reads 3x30x40 elements from each source
//! ```

pub mod array;
mod env;
pub mod error;
pub mod index;
pub mod node;
pub mod ops;
pub mod realize;
pub mod source;

pub use array::{DType, DenseArray, Element, LazyArray, Shape};
pub use error::{ArrayError, IndexError, Result};
pub use index::{AxisRange, AxisSelection, IndexExpr, IndexTerm, Selection, SliceSpec};
pub use node::{ArrayNode, BinaryOp};
pub use ops::LazyArrayOps;
pub use realize::Realizer;
pub use source::ArraySource;
