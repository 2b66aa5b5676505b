//! Core array abstractions: dtypes, shapes, dense results, and the lazy array handle.
//!
//! Metadata types ([`DType`], [`Shape`]) are shared between the lazy graph and realized
//! [`DenseArray`] values, so shape and dtype propagation never has to touch data.

mod dense;
pub mod dtype;
mod element;
mod lazy_array;
pub mod shape;

pub use dense::DenseArray;
pub use dtype::{promote, DType};
pub use element::Element;
pub use lazy_array::LazyArray;
pub use shape::{broadcast_shapes, Shape};
