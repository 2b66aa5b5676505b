//! Defines the scalar element trait tying Rust types to [`DType`] tags and kernels.

use std::fmt;

use ndarray::ArrayD;
use num_traits::AsPrimitive;

use super::{DType, DenseArray};
use crate::node::BinaryOp;

/// Scalar type that can live inside a [`DenseArray`].
///
/// Conversions between element types use `as` semantics (truncation toward zero for
/// float-to-integer casts), which is what realization applies when a source hands back a
/// different dtype than it declared.
pub trait Element:
    Copy
    + Send
    + Sync
    + PartialEq
    + fmt::Debug
    + 'static
    + AsPrimitive<i32>
    + AsPrimitive<i64>
    + AsPrimitive<f32>
    + AsPrimitive<f64>
{
    /// Dtype tag for the element type.
    const DTYPE: DType;

    /// Wraps a typed array into the matching [`DenseArray`] variant.
    fn into_dense(array: ArrayD<Self>) -> DenseArray;

    /// Borrows the typed array when `dense` holds this element type.
    fn as_array(dense: &DenseArray) -> Option<&ArrayD<Self>>;

    /// Unwraps the typed array when `dense` holds this element type.
    fn into_array(dense: DenseArray) -> Option<ArrayD<Self>>;

    /// Applies a binary operation to a single pair of elements.
    fn apply(op: BinaryOp, lhs: Self, rhs: Self) -> Self;
}

macro_rules! impl_integer_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn into_dense(array: ArrayD<Self>) -> DenseArray {
                DenseArray::$variant(array)
            }

            fn as_array(dense: &DenseArray) -> Option<&ArrayD<Self>> {
                match dense {
                    DenseArray::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn into_array(dense: DenseArray) -> Option<ArrayD<Self>> {
                match dense {
                    DenseArray::$variant(array) => Some(array),
                    _ => None,
                }
            }

            // Integer arithmetic wraps on overflow instead of panicking.
            fn apply(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
                match op {
                    BinaryOp::Add => lhs.wrapping_add(rhs),
                    BinaryOp::Sub => lhs.wrapping_sub(rhs),
                    BinaryOp::Mul => lhs.wrapping_mul(rhs),
                    BinaryOp::Maximum => lhs.max(rhs),
                    BinaryOp::Minimum => lhs.min(rhs),
                }
            }
        }
    };
}

macro_rules! impl_float_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn into_dense(array: ArrayD<Self>) -> DenseArray {
                DenseArray::$variant(array)
            }

            fn as_array(dense: &DenseArray) -> Option<&ArrayD<Self>> {
                match dense {
                    DenseArray::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn into_array(dense: DenseArray) -> Option<ArrayD<Self>> {
                match dense {
                    DenseArray::$variant(array) => Some(array),
                    _ => None,
                }
            }

            // maximum/minimum propagate NaN from either side.
            fn apply(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
                match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Maximum => {
                        if lhs.is_nan() || rhs.is_nan() {
                            <$ty>::NAN
                        } else {
                            lhs.max(rhs)
                        }
                    }
                    BinaryOp::Minimum => {
                        if lhs.is_nan() || rhs.is_nan() {
                            <$ty>::NAN
                        } else {
                            lhs.min(rhs)
                        }
                    }
                }
            }
        }
    };
}

impl_integer_element!(i32, I32);
impl_integer_element!(i64, I64);
impl_float_element!(f32, F32);
impl_float_element!(f64, F64);
