//! Owned dense arrays produced by realization and used as in-memory sources.

use ndarray::{ArrayD, Axis, IxDyn, SliceInfoElem, Zip};
use num_traits::AsPrimitive;

use super::{DType, Element};
use crate::error::{ArrayError, Result};
use crate::index::{AxisSelection, Selection};
use crate::node::BinaryOp;

/// Concrete dense array holding one of the supported element types.
///
/// A realized result is a snapshot: it has no connection to the graph that produced it and is
/// owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum DenseArray {
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

macro_rules! dispatch {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            DenseArray::I32($array) => $body,
            DenseArray::I64($array) => $body,
            DenseArray::F32($array) => $body,
            DenseArray::F64($array) => $body,
        }
    };
}

impl DenseArray {
    /// Wraps an existing `ndarray` array.
    pub fn from_array<T: Element>(array: ArrayD<T>) -> Self {
        T::into_dense(array)
    }

    /// Builds a row-major array from raw values, validating the length against the shape.
    pub fn from_shape_vec<T: Element>(shape: &[usize], data: Vec<T>) -> Result<Self> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), data)?;
        Ok(T::into_dense(array))
    }

    /// Returns an array of the given shape with every element set to `value`.
    pub fn from_elem<T: Element>(shape: &[usize], value: T) -> Self {
        T::into_dense(ArrayD::from_elem(IxDyn(shape), value))
    }

    /// Returns a rank-0 array holding `value`.
    pub fn scalar<T: Element>(value: T) -> Self {
        Self::from_elem(&[], value)
    }

    /// Returns the element dtype.
    pub fn dtype(&self) -> DType {
        match self {
            DenseArray::I32(_) => DType::I32,
            DenseArray::I64(_) => DType::I64,
            DenseArray::F32(_) => DType::F32,
            DenseArray::F64(_) => DType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        dispatch!(self, array => array.shape())
    }

    pub fn ndim(&self) -> usize {
        dispatch!(self, array => array.ndim())
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        dispatch!(self, array => array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the typed array, or `None` when the dtype differs from `T`.
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::as_array(self)
    }

    /// Unwraps the typed array, or `None` when the dtype differs from `T`.
    pub fn into_array<T: Element>(self) -> Option<ArrayD<T>> {
        T::into_array(self)
    }

    /// Copies the elements out in logical row-major order.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        self.as_array::<T>()
            .map(|array| array.iter().copied().collect())
    }

    /// Converts to `dtype`, copying even when the dtype already matches.
    pub fn cast(&self, dtype: DType) -> DenseArray {
        dispatch!(self, array => cast_array(array, dtype))
    }

    /// Converts to `dtype`, reusing the storage when no conversion is needed.
    pub fn into_dtype(self, dtype: DType) -> DenseArray {
        if self.dtype() == dtype {
            self
        } else {
            self.cast(dtype)
        }
    }

    /// Extracts the sub-array addressed by `selection`.
    ///
    /// Integer axes are dropped from the result; range axes keep their selected positions in
    /// order, including descending order for negative steps.
    pub fn select(&self, selection: &Selection) -> Result<DenseArray> {
        selection.check(self.shape())?;
        Ok(dispatch!(self, array => DenseArray::from_array(select_array(array, selection))))
    }

    /// Combines two arrays elementwise after broadcasting both to `shape`.
    ///
    /// Both operands must already share a dtype; realization casts before calling this.
    pub(crate) fn combine(
        op: BinaryOp,
        lhs: &DenseArray,
        rhs: &DenseArray,
        shape: &[usize],
    ) -> Result<DenseArray> {
        match (lhs, rhs) {
            (DenseArray::I32(a), DenseArray::I32(b)) => {
                Ok(DenseArray::from_array(zip_apply(op, a, b, shape)?))
            }
            (DenseArray::I64(a), DenseArray::I64(b)) => {
                Ok(DenseArray::from_array(zip_apply(op, a, b, shape)?))
            }
            (DenseArray::F32(a), DenseArray::F32(b)) => {
                Ok(DenseArray::from_array(zip_apply(op, a, b, shape)?))
            }
            (DenseArray::F64(a), DenseArray::F64(b)) => {
                Ok(DenseArray::from_array(zip_apply(op, a, b, shape)?))
            }
            _ => Err(ArrayError::UnsupportedOperation(format!(
                "{op} between {} and {} operands",
                lhs.dtype(),
                rhs.dtype()
            ))),
        }
    }
}

fn cast_array<T: Element>(array: &ArrayD<T>, dtype: DType) -> DenseArray {
    match dtype {
        DType::I32 => DenseArray::I32(array.mapv(<T as AsPrimitive<i32>>::as_)),
        DType::I64 => DenseArray::I64(array.mapv(<T as AsPrimitive<i64>>::as_)),
        DType::F32 => DenseArray::F32(array.mapv(<T as AsPrimitive<f32>>::as_)),
        DType::F64 => DenseArray::F64(array.mapv(<T as AsPrimitive<f64>>::as_)),
    }
}

fn select_array<T: Element>(array: &ArrayD<T>, selection: &Selection) -> ArrayD<T> {
    let mut elems = Vec::with_capacity(selection.len());
    let mut descending = Vec::new();
    let mut out_axis = 0usize;
    for axis in selection.iter() {
        match *axis {
            AxisSelection::Index(position) => elems.push(SliceInfoElem::Index(position as isize)),
            AxisSelection::Range(range) => {
                let (lo, hi, stride) = range.ascending_bounds();
                elems.push(SliceInfoElem::Slice {
                    start: lo as isize,
                    end: Some(hi as isize),
                    step: stride as isize,
                });
                if range.step < 0 {
                    descending.push(out_axis);
                }
                out_axis += 1;
            }
        }
    }
    let mut view = array.slice(elems.as_slice());
    for axis in descending {
        view.invert_axis(Axis(axis));
    }
    view.to_owned()
}

fn zip_apply<T: Element>(
    op: BinaryOp,
    lhs: &ArrayD<T>,
    rhs: &ArrayD<T>,
    shape: &[usize],
) -> Result<ArrayD<T>> {
    let lhs_view = lhs
        .broadcast(IxDyn(shape))
        .ok_or_else(|| ArrayError::shape_mismatch(lhs.shape(), shape))?;
    let rhs_view = rhs
        .broadcast(IxDyn(shape))
        .ok_or_else(|| ArrayError::shape_mismatch(rhs.shape(), shape))?;
    Ok(Zip::from(&lhs_view)
        .and(&rhs_view)
        .map_collect(|&a, &b| T::apply(op, a, b)))
}
