//! Elementwise conformance scenarios run against counting sources.
//!
//! Each [`Case`] builds `op(adapter(a), adapter(b))` over two linearly spaced arrays, applies a
//! sequence of index expressions and checks, in order: nothing is read while the graph is being
//! built, the lazy shape matches the eager one, the realized values equal the eagerly computed
//! reference, and every contributing source element was read exactly once.

use std::sync::Arc;

use anyhow::{ensure, Context};
use lazynd::ops;
use lazynd::{ArrayError, BinaryOp, DenseArray, IndexError, IndexExpr, LazyArray, Realizer};
use ndarray::{s, Array1, ArrayD, ArrayViewD, Ix1, Ix2, Ix3, Zip};

use crate::counting_source::CountingSource;

pub type Result<T = ()> = anyhow::Result<T>;

type Reference = fn(ArrayViewD<'_, f64>) -> Result<ArrayD<f64>>;

/// Source shape, index expressions applied one after another, and the eager equivalent of
/// those index expressions.
pub struct Case {
    pub name: &'static str,
    pub shape: Vec<usize>,
    pub cuts: Vec<IndexExpr>,
    pub reference: Reference,
}

/// Evenly spaced values in `[start, stop]`, reshaped to `shape`.
pub fn linspace(start: f64, stop: f64, shape: &[usize]) -> Result<ArrayD<f64>> {
    let size: usize = shape.iter().product();
    let data = Array1::linspace(start, stop, size).into_shape(shape)?;
    Ok(data)
}

/// Eager `op` on two equally shaped arrays.
pub fn dense_binary(op: BinaryOp, lhs: &ArrayD<f64>, rhs: &ArrayD<f64>) -> ArrayD<f64> {
    Zip::from(lhs).and(rhs).map_collect(|&a, &b| match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Maximum => {
            if a.is_nan() || b.is_nan() {
                f64::NAN
            } else {
                a.max(b)
            }
        }
        BinaryOp::Minimum => {
            if a.is_nan() || b.is_nan() {
                f64::NAN
            } else {
                a.min(b)
            }
        }
    })
}

pub fn vector() -> Case {
    Case {
        name: "vector",
        shape: vec![10],
        cuts: Vec::new(),
        reference: |view| Ok(view.into_dimensionality::<Ix1>()?.to_owned().into_dyn()),
    }
}

pub fn matrix() -> Case {
    Case {
        name: "matrix",
        shape: vec![30, 40],
        cuts: Vec::new(),
        reference: |view| Ok(view.to_owned()),
    }
}

pub fn matrix_row() -> Case {
    Case {
        name: "matrix_row",
        shape: vec![30, 40],
        cuts: vec![IndexExpr::from(5)],
        reference: |view| {
            let view = view.into_dimensionality::<Ix2>()?;
            Ok(view.slice(s![5, ..]).to_owned().into_dyn())
        },
    }
}

pub fn volume_leading_slice() -> Case {
    Case {
        name: "volume_leading_slice",
        shape: vec![500, 30, 40],
        cuts: vec![IndexExpr::from(3..6)],
        reference: |view| {
            let view = view.into_dimensionality::<Ix3>()?;
            Ok(view.slice(s![3..6, .., ..]).to_owned().into_dyn())
        },
    }
}

pub fn volume_inner_slice() -> Case {
    Case {
        name: "volume_inner_slice",
        shape: vec![500, 30, 40],
        cuts: vec![IndexExpr::from((.., 3..6))],
        reference: |view| {
            let view = view.into_dimensionality::<Ix3>()?;
            Ok(view.slice(s![.., 3..6, ..]).to_owned().into_dyn())
        },
    }
}

/// A no-op full slice followed by `[:, 3:6]`; must read exactly what the single slice reads.
pub fn volume_repeated_slice() -> Case {
    Case {
        name: "volume_repeated_slice",
        shape: vec![500, 30, 40],
        cuts: vec![IndexExpr::from(..), IndexExpr::from((.., 3..6))],
        reference: |view| {
            let view = view.into_dimensionality::<Ix3>()?;
            Ok(view.slice(s![.., 3..6, ..]).to_owned().into_dyn())
        },
    }
}

pub fn cases() -> Vec<Case> {
    vec![
        vector(),
        matrix(),
        matrix_row(),
        volume_leading_slice(),
        volume_inner_slice(),
        volume_repeated_slice(),
    ]
}

/// Runs `case` for `op` with the given realizer.
pub fn run_case_with(op: BinaryOp, case: &Case, realizer: &Realizer) -> Result {
    let raw1 = linspace(0.0, 1.0, &case.shape)?;
    let raw2 = linspace(0.2, 1.2, &case.shape)?;
    let data1 = Arc::new(CountingSource::new(DenseArray::from_array(raw1.clone())));
    let data2 = Arc::new(CountingSource::new(DenseArray::from_array(raw2.clone())));

    let mut array = ops::elementwise(
        op,
        &ops::adapter(Arc::clone(&data1))?,
        &ops::adapter(Arc::clone(&data2))?,
    )?;
    ensure!(
        data1.all_zero() && data2.all_zero(),
        "{}: building {op} read source data",
        case.name
    );

    for cut in &case.cuts {
        array = array
            .index(cut)
            .with_context(|| format!("{}: indexing with {cut}", case.name))?;
        ensure!(
            data1.all_zero() && data2.all_zero(),
            "{}: indexing with {cut} read source data",
            case.name
        );
    }

    let expected = (case.reference)(dense_binary(op, &raw1, &raw2).view())?;
    ensure!(
        array.shape().dims() == expected.shape(),
        "{}: lazy shape {} but eager shape {:?}",
        case.name,
        array.shape(),
        expected.shape()
    );

    let result = realizer.realize(&array)?;
    let result = result
        .as_array::<f64>()
        .with_context(|| format!("{}: realized {} instead of f64", case.name, result.dtype()))?;
    ensure!(
        *result == expected,
        "{}: realized values differ from the eager result",
        case.name
    );

    for (label, source) in [("lhs", &data1), ("rhs", &data2)] {
        ensure!(
            source.read_calls() == 1,
            "{}: {label} source served {} reads",
            case.name,
            source.read_calls()
        );
        let unique = source.unique_counts();
        ensure!(
            unique.iter().all(|&count| count <= 1),
            "{}: {label} source element read counts {unique:?}",
            case.name
        );
        ensure!(
            source.total_reads() == expected.len() as u64,
            "{}: {label} source read {} elements for a result of {}",
            case.name,
            source.total_reads(),
            expected.len()
        );
    }
    Ok(())
}

pub fn run_case(op: BinaryOp, case: &Case) -> Result {
    run_case_with(op, case, &Realizer::new())
}

/// Incompatible shapes fail when the node is built, before any read.
pub fn shape_mismatch_at_construction(op: BinaryOp) -> Result {
    let data1 = Arc::new(CountingSource::new(DenseArray::from_array(linspace(
        0.0,
        1.0,
        &[10],
    )?)));
    let data2 = Arc::new(CountingSource::new(DenseArray::from_array(linspace(
        0.2,
        1.2,
        &[20],
    )?)));
    let lhs = ops::adapter(Arc::clone(&data1))?;
    let rhs = ops::adapter(Arc::clone(&data2))?;

    match ops::elementwise(op, &lhs, &rhs) {
        Err(ArrayError::ShapeMismatch { lhs, rhs }) => {
            ensure!(lhs == vec![10] && rhs == vec![20], "mismatch reports {lhs:?} and {rhs:?}");
        }
        Err(other) => anyhow::bail!("expected a shape mismatch, got {other}"),
        Ok(array) => anyhow::bail!("{op} of (10,) and (20,) built {array}"),
    }
    ensure!(data1.read_calls() == 0 && data2.read_calls() == 0);
    Ok(())
}

/// An out-of-range integer index fails at `index` time, not at realization.
pub fn out_of_range_index_at_index_time(op: BinaryOp) -> Result {
    let data1 = Arc::new(CountingSource::new(DenseArray::from_array(linspace(
        0.0,
        1.0,
        &[30, 40],
    )?)));
    let data2 = Arc::new(CountingSource::new(DenseArray::from_array(linspace(
        0.2,
        1.2,
        &[30, 40],
    )?)));
    let array: LazyArray = ops::elementwise(
        op,
        &ops::adapter(Arc::clone(&data1))?,
        &ops::adapter(Arc::clone(&data2))?,
    )?;

    let err = match array.index((0, 40)) {
        Err(err) => err,
        Ok(indexed) => anyhow::bail!("indexing (30, 40) with [0, 40] built {indexed}"),
    };
    ensure!(
        err.as_index_error()
            == Some(&IndexError::OutOfRange {
                axis: 1,
                index: 40,
                len: 40,
            }),
        "unexpected error {err}"
    );
    ensure!(data1.read_calls() == 0 && data2.read_calls() == 0);
    Ok(())
}
