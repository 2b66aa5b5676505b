use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use lazynd::ops;
use lazynd::{
    ArrayError, BinaryOp, DType, DenseArray, IndexExpr, IndexTerm, LazyArray, LazyArrayOps,
    Realizer,
};
use lazynd_tests::{CountingSource, FailingSource, MisbehavingSource, SourceFailure};
use ndarray::{ArrayD, Dimension, IxDyn, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn counting(shape: &[usize], offset: f64) -> Arc<CountingSource> {
    let data = ArrayD::from_shape_fn(IxDyn(shape), |index| {
        index
            .slice()
            .iter()
            .fold(offset, |acc, &position| acc * 10.0 + position as f64)
    });
    Arc::new(CountingSource::new(DenseArray::from_array(data)))
}

fn f64_values(array: &DenseArray) -> Vec<f64> {
    array.to_vec::<f64>().expect("float64 result")
}

#[test]
fn construction_and_indexing_never_read() -> Result<()> {
    init_logging();
    let a = counting(&[4, 1, 3], 1.0);
    let b = counting(&[5, 1], 2.0);
    let c = counting(&[3], 3.0);

    let lhs = ops::adapter(Arc::clone(&a))?;
    let rhs = ops::adapter(Arc::clone(&b))?;
    let sum = ops::add(&lhs, &rhs)?;
    assert_eq!(sum.shape(), &[4, 5, 3]);

    let diff = sum.sub(&ops::adapter(Arc::clone(&c))?)?;
    assert_eq!(diff.shape(), &[4, 5, 3]);
    assert_eq!(diff.dtype(), DType::F64);

    let row = diff.index((1, .., 2))?;
    assert_eq!(row.shape(), &[5]);
    let reversed = row.index(IndexTerm::reversed())?.index(1..4)?;
    assert_eq!(reversed.shape(), &[3]);

    for source in [&a, &b, &c] {
        assert_eq!(source.read_calls(), 0);
        assert!(source.all_zero());
    }
    Ok(())
}

#[test]
fn broadcast_operands_read_only_what_contributes() -> Result<()> {
    init_logging();
    let a = counting(&[6, 1], 1.0);
    let b = counting(&[4], 2.0);
    let sum = ops::adapter(Arc::clone(&a))?.add(&ops::adapter(Arc::clone(&b))?)?;
    assert_eq!(sum.shape(), &[6, 4]);

    let picked = sum.index((2..4, 1))?;
    assert_eq!(picked.shape(), &[2]);
    let dense = picked.realize()?;
    assert_eq!(f64_values(&dense), vec![120.0 + 21.0, 130.0 + 21.0]);

    assert_eq!(a.read_calls(), 1);
    assert_eq!(a.total_reads(), 2);
    assert_eq!(a.count_at(&[2, 0]), 1);
    assert_eq!(a.count_at(&[3, 0]), 1);
    assert_eq!(b.read_calls(), 1);
    assert_eq!(b.total_reads(), 1);
    assert_eq!(b.count_at(&[1]), 1);
    Ok(())
}

#[test]
fn stretched_axes_are_read_once() -> Result<()> {
    let a = counting(&[1, 4], 1.0);
    let b = counting(&[3, 1], 2.0);
    let sum = ops::adapter(Arc::clone(&a))?.add(&ops::adapter(Arc::clone(&b))?)?;
    let tail = sum.index(1..)?;
    assert_eq!(tail.shape(), &[2, 4]);

    let dense = tail.realize()?;
    let expected = ArrayD::from_shape_fn(IxDyn(&[2, 4]), |index| {
        (100.0 + index[1] as f64) + (200.0 + (index[0] + 1) as f64 * 10.0)
    });
    assert_eq!(dense.as_array::<f64>(), Some(&expected));

    assert_eq!(a.unique_counts(), BTreeSet::from([1]));
    assert_eq!(b.count_at(&[0, 0]), 0);
    assert_eq!(b.count_at(&[1, 0]), 1);
    assert_eq!(b.count_at(&[2, 0]), 1);
    Ok(())
}

#[test]
fn empty_slice_of_stretched_axis_reads_nothing() -> Result<()> {
    let a = counting(&[30, 1], 1.0);
    let b = counting(&[30, 40], 2.0);
    let sum = ops::adapter(Arc::clone(&a))?.add(&ops::adapter(Arc::clone(&b))?)?;
    let empty = sum.index((.., 5..5))?;
    assert_eq!(empty.shape(), &[30, 0]);

    let dense = empty.realize()?;
    assert_eq!(dense.shape(), &[30, 0]);
    assert_eq!(dense.len(), 0);
    assert_eq!(a.total_reads(), 0);
    assert_eq!(b.total_reads(), 0);
    assert!(a.all_zero() && b.all_zero());
    Ok(())
}

#[test]
fn integer_index_on_broadcast_axis_keeps_both_operands() -> Result<()> {
    let a = counting(&[2, 1, 3], 1.0);
    let b = counting(&[4, 1], 2.0);
    let product = ops::mul(&ops::adapter(Arc::clone(&a))?, &ops::adapter(Arc::clone(&b))?)?;
    assert_eq!(product.shape(), &[2, 4, 3]);

    let element = product.index((1, 2, 0))?;
    assert_eq!(element.ndim(), 0);
    let dense = element.realize()?;
    assert_eq!(f64_values(&dense), vec![1100.0 * 220.0]);
    assert_eq!(a.total_reads(), 1);
    assert_eq!(a.count_at(&[1, 0, 0]), 1);
    assert_eq!(b.total_reads(), 1);
    assert_eq!(b.count_at(&[2, 0]), 1);
    Ok(())
}

#[test]
fn incompatible_shapes_fail_at_construction() -> Result<()> {
    let a = counting(&[2, 3], 1.0);
    let b = counting(&[4, 3], 2.0);
    let lhs = ops::adapter(Arc::clone(&a))?;
    let rhs = ops::adapter(Arc::clone(&b))?;
    for op in BinaryOp::ALL {
        match lhs.elementwise(op, &rhs) {
            Err(ArrayError::ShapeMismatch { lhs, rhs }) => {
                assert_eq!(lhs, vec![2, 3]);
                assert_eq!(rhs, vec![4, 3]);
            }
            other => panic!("{op}: expected a shape mismatch, got {other:?}"),
        }
    }
    assert_eq!(a.read_calls() + b.read_calls(), 0);
    Ok(())
}

#[test]
fn unknown_operation_names_are_rejected() -> Result<()> {
    let lhs = LazyArray::from_dense(DenseArray::from_elem(&[3], 2i32));
    let rhs = LazyArray::from_dense(DenseArray::from_elem(&[3], 5i32));

    let err = ops::elementwise_by_name("divide", &lhs, &rhs).expect_err("divide is unsupported");
    assert!(matches!(err, ArrayError::UnsupportedOperation(ref name) if name == "divide"));
    assert_eq!(err.to_string(), "unsupported operation 'divide'");

    let diff = ops::elementwise_by_name("subtract", &lhs, &rhs)?;
    assert_eq!(diff.realize()?.to_vec::<i32>(), Some(vec![-3, -3, -3]));
    for op in BinaryOp::ALL {
        assert_eq!(op.name().parse::<BinaryOp>()?, op);
    }
    Ok(())
}

#[test]
fn dtypes_promote_at_construction() -> Result<()> {
    let ints = LazyArray::from_dense(DenseArray::from_shape_vec(&[3], vec![1i32, 2, 3])?);
    let longs = LazyArray::from_dense(DenseArray::from_shape_vec(&[3], vec![10i64, 20, 30])?);
    let floats = LazyArray::from_dense(DenseArray::from_shape_vec(&[3], vec![0.5f32, 0.25, 2.0])?);
    let doubles = LazyArray::from_dense(DenseArray::scalar(0.125f64));

    assert_eq!(ints.add(&ints)?.dtype(), DType::I32);
    assert_eq!(floats.add(&floats)?.dtype(), DType::F32);

    let widened = ints.add(&longs)?;
    assert_eq!(widened.dtype(), DType::I64);
    assert_eq!(widened.realize()?.to_vec::<i64>(), Some(vec![11, 22, 33]));

    let mixed = ints.sub(&floats)?;
    assert_eq!(mixed.dtype(), DType::F64);
    assert_eq!(mixed.realize()?.to_vec::<f64>(), Some(vec![0.5, 1.75, 1.0]));

    let scaled = floats.mul(&doubles)?;
    assert_eq!(scaled.dtype(), DType::F64);
    assert_eq!(scaled.shape(), &[3]);
    assert_eq!(
        scaled.realize()?.to_vec::<f64>(),
        Some(vec![0.0625, 0.03125, 0.25])
    );
    Ok(())
}

#[test]
fn integer_arithmetic_wraps_and_float_extrema_propagate_nan() -> Result<()> {
    let max = LazyArray::from_dense(DenseArray::from_shape_vec(&[2], vec![i32::MAX, i32::MIN])?);
    let one = LazyArray::from_dense(DenseArray::scalar(1i32));
    assert_eq!(
        max.add(&one)?.realize()?.to_vec::<i32>(),
        Some(vec![i32::MIN, i32::MIN + 1])
    );
    assert_eq!(
        max.sub(&one)?.realize()?.to_vec::<i32>(),
        Some(vec![i32::MAX - 1, i32::MAX])
    );

    let lhs = LazyArray::from_dense(DenseArray::from_shape_vec(&[3], vec![1.0f64, f64::NAN, 3.0])?);
    let rhs = LazyArray::from_dense(DenseArray::from_shape_vec(&[3], vec![2.0f64, 0.0, f64::NAN])?);
    let high = f64_values(&ops::maximum(&lhs, &rhs)?.realize()?);
    assert_eq!(high[0], 2.0);
    assert!(high[1].is_nan() && high[2].is_nan());
    let low = f64_values(&ops::minimum(&lhs, &rhs)?.realize()?);
    assert_eq!(low[0], 1.0);
    assert!(low[1].is_nan() && low[2].is_nan());
    Ok(())
}

#[test]
fn read_failures_surface_unchanged() -> Result<()> {
    let good = counting(&[4, 3], 1.0);
    let bad = Arc::new(FailingSource::new(DType::F64, &[4, 3], "disk on fire"));
    let sum = ops::adapter(Arc::clone(&good))?.add(&ops::adapter(Arc::clone(&bad))?)?;
    let row = sum.index(2)?;
    assert_eq!(bad.read_calls(), 0);

    let err = row.realize().expect_err("failing source");
    assert_eq!(err.to_string(), "source failure: disk on fire");
    match &err {
        ArrayError::Read(inner) => {
            assert_eq!(
                inner.downcast_ref::<SourceFailure>(),
                Some(&SourceFailure {
                    message: "disk on fire".to_string()
                })
            );
        }
        other => panic!("expected a read failure, got {other:?}"),
    }
    assert_eq!(bad.read_calls(), 1);

    let err = ops::realize(&sum).expect_err("failing source");
    assert!(matches!(err, ArrayError::Read(_)));
    Ok(())
}

#[test]
fn malformed_sources_are_reported() -> Result<()> {
    let inconsistent = Arc::new(MisbehavingSource {
        dtype: DType::I32,
        shape: vec![3],
        ndim: 2,
        returned: DenseArray::from_elem(&[3], 0i32),
    });
    match LazyArray::from_source(inconsistent) {
        Err(ArrayError::InconsistentSource { ndim, shape }) => {
            assert_eq!(ndim, 2);
            assert_eq!(shape, vec![3]);
        }
        other => panic!("expected an inconsistent source, got {other:?}"),
    }

    let short = Arc::new(MisbehavingSource {
        dtype: DType::I32,
        shape: vec![3],
        ndim: 1,
        returned: DenseArray::from_elem(&[2], 0i32),
    });
    match LazyArray::from_source(short)?.realize() {
        Err(ArrayError::SourceShape { expected, actual }) => {
            assert_eq!(expected, vec![3]);
            assert_eq!(actual, vec![2]);
        }
        other => panic!("expected a source shape error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn source_data_is_cast_to_declared_dtype() -> Result<()> {
    let mislabeled = Arc::new(MisbehavingSource {
        dtype: DType::F64,
        shape: vec![3],
        ndim: 1,
        returned: DenseArray::from_shape_vec(&[3], vec![1i32, 2, 3])?,
    });
    let array = ops::adapter(mislabeled)?;
    assert_eq!(array.dtype(), DType::F64);
    let dense = array.realize()?;
    assert_eq!(dense.dtype(), DType::F64);
    assert_eq!(dense.to_vec::<f64>(), Some(vec![1.0, 2.0, 3.0]));
    Ok(())
}

#[test]
fn every_realization_reads_again() -> Result<()> {
    let a = counting(&[5, 4], 1.0);
    let b = counting(&[5, 4], 2.0);
    let diff = ops::sub(&ops::adapter(Arc::clone(&a))?, &ops::adapter(Arc::clone(&b))?)?;
    let window = diff.index((1..3, ..))?;

    let first = window.realize()?;
    let second = window.realize()?;
    assert_eq!(first, second);
    assert_eq!(a.read_calls(), 2);
    assert_eq!(a.unique_counts(), BTreeSet::from([0, 2]));
    assert_eq!(a.total_reads(), 2 * 2 * 4);
    Ok(())
}

#[test]
fn parallel_realization_matches_sequential() -> Result<()> {
    init_logging();
    let mut rng = StdRng::seed_from_u64(11);
    let shape = [8, 6, 5];
    let data = |rng: &mut StdRng| {
        let values = (0..shape.iter().product::<usize>())
            .map(|_| rng.gen_range(-100.0..100.0))
            .collect::<Vec<f64>>();
        DenseArray::from_shape_vec(&shape, values)
    };
    let a = Arc::new(CountingSource::new(data(&mut rng)?));
    let b = Arc::new(CountingSource::new(data(&mut rng)?));
    let c = Arc::new(CountingSource::new(data(&mut rng)?));

    let graph = ops::maximum(
        &ops::add(&ops::adapter(Arc::clone(&a))?, &ops::adapter(Arc::clone(&b))?)?,
        &ops::adapter(Arc::clone(&c))?,
    )?
    .index((IndexTerm::stepped(None, None, -3), 1..5, 2))?;

    let sequential = Realizer::new().realize(&graph)?;
    let sequential_counts = [a.counts(), b.counts(), c.counts()];
    for source in [&a, &b, &c] {
        source.reset();
    }

    let parallel = Realizer::new().with_parallel(true);
    assert!(parallel.is_parallel());
    let concurrent = ops::realize_with(&graph, &parallel)?;
    assert_eq!(sequential, concurrent);
    assert_eq!([a.counts(), b.counts(), c.counts()], sequential_counts);
    Ok(())
}

#[test]
fn nested_chains_match_eager_computation() -> Result<()> {
    init_logging();
    let mut rng = StdRng::seed_from_u64(29);
    for _ in 0..50 {
        let rank = rng.gen_range(1..=3);
        let result_shape: Vec<usize> = (0..rank).map(|_| rng.gen_range(1..=5)).collect();
        let operand_shape = |rng: &mut StdRng| {
            let dropped = rng.gen_range(0..=result_shape.len());
            result_shape[dropped..]
                .iter()
                .map(|&len| if rng.gen_bool(0.3) { 1 } else { len })
                .collect::<Vec<_>>()
        };
        let shapes = [
            operand_shape(&mut rng),
            operand_shape(&mut rng),
            operand_shape(&mut rng),
        ];
        let sources = shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| counting(shape, i as f64 + 1.0))
            .collect::<Vec<_>>();
        let arrays = sources
            .iter()
            .map(|source| ops::adapter(Arc::clone(source)))
            .collect::<lazynd::Result<Vec<_>>>()?;

        let op = BinaryOp::ALL[rng.gen_range(0..BinaryOp::ALL.len())];
        let graph = ops::elementwise(op, &arrays[0], &arrays[1])?.sub(&arrays[2])?;

        let mut expr_shape = graph.shape().dims().to_vec();
        let mut lazy = graph.clone();
        let mut exprs = Vec::new();
        for _ in 0..rng.gen_range(1..=3) {
            let expr: IndexExpr = expr_shape
                .iter()
                .map(|&len| match rng.gen_range(0..3) {
                    0 if len > 0 => IndexTerm::Index(rng.gen_range(0..len as isize)),
                    1 => IndexTerm::stepped(None, None, -1),
                    _ => IndexTerm::slice(rng.gen_range(0..=len as isize), len as isize),
                })
                .collect();
            lazy = lazy.index(&expr)?;
            expr_shape = lazy.shape().dims().to_vec();
            exprs.push(expr);
        }
        assert!(sources.iter().all(|source| source.read_calls() == 0));

        let eager_operands = sources
            .iter()
            .map(|source| source.data().as_array::<f64>().expect("float64").clone())
            .collect::<Vec<_>>();
        let full = graph.shape().dims().to_vec();
        let broadcast = |array: &ArrayD<f64>| {
            array
                .broadcast(IxDyn(&full))
                .expect("broadcastable operand")
                .to_owned()
        };
        let (x, y, z) = (
            broadcast(&eager_operands[0]),
            broadcast(&eager_operands[1]),
            broadcast(&eager_operands[2]),
        );
        let combined = Zip::from(&x).and(&y).map_collect(|&p, &q| match op {
            BinaryOp::Add => p + q,
            BinaryOp::Sub => p - q,
            BinaryOp::Mul => p * q,
            BinaryOp::Maximum => p.max(q),
            BinaryOp::Minimum => p.min(q),
        });
        let mut eager = DenseArray::from_array(&combined - &z);
        for expr in &exprs {
            eager = eager.select(&expr.resolve(eager.shape())?)?;
        }

        assert_eq!(lazy.shape().dims(), eager.shape());
        assert_eq!(lazy.realize()?, eager);
        for source in &sources {
            assert_eq!(source.read_calls(), 1);
            assert!(source.unique_counts().iter().all(|&count| count <= 1));
        }
    }
    Ok(())
}

#[test]
fn display_names_node_kind() -> Result<()> {
    let array = LazyArray::from_dense(DenseArray::from_elem(&[4, 5], 0i64));
    assert_eq!(
        array.to_string(),
        "LazyArray<source>(shape=[4, 5], dtype=int64)"
    );
    let sum = array.add(&LazyArray::from_dense(DenseArray::scalar(1.5f32)))?;
    assert_eq!(
        sum.index(0)?.to_string(),
        "LazyArray<elementwise>(shape=[5], dtype=float64)"
    );
    Ok(())
}
