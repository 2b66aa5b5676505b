//! Instrumented sources used to observe exactly what realization reads.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Result};
use lazynd::{ArraySource, DType, DenseArray, Selection};
use ndarray::ArrayD;

/// In-memory source that records how many times each element has been read.
pub struct CountingSource {
    data: DenseArray,
    counts: Mutex<ArrayD<u32>>,
    reads: AtomicUsize,
}

impl CountingSource {
    pub fn new(data: DenseArray) -> Self {
        let counts = ArrayD::zeros(data.shape());
        CountingSource {
            data,
            counts: Mutex::new(counts),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn data(&self) -> &DenseArray {
        &self.data
    }

    /// Number of `read` calls served so far.
    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Counters stay usable after a panicking reader poisoned the lock.
    fn lock_counts(&self) -> MutexGuard<'_, ArrayD<u32>> {
        self.counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the per-element read counts.
    pub fn counts(&self) -> ArrayD<u32> {
        self.lock_counts().clone()
    }

    /// Distinct per-element read counts, e.g. `{0, 1}` after a partial read.
    pub fn unique_counts(&self) -> BTreeSet<u32> {
        self.counts().iter().copied().collect()
    }

    pub fn all_zero(&self) -> bool {
        self.counts().iter().all(|&count| count == 0)
    }

    pub fn count_at(&self, position: &[usize]) -> u32 {
        self.counts()[position]
    }

    /// Total number of element reads across all calls.
    pub fn total_reads(&self) -> u64 {
        self.counts().iter().map(|&count| u64::from(count)).sum()
    }

    pub fn reset(&self) {
        self.lock_counts().fill(0);
        self.reads.store(0, Ordering::SeqCst);
    }
}

impl fmt::Debug for CountingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingSource")
            .field("dtype", &self.data.dtype())
            .field("shape", &self.data.shape())
            .field("read_calls", &self.read_calls())
            .finish()
    }
}

impl ArraySource for CountingSource {
    fn dtype(&self) -> DType {
        self.data.dtype()
    }

    fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    fn read(&self, selection: &Selection) -> Result<DenseArray> {
        selection.check(self.data.shape())?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        {
            let mut counts = self.lock_counts();
            selection.for_each_position(|position| counts[position] += 1);
        }
        Ok(self.data.select(selection)?)
    }
}

/// Error returned by [`FailingSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub message: String,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source failure: {}", self.message)
    }
}

impl std::error::Error for SourceFailure {}

/// Source with valid metadata whose reads always fail with [`SourceFailure`].
#[derive(Debug)]
pub struct FailingSource {
    dtype: DType,
    shape: Vec<usize>,
    message: String,
    reads: AtomicUsize,
}

impl FailingSource {
    pub fn new(dtype: DType, shape: &[usize], message: impl Into<String>) -> Self {
        FailingSource {
            dtype,
            shape: shape.to_vec(),
            message: message.into(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ArraySource for FailingSource {
    fn dtype(&self) -> DType {
        self.dtype
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn read(&self, _selection: &Selection) -> Result<DenseArray> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(SourceFailure {
            message: self.message.clone(),
        }
        .into())
    }
}

/// Source whose metadata disagrees with itself or whose reads return the wrong shape.
#[derive(Debug)]
pub struct MisbehavingSource {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub ndim: usize,
    pub returned: DenseArray,
}

impl ArraySource for MisbehavingSource {
    fn dtype(&self) -> DType {
        self.dtype
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn ndim(&self) -> usize {
        self.ndim
    }

    fn read(&self, selection: &Selection) -> Result<DenseArray> {
        if selection.len() != self.shape.len() {
            bail!("selection rank {} for shape {:?}", selection.len(), self.shape);
        }
        Ok(self.returned.clone())
    }
}
