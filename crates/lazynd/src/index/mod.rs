//! Index expressions and their resolution against concrete shapes.
//!
//! An [`IndexExpr`] is what callers write: integers, slices (with optional negative bounds and
//! steps), full axes and an optional ellipsis. Resolving it against a shape yields a
//! [`Selection`], the normalized per-axis form the engine composes and hands to sources.

mod selection;

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::IndexError;
pub use selection::{AxisRange, AxisSelection, Selection};

/// Slice bounds with optional start, stop, and step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SliceSpec {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl SliceSpec {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        SliceSpec { start, stop, step }
    }

    /// Returns a copy of the slice with `step` set.
    pub fn with_step(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    /// Normalizes the slice against an axis of length `len`.
    ///
    /// Bounds are clamped rather than rejected, negative bounds count from the end, and a
    /// negative step walks the axis backwards; only a zero step is an error.
    pub fn resolve(&self, len: usize, axis: usize) -> Result<AxisRange, IndexError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(IndexError::ZeroStep { axis });
        }
        let n = len as isize;
        let (lower, upper) = if step < 0 { (-1, n - 1) } else { (0, n) };
        let clamp = |value: isize| {
            if value < 0 {
                (value + n).max(lower)
            } else {
                value.min(upper)
            }
        };
        let start = self
            .start
            .map(clamp)
            .unwrap_or(if step < 0 { upper } else { lower });
        let stop = self
            .stop
            .map(clamp)
            .unwrap_or(if step < 0 { lower } else { upper });
        let stride = step.unsigned_abs();
        let count = if step > 0 && stop > start {
            (stop - start - 1) as usize / stride + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) as usize / stride + 1
        } else {
            0
        };
        if count == 0 {
            Ok(AxisRange::empty())
        } else {
            Ok(AxisRange::new(start as usize, step, count))
        }
    }
}

impl fmt::Display for SliceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{start}")?;
        }
        f.write_str(":")?;
        if let Some(stop) = self.stop {
            write!(f, "{stop}")?;
        }
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

/// One per-axis selector of an index expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexTerm {
    /// Single position; negative values count from the end. Removes the axis.
    Index(isize),
    /// Strided range of positions. Keeps the axis.
    Slice(SliceSpec),
    /// The whole axis.
    Full,
    /// Stands for as many full axes as needed to cover the unindexed dimensions.
    Ellipsis,
}

impl IndexTerm {
    /// `start..stop` with unit step.
    pub fn slice(start: isize, stop: isize) -> Self {
        IndexTerm::Slice(SliceSpec::new(Some(start), Some(stop), None))
    }

    /// `start..stop` with an explicit step.
    pub fn stepped(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        IndexTerm::Slice(SliceSpec::new(start, stop, Some(step)))
    }

    /// The whole axis walked backwards.
    pub fn reversed() -> Self {
        IndexTerm::Slice(SliceSpec::default().with_step(-1))
    }
}

impl fmt::Display for IndexTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexTerm::Index(index) => write!(f, "{index}"),
            IndexTerm::Slice(spec) => write!(f, "{spec}"),
            IndexTerm::Full => f.write_str(":"),
            IndexTerm::Ellipsis => f.write_str("..."),
        }
    }
}

impl From<SliceSpec> for IndexTerm {
    fn from(spec: SliceSpec) -> Self {
        IndexTerm::Slice(spec)
    }
}

impl From<RangeFull> for IndexTerm {
    fn from(_: RangeFull) -> Self {
        IndexTerm::Full
    }
}

fn saturating_isize<T: TryInto<isize> + PartialOrd + Default>(value: T) -> isize {
    let negative = value < T::default();
    value
        .try_into()
        .unwrap_or(if negative { isize::MIN } else { isize::MAX })
}

macro_rules! impl_integer_terms {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for IndexTerm {
                fn from(index: $ty) -> Self {
                    IndexTerm::Index(saturating_isize(index))
                }
            }

            impl From<Range<$ty>> for IndexTerm {
                fn from(range: Range<$ty>) -> Self {
                    IndexTerm::Slice(SliceSpec::new(
                        Some(saturating_isize(range.start)),
                        Some(saturating_isize(range.end)),
                        None,
                    ))
                }
            }

            impl From<RangeFrom<$ty>> for IndexTerm {
                fn from(range: RangeFrom<$ty>) -> Self {
                    IndexTerm::Slice(SliceSpec::new(Some(saturating_isize(range.start)), None, None))
                }
            }

            impl From<RangeTo<$ty>> for IndexTerm {
                fn from(range: RangeTo<$ty>) -> Self {
                    IndexTerm::Slice(SliceSpec::new(None, Some(saturating_isize(range.end)), None))
                }
            }

            impl From<$ty> for IndexExpr {
                fn from(index: $ty) -> Self {
                    IndexExpr::from(IndexTerm::from(index))
                }
            }

            impl From<Range<$ty>> for IndexExpr {
                fn from(range: Range<$ty>) -> Self {
                    IndexExpr::from(IndexTerm::from(range))
                }
            }

            impl From<RangeFrom<$ty>> for IndexExpr {
                fn from(range: RangeFrom<$ty>) -> Self {
                    IndexExpr::from(IndexTerm::from(range))
                }
            }

            impl From<RangeTo<$ty>> for IndexExpr {
                fn from(range: RangeTo<$ty>) -> Self {
                    IndexExpr::from(IndexTerm::from(range))
                }
            }
        )*
    };
}

impl_integer_terms!(i32, i64, isize, usize);

/// Ordered list of per-axis selectors, applied from the first axis onwards.
///
/// Axes not covered by the expression are taken whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexExpr {
    terms: SmallVec<[IndexTerm; 4]>,
}

impl IndexExpr {
    /// The empty expression, which selects everything.
    pub fn new() -> Self {
        IndexExpr::default()
    }

    /// Appends a term, builder style.
    pub fn push(mut self, term: impl Into<IndexTerm>) -> Self {
        self.terms.push(term.into());
        self
    }

    pub fn terms(&self) -> &[IndexTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Validates the expression against `shape` and normalizes it into a [`Selection`].
    pub fn resolve(&self, shape: &[usize]) -> Result<Selection, IndexError> {
        let ndim = shape.len();
        let ellipses = self
            .terms
            .iter()
            .filter(|term| matches!(term, IndexTerm::Ellipsis))
            .count();
        if ellipses > 1 {
            return Err(IndexError::MultipleEllipsis);
        }
        let explicit = self.terms.len() - ellipses;
        if explicit > ndim {
            return Err(IndexError::TooManyTerms {
                terms: explicit,
                ndim,
            });
        }

        let mut axes = SmallVec::<[AxisSelection; 4]>::with_capacity(ndim);
        let mut axis = 0usize;
        for term in &self.terms {
            match *term {
                IndexTerm::Ellipsis => {
                    for _ in 0..ndim - explicit {
                        axes.push(AxisSelection::Range(AxisRange::full(shape[axis])));
                        axis += 1;
                    }
                }
                IndexTerm::Full => {
                    axes.push(AxisSelection::Range(AxisRange::full(shape[axis])));
                    axis += 1;
                }
                IndexTerm::Index(index) => {
                    axes.push(AxisSelection::Index(resolve_position(
                        index,
                        shape[axis],
                        axis,
                    )?));
                    axis += 1;
                }
                IndexTerm::Slice(spec) => {
                    axes.push(AxisSelection::Range(spec.resolve(shape[axis], axis)?));
                    axis += 1;
                }
            }
        }
        while axis < ndim {
            axes.push(AxisSelection::Range(AxisRange::full(shape[axis])));
            axis += 1;
        }
        Ok(Selection::from_axes(axes))
    }
}

/// Maps a possibly negative integer index onto `0..len`.
fn resolve_position(index: isize, len: usize, axis: usize) -> Result<usize, IndexError> {
    let n = len as isize;
    let position = if index < 0 { index + n } else { index };
    if position < 0 || position >= n {
        return Err(IndexError::OutOfRange { axis, index, len });
    }
    Ok(position as usize)
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{term}")?;
        }
        f.write_str("]")
    }
}

impl From<IndexTerm> for IndexExpr {
    fn from(term: IndexTerm) -> Self {
        IndexExpr {
            terms: SmallVec::from_elem(term, 1),
        }
    }
}

impl From<&IndexExpr> for IndexExpr {
    fn from(expr: &IndexExpr) -> Self {
        expr.clone()
    }
}

impl From<SliceSpec> for IndexExpr {
    fn from(spec: SliceSpec) -> Self {
        IndexExpr::from(IndexTerm::Slice(spec))
    }
}

impl From<RangeFull> for IndexExpr {
    fn from(_: RangeFull) -> Self {
        IndexExpr::from(IndexTerm::Full)
    }
}

impl From<Vec<IndexTerm>> for IndexExpr {
    fn from(terms: Vec<IndexTerm>) -> Self {
        IndexExpr {
            terms: SmallVec::from_vec(terms),
        }
    }
}

impl From<&[IndexTerm]> for IndexExpr {
    fn from(terms: &[IndexTerm]) -> Self {
        IndexExpr {
            terms: SmallVec::from_slice(terms),
        }
    }
}

impl<const N: usize> From<[IndexTerm; N]> for IndexExpr {
    fn from(terms: [IndexTerm; N]) -> Self {
        IndexExpr {
            terms: terms.into_iter().collect(),
        }
    }
}

impl FromIterator<IndexTerm> for IndexExpr {
    fn from_iter<I: IntoIterator<Item = IndexTerm>>(iter: I) -> Self {
        IndexExpr {
            terms: iter.into_iter().collect(),
        }
    }
}

macro_rules! impl_tuple_expr {
    ($($name:ident),+) => {
        impl<$($name: Into<IndexTerm>),+> From<($($name,)+)> for IndexExpr {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                IndexExpr {
                    terms: SmallVec::from_iter([$($name.into()),+]),
                }
            }
        }
    };
}

impl_tuple_expr!(A);
impl_tuple_expr!(A, B);
impl_tuple_expr!(A, B, C);
impl_tuple_expr!(A, B, C, D);
impl_tuple_expr!(A, B, C, D, E);
