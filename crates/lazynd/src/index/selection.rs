//! Normalized selections and the composition rules that keep indexing chains flat.

use std::fmt;

use smallvec::SmallVec;

use super::{IndexExpr, IndexTerm, SliceSpec};
use crate::array::Shape;
use crate::error::IndexError;

/// Strided run of `len` positions `start, start + step, ...` along one axis.
///
/// Empty ranges are canonicalized to `start = 0, step = 1`, and single-element ranges keep
/// their start with `step = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisRange {
    pub start: usize,
    pub step: isize,
    pub len: usize,
}

impl AxisRange {
    pub fn new(start: usize, step: isize, len: usize) -> Self {
        match len {
            0 => AxisRange::empty(),
            1 => AxisRange { start, step: 1, len },
            _ => AxisRange { start, step, len },
        }
    }

    /// Every position of an axis of length `len`, in order.
    pub fn full(len: usize) -> Self {
        AxisRange::new(0, 1, len)
    }

    pub fn empty() -> Self {
        AxisRange {
            start: 0,
            step: 1,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the `k`-th selected element along the underlying axis.
    pub fn position(&self, k: usize) -> usize {
        (self.start as isize + k as isize * self.step) as usize
    }

    /// Iterates the selected positions in selection order.
    pub fn positions(self) -> impl Iterator<Item = usize> {
        (0..self.len).map(move |k| self.position(k))
    }

    /// Applies `outer`, expressed over this range's `len` positions, and returns the equivalent
    /// range over the underlying axis.
    pub fn compose(&self, outer: &AxisRange) -> AxisRange {
        if outer.is_empty() {
            return AxisRange::empty();
        }
        // With more than one position both steps are bounded by the axis length.
        let step = if outer.len == 1 {
            1
        } else {
            self.step.saturating_mul(outer.step)
        };
        AxisRange::new(self.position(outer.start), step, outer.len)
    }

    /// Lowest position, one past the highest position, and absolute stride.
    ///
    /// Together with a reversal for negative steps this describes the range as an ascending
    /// slice, which is how dense arrays are cut.
    pub fn ascending_bounds(&self) -> (usize, usize, usize) {
        if self.is_empty() {
            return (0, 0, 1);
        }
        let stride = self.step.unsigned_abs();
        let last = self.position(self.len - 1);
        if self.step > 0 {
            (self.start, last + 1, stride)
        } else {
            (last, self.start + 1, stride)
        }
    }

    /// Whether every selected position lies inside an axis of length `axis_len`.
    pub fn fits(&self, axis_len: usize) -> bool {
        if self.is_empty() {
            return true;
        }
        let (_, end, _) = self.ascending_bounds();
        end <= axis_len
    }

    fn to_slice_spec(self) -> SliceSpec {
        if self.is_empty() {
            return SliceSpec::new(Some(0), Some(0), None);
        }
        let start = self.start as isize;
        let step = (self.step != 1).then_some(self.step);
        let last = self.position(self.len - 1);
        if self.step > 0 {
            SliceSpec::new(Some(start), Some(last as isize + 1), step)
        } else {
            // A stop of -1 would count from the end, so a run reaching position 0 has no stop.
            let stop = (last > 0).then(|| last as isize - 1);
            SliceSpec::new(Some(start), stop, step)
        }
    }
}

/// Resolved selector for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisSelection {
    /// A single position; the axis disappears from the result.
    Index(usize),
    /// A range of positions; the axis is kept with `len` entries.
    Range(AxisRange),
}

/// An index expression normalized against a concrete shape: exactly one [`AxisSelection`] per
/// axis, all positions in range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    axes: SmallVec<[AxisSelection; 4]>,
}

impl Selection {
    pub fn from_axes<I: IntoIterator<Item = AxisSelection>>(axes: I) -> Self {
        Selection {
            axes: axes.into_iter().collect(),
        }
    }

    /// Identity selection over `shape`.
    pub fn full(shape: &[usize]) -> Self {
        Selection::from_axes(
            shape
                .iter()
                .map(|&len| AxisSelection::Range(AxisRange::full(len))),
        )
    }

    pub fn axes(&self) -> &[AxisSelection] {
        &self.axes
    }

    /// Number of axes of the array the selection applies to.
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AxisSelection> {
        self.axes.iter()
    }

    /// Shape of the selected sub-array.
    pub fn shape(&self) -> Shape {
        let dims: SmallVec<[usize; 4]> = self
            .axes
            .iter()
            .filter_map(|axis| match axis {
                AxisSelection::Range(range) => Some(range.len),
                AxisSelection::Index(_) => None,
            })
            .collect();
        Shape::new(dims)
    }

    /// Number of elements the selection addresses.
    pub fn num_elements(&self) -> usize {
        self.shape().num_elements()
    }

    /// Whether the selection is the identity over `shape`.
    pub fn is_full(&self, shape: &[usize]) -> bool {
        *self == Selection::full(shape)
    }

    /// Validates the selection against an array of the given shape.
    pub fn check(&self, shape: &[usize]) -> Result<(), IndexError> {
        if self.axes.len() != shape.len() {
            return Err(IndexError::RankMismatch {
                expected: shape.len(),
                actual: self.axes.len(),
            });
        }
        for (axis, (selection, &len)) in self.axes.iter().zip(shape).enumerate() {
            match *selection {
                AxisSelection::Index(position) if position >= len => {
                    return Err(IndexError::OutOfRange {
                        axis,
                        index: position as isize,
                        len,
                    });
                }
                AxisSelection::Range(range) if !range.fits(len) => {
                    let (_, end, _) = range.ascending_bounds();
                    return Err(IndexError::OutOfRange {
                        axis,
                        index: end as isize - 1,
                        len,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Folds `outer`, a selection over this selection's result, into a single selection over
    /// the original array.
    ///
    /// Integer axes of `self` are already gone from the result and pass through untouched; each
    /// range axis consumes the next axis of `outer`.
    pub fn compose(&self, outer: &Selection) -> Result<Selection, IndexError> {
        outer.check(self.shape().dims())?;
        let mut outer_axes = outer.iter();
        let mut axes = SmallVec::<[AxisSelection; 4]>::with_capacity(self.axes.len());
        for axis in &self.axes {
            let composed = match *axis {
                AxisSelection::Index(position) => AxisSelection::Index(position),
                AxisSelection::Range(range) => match outer_axes.next() {
                    Some(&AxisSelection::Index(k)) => AxisSelection::Index(range.position(k)),
                    Some(&AxisSelection::Range(inner)) => {
                        AxisSelection::Range(range.compose(&inner))
                    }
                    None => {
                        return Err(IndexError::RankMismatch {
                            expected: self.shape().rank(),
                            actual: outer.len(),
                        })
                    }
                },
            };
            axes.push(composed);
        }
        Ok(Selection { axes })
    }

    /// Renders the selection as an expression of concrete integers and slices that resolves
    /// back to the same selection.
    pub fn to_index_expr(&self) -> IndexExpr {
        self.axes
            .iter()
            .map(|axis| match *axis {
                AxisSelection::Index(position) => IndexTerm::Index(position as isize),
                AxisSelection::Range(range) => IndexTerm::Slice(range.to_slice_spec()),
            })
            .collect()
    }

    /// Calls `visit` with the full coordinate of every addressed element, in row-major order of
    /// the selected sub-array.
    pub fn for_each_position(&self, mut visit: impl FnMut(&[usize])) {
        let shape = self.shape();
        if shape.is_empty() {
            return;
        }
        let dims = shape.dims();
        let mut counter = vec![0usize; dims.len()];
        let mut position = vec![0usize; self.axes.len()];
        loop {
            let mut kept = 0usize;
            for (slot, axis) in position.iter_mut().zip(self.axes.iter()) {
                *slot = match *axis {
                    AxisSelection::Index(p) => p,
                    AxisSelection::Range(range) => {
                        let p = range.position(counter[kept]);
                        kept += 1;
                        p
                    }
                };
            }
            visit(&position);

            let mut axis = dims.len();
            loop {
                if axis == 0 {
                    return;
                }
                axis -= 1;
                counter[axis] += 1;
                if counter[axis] < dims[axis] {
                    break;
                }
                counter[axis] = 0;
            }
        }
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a AxisSelection;
    type IntoIter = std::slice::Iter<'a, AxisSelection>;

    fn into_iter(self) -> Self::IntoIter {
        self.axes.iter()
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_index_expr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descending_run_to_zero_renders_without_stop() {
        let range = AxisRange::new(4, -2, 3);
        let spec = range.to_slice_spec();
        assert_eq!(spec, SliceSpec::new(Some(4), None, Some(-2)));
        assert_eq!(spec.resolve(10, 0).unwrap(), range);
    }

    #[test]
    fn ascending_bounds_cover_negative_steps() {
        let range = AxisRange::new(9, -3, 3);
        assert_eq!(range.positions().collect::<Vec<_>>(), vec![9, 6, 3]);
        assert_eq!(range.ascending_bounds(), (3, 10, 3));
        assert!(range.fits(10));
        assert!(!range.fits(9));
    }

    #[test]
    fn compose_of_empty_is_canonical() {
        let range = AxisRange::new(2, 3, 5);
        assert_eq!(range.compose(&AxisRange::empty()), AxisRange::empty());
        assert_eq!(AxisRange::new(7, -1, 0), AxisRange::empty());
    }

    #[test]
    fn huge_steps_compose_without_overflow() {
        let single = AxisRange::new(0, isize::MAX, 1);
        assert_eq!(single, AxisRange::new(0, 1, 1));
        let raw = AxisRange {
            start: 3,
            step: isize::MAX,
            len: 1,
        };
        let outer = AxisRange {
            start: 0,
            step: isize::MIN,
            len: 1,
        };
        assert_eq!(raw.compose(&outer), AxisRange::new(3, 1, 1));
    }
}
