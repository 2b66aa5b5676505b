//! Binary elementwise node with broadcasting and dtype promotion.

use std::fmt;
use std::str::FromStr;

use log::trace;
use serde::{Deserialize, Serialize};

use super::ArrayNode;
use crate::array::{broadcast_shapes, DType, DenseArray, LazyArray, Shape};
use crate::error::{ArrayError, Result};
use crate::index::{AxisRange, AxisSelection, Selection};
use crate::realize::Realizer;

/// Operation tag of an elementwise node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Maximum,
    Minimum,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 5] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Maximum,
        BinaryOp::Minimum,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Maximum => "maximum",
            BinaryOp::Minimum => "minimum",
        }
    }
}

impl FromStr for BinaryOp {
    type Err = ArrayError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "add" => Ok(BinaryOp::Add),
            "sub" | "subtract" => Ok(BinaryOp::Sub),
            "mul" | "multiply" => Ok(BinaryOp::Mul),
            "maximum" => Ok(BinaryOp::Maximum),
            "minimum" => Ok(BinaryOp::Minimum),
            other => Err(ArrayError::UnsupportedOperation(other.to_string())),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `op(lhs, rhs)` evaluated lazily over the broadcast of both operand shapes.
#[derive(Debug)]
pub struct ElementwiseNode {
    op: BinaryOp,
    lhs: LazyArray,
    rhs: LazyArray,
    shape: Shape,
    dtype: DType,
}

impl ElementwiseNode {
    /// Validates broadcast compatibility and records the result shape and promoted dtype.
    pub fn new(op: BinaryOp, lhs: LazyArray, rhs: LazyArray) -> Result<Self> {
        let shape = broadcast_shapes(lhs.shape(), rhs.shape())?;
        let dtype = lhs.dtype().promote(rhs.dtype());
        Ok(ElementwiseNode {
            op,
            lhs,
            rhs,
            shape,
            dtype,
        })
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub fn lhs(&self) -> &LazyArray {
        &self.lhs
    }

    pub fn rhs(&self) -> &LazyArray {
        &self.rhs
    }
}

impl ArrayNode for ElementwiseNode {
    fn kind(&self) -> &'static str {
        "elementwise"
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn select(&self, selection: &Selection) -> Result<LazyArray> {
        let lhs_selection = operand_selection(self.lhs.shape(), &self.shape, selection);
        let rhs_selection = operand_selection(self.rhs.shape(), &self.shape, selection);
        trace!(
            "{} {}: pushing {} down as {} / {}",
            self.op,
            self.shape,
            selection,
            lhs_selection,
            rhs_selection
        );
        let lhs = self.lhs.select(&lhs_selection)?;
        let rhs = self.rhs.select(&rhs_selection)?;
        let node = ElementwiseNode::new(self.op, lhs, rhs)?;
        debug_assert_eq!(node.shape, selection.shape());
        Ok(LazyArray::from_node(node))
    }

    fn realize(&self, realizer: &Realizer) -> Result<DenseArray> {
        let (lhs, rhs) = realizer.join(
            || realizer.realize_node(self.lhs.node()),
            || realizer.realize_node(self.rhs.node()),
        );
        let lhs = lhs?.into_dtype(self.dtype);
        let rhs = rhs?.into_dtype(self.dtype);
        DenseArray::combine(self.op, &lhs, &rhs, self.shape.dims())
    }
}

/// Restricts one operand to the part of it that contributes to `selection` of the result.
///
/// Operand axes line up with the trailing result axes. Leading result axes the operand lacks
/// are skipped. An operand axis of size 1 that is stretched by broadcasting keeps its single
/// element: an integer term becomes `Index(0)` and a non-empty range term keeps the whole axis,
/// which still broadcasts against the narrowed result. An empty range stays empty.
fn operand_selection(operand: &Shape, result: &Shape, selection: &Selection) -> Selection {
    let offset = result.rank() - operand.rank();
    Selection::from_axes(
        selection
            .iter()
            .zip(result.dims())
            .skip(offset)
            .zip(operand.dims())
            .map(|((term, &result_len), &operand_len)| {
                if operand_len != 1 || result_len == 1 {
                    return *term;
                }
                match term {
                    AxisSelection::Index(_) => AxisSelection::Index(0),
                    AxisSelection::Range(range) if range.is_empty() => {
                        AxisSelection::Range(AxisRange::empty())
                    }
                    AxisSelection::Range(_) => AxisSelection::Range(AxisRange::full(1)),
                }
            }),
    )
}
