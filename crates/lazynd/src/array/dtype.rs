//! Enumerates the scalar element types lazy arrays can carry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical dtype identifier shared between sources, lazy nodes, and dense results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit floating point following IEEE-754 semantics.
    F32,
    /// 64-bit floating point following IEEE-754 semantics.
    F64,
}

impl DType {
    /// Returns the number of bytes required per scalar element.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::I32 | DType::F32 => 4,
            DType::I64 | DType::F64 => 8,
        }
    }

    /// Returns `true` for the floating-point dtypes.
    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Returns `true` for the signed integer dtypes.
    pub fn is_integer(self) -> bool {
        matches!(self, DType::I32 | DType::I64)
    }

    /// Stable name matching the conventional numeric-library spelling.
    pub fn name(self) -> &'static str {
        match self {
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::F32 => "float32",
            DType::F64 => "float64",
        }
    }

    /// Result dtype of a binary operation between `self` and `other`.
    ///
    /// Follows the usual promotion table: widths widen within a kind, and mixing an integer
    /// with `F32` goes to `F64` because `F32` cannot hold every `I32`/`I64` value.
    pub fn promote(self, other: DType) -> DType {
        use DType::*;
        match (self, other) {
            (I32, I32) => I32,
            (F32, F32) => F32,
            (I32, I64) | (I64, I32) | (I64, I64) => I64,
            (F64, _) | (_, F64) => F64,
            (F32, _) | (_, F32) => F64,
        }
    }
}

/// Free-function form of [`DType::promote`].
pub fn promote(lhs: DType, rhs: DType) -> DType {
    lhs.promote(rhs)
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
