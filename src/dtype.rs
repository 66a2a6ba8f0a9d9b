//! Element Types
//!
//! Every tensor carries a [`DType`]. The set mirrors the "all types and half"
//! dispatch set of the host framework: the unsigned/signed integer widths,
//! half precision, single and double precision.
//!
//! ## Statistics dtype
//!
//! The forward pass produces two per-row statistics, `mean` and `invvar`.
//! Their element type is derived from the input type:
//!
//! ```text
//! I64, F64        -> F64
//! everything else -> F32
//! ```
//!
//! Half precision inputs therefore keep their statistics in single precision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tensor element type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    U8,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl DType {
    /// Every supported dtype, in dispatch order
    pub const ALL: [DType; 8] = [
        DType::U8,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::F16,
        DType::F32,
        DType::F64,
    ];

    /// Element type used for the `mean` and `invvar` statistics of an input
    /// of this type
    ///
    /// # Example
    ///
    /// ```rust
    /// # use fused_layer_norm::DType;
    /// assert_eq!(DType::F16.stats_dtype(), DType::F32);
    /// assert_eq!(DType::I64.stats_dtype(), DType::F64);
    /// ```
    pub fn stats_dtype(self) -> DType {
        match self {
            DType::I64 | DType::F64 => DType::F64,
            _ => DType::F32,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::U8 | DType::I8 => 1,
            DType::I16 | DType::F16 => 2,
            DType::I32 | DType::F32 => 4,
            DType::I64 | DType::F64 => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DType::U8 => "u8",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown dtype '{}'", s))
    }
}
