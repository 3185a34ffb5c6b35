//! Integer widths for vertex identifiers and edge offsets.
//!
//! Graphs are generic over the width of their vertex ids (`V`) and of their
//! edge offsets (`E`). Both are plain unsigned integers; `u32` and `u64` are
//! provided. Conversions from the `u64` space used by renumbering and on the
//! wire are checked and fail with [`GraphError::IdOverflow`].

use crate::algs::wire::WireValue;
use crate::graph_error::GraphError;
use num_traits::{FromPrimitive, PrimInt, ToPrimitive, Unsigned};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// An unsigned integer usable as a vertex id or an edge offset.
pub trait GraphIndex:
    PrimInt + Unsigned + FromPrimitive + ToPrimitive + Hash + Debug + Display + Default + WireValue
{
    /// Human-readable width, used in overflow errors and case labels.
    const WIDTH_NAME: &'static str;

    /// Checked narrowing from the canonical `u64` id space.
    #[inline]
    fn try_from_u64(raw: u64) -> Result<Self, GraphError> {
        Self::from_u64(raw).ok_or(GraphError::IdOverflow {
            value: raw,
            width: Self::WIDTH_NAME,
        })
    }

    /// Checked narrowing from a `usize` count or offset.
    #[inline]
    fn try_from_usize(raw: usize) -> Result<Self, GraphError> {
        Self::from_usize(raw).ok_or(GraphError::IdOverflow {
            value: raw as u64,
            width: Self::WIDTH_NAME,
        })
    }

    /// Lossless widening to `u64`.
    fn widen(self) -> u64;

    #[inline]
    fn as_index(self) -> usize {
        self.widen() as usize
    }
}

impl GraphIndex for u32 {
    const WIDTH_NAME: &'static str = "u32";

    #[inline]
    fn widen(self) -> u64 {
        u64::from(self)
    }
}

impl GraphIndex for u64 {
    const WIDTH_NAME: &'static str = "u64";

    #[inline]
    fn widen(self) -> u64 {
        self
    }
}

/// Width of internal vertex ids.
pub trait VertexId: GraphIndex {}
impl<T: GraphIndex> VertexId for T {}

/// Width of CSC edge offsets.
pub trait EdgeIndex: GraphIndex {}
impl<T: GraphIndex> EdgeIndex for T {}

/// SplitMix64 finaliser: a stateless, platform-independent mix of a vertex id.
///
/// Used wherever a vertex must be mapped to a bucket (owner rank, property
/// value) identically on every rank and for every rank count.
#[inline]
pub const fn mix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_is_checked() {
        assert_eq!(u32::try_from_u64(7), Ok(7u32));
        assert_eq!(
            u32::try_from_u64(u64::from(u32::MAX) + 1),
            Err(GraphError::IdOverflow {
                value: u64::from(u32::MAX) + 1,
                width: "u32"
            })
        );
        assert_eq!(u64::try_from_u64(u64::MAX).map(GraphIndex::widen), Ok(u64::MAX));
    }

    #[test]
    fn mix_is_stable() {
        // reference values of the SplitMix64 finaliser
        assert_eq!(mix64(0), 0xE220_A839_7B1D_CDAF);
        assert_ne!(mix64(1), mix64(2));
    }
}
