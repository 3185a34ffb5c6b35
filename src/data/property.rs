//! Vertex property values and their deterministic generator.
//!
//! [`PropertyValue`] gives scalars and 2-tuples one total order and one
//! equality, so the reference operator's `<` never meets an undefined
//! comparison (floats order by IEEE-754 `totalOrder`).

use crate::algs::wire::WireValue;
use crate::graph_error::GraphError;
use crate::topology::vertex::mix64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;

pub trait PropertyValue: WireValue + Debug {
    /// Total order used by operators and canonicalization.
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Value for hash bucket `bucket`.
    fn from_bucket(bucket: u64) -> Self;

    fn total_lt(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Less
    }

    fn total_eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

macro_rules! impl_int_property {
    ($($t:ty),*) => {
        $(
            impl PropertyValue for $t {
                #[inline]
                fn total_cmp(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }
                #[inline]
                fn from_bucket(bucket: u64) -> Self {
                    bucket as $t
                }
            }
        )*
    };
}

macro_rules! impl_float_property {
    ($($t:ty),*) => {
        $(
            impl PropertyValue for $t {
                #[inline]
                fn total_cmp(&self, other: &Self) -> Ordering {
                    <$t>::total_cmp(self, other)
                }
                #[inline]
                fn from_bucket(bucket: u64) -> Self {
                    bucket as $t
                }
            }
        )*
    };
}

impl_int_property!(i32, i64);
impl_float_property!(f32, f64);

/// Lexicographic over the two components.
impl<A: PropertyValue, B: PropertyValue> PropertyValue for (A, B) {
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.0
            .total_cmp(&other.0)
            .then_with(|| self.1.total_cmp(&other.1))
    }

    fn from_bucket(bucket: u64) -> Self {
        (A::from_bucket(bucket), B::from_bucket(bucket))
    }
}

/// Derives a property from a vertex's original id: `mix64(id) % bucket_count`.
///
/// The result depends only on the original id, never on the rank computing
/// it or on the number of ranks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyGenerator {
    bucket_count: u64,
}

impl PropertyGenerator {
    pub fn new(bucket_count: u64) -> Result<Self, GraphError> {
        if bucket_count == 0 {
            return Err(GraphError::InvalidShape(
                "property bucket count must be non-zero".into(),
            ));
        }
        Ok(Self { bucket_count })
    }

    pub fn bucket_count(&self) -> u64 {
        self.bucket_count
    }

    pub fn bucket_of(&self, original: u64) -> u64 {
        mix64(original) % self.bucket_count
    }

    pub fn value_of<P: PropertyValue>(&self, original: u64) -> P {
        P::from_bucket(self.bucket_of(original))
    }
}
