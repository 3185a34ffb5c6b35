//! Output records of the edge transform-filter.
//!
//! A record is `{key fields} + {destination} + {payload fields}`; which
//! fields exist is fixed per run by a [`RecordShape`]. Records have no
//! identity beyond their values.

use crate::graph_error::GraphError;
use crate::topology::key::{Key, KeyKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Key and destination only.
    Empty,
    /// One `i32`.
    Scalar,
    /// An `(f32, i32)` pair.
    Pair,
}

impl PayloadKind {
    pub fn label(&self) -> &'static str {
        match self {
            PayloadKind::Empty => "empty",
            PayloadKind::Scalar => "scalar",
            PayloadKind::Pair => "pair",
        }
    }
}

/// Operator output payload. Ordered and compared totally (`f32::total_cmp`).
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub enum Payload {
    Empty,
    Scalar(i32),
    Pair(f32, i32),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Empty => PayloadKind::Empty,
            Payload::Scalar(_) => PayloadKind::Scalar,
            Payload::Pair(..) => PayloadKind::Pair,
        }
    }

    /// The constant payload of the reference operator: nothing, `1`, or `(1.0, 1)`.
    pub fn unit(kind: PayloadKind) -> Self {
        match kind {
            PayloadKind::Empty => Payload::Empty,
            PayloadKind::Scalar => Payload::Scalar(1),
            PayloadKind::Pair => Payload::Pair(1.0, 1),
        }
    }
}

impl Ord for Payload {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Payload::Empty, Payload::Empty) => Ordering::Equal,
            (Payload::Scalar(a), Payload::Scalar(b)) => a.cmp(b),
            (Payload::Pair(fa, ia), Payload::Pair(fb, ib)) => fa.total_cmp(fb).then_with(|| ia.cmp(ib)),
            _ => (self.kind() as u8).cmp(&(other.kind() as u8)),
        }
    }
}

impl PartialOrd for Payload {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Payload {}

/// One operator output. Fields are compared in declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeRecord<V> {
    pub key: Key<V>,
    pub dst: V,
    pub payload: Payload,
}

impl<V: fmt::Display + Copy> fmt::Display for EdgeRecord<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key {
            Key::Plain(v) => write!(f, "({v}")?,
            Key::Tagged(v, t) => write!(f, "(({v}, {t})")?,
        }
        write!(f, " -> {}", self.dst)?;
        match self.payload {
            Payload::Empty => write!(f, ")"),
            Payload::Scalar(x) => write!(f, ", {x})"),
            Payload::Pair(a, b) => write!(f, ", ({a}, {b}))"),
        }
    }
}

/// The fixed shape of every record produced in one run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordShape {
    pub key: KeyKind,
    pub payload: PayloadKind,
}

impl RecordShape {
    pub fn new(key: KeyKind, payload: PayloadKind) -> Self {
        Self { key, payload }
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        self.key.validate()
    }

    /// Fail unless `record` has this shape.
    pub fn check<V: Copy>(&self, record: &EdgeRecord<V>) -> Result<(), GraphError> {
        if record.key.is_tagged() != self.key.is_tagged() {
            return Err(GraphError::InvalidShape(format!(
                "{} key in a {} record stream",
                if record.key.is_tagged() { "tagged" } else { "plain" },
                self.key.label()
            )));
        }
        if record.payload.kind() != self.payload {
            return Err(GraphError::ShapeMismatch {
                expected: self.payload,
                found: record.payload.kind(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-key/{}-payload", self.key.label(), self.payload.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_order_by_key_then_dst_then_payload() {
        let mut v = vec![
            EdgeRecord { key: Key::Plain(2u32), dst: 0, payload: Payload::Scalar(1) },
            EdgeRecord { key: Key::Plain(1), dst: 5, payload: Payload::Scalar(1) },
            EdgeRecord { key: Key::Plain(1), dst: 3, payload: Payload::Scalar(1) },
        ];
        v.sort();
        let order: Vec<_> = v.iter().map(|r| (r.key.vertex(), r.dst)).collect();
        assert_eq!(order, vec![(1, 3), (1, 5), (2, 0)]);
    }

    #[test]
    fn pair_payload_uses_total_float_order() {
        assert!(Payload::Pair(-0.0, 1) < Payload::Pair(0.0, 1));
        assert_eq!(Payload::Pair(f32::NAN, 1), Payload::Pair(f32::NAN, 1));
        assert_eq!(Payload::unit(PayloadKind::Pair), Payload::Pair(1.0, 1));
    }

    #[test]
    fn shape_check_catches_wrong_payload() {
        let shape = RecordShape::new(KeyKind::Plain, PayloadKind::Scalar);
        let ok = EdgeRecord { key: Key::Plain(1u64), dst: 2, payload: Payload::Scalar(1) };
        let bad = EdgeRecord { payload: Payload::Empty, ..ok };
        assert!(shape.check(&ok).is_ok());
        assert_eq!(
            shape.check(&bad),
            Err(GraphError::ShapeMismatch { expected: PayloadKind::Scalar, found: PayloadKind::Empty })
        );
        let tagged = EdgeRecord { key: Key::Tagged(1u64, 0), ..ok };
        assert!(matches!(shape.check(&tagged), Err(GraphError::InvalidShape(_))));
    }
}
