//! Operator keys: a plain source vertex, or a source vertex tagged with a
//! small integer so one vertex can act as several logical sources.

use crate::graph_error::GraphError;
use itertools::Either;
use serde::{Deserialize, Serialize};

pub type Tag = i32;

/// Source key handed to an edge operator.
///
/// Ordering is lexicographic: vertex first, then tag. Within one run all keys
/// share the same variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key<V> {
    Plain(V),
    Tagged(V, Tag),
}

impl<V: Copy> Key<V> {
    pub fn vertex(&self) -> V {
        match *self {
            Key::Plain(v) | Key::Tagged(v, _) => v,
        }
    }

    pub fn tag(&self) -> Option<Tag> {
        match *self {
            Key::Plain(_) => None,
            Key::Tagged(_, t) => Some(t),
        }
    }

    pub fn is_tagged(&self) -> bool {
        matches!(self, Key::Tagged(..))
    }

    /// Rewrite the vertex, keeping the tag.
    pub fn try_map_vertex<W, F>(self, f: F) -> Result<Key<W>, GraphError>
    where
        F: FnOnce(V) -> Result<W, GraphError>,
    {
        Ok(match self {
            Key::Plain(v) => Key::Plain(f(v)?),
            Key::Tagged(v, t) => Key::Tagged(f(v)?, t),
        })
    }
}

/// How keys are derived from an edge's source vertex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// One invocation per edge with `Key::Plain(src)`.
    Plain,
    /// `tags` invocations per edge with `Key::Tagged(src, t)`, `t in 0..tags`.
    Tagged { tags: Tag },
}

impl KeyKind {
    pub fn is_tagged(&self) -> bool {
        matches!(self, KeyKind::Tagged { .. })
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        match *self {
            KeyKind::Tagged { tags } if tags < 1 => Err(GraphError::InvalidShape(format!(
                "tagged keys need at least one tag, got {tags}"
            ))),
            _ => Ok(()),
        }
    }

    /// All keys an edge with source `src` is invoked with.
    pub fn keys<V: Copy>(self, src: V) -> impl Iterator<Item = Key<V>> {
        match self {
            KeyKind::Plain => Either::Left(std::iter::once(Key::Plain(src))),
            KeyKind::Tagged { tags } => Either::Right((0..tags).map(move |t| Key::Tagged(src, t))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            KeyKind::Plain => "plain",
            KeyKind::Tagged { .. } => "tagged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_keys_order_by_vertex_then_tag() {
        let mut keys = vec![Key::Tagged(2u32, 0), Key::Tagged(1, 5), Key::Tagged(1, 2)];
        keys.sort();
        assert_eq!(keys, vec![Key::Tagged(1, 2), Key::Tagged(1, 5), Key::Tagged(2, 0)]);
    }

    #[test]
    fn key_fanout() {
        assert_eq!(KeyKind::Plain.keys(4u64).collect::<Vec<_>>(), vec![Key::Plain(4)]);
        assert_eq!(
            KeyKind::Tagged { tags: 3 }.keys(4u64).collect::<Vec<_>>(),
            vec![Key::Tagged(4, 0), Key::Tagged(4, 1), Key::Tagged(4, 2)]
        );
        assert!(KeyKind::Tagged { tags: 0 }.validate().is_err());
    }
}
