//! Top-level module for graph topology.
//!
//! This module provides:
//! - vertex and edge index widths ([`vertex`])
//! - the rank partition of internal vertex ids ([`partition`])
//! - renumbering between original and internal ids ([`renumber`])
//! - the partitioned CSC graph store ([`graph`])
//! - operator keys ([`key`])
//!
//! Most users call [`partition_edges`] on a [`RawEdgeList`] and hand each
//! rank its [`LocalGraph`].

pub mod graph;
pub mod key;
pub mod partition;
pub mod renumber;
pub mod vertex;

pub use graph::{LocalGraph, PartitionedGraph, RawEdgeList, partition_edges};
pub use key::{Key, KeyKind, Tag};
pub use partition::VertexPartition;
pub use renumber::{HashRenumberer, RenumberMap, Renumberer};
pub use vertex::{EdgeIndex, GraphIndex, VertexId, mix64};
