//! Graph input: text edge lists and bundled datasets.
//!
//! Every source produces a [`RawEdgeList`](crate::topology::graph::RawEdgeList)
//! in original vertex ids; partitioning happens afterwards.

pub mod datasets;
pub mod edge_list;

pub use datasets::karate_club;
pub use edge_list::{EdgeListReader, parse_edge_list, read_edge_list};
