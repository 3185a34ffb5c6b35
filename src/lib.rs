#![cfg_attr(docsrs, feature(doc_cfg))]
//! # edge-sieve
//!
//! edge-sieve is a distributed graph-edge transform-and-filter primitive. A
//! directed graph is partitioned across ranks; every rank applies a pure
//! operator to its edges, augmented with the properties of both endpoints,
//! and keeps the edges for which the operator emits a record. The union of
//! all ranks' records equals, as a multiset, what the same operator produces
//! on an unpartitioned copy of the graph, and the crate ships the oracle that
//! checks exactly that.
//!
//! ## Pipeline
//! 1. [`topology::partition_edges`] renumbers vertices into contiguous
//!    per-rank ranges and stores each rank's incoming edges column-wise.
//! 2. [`data::VertexPropertyTable::generate`] derives one property per local
//!    vertex from its original id.
//! 3. [`algs::propagate`] fetches remote source properties so every local
//!    edge sees both endpoints.
//! 4. [`algs::transform_filter_edges`] runs the operator, once per edge or
//!    once per (edge, tag).
//! 5. [`algs::gather_records`] concatenates all records on a root rank, and
//!    [`algs::oracle`] compares them with a single-rank rerun.
//!
//! [`suite::run_suite`] drives the whole matrix of key shapes, payload shapes
//! and id widths on an in-process cluster ([`algs::communicator::RayonComm`]).
//!
//! ## Determinism
//!
//! Properties and owner ranks are hashes of original vertex ids, and the
//! R-MAT generator draws from a seeded `SmallRng`, so every run is
//! reproducible and independent of the rank count.
//!
//! ## Logging
//! The crate logs through the `log` facade and never installs a logger.

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod graph_error;
pub mod io;
pub mod suite;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use graph_error::{GraphError, VerificationError};

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm, run_world};
    pub use crate::algs::context::ExecContext;
    pub use crate::algs::gather::gather_records;
    pub use crate::algs::oracle::{
        ReferenceGraph, canonicalize, compare_canonical, reconstruct_reference, unrenumber_records,
    };
    pub use crate::algs::propagation::{EdgeEndpointCache, propagate};
    pub use crate::algs::rmat::{RmatConfig, generate_rmat};
    pub use crate::algs::transform::{
        EdgeOperator, EdgePropertyView, EdgeWeights, LessThanOperator, NoEdgeProperty, extract_transform_edges,
        extract_transform_weighted_edges, transform_filter_edges,
    };
    pub use crate::data::{
        EdgeRecord, Payload, PayloadKind, PropertyGenerator, PropertyValue, RecordShape, VertexPropertyTable,
    };
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::graph_error::{GraphError, VerificationError};
    pub use crate::io::{karate_club, parse_edge_list, read_edge_list};
    pub use crate::suite::{
        CaseConfig, CaseOperator, CaseOutcome, CaseReport, IdWidth, PropertyKind, SuiteConfig, SuiteReport, run_case,
        run_case_with, run_suite, run_suite_with,
    };
    pub use crate::topology::{
        EdgeIndex, GraphIndex, HashRenumberer, Key, KeyKind, LocalGraph, PartitionedGraph, RawEdgeList,
        RenumberMap, Renumberer, VertexId, VertexPartition, partition_edges,
    };
}
