//! GraphError / VerificationError: unified error types for edge-sieve public APIs.
//!
//! Configuration and communication failures are fatal for the invocation that
//! hit them ([`GraphError`]). Oracle mismatches are reported as
//! [`VerificationError`] so a suite can record them and keep going.

use crate::data::record::PayloadKind;
use thiserror::Error;

/// Fatal errors raised by partitioning, propagation, the operator runtime and
/// the collectives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// A partitioning or a communicator was requested with zero ranks.
    #[error("configuration error: number of ranks must be non-zero")]
    ZeroRanks,
    /// The communicator and the partitioned graph disagree on the rank count.
    #[error("configuration error: communicator has {actual} ranks, graph was partitioned for {expected}")]
    RankCountMismatch { expected: usize, actual: usize },
    /// A rank index (own rank, root) lies outside `0..n_ranks`.
    #[error("configuration error: rank {rank} out of range for {n_ranks} ranks")]
    RankOutOfRange { rank: usize, n_ranks: usize },
    /// Partition offsets are empty, do not start at zero, or decrease.
    #[error("configuration error: invalid partition boundaries: {0}")]
    InvalidPartition(String),
    /// The renumber map is not a bijection over the vertex set.
    #[error("configuration error: invalid renumber map: {0}")]
    InvalidRenumberMap(String),
    /// An identifier does not fit the selected vertex or edge width.
    #[error("configuration error: identifier {value} does not fit in {width}")]
    IdOverflow { value: u64, width: &'static str },
    /// A vertex id falls outside every partition range.
    #[error("configuration error: vertex {0} is not owned by any partition")]
    VertexOutOfRange(u64),
    /// A per-edge or per-vertex array does not line up with the graph it belongs to.
    #[error("configuration error: {what} has {found} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Key or payload shape declaration is unusable.
    #[error("configuration error: invalid record shape: {0}")]
    InvalidShape(String),
    /// The input edge list is malformed.
    #[error("malformed dataset: {0}")]
    MalformedDataset(String),
    /// The synthetic generator was configured with impossible parameters.
    #[error("invalid generator config: {0}")]
    InvalidGeneratorConfig(String),
    /// A collective could not complete (peer gone, size mismatch, timeout).
    #[error("communication with rank {neighbor} failed: {message}")]
    CommError { neighbor: usize, message: String },
    /// The operator returned a payload whose kind differs from the declared shape.
    #[error("operator produced a {found:?} payload where {expected:?} was declared")]
    ShapeMismatch {
        expected: PayloadKind,
        found: PayloadKind,
    },
    /// Reading a dataset from disk failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl GraphError {
    /// True for errors that are raised before any computation starts.
    pub fn is_config(&self) -> bool {
        !matches!(
            self,
            GraphError::CommError { .. } | GraphError::ShapeMismatch { .. } | GraphError::Io(_)
        )
    }

    /// True for failed collectives.
    pub fn is_comm(&self) -> bool {
        matches!(self, GraphError::CommError { .. })
    }

    pub(crate) fn comm(neighbor: usize, message: impl Into<String>) -> Self {
        GraphError::CommError {
            neighbor,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        GraphError::Io(e.to_string())
    }
}

/// Correctness failures found by the reference oracle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Canonicalized buffers differ in length; `first_mismatch` is the first
    /// position where they disagree.
    #[error(
        "{case}: distributed result has {actual} records, reference has {expected} (first difference at {first_mismatch})"
    )]
    LengthMismatch {
        case: String,
        expected: usize,
        actual: usize,
        first_mismatch: usize,
    },
    /// Canonicalized buffers differ at `index`.
    #[error("{case}: first mismatch at canonical position {index}: expected {expected}, got {actual}")]
    RecordMismatch {
        case: String,
        index: usize,
        expected: String,
        actual: String,
    },
    /// Seen on non-root ranks: the root rank reported a mismatch.
    #[error("{case}: verification failed on root rank {root}")]
    ReportedByRoot { case: String, root: usize },
}

impl VerificationError {
    /// Label of the (key, payload, width) combination that failed.
    pub fn case(&self) -> &str {
        match self {
            VerificationError::LengthMismatch { case, .. }
            | VerificationError::RecordMismatch { case, .. }
            | VerificationError::ReportedByRoot { case, .. } => case,
        }
    }
}
