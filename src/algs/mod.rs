//! Re-export public algorithms.

pub mod collective;
pub mod communicator;
pub mod context;
pub mod gather;
pub mod oracle;
pub mod propagation;
pub mod rmat;
pub mod transform;
pub mod wire;

pub use context::ExecContext;
pub use gather::gather_records;
pub use oracle::{compare_canonical, canonicalize, reconstruct_reference, unrenumber_records};
pub use propagation::{EdgeEndpointCache, propagate};
pub use transform::{extract_transform_edges, transform_filter_edges};
