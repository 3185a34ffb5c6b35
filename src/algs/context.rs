//! Explicit execution context threaded through every distributed call.
//!
//! An [`ExecContext`] borrows the rank's communicator and hands out a fresh
//! pair of [`CollectiveTags`] per collective. Every rank issues the same
//! collectives in the same order, so the tag sequences stay aligned across the
//! world without any negotiation.

use crate::algs::communicator::{CollectiveTags, CommTag, Communicator};
use crate::graph_error::GraphError;
use std::sync::atomic::{AtomicU16, Ordering};

/// First tag handed out by [`ExecContext::new`].
pub const DEFAULT_BASE_TAG: CommTag = CommTag::new(0x5100);

pub struct ExecContext<'a, C: Communicator> {
    comm: &'a C,
    next_tag: AtomicU16,
}

impl<'a, C: Communicator> ExecContext<'a, C> {
    pub fn new(comm: &'a C) -> Result<Self, GraphError> {
        Self::with_base_tag(comm, DEFAULT_BASE_TAG)
    }

    pub fn with_base_tag(comm: &'a C, base: CommTag) -> Result<Self, GraphError> {
        if comm.size() == 0 {
            return Err(GraphError::ZeroRanks);
        }
        if comm.rank() >= comm.size() {
            return Err(GraphError::RankOutOfRange {
                rank: comm.rank(),
                n_ranks: comm.size(),
            });
        }
        Ok(Self {
            comm,
            next_tag: AtomicU16::new(base.as_u16()),
        })
    }

    pub fn comm(&self) -> &'a C {
        self.comm
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn size(&self) -> usize {
        self.comm.size()
    }

    /// Reserve the tags for the next collective.
    pub fn next_tags(&self) -> CollectiveTags {
        let base = self.next_tag.fetch_add(2, Ordering::Relaxed);
        CollectiveTags::from_base(CommTag::new(base))
    }

    pub fn barrier(&self) -> Result<(), GraphError> {
        self.comm.barrier()
    }

    /// Fail unless `root` names a rank of this world.
    pub fn check_root(&self, root: usize) -> Result<(), GraphError> {
        if root < self.size() {
            Ok(())
        } else {
            Err(GraphError::RankOutOfRange {
                rank: root,
                n_ranks: self.size(),
            })
        }
    }
}
