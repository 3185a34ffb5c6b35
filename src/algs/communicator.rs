//! Thin façade over single-rank (no-op) or intra-process (threaded) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! All handles are **waitable** but non-blocking; the collectives call
//! `.wait()` before they trust that a buffer is ready.

use crate::graph_error::GraphError;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Message tag distinguishing independent communication epochs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
    pub const fn offset(self, by: u16) -> Self {
        Self(self.0.wrapping_add(by))
    }
}

/// Tags for the two stages (byte counts, then data) of one collective.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollectiveTags {
    pub sizes: CommTag,
    pub data: CommTag,
}

impl CollectiveTags {
    pub const fn from_base(base: CommTag) -> Self {
        Self {
            sizes: base,
            data: base.offset(1),
        }
    }
}

/// Non-blocking point-to-point interface the collectives are built on.
pub trait Communicator: Send + Sync {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// Post a send of `buf` to `peer`.
    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive from `peer`; `buf.len()` is the expected message size.
    /// The message itself is returned by [`Wait::wait`].
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Block until every rank has reached the barrier. A rank that gives up
    /// waiting reports the first peer that never arrived.
    fn barrier(&self) -> Result<(), GraphError>;

    fn is_no_comm(&self) -> bool {
        false
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Single-rank communicator: rank 0 of a world of size 1.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) -> Result<(), GraphError> {
        Ok(())
    }

    fn is_no_comm(&self) -> bool {
        true
    }
}

// --- RayonComm: intra-process / multi-thread ---
type MailKey = (usize, usize, u16); // (src, dst, tag)

/// Default time a receive waits before the peer is declared stalled.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Default)]
struct Mailbox {
    slots: DashMap<MailKey, VecDeque<Bytes>>,
    lock: Mutex<()>,
    arrived: Condvar,
}

impl Mailbox {
    fn post(&self, key: MailKey, msg: Bytes) {
        self.slots.entry(key).or_default().push_back(msg);
        let _guard = self.lock.lock();
        self.arrived.notify_all();
    }

    fn take(&self, key: &MailKey) -> Option<Bytes> {
        self.slots.get_mut(key).and_then(|mut q| q.pop_front())
    }
}

/// Ranks waiting in the current barrier generation.
struct BarrierState {
    generation: u64,
    waiting: Vec<bool>,
    count: usize,
}

struct Gate {
    state: Mutex<BarrierState>,
    opened: Condvar,
}

impl Gate {
    fn new(size: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                generation: 0,
                waiting: vec![false; size],
                count: 0,
            }),
            opened: Condvar::new(),
        }
    }

    fn wait(&self, rank: usize, deadline: Instant) -> Result<(), GraphError> {
        let mut st = self.state.lock();
        let generation = st.generation;
        st.waiting[rank] = true;
        st.count += 1;
        if st.count == st.waiting.len() {
            st.generation += 1;
            st.count = 0;
            st.waiting.fill(false);
            self.opened.notify_all();
            return Ok(());
        }
        while st.generation == generation {
            if self.opened.wait_until(&mut st, deadline).timed_out() && st.generation == generation {
                // leave the generation so a late peer does not count us
                st.waiting[rank] = false;
                st.count -= 1;
                let missing = (0..st.waiting.len())
                    .find(|&r| r != rank && !st.waiting[r])
                    .unwrap_or(rank);
                return Err(GraphError::comm(missing, format!("rank {missing} never reached the barrier")));
            }
        }
        Ok(())
    }
}

struct World {
    mailbox: Mailbox,
    gate: Gate,
}

/// One rank of an in-process world; every rank runs on its own thread and
/// shares the world's mailbox. Messages between a (src, dst, tag) triple are
/// delivered in FIFO order.
#[derive(Clone)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    world: Arc<World>,
    recv_timeout: Duration,
}

impl fmt::Debug for RayonComm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("recv_timeout", &self.recv_timeout)
            .finish()
    }
}

impl RayonComm {
    /// Create all `size` ranks of a fresh world.
    pub fn world(size: usize) -> Vec<RayonComm> {
        let world = Arc::new(World {
            mailbox: Mailbox::default(),
            gate: Gate::new(size),
        });
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                world: Arc::clone(&world),
                recv_timeout: DEFAULT_RECV_TIMEOUT,
            })
            .collect()
    }

    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }
}

/// Pending receive on a [`RayonComm`].
pub struct LocalHandle {
    world: Arc<World>,
    key: MailKey,
    deadline: Instant,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let mailbox = &self.world.mailbox;
        let mut guard = mailbox.lock.lock();
        loop {
            if let Some(msg) = mailbox.take(&self.key) {
                return Some(msg.to_vec());
            }
            if mailbox
                .arrived
                .wait_until(&mut guard, self.deadline)
                .timed_out()
            {
                return mailbox.take(&self.key).map(|msg| msg.to_vec());
            }
        }
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        self.world.mailbox.post(key, Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            world: Arc::clone(&self.world),
            key: (peer, self.rank, tag),
            deadline: Instant::now() + self.recv_timeout,
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<(), GraphError> {
        self.world.gate.wait(self.rank, Instant::now() + self.recv_timeout)
    }
}

/// Run `f` once per rank of a fresh in-process world of `n_ranks`, each rank
/// on its own scoped thread. Results are returned in rank order.
///
/// A rank whose worker panics is reported as a [`GraphError::CommError`];
/// its peers see the same failure through their receive deadline.
pub fn run_world<T, F>(n_ranks: usize, recv_timeout: Duration, f: F) -> Result<Vec<T>, GraphError>
where
    T: Send,
    F: Fn(&RayonComm) -> T + Sync,
{
    if n_ranks == 0 {
        return Err(GraphError::ZeroRanks);
    }
    let comms: Vec<RayonComm> = RayonComm::world(n_ranks)
        .into_iter()
        .map(|c| c.with_recv_timeout(recv_timeout))
        .collect();
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = comms.iter().map(|c| s.spawn(move || f(c))).collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, h)| h.join().map_err(|_| GraphError::comm(rank, "rank worker panicked")))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rayon_roundtrip_two_ranks() {
        let mut world = RayonComm::world(2);
        let comm1 = world.pop().unwrap();
        let comm0 = world.pop().unwrap();

        let mut recv_buf = [0u8; 4];
        let recv_handle = comm1.irecv(0, 7, &mut recv_buf);
        comm0.isend(1, 7, &[1, 2, 3, 4]).wait();

        let data = recv_handle
            .wait()
            .expect("Expected to receive data from rank 0");
        recv_buf.copy_from_slice(&data);
        assert_eq!(&recv_buf, &[1, 2, 3, 4]);
    }

    #[test]
    fn separate_worlds_do_not_share_mail() {
        let a = RayonComm::world(2);
        let b: Vec<_> = RayonComm::world(2)
            .into_iter()
            .map(|c| c.with_recv_timeout(Duration::from_millis(20)))
            .collect();
        a[0].isend(1, 3, &[9]);
        let mut buf = [0u8; 1];
        assert!(b[1].irecv(0, 3, &mut buf).wait().is_none());
        assert_eq!(a[1].irecv(0, 3, &mut buf).wait(), Some(vec![9]));
    }

    #[test]
    fn receive_from_other_thread() {
        let mut world = RayonComm::world(2);
        let comm1 = world.pop().unwrap();
        let comm0 = world.pop().unwrap();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            comm0.isend(1, 11, b"late");
        });
        let mut buf = [0u8; 4];
        assert_eq!(comm1.irecv(0, 11, &mut buf).wait().as_deref(), Some(&b"late"[..]));
        t.join().unwrap();
    }

    #[test]
    fn run_world_returns_in_rank_order() {
        let ranks = run_world(4, Duration::from_secs(5), |c| (c.rank(), c.size())).unwrap();
        assert_eq!(ranks, vec![(0, 4), (1, 4), (2, 4), (3, 4)]);
        assert!(matches!(
            run_world(0, Duration::from_secs(1), |c| c.rank()),
            Err(GraphError::ZeroRanks)
        ));
    }

    #[test]
    fn barrier_releases_every_generation() {
        let rounds = run_world(3, Duration::from_secs(5), |c| {
            (0..4).map(|_| c.barrier()).collect::<Result<Vec<()>, _>>()
        })
        .unwrap();
        assert!(rounds.iter().all(|r| r.as_ref().map(Vec::len) == Ok(4)));
    }

    #[test]
    fn barrier_times_out_on_an_absent_peer() {
        let results = run_world(3, Duration::from_millis(100), |c| {
            if c.rank() == 2 {
                Ok(())
            } else {
                c.barrier()
            }
        })
        .unwrap();
        for r in &results[..2] {
            assert!(matches!(r, Err(GraphError::CommError { neighbor: 2, .. })), "{r:?}");
        }
        assert_eq!(results[2], Ok(()));
    }

    #[test]
    fn no_comm_is_single_rank() {
        let comm = NoComm;
        assert!(comm.is_no_comm());
        assert_eq!((comm.rank(), comm.size()), (0, 1));
        let mut buf = [0u8; 8];
        assert!(comm.irecv(0, 1, &mut buf).wait().is_none());
        assert_eq!(comm.barrier(), Ok(()));
    }
}
