//! Collective operations built on the point-to-point [`Communicator`].
//!
//! Every collective runs in two stages, mirroring ghost completion:
//!  1. exchange byte counts ([`WireCount`] headers) with the peers involved,
//!  2. exchange the payloads into buffers of exactly that size.
//!
//! Both stages post all receives first, then all sends, then wait. Every
//! handle is drained before returning, even when an error is found, and any
//! size disagreement between header and payload is a fatal
//! [`GraphError::CommError`].

use crate::algs::communicator::{CollectiveTags, CommTag, Communicator, Wait};
use crate::algs::context::ExecContext;
use crate::algs::wire::{WireCount, WireValue, cast_slice, decode_values, encode_values};
use crate::graph_error::GraphError;
use std::collections::HashMap;

/// Stage 1: send `count_for(peer)` to every rank in `send_to`, receive one
/// count from every rank in `recv_from`.
fn exchange_counts<C, F>(
    comm: &C,
    tag: CommTag,
    send_to: &[usize],
    recv_from: &[usize],
    count_for: F,
) -> Result<HashMap<usize, usize>, GraphError>
where
    C: Communicator,
    F: Fn(usize) -> usize,
{
    let header_len = std::mem::size_of::<WireCount>();

    // 1) post all receives
    let mut pending_recvs = Vec::with_capacity(recv_from.len());
    for &nbr in recv_from {
        let mut window = [0u8; std::mem::size_of::<WireCount>()];
        pending_recvs.push((nbr, comm.irecv(nbr, tag.as_u16(), &mut window)));
    }

    // 2) post all sends
    let mut pending_sends = Vec::with_capacity(send_to.len());
    for &nbr in send_to {
        let count = WireCount::new(count_for(nbr));
        pending_sends.push(comm.isend(nbr, tag.as_u16(), cast_slice(std::slice::from_ref(&count))));
    }

    // 3) wait for all recvs (but do not early-return)
    let mut counts = HashMap::with_capacity(recv_from.len());
    let mut maybe_err = None;
    for (nbr, h) in pending_recvs {
        match h.wait() {
            Some(data) if data.len() == header_len => {
                let mut cnt = WireCount::default();
                bytemuck::bytes_of_mut(&mut cnt).copy_from_slice(&data);
                counts.insert(nbr, cnt.get());
            }
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(GraphError::comm(
                    nbr,
                    format!("size header: expected {header_len} bytes, got {}", data.len()),
                ));
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(GraphError::comm(nbr, format!("no size header from rank {nbr}")));
            }
            _ => {} // already have an error; just drain
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(counts),
    }
}

/// Stage 2: ship `sends` and receive exactly `len` bytes from each `(peer, len)`.
/// Empty messages are skipped on both sides.
fn exchange_payloads<C: Communicator>(
    comm: &C,
    tag: CommTag,
    sends: &[(usize, &[u8])],
    recvs: &[(usize, usize)],
) -> Result<HashMap<usize, Vec<u8>>, GraphError> {
    let mut received = HashMap::with_capacity(recvs.len());

    let mut pending_recvs = Vec::with_capacity(recvs.len());
    for &(nbr, len) in recvs {
        if len == 0 {
            received.insert(nbr, Vec::new());
            continue;
        }
        let mut buffer = vec![0u8; len];
        let h = comm.irecv(nbr, tag.as_u16(), &mut buffer);
        pending_recvs.push((nbr, len, h, buffer));
    }

    let mut pending_sends = Vec::with_capacity(sends.len());
    for &(nbr, bytes) in sends {
        if !bytes.is_empty() {
            pending_sends.push(comm.isend(nbr, tag.as_u16(), bytes));
        }
    }

    let mut maybe_err = None;
    for (nbr, len, h, mut buffer) in pending_recvs {
        match h.wait() {
            Some(raw) if raw.len() == len => {
                buffer.copy_from_slice(&raw);
                received.insert(nbr, buffer);
            }
            Some(raw) if maybe_err.is_none() => {
                maybe_err = Some(GraphError::comm(
                    nbr,
                    format!("payload: expected {len} bytes, got {}", raw.len()),
                ));
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(GraphError::comm(nbr, format!("no payload from rank {nbr}")));
            }
            _ => {}
        }
    }

    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(received),
    }
}

/// Personalized all-to-all: `outgoing[r]` goes to rank `r`; the result holds
/// at index `r` what rank `r` sent to us.
pub fn all_to_all_v<C: Communicator>(
    comm: &C,
    tags: CollectiveTags,
    outgoing: Vec<Vec<u8>>,
) -> Result<Vec<Vec<u8>>, GraphError> {
    let size = comm.size();
    let me = comm.rank();
    if outgoing.len() != size {
        return Err(GraphError::RankCountMismatch {
            expected: size,
            actual: outgoing.len(),
        });
    }
    if size == 1 {
        return Ok(outgoing);
    }

    let peers: Vec<usize> = (0..size).filter(|&r| r != me).collect();
    let mut received = {
        let counts = exchange_counts(comm, tags.sizes, &peers, &peers, |p| outgoing[p].len())?;
        let sends: Vec<(usize, &[u8])> = peers.iter().map(|&p| (p, outgoing[p].as_slice())).collect();
        let recvs: Vec<(usize, usize)> = peers
            .iter()
            .map(|&p| (p, counts.get(&p).copied().unwrap_or(0)))
            .collect();
        exchange_payloads(comm, tags.data, &sends, &recvs)?
    };

    Ok(outgoing
        .into_iter()
        .enumerate()
        .map(|(r, own)| {
            if r == me {
                own
            } else {
                received.remove(&r).unwrap_or_default()
            }
        })
        .collect())
}

/// Concatenation onto `root`: the root gets every rank's buffer (indexed by
/// rank), the others get `None`.
pub fn gather_v<C: Communicator>(
    comm: &C,
    tags: CollectiveTags,
    root: usize,
    bytes: Vec<u8>,
) -> Result<Option<Vec<Vec<u8>>>, GraphError> {
    let size = comm.size();
    let me = comm.rank();
    if root >= size {
        return Err(GraphError::RankOutOfRange { rank: root, n_ranks: size });
    }

    if me != root {
        exchange_counts(comm, tags.sizes, &[root], &[], |_| bytes.len())?;
        exchange_payloads(comm, tags.data, &[(root, bytes.as_slice())], &[])?;
        return Ok(None);
    }

    let peers: Vec<usize> = (0..size).filter(|&r| r != me).collect();
    let counts = exchange_counts(comm, tags.sizes, &[], &peers, |_| 0)?;
    let recvs: Vec<(usize, usize)> = peers
        .iter()
        .map(|&p| (p, counts.get(&p).copied().unwrap_or(0)))
        .collect();
    let mut received = exchange_payloads(comm, tags.data, &[], &recvs)?;

    let mut own = Some(bytes);
    Ok(Some(
        (0..size)
            .map(|r| {
                if r == me {
                    own.take().unwrap_or_default()
                } else {
                    received.remove(&r).unwrap_or_default()
                }
            })
            .collect(),
    ))
}

/// Root's `bytes` reach every rank; non-root input is ignored.
pub fn broadcast<C: Communicator>(
    comm: &C,
    tags: CollectiveTags,
    root: usize,
    bytes: Vec<u8>,
) -> Result<Vec<u8>, GraphError> {
    let size = comm.size();
    let me = comm.rank();
    if root >= size {
        return Err(GraphError::RankOutOfRange { rank: root, n_ranks: size });
    }
    if me == root {
        let peers: Vec<usize> = (0..size).filter(|&r| r != me).collect();
        exchange_counts(comm, tags.sizes, &peers, &[], |_| bytes.len())?;
        let sends: Vec<(usize, &[u8])> = peers.iter().map(|&p| (p, bytes.as_slice())).collect();
        exchange_payloads(comm, tags.data, &sends, &[])?;
        Ok(bytes)
    } else {
        let counts = exchange_counts(comm, tags.sizes, &[], &[root], |_| 0)?;
        let len = counts.get(&root).copied().unwrap_or(0);
        let mut received = exchange_payloads(comm, tags.data, &[], &[(root, len)])?;
        Ok(received.remove(&root).unwrap_or_default())
    }
}

fn decode_from<T: WireValue>(rank: usize, bytes: &[u8]) -> Result<Vec<T>, GraphError> {
    decode_values(bytes).map_err(|e| GraphError::comm(rank, e))
}

/// Typed [`all_to_all_v`] over one column of values per destination rank.
pub fn all_to_all_values<T, C>(
    ctx: &ExecContext<'_, C>,
    outgoing: &[Vec<T>],
) -> Result<Vec<Vec<T>>, GraphError>
where
    T: WireValue,
    C: Communicator,
{
    let encoded = outgoing.iter().map(|col| encode_values(col)).collect();
    let incoming = all_to_all_v(ctx.comm(), ctx.next_tags(), encoded)?;
    incoming
        .iter()
        .enumerate()
        .map(|(r, bytes)| decode_from(r, bytes))
        .collect()
}

/// Typed [`gather_v`] of one column.
pub fn gather_values<T, C>(
    ctx: &ExecContext<'_, C>,
    root: usize,
    values: &[T],
) -> Result<Option<Vec<Vec<T>>>, GraphError>
where
    T: WireValue,
    C: Communicator,
{
    match gather_v(ctx.comm(), ctx.next_tags(), root, encode_values(values))? {
        None => Ok(None),
        Some(per_rank) => per_rank
            .iter()
            .enumerate()
            .map(|(r, bytes)| decode_from(r, bytes))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
    }
}

/// Typed [`broadcast`] of one column.
pub fn broadcast_values<T, C>(
    ctx: &ExecContext<'_, C>,
    root: usize,
    values: &[T],
) -> Result<Vec<T>, GraphError>
where
    T: WireValue,
    C: Communicator,
{
    let bytes = broadcast(ctx.comm(), ctx.next_tags(), root, encode_values(values))?;
    decode_from(root, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{self, NoComm, RayonComm};
    use std::time::Duration;

    fn run_world<T, F>(n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&RayonComm) -> T + Sync,
    {
        communicator::run_world(n, Duration::from_secs(10), f).unwrap()
    }

    #[test]
    fn single_rank_collectives_are_local() {
        let comm = NoComm;
        let ctx = ExecContext::new(&comm).unwrap();
        let out = all_to_all_values(&ctx, &[vec![1u32, 2]]).unwrap();
        assert_eq!(out, vec![vec![1, 2]]);
        let g = gather_values(&ctx, 0, &[7u64]).unwrap();
        assert_eq!(g, Some(vec![vec![7]]));
        assert_eq!(broadcast_values(&ctx, 0, &[3i32]).unwrap(), vec![3]);
    }

    #[test]
    fn all_to_all_routes_by_rank() {
        let results = run_world(3, |c| {
            let ctx = ExecContext::new(c).unwrap();
            let me = c.rank() as u64;
            // rank r sends (r * 10 + dst) repeated dst times to dst
            let outgoing: Vec<Vec<u64>> = (0..3u64).map(|d| vec![me * 10 + d; d as usize]).collect();
            all_to_all_values(&ctx, &outgoing).unwrap()
        });
        for (me, incoming) in results.iter().enumerate() {
            for (src, col) in incoming.iter().enumerate() {
                assert_eq!(col, &vec![src as u64 * 10 + me as u64; me]);
            }
        }
    }

    #[test]
    fn gather_concatenates_on_root_only() {
        let results = run_world(4, |c| {
            let ctx = ExecContext::new(c).unwrap();
            let mine: Vec<i32> = (0..c.rank() as i32).collect();
            gather_values(&ctx, 2, &mine).unwrap()
        });
        for (rank, res) in results.into_iter().enumerate() {
            if rank == 2 {
                let per_rank = res.expect("root receives");
                assert_eq!(per_rank, vec![vec![], vec![0], vec![0, 1], vec![0, 1, 2]]);
            } else {
                assert!(res.is_none());
            }
        }
    }

    #[test]
    fn broadcast_reaches_everyone() {
        let results = run_world(3, |c| {
            let ctx = ExecContext::new(c).unwrap();
            let mine = if c.rank() == 1 { vec![5u8, 6] } else { vec![] };
            broadcast_values(&ctx, 1, &mine).unwrap()
        });
        assert!(results.iter().all(|r| r == &vec![5u8, 6]));
    }

    #[test]
    fn missing_peer_is_comm_error() {
        let comms: Vec<_> = RayonComm::world(2)
            .into_iter()
            .map(|c| c.with_recv_timeout(Duration::from_millis(30)))
            .collect();
        // rank 1 never participates
        let res = all_to_all_v(&comms[0], CollectiveTags::from_base(CommTag::new(1)), vec![vec![1], vec![2]]);
        assert!(matches!(res, Err(GraphError::CommError { neighbor: 1, .. })));
    }

    #[test]
    fn wrong_fanout_is_rejected() {
        let comm = NoComm;
        let res = all_to_all_v(&comm, CollectiveTags::from_base(CommTag::new(1)), vec![vec![], vec![]]);
        assert_eq!(res, Err(GraphError::RankCountMismatch { expected: 1, actual: 2 }));
    }
}
