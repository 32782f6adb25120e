// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! In-process loopback substrate.
//!
//! Runs a whole process group inside one process: [`Loopback::new`] builds
//! the group, [`Loopback::endpoint`] hands out one [`Endpoint`] per rank,
//! and each endpoint is driven from its own thread. Point-to-point delivery
//! uses one unbounded channel per destination rank with tag/source matching
//! on the receive side; collectives rendezvous through a shared round
//! board.
//!
//! Each rank must be driven serially (the usual single-thread-per-
//! communicator discipline); endpoints of *different* ranks are free to run
//! concurrently.

use crate::config::{LOOPBACK_MAX_RANKS, LOOPBACK_OP_TIMEOUT, TAG_MAX};
use crate::raw::{Rank, RawComm, RawDatatype, Tag};
use crate::substrate::{ReduceOp, Substrate};
use crate::{Error, Result};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::ops::{Add, Mul};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// One in-flight point-to-point message.
#[derive(Debug)]
struct Envelope {
    source: Rank,
    tag: Tag,
    datatype: RawDatatype,
    count: u32,
    payload: Vec<u8>,
}

/// Collective operation kinds for round matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Barrier,
    Broadcast,
    Gather,
    Scatter,
    Reduce(ReduceOp),
}

/// One collective rendezvous round.
///
/// Created by the first rank to arrive; later arrivals must present the
/// same parameters. When the last rank arrives the outcome is computed
/// once, and the round is dropped after the last rank has copied out.
#[derive(Debug)]
struct Round {
    kind: Kind,
    root: Rank,
    datatype: RawDatatype,
    count: u32,
    /// Byte length of a per-rank contribution, fixed by the first
    /// contributor of the round.
    contrib_bytes: Option<usize>,
    contrib: Vec<Option<Vec<u8>>>,
    arrived: u32,
    outcome: Option<core::result::Result<Arc<Vec<u8>>, Error>>,
    departed: u32,
}

#[derive(Debug)]
struct RankState {
    sender: Sender<Envelope>,
    queue: Receiver<Envelope>,
    /// Messages pulled off the queue while looking for a different
    /// (source, tag) match.
    pending: Mutex<VecDeque<Envelope>>,
    /// This rank's collective call counter. All ranks issue collectives in
    /// the same program order, so equal counters identify the same round.
    collective_seq: AtomicU64,
}

#[derive(Debug)]
struct Shared {
    size: u32,
    ranks: Vec<RankState>,
    rounds: Mutex<HashMap<u64, Round>>,
    round_cv: Condvar,
}

/// Factory for an in-process rank group.
#[derive(Debug, Clone)]
pub struct Loopback {
    shared: Arc<Shared>,
}

impl Loopback {
    /// Build a loopback group of `size` ranks over the world communicator.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRank`] when `size` is zero or above
    /// [`LOOPBACK_MAX_RANKS`].
    pub fn new(size: u32) -> Result<Loopback> {
        if size == 0 || size > LOOPBACK_MAX_RANKS {
            return Err(Error::InvalidRank(size));
        }
        let ranks = (0..size)
            .map(|_| {
                let (sender, queue) = unbounded();
                RankState {
                    sender,
                    queue,
                    pending: Mutex::new(VecDeque::new()),
                    collective_seq: AtomicU64::new(0),
                }
            })
            .collect();
        log::debug!("[loopback] group up, {} ranks", size);
        Ok(Loopback {
            shared: Arc::new(Shared {
                size,
                ranks,
                rounds: Mutex::new(HashMap::new()),
                round_cv: Condvar::new(),
            }),
        })
    }

    /// Endpoint for one rank.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRank`] when `rank` is outside the group.
    pub fn endpoint(&self, rank: Rank) -> Result<Endpoint> {
        if rank >= self.shared.size {
            return Err(Error::InvalidRank(rank));
        }
        Ok(Endpoint {
            rank,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Endpoints for every rank, in rank order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<Endpoint> {
        (0..self.shared.size)
            .map(|rank| Endpoint {
                rank,
                shared: Arc::clone(&self.shared),
            })
            .collect()
    }
}

/// One rank's substrate handle.
#[derive(Debug)]
pub struct Endpoint {
    rank: Rank,
    shared: Arc<Shared>,
}

impl Endpoint {
    fn check_comm(&self, comm: RawComm) -> Result<()> {
        if comm != RawComm::WORLD {
            return Err(Error::InvalidCommunicator(comm));
        }
        Ok(())
    }

    fn check_rank(&self, rank: Rank) -> Result<()> {
        if rank >= self.shared.size {
            return Err(Error::InvalidRank(rank));
        }
        Ok(())
    }

    fn check_tag(tag: Tag) -> Result<()> {
        if tag > TAG_MAX {
            return Err(Error::InvalidTag(tag));
        }
        Ok(())
    }

    /// Copy a matched envelope into the caller's buffer.
    fn deliver(env: &Envelope, buf: &mut [u8], count: u32, datatype: RawDatatype) -> Result<u32> {
        if env.datatype != datatype {
            return Err(Error::DatatypeMismatch {
                expected: datatype,
                got: env.datatype,
            });
        }
        if env.count > count {
            return Err(Error::Truncated {
                capacity: count,
                incoming: env.count,
            });
        }
        buf[..env.payload.len()].copy_from_slice(&env.payload);
        Ok(env.count)
    }

    /// Rendezvous with the other ranks for one collective round.
    ///
    /// `contrib` is this rank's payload where the operation takes one
    /// (sender side of broadcast/scatter, every rank for gather/reduce).
    fn run_collective(
        &self,
        comm: RawComm,
        kind: Kind,
        root: Rank,
        datatype: RawDatatype,
        count: u32,
        contrib: Option<Vec<u8>>,
    ) -> Result<Arc<Vec<u8>>> {
        self.check_comm(comm)?;
        self.check_rank(root)?;
        let me = self.rank as usize;
        let seq = self.shared.ranks[me].collective_seq.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "[loopback] rank {} enters {:?} round {} (root {})",
            self.rank,
            kind,
            seq,
            root
        );

        let deadline = Instant::now() + LOOPBACK_OP_TIMEOUT;
        let mut rounds = self.shared.rounds.lock();

        let round = rounds.entry(seq).or_insert_with(|| Round {
            kind,
            root,
            datatype,
            count,
            contrib_bytes: None,
            contrib: vec![None; self.shared.size as usize],
            arrived: 0,
            outcome: None,
            departed: 0,
        });

        if round.kind != kind
            || round.root != root
            || round.datatype != datatype
            || round.count != count
        {
            return Err(Error::CollectiveMismatch(
                "ranks disagree on collective kind, root, datatype or count",
            ));
        }
        if let Some(bytes) = contrib {
            match round.contrib_bytes {
                None => round.contrib_bytes = Some(bytes.len()),
                Some(expected) if expected != bytes.len() => {
                    return Err(Error::CollectiveMismatch(
                        "ranks disagree on contribution size",
                    ));
                }
                Some(_) => {}
            }
            round.contrib[me] = Some(bytes);
        }
        round.arrived += 1;

        if round.arrived == self.shared.size {
            round.outcome = Some(Self::complete(round));
            self.shared.round_cv.notify_all();
        }

        // Wait for the round outcome, then copy the shared payload out.
        let shared_payload = loop {
            let Some(round) = rounds.get(&seq) else {
                return Err(Error::CollectiveMismatch("collective round vanished"));
            };
            if let Some(outcome) = &round.outcome {
                break outcome.clone()?;
            }
            if self.shared.round_cv.wait_until(&mut rounds, deadline).timed_out() {
                return Err(Error::Timeout);
            }
        };

        if let Some(round) = rounds.get_mut(&seq) {
            round.departed += 1;
            if round.departed == self.shared.size {
                rounds.remove(&seq);
            }
        }
        Ok(shared_payload)
    }

    /// Compute the shared payload once every rank has arrived.
    fn complete(round: &mut Round) -> core::result::Result<Arc<Vec<u8>>, Error> {
        let payload = match round.kind {
            Kind::Barrier => Vec::new(),
            Kind::Broadcast | Kind::Scatter => {
                let Some(bytes) = round.contrib[round.root as usize].take() else {
                    return Err(Error::CollectiveMismatch("root contributed no buffer"));
                };
                bytes
            }
            Kind::Gather => {
                let mut all = Vec::new();
                for slot in &mut round.contrib {
                    let Some(bytes) = slot.take() else {
                        return Err(Error::CollectiveMismatch("rank contributed no buffer"));
                    };
                    all.extend_from_slice(&bytes);
                }
                all
            }
            Kind::Reduce(op) => {
                let mut slots = round.contrib.iter_mut();
                let Some(Some(mut acc)) = slots.next().map(Option::take) else {
                    return Err(Error::CollectiveMismatch("rank contributed no buffer"));
                };
                for slot in slots {
                    let Some(bytes) = slot.take() else {
                        return Err(Error::CollectiveMismatch("rank contributed no buffer"));
                    };
                    fold_contrib(round.datatype, op, &mut acc, &bytes)?;
                }
                acc
            }
        };
        Ok(Arc::new(payload))
    }
}

impl Substrate for Endpoint {
    fn rank(&self, comm: RawComm) -> Result<Rank> {
        self.check_comm(comm)?;
        Ok(self.rank)
    }

    fn size(&self, comm: RawComm) -> Result<u32> {
        self.check_comm(comm)?;
        Ok(self.shared.size)
    }

    fn send(
        &self,
        comm: RawComm,
        buf: &[u8],
        count: u32,
        datatype: RawDatatype,
        dest: Rank,
        tag: Tag,
    ) -> Result<()> {
        self.check_comm(comm)?;
        self.check_rank(dest)?;
        Self::check_tag(tag)?;
        if let Some(elem) = datatype.builtin_size_bytes() {
            let expected = count as usize * elem as usize;
            if buf.len() != expected {
                return Err(Error::CountMismatch {
                    expected: count,
                    got: (buf.len() / elem as usize) as u32,
                });
            }
        }
        log::trace!(
            "[loopback] rank {} -> rank {} tag {} ({} elems)",
            self.rank,
            dest,
            tag,
            count
        );
        let env = Envelope {
            source: self.rank,
            tag,
            datatype,
            count,
            payload: buf.to_vec(),
        };
        self.shared.ranks[dest as usize]
            .sender
            .send(env)
            .map_err(|_| Error::RankShutDown(dest))
    }

    fn recv(
        &self,
        comm: RawComm,
        buf: &mut [u8],
        count: u32,
        datatype: RawDatatype,
        source: Rank,
        tag: Tag,
    ) -> Result<u32> {
        self.check_comm(comm)?;
        self.check_rank(source)?;
        Self::check_tag(tag)?;
        let state = &self.shared.ranks[self.rank as usize];

        // Earlier mismatched arrivals first.
        {
            let mut pending = state.pending.lock();
            if let Some(pos) = pending
                .iter()
                .position(|env| env.source == source && env.tag == tag)
            {
                if let Some(env) = pending.remove(pos) {
                    drop(pending);
                    return Self::deliver(&env, buf, count, datatype);
                }
            }
        }

        let deadline = Instant::now() + LOOPBACK_OP_TIMEOUT;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout);
            }
            match state.queue.recv_timeout(deadline - now) {
                Ok(env) if env.source == source && env.tag == tag => {
                    return Self::deliver(&env, buf, count, datatype);
                }
                Ok(env) => state.pending.lock().push_back(env),
                Err(RecvTimeoutError::Timeout) => return Err(Error::Timeout),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::RankShutDown(self.rank))
                }
            }
        }
    }

    fn broadcast(
        &self,
        comm: RawComm,
        buf: &mut [u8],
        count: u32,
        datatype: RawDatatype,
        root: Rank,
    ) -> Result<()> {
        let contrib = (self.rank == root).then(|| buf.to_vec());
        let shared = self.run_collective(comm, Kind::Broadcast, root, datatype, count, contrib)?;
        if shared.len() != buf.len() {
            return Err(Error::CollectiveMismatch(
                "ranks disagree on broadcast buffer size",
            ));
        }
        buf.copy_from_slice(&shared);
        Ok(())
    }

    fn gather(
        &self,
        comm: RawComm,
        send: &[u8],
        recv: Option<&mut [u8]>,
        count: u32,
        datatype: RawDatatype,
        root: Rank,
    ) -> Result<()> {
        if self.rank == root && recv.is_none() {
            return Err(Error::CollectiveMismatch("gather root without receive buffer"));
        }
        let shared = self.run_collective(
            comm,
            Kind::Gather,
            root,
            datatype,
            count,
            Some(send.to_vec()),
        )?;
        if self.rank == root {
            if let Some(recv) = recv {
                if recv.len() != shared.len() {
                    return Err(Error::CountMismatch {
                        expected: count * self.shared.size,
                        got: (recv.len() / send.len().max(1) * count as usize) as u32,
                    });
                }
                recv.copy_from_slice(&shared);
            }
        }
        Ok(())
    }

    fn scatter(
        &self,
        comm: RawComm,
        send: Option<&[u8]>,
        recv: &mut [u8],
        count: u32,
        datatype: RawDatatype,
        root: Rank,
    ) -> Result<()> {
        if self.rank == root && send.is_none() {
            return Err(Error::CollectiveMismatch("scatter root without send buffer"));
        }
        let contrib = if self.rank == root {
            send.map(<[u8]>::to_vec)
        } else {
            None
        };
        let shared = self.run_collective(comm, Kind::Scatter, root, datatype, count, contrib)?;
        let chunk = recv.len();
        let expected = chunk * self.shared.size as usize;
        if shared.len() != expected {
            return Err(Error::CountMismatch {
                expected: count * self.shared.size,
                got: count,
            });
        }
        let offset = chunk * self.rank as usize;
        recv.copy_from_slice(&shared[offset..offset + chunk]);
        Ok(())
    }

    fn reduce(
        &self,
        comm: RawComm,
        send: &[u8],
        recv: Option<&mut [u8]>,
        count: u32,
        datatype: RawDatatype,
        op: ReduceOp,
        root: Rank,
    ) -> Result<()> {
        if self.rank == root && recv.is_none() {
            return Err(Error::CollectiveMismatch("reduce root without receive buffer"));
        }
        let shared = self.run_collective(
            comm,
            Kind::Reduce(op),
            root,
            datatype,
            count,
            Some(send.to_vec()),
        )?;
        if self.rank == root {
            if let Some(recv) = recv {
                if recv.len() != shared.len() {
                    return Err(Error::CountMismatch {
                        expected: count,
                        got: (recv.len() / send.len().max(1) * count as usize) as u32,
                    });
                }
                recv.copy_from_slice(&shared);
            }
        }
        Ok(())
    }

    fn barrier(&self, comm: RawComm) -> Result<()> {
        self.run_collective(comm, Kind::Barrier, 0, RawDatatype::NULL, 0, None)?;
        Ok(())
    }
}

/// Element-wise fold of one contribution into the accumulator.
///
/// The loopback substrate interprets raw bytes through the datatype code,
/// exactly like a real fabric's reduction kernels. Reads are unaligned
/// because contribution buffers are plain byte vectors.
fn fold_contrib(
    datatype: RawDatatype,
    op: ReduceOp,
    acc: &mut [u8],
    contrib: &[u8],
) -> core::result::Result<(), Error> {
    match datatype {
        RawDatatype::INT8 => fold_typed::<i8>(op, acc, contrib),
        RawDatatype::INT16 => fold_typed::<i16>(op, acc, contrib),
        RawDatatype::INT32 => fold_typed::<i32>(op, acc, contrib),
        RawDatatype::INT64 => fold_typed::<i64>(op, acc, contrib),
        RawDatatype::UINT8 => fold_typed::<u8>(op, acc, contrib),
        RawDatatype::UINT16 => fold_typed::<u16>(op, acc, contrib),
        RawDatatype::UINT32 => fold_typed::<u32>(op, acc, contrib),
        RawDatatype::UINT64 => fold_typed::<u64>(op, acc, contrib),
        RawDatatype::FLOAT32 => fold_typed::<f32>(op, acc, contrib),
        RawDatatype::FLOAT64 => fold_typed::<f64>(op, acc, contrib),
        _ => return Err(Error::Unsupported("reduce over a derived datatype")),
    }
    Ok(())
}

/// Unaligned element-wise fold for one scalar type.
fn fold_typed<T>(op: ReduceOp, acc: &mut [u8], contrib: &[u8])
where
    T: bytemuck::Pod + PartialOrd + Add<Output = T> + Mul<Output = T>,
{
    let width = std::mem::size_of::<T>();
    for (a, b) in acc.chunks_exact_mut(width).zip(contrib.chunks_exact(width)) {
        let x: T = bytemuck::pod_read_unaligned(a);
        let y: T = bytemuck::pod_read_unaligned(b);
        let folded = match op {
            ReduceOp::Sum => x + y,
            ReduceOp::Prod => x * y,
            ReduceOp::Min => {
                if y < x {
                    y
                } else {
                    x
                }
            }
            ReduceOp::Max => {
                if y > x {
                    y
                } else {
                    x
                }
            }
        };
        a.copy_from_slice(bytemuck::bytes_of(&folded));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_size_is_bounded() {
        assert!(matches!(Loopback::new(0), Err(Error::InvalidRank(0))));
        assert!(Loopback::new(LOOPBACK_MAX_RANKS + 1).is_err());
        assert!(Loopback::new(2).is_ok());
    }

    #[test]
    fn endpoint_requires_valid_rank() {
        let group = Loopback::new(2).expect("size 2 is valid");
        assert!(group.endpoint(1).is_ok());
        assert!(matches!(group.endpoint(2), Err(Error::InvalidRank(2))));
    }

    #[test]
    fn send_validates_arguments() {
        let group = Loopback::new(2).expect("size 2 is valid");
        let ep = group.endpoint(0).expect("rank 0 exists");
        let payload = 7u32.to_ne_bytes();

        let bad_comm = ep.send(RawComm(99), &payload, 1, RawDatatype::UINT32, 1, 0);
        assert!(matches!(bad_comm, Err(Error::InvalidCommunicator(_))));

        let bad_dest = ep.send(RawComm::WORLD, &payload, 1, RawDatatype::UINT32, 5, 0);
        assert!(matches!(bad_dest, Err(Error::InvalidRank(5))));

        let bad_tag = ep.send(RawComm::WORLD, &payload, 1, RawDatatype::UINT32, 1, TAG_MAX + 1);
        assert!(matches!(bad_tag, Err(Error::InvalidTag(_))));

        let bad_count = ep.send(RawComm::WORLD, &payload, 2, RawDatatype::UINT32, 1, 0);
        assert!(matches!(bad_count, Err(Error::CountMismatch { .. })));
    }

    #[test]
    fn self_send_then_recv_matches_tag() {
        let group = Loopback::new(1).expect("size 1 is valid");
        let ep = group.endpoint(0).expect("rank 0 exists");

        ep.send(RawComm::WORLD, &5u32.to_ne_bytes(), 1, RawDatatype::UINT32, 0, 3)
            .expect("self send");
        ep.send(RawComm::WORLD, &6u32.to_ne_bytes(), 1, RawDatatype::UINT32, 0, 4)
            .expect("self send");

        // Request the later tag first: the earlier message must be parked,
        // not dropped.
        let mut buf = [0u8; 4];
        let got = ep
            .recv(RawComm::WORLD, &mut buf, 1, RawDatatype::UINT32, 0, 4)
            .expect("tag 4 arrives");
        assert_eq!(got, 1);
        assert_eq!(u32::from_ne_bytes(buf), 6);

        let got = ep
            .recv(RawComm::WORLD, &mut buf, 1, RawDatatype::UINT32, 0, 3)
            .expect("tag 3 was parked");
        assert_eq!(got, 1);
        assert_eq!(u32::from_ne_bytes(buf), 5);
    }

    #[test]
    fn datatype_mismatch_is_rejected_on_delivery() {
        let group = Loopback::new(1).expect("size 1 is valid");
        let ep = group.endpoint(0).expect("rank 0 exists");

        ep.send(RawComm::WORLD, &1f32.to_ne_bytes(), 1, RawDatatype::FLOAT32, 0, 0)
            .expect("self send");
        let mut buf = [0u8; 4];
        let err = ep
            .recv(RawComm::WORLD, &mut buf, 1, RawDatatype::UINT32, 0, 0)
            .unwrap_err();
        assert!(matches!(err, Error::DatatypeMismatch { .. }));
    }

    #[test]
    fn fold_handles_every_builtin() {
        let mut acc = 3i64.to_ne_bytes().to_vec();
        fold_contrib(RawDatatype::INT64, ReduceOp::Sum, &mut acc, &4i64.to_ne_bytes())
            .expect("builtin fold");
        assert_eq!(i64::from_ne_bytes(acc.try_into().expect("8 bytes")), 7);

        let mut acc = 2.5f64.to_ne_bytes().to_vec();
        fold_contrib(RawDatatype::FLOAT64, ReduceOp::Max, &mut acc, &1.5f64.to_ne_bytes())
            .expect("builtin fold");
        assert_eq!(f64::from_ne_bytes(acc.try_into().expect("8 bytes")), 2.5);

        let mut acc = vec![0u8; 4];
        let err = fold_contrib(RawDatatype::derived(1), ReduceOp::Sum, &mut acc, &[0u8; 4])
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
