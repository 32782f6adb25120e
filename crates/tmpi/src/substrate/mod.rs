// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! # Substrate seam
//!
//! [`Substrate`] is the trait the external message-passing substrate
//! implements: untyped entry points that take a byte buffer, an element
//! count and a raw datatype code. tmpi's typed surface ([`crate::session`])
//! resolves descriptors and unwraps handles, then delegates here; it never
//! interprets payload bytes itself.
//!
//! The crate ships one implementation, [`loopback::Loopback`], which runs a
//! whole process group inside a single process (one thread per rank). It
//! backs the test suite and is useful for single-host integration runs
//! before a real fabric is wired up.

pub mod loopback;

use crate::raw::{Rank, RawComm, RawDatatype, Tag};
use crate::Result;

/// Reduction operator codes understood by the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Prod,
    Min,
    Max,
}

/// Untyped substrate entry points, keyed by raw datatype codes.
///
/// Buffer lengths are in bytes; `count` is in elements. Implementations may
/// trust `buf.len() / count` as the element stride for codes they do not
/// recognize, since the typed layer above derives both from one descriptor.
///
/// Blocking semantics, thread-safety levels and delivery scheduling are the
/// implementation's business; tmpi only requires that errors surface as
/// [`crate::Error`] before or instead of data corruption, never after.
pub trait Substrate: Send + Sync {
    /// This caller's rank within `comm`.
    fn rank(&self, comm: RawComm) -> Result<Rank>;

    /// Number of ranks in `comm`.
    fn size(&self, comm: RawComm) -> Result<u32>;

    /// Blocking typed-buffer send to `dest`.
    fn send(
        &self,
        comm: RawComm,
        buf: &[u8],
        count: u32,
        datatype: RawDatatype,
        dest: Rank,
        tag: Tag,
    ) -> Result<()>;

    /// Blocking receive from `source` with matching `tag`.
    ///
    /// Returns the element count actually received, which may be smaller
    /// than `count`.
    fn recv(
        &self,
        comm: RawComm,
        buf: &mut [u8],
        count: u32,
        datatype: RawDatatype,
        source: Rank,
        tag: Tag,
    ) -> Result<u32>;

    /// Broadcast `root`'s buffer to every rank. Collective.
    fn broadcast(
        &self,
        comm: RawComm,
        buf: &mut [u8],
        count: u32,
        datatype: RawDatatype,
        root: Rank,
    ) -> Result<()>;

    /// Gather every rank's `send` buffer into `recv` on `root`, in rank
    /// order. Collective; `recv` is `Some` on the root only.
    fn gather(
        &self,
        comm: RawComm,
        send: &[u8],
        recv: Option<&mut [u8]>,
        count: u32,
        datatype: RawDatatype,
        root: Rank,
    ) -> Result<()>;

    /// Scatter equal chunks of `root`'s `send` buffer to every rank.
    /// Collective; `send` is `Some` on the root only.
    fn scatter(
        &self,
        comm: RawComm,
        send: Option<&[u8]>,
        recv: &mut [u8],
        count: u32,
        datatype: RawDatatype,
        root: Rank,
    ) -> Result<()>;

    /// Element-wise reduction of every rank's `send` buffer into `recv` on
    /// `root`. Collective; `recv` is `Some` on the root only.
    fn reduce(
        &self,
        comm: RawComm,
        send: &[u8],
        recv: Option<&mut [u8]>,
        count: u32,
        datatype: RawDatatype,
        op: ReduceOp,
        root: Rank,
    ) -> Result<()>;

    /// Block until every rank in `comm` has entered the barrier.
    fn barrier(&self, comm: RawComm) -> Result<()>;
}
