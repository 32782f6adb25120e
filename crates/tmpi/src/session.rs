// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! # Typed communication surface
//!
//! [`Session`] wraps a [`Substrate`] and exposes the templated calls the
//! registry exists for: every operation resolves its payload type's wire
//! descriptor through [`crate::datatype::Resolved`] (so a sentinel
//! resolution is a compile error, not a wrong-wire transmission), casts the
//! payload to its byte image, and delegates to the substrate's untyped
//! entry point with the descriptor's datatype code.
//!
//! Counts follow the usual MPI conventions: collective `count`s are per
//! rank, so a gather root receives `size * count` elements and a scatter
//! root provides them.
//!
//! ```no_run
//! use tmpi::substrate::loopback::Loopback;
//! use tmpi::{Communicator, Session};
//!
//! # fn main() -> tmpi::Result<()> {
//! let group = Loopback::new(2)?;
//! let session = Session::new(group.endpoint(0)?);
//! session.send(Communicator::WORLD, &42.5f64, 1, 7)?;
//! # Ok(())
//! # }
//! ```

use crate::comm::Communicator;
use crate::datatype::{Resolved, Transmissible};
use crate::raw::{Rank, Tag};
use crate::substrate::{ReduceOp, Substrate};
use crate::{Error, Result};

fn element_count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::CountMismatch {
        expected: u32::MAX,
        got: u32::MAX,
    })
}

/// Typed façade over one substrate endpoint.
///
/// The session owns nothing of the process group; it pairs a substrate
/// handle with the descriptor registry. Cheap to construct, one per rank.
#[derive(Debug)]
pub struct Session<S: Substrate> {
    substrate: S,
}

impl<S: Substrate> Session<S> {
    pub fn new(substrate: S) -> Session<S> {
        Session { substrate }
    }

    /// The underlying substrate endpoint.
    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    /// This caller's rank within `comm`.
    ///
    /// # Errors
    ///
    /// Whatever the substrate reports for an unknown communicator.
    pub fn rank(&self, comm: Communicator) -> Result<Rank> {
        self.substrate.rank(comm.as_raw())
    }

    /// Number of ranks in `comm`.
    ///
    /// # Errors
    ///
    /// Whatever the substrate reports for an unknown communicator.
    pub fn size(&self, comm: Communicator) -> Result<u32> {
        self.substrate.size(comm.as_raw())
    }

    /// Send one value to `dest`.
    ///
    /// # Errors
    ///
    /// Substrate delivery errors; argument validation per the substrate.
    pub fn send<T: Transmissible>(
        &self,
        comm: Communicator,
        value: &T,
        dest: Rank,
        tag: Tag,
    ) -> Result<()> {
        self.send_slice(comm, core::slice::from_ref(value), dest, tag)
    }

    /// Send a contiguous slice to `dest`.
    ///
    /// # Errors
    ///
    /// Substrate delivery errors; argument validation per the substrate.
    pub fn send_slice<T: Transmissible>(
        &self,
        comm: Communicator,
        data: &[T],
        dest: Rank,
        tag: Tag,
    ) -> Result<()> {
        let desc = Resolved::<T>::DESCRIPTOR;
        let count = element_count(data.len())?;
        self.substrate.send(
            comm.as_raw(),
            bytemuck::cast_slice(data),
            count,
            desc.code,
            dest,
            tag,
        )
    }

    /// Receive one value from `source` with matching `tag`.
    ///
    /// # Errors
    ///
    /// [`Error::DatatypeMismatch`] when the matched message carries a
    /// different wire type; otherwise substrate delivery errors.
    pub fn recv<T: Transmissible>(
        &self,
        comm: Communicator,
        source: Rank,
        tag: Tag,
    ) -> Result<T> {
        let mut value = T::zeroed();
        let got = self.recv_into(comm, core::slice::from_mut(&mut value), source, tag)?;
        if got != 1 {
            return Err(Error::CountMismatch {
                expected: 1,
                got,
            });
        }
        Ok(value)
    }

    /// Receive up to `buf.len()` elements from `source` with matching
    /// `tag`. Returns the element count actually received.
    ///
    /// # Errors
    ///
    /// [`Error::Truncated`] when the matched message does not fit,
    /// [`Error::DatatypeMismatch`] on wire-type disagreement; otherwise
    /// substrate delivery errors.
    pub fn recv_into<T: Transmissible>(
        &self,
        comm: Communicator,
        buf: &mut [T],
        source: Rank,
        tag: Tag,
    ) -> Result<u32> {
        let desc = Resolved::<T>::DESCRIPTOR;
        let count = element_count(buf.len())?;
        self.substrate.recv(
            comm.as_raw(),
            bytemuck::cast_slice_mut(buf),
            count,
            desc.code,
            source,
            tag,
        )
    }

    /// Broadcast `root`'s buffer to every rank. Collective: every rank
    /// passes a buffer of the same length; `root`'s is read, the others are
    /// overwritten.
    ///
    /// # Errors
    ///
    /// [`Error::CollectiveMismatch`] when the ranks' calls disagree;
    /// otherwise substrate delivery errors.
    pub fn broadcast<T: Transmissible>(
        &self,
        comm: Communicator,
        data: &mut [T],
        root: Rank,
    ) -> Result<()> {
        let desc = Resolved::<T>::DESCRIPTOR;
        let count = element_count(data.len())?;
        self.substrate.broadcast(
            comm.as_raw(),
            bytemuck::cast_slice_mut(data),
            count,
            desc.code,
            root,
        )
    }

    /// Gather every rank's `send` slice on `root`, in rank order. `recv`
    /// is `Some` on the root and must hold `size * send.len()` elements.
    ///
    /// # Errors
    ///
    /// [`Error::CountMismatch`] on a wrong receive buffer shape,
    /// [`Error::CollectiveMismatch`] when the ranks' calls disagree.
    pub fn gather<T: Transmissible>(
        &self,
        comm: Communicator,
        send: &[T],
        recv: Option<&mut [T]>,
        root: Rank,
    ) -> Result<()> {
        let desc = Resolved::<T>::DESCRIPTOR;
        let count = element_count(send.len())?;
        self.substrate.gather(
            comm.as_raw(),
            bytemuck::cast_slice(send),
            recv.map(bytemuck::cast_slice_mut),
            count,
            desc.code,
            root,
        )
    }

    /// Scatter equal chunks of `root`'s `send` slice to every rank. `send`
    /// is `Some` on the root and must hold `size * recv.len()` elements.
    ///
    /// # Errors
    ///
    /// [`Error::CountMismatch`] on a wrong send buffer shape,
    /// [`Error::CollectiveMismatch`] when the ranks' calls disagree.
    pub fn scatter<T: Transmissible>(
        &self,
        comm: Communicator,
        send: Option<&[T]>,
        recv: &mut [T],
        root: Rank,
    ) -> Result<()> {
        let desc = Resolved::<T>::DESCRIPTOR;
        let count = element_count(recv.len())?;
        self.substrate.scatter(
            comm.as_raw(),
            send.map(bytemuck::cast_slice),
            bytemuck::cast_slice_mut(recv),
            count,
            desc.code,
            root,
        )
    }

    /// Element-wise reduction of every rank's `send` slice onto `root`.
    /// `recv` is `Some` on the root and matches `send` in length.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] when the substrate cannot reduce the
    /// datatype, [`Error::CollectiveMismatch`] when the ranks' calls
    /// disagree.
    pub fn reduce<T: Transmissible>(
        &self,
        comm: Communicator,
        send: &[T],
        recv: Option<&mut [T]>,
        op: ReduceOp,
        root: Rank,
    ) -> Result<()> {
        let desc = Resolved::<T>::DESCRIPTOR;
        let count = element_count(send.len())?;
        self.substrate.reduce(
            comm.as_raw(),
            bytemuck::cast_slice(send),
            recv.map(bytemuck::cast_slice_mut),
            count,
            desc.code,
            op,
            root,
        )
    }

    /// Block until every rank in `comm` has entered the barrier.
    ///
    /// # Errors
    ///
    /// Substrate rendezvous errors.
    pub fn barrier(&self, comm: Communicator) -> Result<()> {
        self.substrate.barrier(comm.as_raw())
    }
}
