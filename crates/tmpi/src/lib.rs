// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! # TMPI - Typed Message Passing
//!
//! A compile-time type-safety layer over MPI-style message-passing
//! substrates: ranks grouped into communicators, exchanging typed data
//! through point-to-point and collective operations. The substrate (wire
//! transport, protocol selection, process launch) stays external; tmpi's
//! job is that nothing untyped, mistyped or unregistered can reach it.
//!
//! ## Quick Start
//!
//! ```rust
//! use tmpi::substrate::loopback::Loopback;
//! use tmpi::{Communicator, Session};
//!
//! fn main() -> tmpi::Result<()> {
//!     let group = Loopback::new(2)?;
//!     let world = Communicator::WORLD;
//!
//!     let receiver = group.endpoint(1)?;
//!     let handle = std::thread::spawn(move || {
//!         Session::new(receiver).recv::<f64>(Communicator::WORLD, 0, 7)
//!     });
//!
//!     let session = Session::new(group.endpoint(0)?);
//!     session.send(world, &42.5f64, 1, 7)?;
//!
//!     assert_eq!(handle.join().expect("receiver thread")?, 42.5);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Application Layer                           |
//! |        Session<S>::send/recv/broadcast/gather/scatter/...         |
//! +--------------------------------------------------------------------+
//! |                       Type-Safety Layer                            |
//! |  Descriptor Registry (Transmissible) | Conversion Policy Gate      |
//! |  resolve::<T>() -> wire descriptor   | Communicator/Group wrappers |
//! +--------------------------------------------------------------------+
//! |                     Substrate Seam (trait)                         |
//! |     untyped entry points: bytes + count + raw datatype code        |
//! +--------------------------------------------------------------------+
//! |                External substrate (out of scope)                   |
//! |    fabric, rendezvous/eager protocols, delivery scheduling         |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`datatype::Transmissible`] | The compile-time registry: impl = registration |
//! | [`datatype::Descriptor`] | Wire descriptor `{ wire_name, substrate code }` |
//! | [`Communicator`] / [`Group`] | Typed non-owning views of native handles |
//! | [`Session`] | Typed communication calls over any [`substrate::Substrate`] |
//!
//! ## The two compile-time policies
//!
//! - **Registry**: a type with no `Transmissible` impl cannot appear in a
//!   communication call at all; a type registered without a descriptor
//!   resolves to the `"n/a"` sentinel, and any transmission call site for
//!   it fails the build (see [`datatype::Resolved`]).
//! - **Conversion gate**: raw handles wrap explicitly via `from_raw` unless
//!   the build enables the `implicit-conversion` feature, which adds
//!   `From`/`Into` conversions uniformly to every wrapper constructor.
//!
//! Both are settled before the process starts; the crate holds no runtime
//! state of its own.
//!
//! ## Modules Overview
//!
//! - [`datatype`] - descriptor registry (start here)
//! - [`comm`] - handle wrappers and the conversion policy gate
//! - [`session`] - typed operations
//! - [`substrate`] - the seam to the external substrate, plus loopback
//! - [`raw`] - opaque native handle model
//! - [`config`] - build-time constants

/// Typed handle wrappers and the Conversion Policy Gate.
pub mod comm;
/// Build-time configuration constants.
pub mod config;
/// Type Descriptor Registry.
pub mod datatype;
/// Native substrate handle model.
pub mod raw;
/// Typed communication surface.
pub mod session;
/// Substrate seam and the in-process loopback implementation.
pub mod substrate;

pub use comm::{Communicator, Group};
pub use datatype::{resolve, Descriptor, Transmissible};
pub use session::Session;
pub use substrate::ReduceOp;

/// Derive macro registering a `#[repr(C)]` struct of scalars with the
/// descriptor registry.
pub use tmpi_codegen::Transmissible;

/// Re-exported for the derive macro's generated impls and for callers
/// registering pod types by hand.
pub use bytemuck;

use raw::{Rank, RawComm, RawDatatype, Tag};

/// Errors surfaced by tmpi and its substrate seam.
///
/// Everything compile-time-detectable (sentinel resolutions, policy
/// violations) never reaches this enum; these are the argument and
/// delivery failures that remain at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// A descriptor resolved to the `"n/a"` sentinel on a dynamic path.
    /// Carries the offending type or wire name.
    UnresolvedType(&'static str),

    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// The substrate does not recognize this communicator handle.
    InvalidCommunicator(RawComm),
    /// Rank outside the communicator's group (also used for a rank count
    /// outside a substrate's supported range).
    InvalidRank(Rank),
    /// Tag above [`config::TAG_MAX`].
    InvalidTag(Tag),
    /// Buffer shape disagrees with the declared element count.
    CountMismatch { expected: u32, got: u32 },

    // ========================================================================
    // Matching Errors
    // ========================================================================
    /// Matched message carries a different wire datatype than requested.
    DatatypeMismatch {
        expected: RawDatatype,
        got: RawDatatype,
    },
    /// Matched message holds more elements than the receive buffer.
    Truncated { capacity: u32, incoming: u32 },
    /// Ranks entered a collective with disagreeing parameters.
    CollectiveMismatch(&'static str),

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// Peer rank's mailbox is gone.
    RankShutDown(Rank),
    /// A blocking receive or collective rendezvous gave up waiting.
    Timeout,
    /// Operation outside the substrate's capabilities.
    Unsupported(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Resolution
            Error::UnresolvedType(name) => {
                write!(f, "no wire descriptor resolved for {} (sentinel \"n/a\")", name)
            }
            // Arguments
            Error::InvalidCommunicator(comm) => {
                write!(f, "unknown communicator handle {:?}", comm)
            }
            Error::InvalidRank(rank) => write!(f, "invalid rank: {}", rank),
            Error::InvalidTag(tag) => {
                write!(f, "invalid tag: {} (max {})", tag, config::TAG_MAX)
            }
            Error::CountMismatch { expected, got } => {
                write!(f, "count mismatch: expected {} elements, got {}", expected, got)
            }
            // Matching
            Error::DatatypeMismatch { expected, got } => write!(
                f,
                "datatype mismatch: expected code {:?}, message carries {:?}",
                expected, got
            ),
            Error::Truncated { capacity, incoming } => write!(
                f,
                "message truncated: {} incoming elements, buffer holds {}",
                incoming, capacity
            ),
            Error::CollectiveMismatch(what) => write!(f, "collective mismatch: {}", what),
            // Delivery
            Error::RankShutDown(rank) => write!(f, "rank {} has shut down", rank),
            Error::Timeout => write!(f, "operation timed out"),
            Error::Unsupported(what) => write!(f, "unsupported operation: {}", what),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the public [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::comm::{Communicator, Group};
    pub use crate::datatype::{resolve, Descriptor, Transmissible};
    pub use crate::raw::{Rank, Tag};
    pub use crate::session::Session;
    pub use crate::substrate::{ReduceOp, Substrate};
    pub use crate::{Error, Result};
}
