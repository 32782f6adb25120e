// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! # Typed handle wrappers and the Conversion Policy Gate
//!
//! [`Communicator`] and [`Group`] are non-owning typed views over the
//! substrate's raw handles. Wrapping a handle costs nothing and copies no
//! substrate state; unwrapping (`as_raw`) is how the typed surface hands
//! the handle back to the substrate's entry points.
//!
//! ## The gate
//!
//! Whether a raw handle converts *implicitly* into its wrapper is a
//! build-wide, compile-time policy with exactly two states, selected once
//! via the `implicit-conversion` Cargo feature:
//!
//! | build                        | accepted constructions                  |
//! |------------------------------|-----------------------------------------|
//! | default (explicit)           | `Communicator::from_raw(raw)`           |
//! | `implicit-conversion`        | `from_raw` and `raw.into()` / `From`    |
//!
//! Cargo features are additive and resolved once per compiled artifact, so
//! the two policies cannot mix within a build; a call site written against
//! the wrong policy fails to compile. There is no runtime branch and no way
//! to query the policy while the process runs.

use crate::raw::{RawComm, RawGroup};

/// Typed, non-owning view of a native communicator handle.
///
/// The substrate owns the handle's lifecycle; dropping the wrapper does
/// nothing. Copying the wrapper copies only the handle value.
///
/// With the default explicit policy, implicit-style conversion from the raw
/// handle does not compile:
///
#[cfg_attr(not(feature = "implicit-conversion"), doc = "```compile_fail")]
#[cfg_attr(feature = "implicit-conversion", doc = "```")]
/// use tmpi::comm::Communicator;
/// use tmpi::raw::RawComm;
///
/// let comm: Communicator = RawComm::WORLD.into();
/// # let _ = comm;
/// ```
///
/// Explicit construction compiles under either policy:
///
/// ```
/// use tmpi::comm::Communicator;
/// use tmpi::raw::RawComm;
///
/// let comm = Communicator::from_raw(RawComm::WORLD);
/// assert_eq!(comm.as_raw(), RawComm::WORLD);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Communicator {
    raw: RawComm,
}

impl Communicator {
    /// The world communicator, pre-wrapped.
    pub const WORLD: Communicator = Communicator::from_raw(RawComm::WORLD);

    /// Explicitly wrap a raw communicator handle.
    #[must_use]
    pub const fn from_raw(raw: RawComm) -> Communicator {
        Communicator { raw }
    }

    /// The wrapped raw handle, for handing back to substrate entry points.
    #[must_use]
    pub const fn as_raw(self) -> RawComm {
        self.raw
    }
}

#[cfg(feature = "implicit-conversion")]
impl From<RawComm> for Communicator {
    fn from(raw: RawComm) -> Communicator {
        Communicator::from_raw(raw)
    }
}

/// Typed, non-owning view of a native group handle.
///
/// Same construction policy as [`Communicator`]. Keeping the two wrappers
/// as distinct types is the point: a raw group can never be passed where a
/// communicator is expected, even on substrates where the raw handle
/// representations are not mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Group {
    raw: RawGroup,
}

impl Group {
    /// The predefined empty group, pre-wrapped.
    pub const EMPTY: Group = Group::from_raw(RawGroup::EMPTY);

    /// Explicitly wrap a raw group handle.
    #[must_use]
    pub const fn from_raw(raw: RawGroup) -> Group {
        Group { raw }
    }

    /// The wrapped raw handle.
    #[must_use]
    pub const fn as_raw(self) -> RawGroup {
        self.raw
    }
}

#[cfg(feature = "implicit-conversion")]
impl From<RawGroup> for Group {
    fn from(raw: RawGroup) -> Group {
        Group::from_raw(raw)
    }
}
