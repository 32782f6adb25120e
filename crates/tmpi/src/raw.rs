// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! Native substrate handle model.
//!
//! The message-passing substrate owns every handle in this module; tmpi only
//! carries them around. `RawComm`, `RawGroup` and `RawDatatype` are opaque
//! newtypes over the substrate's handle values, together with the predefined
//! handles a substrate publishes (world communicator, built-in scalar
//! datatype codes, the null datatype).
//!
//! Nothing here allocates or has behavior beyond `const` accessors; the
//! typed wrappers live in [`crate::comm`] and the descriptor registry in
//! [`crate::datatype`].

/// Rank of a process within a communicator (0-based).
pub type Rank = u32;

/// Message tag for point-to-point matching.
///
/// Valid tags are `0..=`[`crate::config::TAG_MAX`].
pub type Tag = u32;

/// Opaque native communicator handle.
///
/// The substrate owns the handle's lifecycle; this value is only an
/// identifier. Wrap it in a [`crate::Communicator`] to use the typed API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawComm(pub u64);

impl RawComm {
    /// Null communicator (no process group).
    pub const NULL: RawComm = RawComm(0);

    /// Predefined world communicator: all ranks of the job.
    pub const WORLD: RawComm = RawComm(1);
}

/// Opaque native group handle (process-set membership without a
/// communication context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawGroup(pub u64);

impl RawGroup {
    /// Null group.
    pub const NULL: RawGroup = RawGroup(0);

    /// Predefined empty group (zero members, distinct from null).
    pub const EMPTY: RawGroup = RawGroup(1);
}

// ============================================================================
// Datatype codes
// ============================================================================
// Built-in scalar codes occupy the low value range; derived (caller
// registered) codes set DERIVED_BIT and carry an FNV-1a hash of the type
// name in the low 31 bits, so the two ranges can never collide.
// ============================================================================

/// Bit marking a derived (caller-registered) datatype code.
pub const DERIVED_BIT: u32 = 0x8000_0000;

/// Opaque native datatype handle, the `substrate_code` half of a
/// [`crate::datatype::Descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawDatatype(pub u32);

impl RawDatatype {
    /// Null datatype. Carried by the sentinel descriptor; never valid on
    /// the wire.
    pub const NULL: RawDatatype = RawDatatype(0);

    pub const INT8: RawDatatype = RawDatatype(1);
    pub const INT16: RawDatatype = RawDatatype(2);
    pub const INT32: RawDatatype = RawDatatype(3);
    pub const INT64: RawDatatype = RawDatatype(4);
    pub const UINT8: RawDatatype = RawDatatype(5);
    pub const UINT16: RawDatatype = RawDatatype(6);
    pub const UINT32: RawDatatype = RawDatatype(7);
    pub const UINT64: RawDatatype = RawDatatype(8);
    pub const FLOAT32: RawDatatype = RawDatatype(9);
    pub const FLOAT64: RawDatatype = RawDatatype(10);

    /// Build a derived datatype code from a 32-bit type-name hash.
    #[must_use]
    pub const fn derived(hash: u32) -> RawDatatype {
        RawDatatype(hash | DERIVED_BIT)
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_derived(self) -> bool {
        self.0 & DERIVED_BIT != 0
    }

    /// Element size in bytes for built-in scalar codes.
    ///
    /// Returns `None` for the null code and for derived codes (their layout
    /// is described by the registered descriptor, not by the code itself).
    #[must_use]
    pub const fn builtin_size_bytes(self) -> Option<u32> {
        match self.0 {
            1 | 5 => Some(1),
            2 | 6 => Some(2),
            3 | 7 | 9 => Some(4),
            4 | 8 | 10 => Some(8),
            _ => None,
        }
    }
}
