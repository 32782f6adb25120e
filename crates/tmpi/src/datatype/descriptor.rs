// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! Wire descriptor records.
//!
//! A [`Descriptor`] is the immutable, statically-known association between a
//! transmissible Rust type and the substrate's wire representation: a
//! canonical name plus the opaque datatype code the substrate keys its
//! send/receive entry points on.

use crate::raw::RawDatatype;

/// Scalar classification for descriptor fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    #[must_use]
    pub const fn size_bytes(self) -> u32 {
        match self {
            ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => 8,
        }
    }

    /// Scalars are naturally aligned on every target tmpi supports.
    #[must_use]
    pub const fn alignment(self) -> u8 {
        self.size_bytes() as u8
    }
}

/// Layout of a single field inside a derived (struct) descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub offset_bytes: u32,
    pub scalar: ScalarKind,
}

/// Wire descriptor: `{ wire_name, substrate code }` plus the layout facts
/// the substrate needs to interpret a contiguous buffer of this type.
///
/// Descriptors are plain `const` data. Built-in scalars get one each (see
/// [`crate::datatype::Transmissible`] impls); derived types carry a field
/// table produced by `#[derive(Transmissible)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Canonical wire name, `"n/a"` for the sentinel.
    pub wire_name: &'static str,
    /// Opaque substrate datatype handle.
    pub code: RawDatatype,
    /// Serialized element size. Descriptors only cover fixed-size,
    /// contiguous types; variable-length layouts are a substrate extension
    /// tmpi does not describe.
    pub size_bytes: u32,
    /// Max field alignment.
    pub alignment: u8,
    /// Field table for derived types; empty for scalars.
    pub fields: &'static [FieldLayout],
}

impl Descriptor {
    /// Sentinel descriptor: the resolution result of a type that opted into
    /// the registry without supplying a real association. Never valid for
    /// transmission; every call site must treat it as a resolution failure.
    pub const SENTINEL: Descriptor = Descriptor {
        wire_name: "n/a",
        code: RawDatatype::NULL,
        size_bytes: 0,
        alignment: 1,
        fields: &[],
    };

    /// Descriptor of one built-in scalar.
    #[must_use]
    pub const fn scalar(wire_name: &'static str, code: RawDatatype, kind: ScalarKind) -> Descriptor {
        Descriptor {
            wire_name,
            code,
            size_bytes: kind.size_bytes(),
            alignment: kind.alignment(),
            fields: &[],
        }
    }

    /// True when this is the `"n/a"` sentinel.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        self.code.is_null()
    }

    /// Reject the sentinel before a substrate call.
    ///
    /// The typed operations in [`crate::session`] reject sentinel
    /// resolutions at compile time; this is the guard for descriptors that
    /// reach a call site by value (dynamic dispatch, tables, FFI edges).
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnresolvedType`] when `self` is the sentinel.
    pub fn ensure_resolved(&self) -> crate::Result<()> {
        if self.is_sentinel() {
            return Err(crate::Error::UnresolvedType(self.wire_name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_flagged_and_rejected() {
        assert!(Descriptor::SENTINEL.is_sentinel());
        assert_eq!(Descriptor::SENTINEL.wire_name, "n/a");
        assert!(Descriptor::SENTINEL.ensure_resolved().is_err());
    }

    #[test]
    fn scalar_descriptor_carries_layout() {
        const D: Descriptor = Descriptor::scalar("int32_t", RawDatatype::INT32, ScalarKind::I32);
        assert!(!D.is_sentinel());
        assert_eq!(D.size_bytes, 4);
        assert_eq!(D.alignment, 4);
        assert!(D.fields.is_empty());
        assert!(D.ensure_resolved().is_ok());
    }
}
