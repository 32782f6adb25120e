// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! The type-to-descriptor registry.
//!
//! The registry is not a data structure: it is the [`Transmissible`] trait
//! itself. Implementing the trait for a type *is* the registration, which
//! keeps the mapping open to caller-owned types without touching tmpi, and
//! makes an unregistered type a missing-impl compile error rather than a
//! runtime lookup failure.

use super::descriptor::{Descriptor, ScalarKind};
use crate::raw::RawDatatype;
use crate::{Error, Result};
use std::marker::PhantomData;

/// A value type that can cross the process group.
///
/// The associated [`DESCRIPTOR`](Self::DESCRIPTOR) constant is the type's
/// entry in the compile-time registry. Its default is the `"n/a"` sentinel,
/// so an impl that supplies nothing registers the type as *explicitly
/// invalid*: it satisfies the bound but every transmission call site for it
/// is rejected (see [`Resolved`]).
///
/// The `Pod` supertrait pins the byte image: a transmissible value is
/// plain-old-data, so slice views handed to the substrate are safe casts,
/// and receive buffers can be zero-initialized.
///
/// # Registering your own type
///
/// For a `#[repr(C)]` struct of already-transmissible scalars, derive it:
///
/// ```
/// use tmpi::datatype::resolve;
///
/// #[derive(Clone, Copy, tmpi::Transmissible)]
/// #[repr(C)]
/// struct Sample {
///     channel: u32,
///     flags: u32,
///     value: f64,
/// }
///
/// assert_ne!(resolve::<Sample>().wire_name, "n/a");
/// ```
///
/// Manual impls supply the constant directly and are the escape hatch for
/// descriptors the derive cannot compute.
pub trait Transmissible: bytemuck::Pod + Send + Sync + 'static {
    /// This type's wire descriptor. Defaults to the sentinel.
    const DESCRIPTOR: Descriptor = Descriptor::SENTINEL;
}

/// Resolve the wire descriptor for `T`.
///
/// Pure compile-time association: no lookup, no allocation, same result for
/// the same `T` everywhere in a build. May return the sentinel; use
/// [`Resolved`] or [`resolve_checked`] at transmission call sites.
#[must_use]
pub const fn resolve<T: Transmissible>() -> Descriptor {
    T::DESCRIPTOR
}

/// Fallible [`resolve`] for call sites that cannot use the static guard.
///
/// # Errors
///
/// [`Error::UnresolvedType`] when `T` resolves to the sentinel.
pub fn resolve_checked<T: Transmissible>() -> Result<Descriptor> {
    let desc = T::DESCRIPTOR;
    if desc.is_sentinel() {
        return Err(Error::UnresolvedType(std::any::type_name::<T>()));
    }
    Ok(desc)
}

/// Static guard that rejects sentinel resolutions at compile time.
///
/// `Resolved::<T>::DESCRIPTOR` is `T`'s descriptor with a constant
/// assertion attached: referencing it for a type whose descriptor is the
/// sentinel fails the build. Every typed operation in [`crate::session`]
/// resolves through this guard, so a sentinel can never reach the substrate
/// boundary.
///
/// ```compile_fail
/// use tmpi::datatype::Resolved;
///
/// #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
/// #[repr(C)]
/// struct Opaque {
///     word: u32,
/// }
///
/// // Registered as explicitly invalid: descriptor stays the sentinel.
/// impl tmpi::datatype::Transmissible for Opaque {}
///
/// // Rejected at compile time, before anything could be transmitted.
/// let _ = Resolved::<Opaque>::DESCRIPTOR;
/// ```
pub struct Resolved<T: Transmissible>(PhantomData<T>);

impl<T: Transmissible> Resolved<T> {
    /// `T`'s descriptor, statically asserted non-sentinel.
    pub const DESCRIPTOR: Descriptor = {
        assert!(
            !T::DESCRIPTOR.is_sentinel(),
            "type resolves to the \"n/a\" sentinel descriptor and cannot be transmitted"
        );
        T::DESCRIPTOR
    };
}

// ============================================================================
// Built-in scalar registrations
// ============================================================================
// Wire names follow the C fixed-width spellings the substrate side of the
// fence speaks.
// ============================================================================

macro_rules! impl_scalar {
    ($rust:ty, $wire:literal, $code:ident, $kind:ident) => {
        impl Transmissible for $rust {
            const DESCRIPTOR: Descriptor =
                Descriptor::scalar($wire, RawDatatype::$code, ScalarKind::$kind);
        }
    };
}

impl_scalar!(i8, "int8_t", INT8, I8);
impl_scalar!(i16, "int16_t", INT16, I16);
impl_scalar!(i32, "int32_t", INT32, I32);
impl_scalar!(i64, "int64_t", INT64, I64);
impl_scalar!(u8, "uint8_t", UINT8, U8);
impl_scalar!(u16, "uint16_t", UINT16, U16);
impl_scalar!(u32, "uint32_t", UINT32, U32);
impl_scalar!(u64, "uint64_t", UINT64, U64);
impl_scalar!(f32, "float", FLOAT32, F32);
impl_scalar!(f64, "double", FLOAT64, F64);

// `bool` is deliberately absent: it is not plain-old-data (its byte image
// has invalid bit patterns), so it cannot satisfy the Pod boundary. Send
// `u8` instead.
