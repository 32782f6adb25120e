// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! # Type Descriptor Registry
//!
//! Compile-time mapping from a transmissible value type to its wire
//! descriptor. Every typed communication call resolves its payload type
//! through here to select the substrate datatype code; no unmapped type can
//! reach the wire.
//!
//! Three pieces:
//!
//! - [`Descriptor`] - the `{ wire_name, substrate code, layout }` record
//! - [`Transmissible`] - the registry itself (impl = registration)
//! - [`Resolved`] - the static guard that makes sentinel resolutions a
//!   compile error at transmission call sites
//!
//! ## Resolution
//!
//! ```
//! use tmpi::datatype::resolve;
//! use tmpi::raw::RawDatatype;
//!
//! let desc = resolve::<f64>();
//! assert_eq!(desc.wire_name, "double");
//! assert_eq!(desc.code, RawDatatype::FLOAT64);
//! ```

mod descriptor;
mod transmissible;

pub use descriptor::{Descriptor, FieldLayout, ScalarKind};
pub use transmissible::{resolve, resolve_checked, Resolved, Transmissible};
