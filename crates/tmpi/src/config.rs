// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! Build-time configuration constants - single source of truth.
//!
//! Everything here is fixed at compile time; tmpi carries no runtime
//! configuration state. The one build-wide *switch* (the Conversion Policy
//! Gate) is not a constant but the `implicit-conversion` Cargo feature, see
//! [`crate::comm`].

use crate::raw::{Rank, Tag};
use std::time::Duration;

/// Largest tag value accepted by point-to-point operations.
///
/// Matches the minimum tag upper bound an MPI-style substrate must
/// guarantee. Substrates may support more; tmpi validates against the
/// portable bound.
pub const TAG_MAX: Tag = 32_767;

/// Upper bound on the rank count of an in-process loopback substrate.
///
/// One OS thread per rank is the intended usage, so this is deliberately
/// far below anything a real fabric would support.
pub const LOOPBACK_MAX_RANKS: Rank = 4_096;

/// How long loopback receive and collective rendezvous wait before giving
/// up with [`crate::Error::Timeout`].
///
/// A triggered timeout in loopback always means a rank mismatch bug in the
/// caller (a missing collective call or an unmatched receive), never a slow
/// network, so the value is short.
pub const LOOPBACK_OP_TIMEOUT: Duration = Duration::from_secs(10);
