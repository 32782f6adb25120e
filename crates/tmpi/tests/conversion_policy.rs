// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! Conversion Policy Gate behavior.
//!
//! The explicit half of the gate (implicit-style construction failing to
//! compile under the default policy) is covered by the `compile_fail`
//! doctests on [`tmpi::comm::Communicator`]; runtime-observable behavior
//! lives here.

use tmpi::raw::{RawComm, RawGroup};
use tmpi::{Communicator, Group};

#[test]
fn explicit_wrapping_compiles_under_every_policy() {
    let comm = Communicator::from_raw(RawComm(0xBEEF));
    assert_eq!(comm.as_raw(), RawComm(0xBEEF));

    let group = Group::from_raw(RawGroup(0xF00D));
    assert_eq!(group.as_raw(), RawGroup(0xF00D));
}

#[test]
fn wrappers_are_views_not_copies_of_substrate_state() {
    // Wrapping and unwrapping must round-trip the exact handle value; the
    // wrapper carries nothing else.
    for handle in [RawComm::NULL, RawComm::WORLD, RawComm(7), RawComm(u64::MAX)] {
        assert_eq!(Communicator::from_raw(handle).as_raw(), handle);
    }
    assert_eq!(
        std::mem::size_of::<Communicator>(),
        std::mem::size_of::<RawComm>()
    );
}

#[test]
fn wrapper_types_are_mutually_exclusive() {
    // A group handle value equal to a communicator handle value still
    // produces unrelated wrapper types; the type system keeps them apart
    // even though the raw representations overlap numerically.
    let comm = Communicator::from_raw(RawComm(1));
    let group = Group::from_raw(RawGroup(1));
    assert_eq!(comm.as_raw().0, group.as_raw().0);
}

#[cfg(feature = "implicit-conversion")]
mod implicit {
    use super::*;

    #[test]
    fn implicit_wrapping_references_the_original_handle() {
        let comm: Communicator = RawComm(0xABCD).into();
        assert_eq!(comm.as_raw(), RawComm(0xABCD));

        let group: Group = RawGroup(0x1234).into();
        assert_eq!(group.as_raw(), RawGroup(0x1234));
    }

    #[test]
    fn implicit_and_explicit_agree() {
        let implicit: Communicator = RawComm::WORLD.into();
        assert_eq!(implicit, Communicator::from_raw(RawComm::WORLD));
    }
}
