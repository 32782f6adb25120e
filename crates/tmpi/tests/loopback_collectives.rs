// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! Typed collectives over the loopback substrate.
//!
//! Every test drives one thread per rank; collectives are entered by all
//! of them, as the substrate contract requires.

use std::thread;
use tmpi::substrate::loopback::Loopback;
use tmpi::{Communicator, Error, ReduceOp, Session, Transmissible};

const WORLD: Communicator = Communicator::WORLD;

/// Run `body(rank, session)` on one thread per rank and propagate panics.
fn with_ranks(size: u32, body: impl Fn(u32, &Session<tmpi::substrate::loopback::Endpoint>) + Sync) {
    let group = Loopback::new(size).expect("loopback group");
    thread::scope(|scope| {
        for (rank, endpoint) in group.endpoints().into_iter().enumerate() {
            let body = &body;
            scope.spawn(move || {
                let session = Session::new(endpoint);
                body(rank as u32, &session);
            });
        }
    });
}

#[test]
fn broadcast_distributes_the_root_buffer() {
    with_ranks(4, |rank, session| {
        let mut data = if rank == 1 { [3i32, 5, 7] } else { [0; 3] };
        session.broadcast(WORLD, &mut data, 1).expect("broadcast");
        assert_eq!(data, [3, 5, 7]);
    });
}

#[test]
fn gather_collects_in_rank_order() {
    with_ranks(3, |rank, session| {
        let contribution = [f64::from(rank), f64::from(rank) + 0.5];
        if rank == 0 {
            let mut all = [0.0f64; 6];
            session
                .gather(WORLD, &contribution, Some(&mut all), 0)
                .expect("gather at root");
            assert_eq!(all, [0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
        } else {
            session
                .gather(WORLD, &contribution, None, 0)
                .expect("gather off root");
        }
    });
}

#[test]
fn scatter_hands_each_rank_its_chunk() {
    with_ranks(3, |rank, session| {
        let mut chunk = [0u16; 2];
        if rank == 2 {
            let all: [u16; 6] = [10, 11, 20, 21, 30, 31];
            session
                .scatter(WORLD, Some(&all), &mut chunk, 2)
                .expect("scatter at root");
        } else {
            session
                .scatter(WORLD, None, &mut chunk, 2)
                .expect("scatter off root");
        }
        assert_eq!(chunk, [10 * (rank as u16 + 1), 10 * (rank as u16 + 1) + 1]);
    });
}

#[test]
fn reduce_folds_elementwise_on_the_root() {
    with_ranks(4, |rank, session| {
        let contribution = [i64::from(rank) + 1, 10 * (i64::from(rank) + 1)];
        if rank == 0 {
            let mut folded = [0i64; 2];
            session
                .reduce(WORLD, &contribution, Some(&mut folded), ReduceOp::Sum, 0)
                .expect("reduce at root");
            assert_eq!(folded, [1 + 2 + 3 + 4, 10 + 20 + 30 + 40]);
        } else {
            session
                .reduce(WORLD, &contribution, None, ReduceOp::Sum, 0)
                .expect("reduce off root");
        }
    });
}

#[test]
fn reduce_supports_min_max_and_prod() {
    with_ranks(3, |rank, session| {
        let x = [f64::from(rank + 1)]; // 1.0, 2.0, 3.0
        let mut out = [0.0f64];

        for (op, expected) in [
            (ReduceOp::Min, 1.0),
            (ReduceOp::Max, 3.0),
            (ReduceOp::Prod, 6.0),
        ] {
            let recv = if rank == 0 { Some(&mut out[..]) } else { None };
            session.reduce(WORLD, &x, recv, op, 0).expect("reduce");
            if rank == 0 {
                assert_eq!(out, [expected]);
            }
        }
    });
}

#[test]
fn reduce_rejects_derived_datatypes() {
    #[derive(Clone, Copy, Transmissible)]
    #[repr(C)]
    struct Pair {
        a: u32,
        b: u32,
    }

    with_ranks(2, |rank, session| {
        let x = [Pair { a: 1, b: 2 }];
        let mut out = [Pair { a: 0, b: 0 }];
        let recv = if rank == 0 { Some(&mut out[..]) } else { None };
        let err = session
            .reduce(WORLD, &x, recv, ReduceOp::Sum, 0)
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    });
}

#[test]
fn broadcast_carries_derived_types() {
    #[derive(Clone, Copy, Debug, PartialEq, Transmissible)]
    #[repr(C)]
    struct Extent {
        lo: i64,
        hi: i64,
    }

    with_ranks(2, |rank, session| {
        let mut data = if rank == 0 {
            [Extent { lo: -4, hi: 9 }]
        } else {
            [Extent { lo: 0, hi: 0 }]
        };
        session.broadcast(WORLD, &mut data, 0).expect("broadcast");
        assert_eq!(data, [Extent { lo: -4, hi: 9 }]);
    });
}

#[test]
fn barrier_orders_work_across_ranks() {
    use std::sync::atomic::{AtomicU32, Ordering};

    static BEFORE: AtomicU32 = AtomicU32::new(0);

    with_ranks(4, |_rank, session| {
        BEFORE.fetch_add(1, Ordering::SeqCst);
        session.barrier(WORLD).expect("barrier");
        // Nobody leaves before everyone arrived.
        assert_eq!(BEFORE.load(Ordering::SeqCst), 4);
    });
}

#[test]
fn consecutive_collectives_stay_in_step() {
    with_ranks(3, |rank, session| {
        for round in 0..8u32 {
            let mut value = [if rank == (round % 3) { round } else { 0 }];
            session
                .broadcast(WORLD, &mut value, round % 3)
                .expect("broadcast round");
            assert_eq!(value, [round]);
            session.barrier(WORLD).expect("barrier round");
        }
    });
}
