// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 tmpi contributors

//! Typed point-to-point delivery over the loopback substrate.
//!
//! One thread per rank, as the loopback substrate intends.

use std::thread;
use tmpi::substrate::loopback::Loopback;
use tmpi::{Communicator, Error, Session, Transmissible};

const WORLD: Communicator = Communicator::WORLD;

#[test]
fn ping_pong_between_two_ranks() {
    let group = Loopback::new(2).expect("group of 2");
    let mut endpoints = group.endpoints().into_iter();
    let ep0 = endpoints.next().expect("rank 0");
    let ep1 = endpoints.next().expect("rank 1");

    thread::scope(|scope| {
        scope.spawn(move || {
            let session = Session::new(ep0);
            session.send(WORLD, &41u32, 1, 0).expect("ping");
            let answer: u32 = session.recv(WORLD, 1, 1).expect("pong");
            assert_eq!(answer, 42);
        });
        scope.spawn(move || {
            let session = Session::new(ep1);
            let question: u32 = session.recv(WORLD, 0, 0).expect("ping");
            session.send(WORLD, &(question + 1), 0, 1).expect("pong");
        });
    });
}

#[test]
fn slices_arrive_in_order_with_their_length() {
    let group = Loopback::new(2).expect("group of 2");
    let sender = group.endpoint(0).expect("rank 0");
    let receiver = group.endpoint(1).expect("rank 1");

    thread::scope(|scope| {
        scope.spawn(move || {
            let session = Session::new(sender);
            session
                .send_slice(WORLD, &[1.5f64, 2.5, 3.5], 1, 9)
                .expect("send slice");
        });
        scope.spawn(move || {
            let session = Session::new(receiver);
            // Oversized buffer: the call reports how much actually arrived.
            let mut buf = [0.0f64; 8];
            let got = session.recv_into(WORLD, &mut buf, 0, 9).expect("recv slice");
            assert_eq!(got, 3);
            assert_eq!(&buf[..3], &[1.5, 2.5, 3.5]);
        });
    });
}

#[test]
fn tag_matching_holds_earlier_messages_aside() {
    let group = Loopback::new(2).expect("group of 2");
    let sender = group.endpoint(0).expect("rank 0");
    let receiver = group.endpoint(1).expect("rank 1");

    thread::scope(|scope| {
        scope.spawn(move || {
            let session = Session::new(sender);
            session.send(WORLD, &10i64, 1, 5).expect("first send");
            session.send(WORLD, &20i64, 1, 6).expect("second send");
        });
        scope.spawn(move || {
            let session = Session::new(receiver);
            // Receive in the opposite tag order.
            let second: i64 = session.recv(WORLD, 0, 6).expect("tag 6");
            let first: i64 = session.recv(WORLD, 0, 5).expect("tag 5");
            assert_eq!((first, second), (10, 20));
        });
    });
}

#[test]
fn undersized_buffer_reports_truncation() {
    let group = Loopback::new(2).expect("group of 2");
    let sender = group.endpoint(0).expect("rank 0");
    let receiver = group.endpoint(1).expect("rank 1");

    thread::scope(|scope| {
        scope.spawn(move || {
            let session = Session::new(sender);
            session
                .send_slice(WORLD, &[1u16, 2, 3, 4], 1, 0)
                .expect("send slice");
        });
        scope.spawn(move || {
            let session = Session::new(receiver);
            let mut buf = [0u16; 2];
            let err = session.recv_into(WORLD, &mut buf, 0, 0).unwrap_err();
            assert_eq!(
                err,
                Error::Truncated {
                    capacity: 2,
                    incoming: 4
                }
            );
        });
    });
}

#[test]
fn derived_types_cross_rank_boundaries_intact() {
    #[derive(Clone, Copy, Debug, PartialEq, Transmissible)]
    #[repr(C)]
    struct Sample {
        sequence: u64,
        value: f64,
        sensor: u32,
        flags: u32,
    }

    let group = Loopback::new(2).expect("group of 2");
    let sender = group.endpoint(0).expect("rank 0");
    let receiver = group.endpoint(1).expect("rank 1");

    let sent = Sample {
        sequence: 7,
        value: -3.75,
        sensor: 12,
        flags: 0b101,
    };

    thread::scope(|scope| {
        scope.spawn(move || {
            Session::new(sender).send(WORLD, &sent, 1, 2).expect("send");
        });
        scope.spawn(move || {
            let got: Sample = Session::new(receiver).recv(WORLD, 0, 2).expect("recv");
            assert_eq!(got, sent);
        });
    });
}

#[test]
fn many_random_tagged_messages_all_match() {
    const MESSAGES: usize = 64;

    let group = Loopback::new(2).expect("group of 2");
    let sender = group.endpoint(0).expect("rank 0");
    let receiver = group.endpoint(1).expect("rank 1");

    let mut tags: Vec<u32> = (0..MESSAGES as u32).collect();
    fastrand::seed(0x7411);
    fastrand::shuffle(&mut tags);
    let send_tags = tags.clone();

    thread::scope(|scope| {
        scope.spawn(move || {
            let session = Session::new(sender);
            for tag in &send_tags {
                session
                    .send(WORLD, &u64::from(*tag), 1, *tag)
                    .expect("tagged send");
            }
        });
        scope.spawn(move || {
            let session = Session::new(receiver);
            // Drain in ascending tag order no matter the send order.
            for tag in 0..MESSAGES as u32 {
                let value: u64 = session.recv(WORLD, 0, tag).expect("tagged recv");
                assert_eq!(value, u64::from(tag));
            }
        });
    });
}
