/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod support;

use channel_mgr::{Bridge, ChannelManagerConfig, ConnectionStatus, ErrorCode, RetryPolicy};
use integration_test_utils::{free_port, init_logging, MockController};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use support::{loopback_v4, loopback_v6, make_manager, wait_for_status, DPID, EVENT_TIMEOUT};
use tokio::io::AsyncReadExt;

#[tokio::test(flavor = "multi_thread")]
async fn bridge_channels_lifecycle() {
    init_logging();
    let (manager, _fixture) = make_manager("bridge-channels", ChannelManagerConfig::default());
    let bridge = Bridge::new("br0", DPID);
    let controller = MockController::bind().await;
    let controller6 = MockController::bind_to(loopback_v6()).await;

    assert_eq!(
        manager
            .channels_by_dpid(DPID)
            .map(|_| ())
            .map_err(|err| err.code()),
        Err(ErrorCode::NotFound)
    );

    manager
        .add_channel(&bridge, loopback_v4())
        .expect("add IPv4 channel");
    manager
        .add_channel(&bridge, loopback_v6())
        .expect("add IPv6 channel");
    assert_eq!(manager.finalize(), 2);

    let chan4 = manager
        .add_channel(&bridge, loopback_v4())
        .expect("add IPv4 channel after finalize");
    let found4 = manager.lookup(&bridge, loopback_v4()).expect("lookup IPv4");
    assert!(Arc::ptr_eq(&chan4, &found4));
    assert_eq!(found4.id(), Some(0));
    manager
        .set_remote_port(chan4.name(), controller.port())
        .expect("set remote port");
    manager
        .set_local_port(chan4.name(), free_port())
        .expect("set local port");
    manager
        .set_local_addr(chan4.name(), loopback_v4())
        .expect("set local addr");

    let chan6 = manager
        .add_channel(&bridge, loopback_v6())
        .expect("add IPv6 channel");
    assert_eq!(
        manager.lookup(&bridge, loopback_v6()).expect("lookup IPv6").id(),
        Some(1)
    );
    manager
        .set_remote_port(chan6.name(), controller6.port())
        .expect("set remote port");
    manager
        .set_local_port(chan6.name(), 0)
        .expect("set local port");
    manager
        .set_local_addr(chan6.name(), loopback_v6())
        .expect("set local addr");

    assert!(manager.lookup_by_channel_id(DPID, 1).is_ok());
    assert_eq!(
        manager
            .lookup_by_channel_id(DPID, 9999)
            .map(|_| ())
            .map_err(|err| err.code()),
        Err(ErrorCode::NotFound)
    );

    let listed = manager.channels_by_dpid(DPID).expect("list bridge channels");
    assert_eq!(listed.len(), 2);
    let mut visited = 0;
    manager
        .dpid_iterate(DPID, |_| {
            visited += 1;
            Ok(())
        })
        .expect("iterate bridge channels");
    assert_eq!(visited, 2);
    assert!(!manager.has_alive_channel(DPID));

    manager.start_channel(chan4.name()).expect("start IPv4 channel");
    let (mut peer, _) = controller
        .accept(EVENT_TIMEOUT)
        .await
        .expect("switch should connect");
    assert!(wait_for_status(&manager, chan4.name(), ConnectionStatus::Connected).await);
    assert!(manager.has_alive_channel(DPID));

    manager.start_channel(chan6.name()).expect("start IPv6 channel");
    let (mut peer6, switch6) = controller6
        .accept(EVENT_TIMEOUT)
        .await
        .expect("switch should connect over IPv6");
    assert_eq!(switch6.ip(), loopback_v6());
    assert!(wait_for_status(&manager, chan6.name(), ConnectionStatus::Connected).await);
    assert_ne!(chan6.local_port(), 0);

    let guard = manager.acquire(chan4.name()).expect("borrow IPv4 channel");
    assert_eq!(
        manager
            .delete_channel(&bridge, loopback_v4())
            .map_err(|err| err.code()),
        Err(ErrorCode::Busy)
    );
    assert!(manager.lookup(&bridge, loopback_v4()).is_ok());
    drop(guard);

    manager
        .delete_channel_with_retry(&bridge, loopback_v4(), RetryPolicy::default())
        .expect("delete IPv4 channel once released");
    assert_eq!(
        manager
            .lookup(&bridge, loopback_v4())
            .map(|_| ())
            .map_err(|err| err.code()),
        Err(ErrorCode::NotFound)
    );
    let mut buffer = [0u8; 8];
    let closed = tokio::time::timeout(EVENT_TIMEOUT, peer.read(&mut buffer))
        .await
        .expect("peer should observe close");
    assert!(matches!(closed, Ok(0) | Err(_)));

    manager
        .delete_channel_with_retry(&bridge, loopback_v6(), RetryPolicy::default())
        .expect("delete IPv6 channel");
    assert!(manager.lookup(&bridge, loopback_v6()).is_err());
    let closed6 = tokio::time::timeout(EVENT_TIMEOUT, peer6.read(&mut buffer))
        .await
        .expect("IPv6 peer should observe close");
    assert!(matches!(closed6, Ok(0) | Err(_)));
    assert!(!manager.has_alive_channel(DPID));
}

#[tokio::test(flavor = "multi_thread")]
async fn ids_are_not_reused_until_finalize() {
    init_logging();
    let (manager, _fixture) = make_manager("bridge-ids", ChannelManagerConfig::default());
    let bridge = Bridge::new("br0", DPID);
    let other = Bridge::new("br1", 0xdef);

    let first = manager
        .add_channel(&bridge, "10.0.0.1".parse().expect("addr"))
        .expect("add first");
    let second = manager
        .add_channel(&bridge, "10.0.0.2".parse().expect("addr"))
        .expect("add second");
    let elsewhere = manager
        .add_channel(&other, "10.0.0.1".parse().expect("addr"))
        .expect("add on other bridge");
    assert_eq!(
        (first.id(), second.id(), elsewhere.id()),
        (Some(0), Some(1), Some(0))
    );
    assert_eq!(
        manager
            .add_channel(&bridge, "10.0.0.1".parse().expect("addr"))
            .map(|_| ())
            .map_err(|err| err.code()),
        Err(ErrorCode::InvalidArgs)
    );

    manager
        .delete_channel(&bridge, "10.0.0.2".parse().expect("addr"))
        .expect("delete second");
    let third = manager
        .add_channel(&bridge, "10.0.0.3".parse().expect("addr"))
        .expect("add third");
    assert_eq!(third.id(), Some(2));

    manager.finalize();
    let fresh = manager
        .add_channel(&bridge, "10.0.0.3".parse().expect("addr"))
        .expect("add after finalize");
    assert_eq!(fresh.id(), Some(0));
}

#[test]
fn concurrent_borrowers_never_observe_a_deleted_channel() {
    init_logging();
    let manager = Arc::new(channel_mgr::ChannelManager::default());
    let bridge = Bridge::new("br0", DPID);
    let channel = manager
        .add_channel(&bridge, loopback_v4())
        .expect("add channel");
    let deleted = Arc::new(AtomicBool::new(false));

    let borrowers: Vec<_> = (0..4)
        .map(|_| {
            let channel = channel.clone();
            let deleted = deleted.clone();
            thread::spawn(move || {
                let mut borrowed = 0u64;
                while !deleted.load(Ordering::Acquire) {
                    if let Ok(guard) = channel.acquire() {
                        assert!(!guard.is_detached());
                        borrowed += 1;
                    }
                }
                borrowed
            })
        })
        .collect();

    loop {
        match manager.delete_channel(&bridge, loopback_v4()) {
            Ok(()) => break,
            Err(err) => assert_eq!(err.code(), ErrorCode::Busy),
        }
        thread::yield_now();
    }
    deleted.store(true, Ordering::Release);
    for borrower in borrowers {
        borrower.join().expect("borrower thread");
    }

    assert_eq!(
        channel.acquire().map(|_| ()).map_err(|err| err.code()),
        Err(ErrorCode::NotFound)
    );
    assert_eq!(channel.ref_count(), 0);
}
