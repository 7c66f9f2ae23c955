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

use channel_mgr::{
    ChannelManagerConfig, ChannelMode, ChannelSpec, ConnectionStatus, Module, Transport,
};
use integration_test_utils::{init_logging, wait_until, MockController};
use std::time::Duration;
use support::{loopback_v4, make_manager, wait_for_status, DPID, EVENT_TIMEOUT};
use tokio::net::TcpStream;

#[tokio::test(flavor = "multi_thread")]
async fn passive_listener_registers_accepted_channels() {
    init_logging();
    let (manager, _fixture) = make_manager("passive", ChannelManagerConfig::default());
    manager
        .create(
            ChannelSpec::new("listener", Transport::Tcp)
                .local(loopback_v4(), 0)
                .bridge(DPID)
                .passive(),
        )
        .expect("create passive channel");

    manager.start_channel("listener").expect("start listening");
    assert_eq!(
        manager.connection_status("listener").expect("status"),
        ConnectionStatus::Connecting
    );
    let port = manager.local_port("listener").expect("bound port");
    assert_ne!(port, 0);

    let client = TcpStream::connect((loopback_v4(), port))
        .await
        .expect("connect to passive channel");
    let accepted_name = format!("listener:{}", client.local_addr().expect("client addr"));
    assert!(wait_for_status(&manager, &accepted_name, ConnectionStatus::Connected).await);

    let accepted = manager
        .lookup_by_name(&accepted_name)
        .expect("accepted channel is registered");
    assert_eq!(accepted.mode(), ChannelMode::Accepted);
    assert_eq!(accepted.dpid(), Some(DPID));
    assert_eq!(accepted.id(), Some(1));
    assert!(manager.lookup_by_channel_id(DPID, 1).is_ok());
    assert!(manager
        .start_channel(&accepted_name)
        .is_err_and(|err| err.code() == channel_mgr::ErrorCode::InvalidArgs));

    drop(client);
    assert!(wait_until(EVENT_TIMEOUT, || manager.lookup_by_name(&accepted_name).is_err()).await);
    assert!(accepted.is_detached());
    assert_eq!(manager.registry().len(), 1);

    manager.stop_channel("listener").expect("stop listener");
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    while TcpStream::connect((loopback_v4(), port)).await.is_ok() {
        assert!(tokio::time::Instant::now() < deadline, "listener should close");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(manager.finalize(), 1);
}

fn start_listener(manager: &channel_mgr::ChannelManager) -> u16 {
    manager
        .create(
            ChannelSpec::new("listener", Transport::Tcp)
                .local(loopback_v4(), 0)
                .bridge(DPID)
                .passive(),
        )
        .expect("create passive channel");
    manager.start_channel("listener").expect("start listening");
    manager.local_port("listener").expect("bound port")
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_inbound_sessions_leave_the_registry() {
    init_logging();
    let (manager, _fixture) = make_manager("inbound-churn", ChannelManagerConfig::default());
    let port = start_listener(&manager);

    for _ in 0..20 {
        let client = TcpStream::connect((loopback_v4(), port))
            .await
            .expect("connect to passive channel");
        assert!(wait_until(EVENT_TIMEOUT, || manager.registry().len() == 2).await);
        drop(client);
        assert!(wait_until(EVENT_TIMEOUT, || manager.registry().len() == 1).await);
    }

    assert_eq!(manager.registry().len(), 1);
    assert_eq!(
        manager.channels_by_dpid(DPID).expect("listener stays").len(),
        1
    );
    assert!(manager.lookup_by_name("listener").is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn borrowed_inbound_session_is_removed_once_released() {
    init_logging();
    let (manager, _fixture) = make_manager("inbound-borrowed", ChannelManagerConfig::default());
    let port = start_listener(&manager);

    let client = TcpStream::connect((loopback_v4(), port))
        .await
        .expect("connect to passive channel");
    let accepted_name = format!("listener:{}", client.local_addr().expect("client addr"));
    assert!(wait_for_status(&manager, &accepted_name, ConnectionStatus::Connected).await);
    let guard = manager.acquire(&accepted_name).expect("borrow inbound channel");

    drop(client);
    assert!(wait_for_status(&manager, &accepted_name, ConnectionStatus::Disconnected).await);
    assert!(manager.lookup_by_name(&accepted_name).is_ok());
    drop(guard);

    Module::stop(&manager).expect("module stop");
    assert!(manager.lookup_by_name(&accepted_name).is_err());
    assert_eq!(manager.registry().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn active_channel_reconnects_after_controller_drop() {
    init_logging();
    let config = ChannelManagerConfig::default().with_reconnect_interval(Duration::from_millis(50));
    let (manager, _fixture) = make_manager("reconnect", config);
    let controller = MockController::bind().await;
    manager
        .create(
            ChannelSpec::new("channel1", Transport::Tcp)
                .local(loopback_v4(), 0)
                .remote(loopback_v4(), controller.port()),
        )
        .expect("create channel");

    manager.start_channel("channel1").expect("start channel");
    let (first, _) = controller
        .accept(EVENT_TIMEOUT)
        .await
        .expect("first connection");
    assert!(wait_for_status(&manager, "channel1", ConnectionStatus::Connected).await);

    drop(first);
    let (_second, _) = controller
        .accept(EVENT_TIMEOUT)
        .await
        .expect("switch should reconnect");
    assert!(wait_for_status(&manager, "channel1", ConnectionStatus::Connected).await);

    manager.stop_channel("channel1").expect("stop channel");
    assert!(
        !wait_until(Duration::from_millis(300), || {
            manager.connection_status("channel1").ok() != Some(ConnectionStatus::Disconnected)
        })
        .await
    );
    assert!(controller.accept(Duration::from_millis(200)).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn module_start_connects_configured_channels() {
    init_logging();
    let (manager, _fixture) = make_manager("module", ChannelManagerConfig::default());
    let controller = MockController::bind().await;
    manager
        .create(
            ChannelSpec::new("configured", Transport::Tcp)
                .local(loopback_v4(), 0)
                .remote(loopback_v4(), controller.port()),
        )
        .expect("create configured channel");
    manager
        .create(ChannelSpec::new("unreachable", Transport::Tcp))
        .expect("create channel without a controller");

    Module::start(&manager).expect("module start");
    assert!(controller.accept(EVENT_TIMEOUT).await.is_some());
    assert!(wait_for_status(&manager, "configured", ConnectionStatus::Connected).await);
    assert_eq!(
        manager.connection_status("unreachable").expect("status"),
        ConnectionStatus::Disconnected
    );

    Module::shutdown(&manager).expect("module shutdown");
    assert_eq!(
        manager.connection_status("configured").expect("status"),
        ConnectionStatus::Disconnected
    );
    Module::finalize(&manager);
    assert!(manager.lookup_by_name("configured").is_err());
    assert!(manager.dispatcher().is_none());
}
