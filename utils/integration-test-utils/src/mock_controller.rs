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

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Loopback listener standing in for an OpenFlow controller.
pub struct MockController {
    listener: TcpListener,
}

impl MockController {
    pub async fn bind() -> Self {
        Self::bind_to(IpAddr::V4(Ipv4Addr::LOCALHOST)).await
    }

    /// Listens on an ephemeral port of `addr`, e.g. `::1` for IPv6 channels.
    pub async fn bind_to(addr: IpAddr) -> Self {
        let listener = TcpListener::bind(SocketAddr::new(addr, 0))
            .await
            .expect("mock controller should bind");
        Self { listener }
    }

    pub fn addr(&self) -> IpAddr {
        self.local().ip()
    }

    pub fn port(&self) -> u16 {
        self.local().port()
    }

    fn local(&self) -> SocketAddr {
        self.listener
            .local_addr()
            .expect("mock controller has a local address")
    }

    /// Waits up to `within` for the switch to connect.
    pub async fn accept(&self, within: Duration) -> Option<(TcpStream, SocketAddr)> {
        timeout(within, self.listener.accept())
            .await
            .ok()
            .and_then(Result::ok)
    }
}

/// Returns a loopback port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("ephemeral port should be available")
}

/// Polls `condition` until it holds or `within` elapses; returns the last observation.
pub async fn wait_until<F>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}
