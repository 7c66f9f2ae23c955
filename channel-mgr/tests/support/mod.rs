use channel_mgr::{ChannelManager, ChannelManagerConfig, ConnectionStatus, Module};
use integration_test_utils::{wait_until, DispatcherFixture};
use std::net::IpAddr;
use std::time::Duration;

pub(crate) const DPID: u64 = 0xabc;
pub(crate) const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn loopback_v4() -> IpAddr {
    "127.0.0.1".parse().expect("valid IPv4 loopback")
}

#[allow(dead_code)]
pub(crate) fn loopback_v6() -> IpAddr {
    "::1".parse().expect("valid IPv6 loopback")
}

/// Manager initialized against a freshly pumped dispatcher.
pub(crate) fn make_manager(
    name: &str,
    config: ChannelManagerConfig,
) -> (ChannelManager, DispatcherFixture) {
    let fixture = DispatcherFixture::start(name);
    let manager = ChannelManager::new(config);
    manager
        .initialize(fixture.dispatcher())
        .expect("manager should accept the dispatcher");
    (manager, fixture)
}

pub(crate) async fn wait_for_status(
    manager: &ChannelManager,
    name: &str,
    status: ConnectionStatus,
) -> bool {
    wait_until(EVENT_TIMEOUT, || {
        manager.connection_status(name).ok() == Some(status)
    })
    .await
}
