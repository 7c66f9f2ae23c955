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

use crate::bridge::{Bridge, DatapathDirectory};
use crate::config::ChannelManagerConfig;
use crate::control_plane::channel::{Channel, ChannelSpec};
use crate::control_plane::channel_guard::ChannelGuard;
use crate::control_plane::channel_registry::ChannelRegistry;
use crate::error::ChannelMgrError;
use crate::event_loop::channel_events::{start_channel, ChannelContext};
use crate::event_loop::dispatcher::EventDispatcher;
use crate::lifecycle::Module;
use crate::observability::{events, fields};
use crate::types::{
    ChannelMode, ConnectionStatus, ConnectionType, ControllerRole, Dpid, Transport,
};
use arc_swap::ArcSwapOption;
use std::net::IpAddr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const COMPONENT: &str = "channel_manager";
const MODULE_NAME: &str = "channel_mgr";

/// Bounded backoff used by [`ChannelManager::delete_channel_with_retry`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Doubles `current`, capped at `max_backoff`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }
}

///
/// [`ChannelManager`] is the API facade over the channel registry and the event loop.
///
/// Each instance owns its own registry; nothing is process-global. Channels are addressed
/// by name, or by bridge plus remote address for channels added through
/// [`add_channel`](ChannelManager::add_channel).
///
/// Starting channels needs an [`EventDispatcher`], handed over by
/// [`Module::initialize`] or [`set_dispatcher`](ChannelManager::set_dispatcher).
///
/// # Examples
///
/// ```
/// use channel_mgr::{Bridge, ChannelManager, ConnectionType, ControllerRole, ErrorCode};
///
/// let manager = ChannelManager::default();
/// let bridge = Bridge::new("br0", 0xabc);
///
/// let v4 = manager.add_channel(&bridge, "127.0.0.1".parse().unwrap()).unwrap();
/// let v6 = manager.add_channel(&bridge, "::1".parse().unwrap()).unwrap();
/// assert_eq!((v4.id(), v6.id()), (Some(0), Some(1)));
///
/// manager
///     .set_controller(v4.name(), ControllerRole::Master, ConnectionType::Auxiliary)
///     .unwrap();
/// assert_eq!(manager.role(v4.name()).unwrap(), ControllerRole::Master);
///
/// assert!(!manager.has_alive_channel(0xabc));
/// assert_eq!(
///     manager.lookup_by_name("hoge").unwrap_err().code(),
///     ErrorCode::NotFound
/// );
/// ```
pub struct ChannelManager {
    config: ChannelManagerConfig,
    registry: Arc<ChannelRegistry>,
    context: ArcSwapOption<ChannelContext>,
    directory: Option<Arc<dyn DatapathDirectory>>,
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new(ChannelManagerConfig::default())
    }
}

impl ChannelManager {
    pub fn new(config: ChannelManagerConfig) -> Self {
        Self {
            registry: Arc::new(ChannelRegistry::new(config.default_protocol_version)),
            config,
            context: ArcSwapOption::empty(),
            directory: None,
        }
    }

    /// Resolves bridge ids through `directory`; binding to an unknown dpid then fails.
    pub fn with_directory(mut self, directory: Arc<dyn DatapathDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn config(&self) -> &ChannelManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Installs the dispatcher that started channels register their interest with.
    pub fn set_dispatcher(&self, dispatcher: EventDispatcher) {
        self.context.store(Some(Arc::new(ChannelContext {
            dispatcher,
            registry: Arc::downgrade(&self.registry),
            reconnect_interval: self.config.reconnect_interval(),
        })));
    }

    pub fn dispatcher(&self) -> Option<EventDispatcher> {
        self.context
            .load()
            .as_ref()
            .map(|context| context.dispatcher.clone())
    }

    fn ensure_bridge(&self, dpid: Dpid) -> Result<(), ChannelMgrError> {
        match &self.directory {
            Some(directory) if directory.lookup_bridge(dpid).is_none() => {
                Err(ChannelMgrError::not_found(format!(
                    "bridge {} is unknown to the datapath",
                    fields::format_dpid(dpid)
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn create(&self, spec: ChannelSpec) -> Result<Arc<Channel>, ChannelMgrError> {
        if let Some(dpid) = spec.dpid() {
            self.ensure_bridge(dpid)?;
        }
        self.registry.create(spec)
    }

    /// Stops and removes a channel; `BUSY` while it is borrowed.
    pub fn destroy(&self, name: &str) -> Result<(), ChannelMgrError> {
        self.registry.destroy(name)
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<Arc<Channel>, ChannelMgrError> {
        self.registry.lookup_by_name(name)
    }

    pub fn lookup(
        &self,
        bridge: &Bridge,
        remote: IpAddr,
    ) -> Result<Arc<Channel>, ChannelMgrError> {
        self.registry.lookup_by_bridge_and_addr(bridge.dpid(), remote)
    }

    pub fn lookup_by_channel_id(
        &self,
        dpid: Dpid,
        id: u64,
    ) -> Result<Arc<Channel>, ChannelMgrError> {
        self.registry.lookup_by_bridge_and_id(dpid, id)
    }

    pub fn channels_by_dpid(&self, dpid: Dpid) -> Result<Vec<Arc<Channel>>, ChannelMgrError> {
        self.registry.list_by_bridge(dpid)
    }

    pub fn dpid_iterate<F>(&self, dpid: Dpid, visitor: F) -> Result<(), ChannelMgrError>
    where
        F: FnMut(&Arc<Channel>) -> Result<(), ChannelMgrError>,
    {
        self.registry.iterate(dpid, visitor)
    }

    /// Adds a TCP channel from `bridge` to the controller at `remote` on the default port.
    ///
    /// The channel is named `<bridge>-ch<id>`; ids count up per bridge.
    pub fn add_channel(
        &self,
        bridge: &Bridge,
        remote: IpAddr,
    ) -> Result<Arc<Channel>, ChannelMgrError> {
        self.ensure_bridge(bridge.dpid())?;
        let port = self.config.default_controller_port;
        self.registry.create_for_bridge(bridge.dpid(), |id| {
            ChannelSpec::new(&format!("{}-ch{id}", bridge.name()), Transport::Tcp)
                .remote(remote, port)
        })
    }

    pub fn delete_channel(&self, bridge: &Bridge, remote: IpAddr) -> Result<(), ChannelMgrError> {
        self.registry.delete_by_bridge_and_addr(bridge.dpid(), remote)
    }

    /// Retries [`delete_channel`](ChannelManager::delete_channel) while it reports `BUSY`,
    /// sleeping with doubling backoff between attempts.
    ///
    /// Returns the last `BUSY` once `policy.max_attempts` is exhausted.
    pub fn delete_channel_with_retry(
        &self,
        bridge: &Bridge,
        remote: IpAddr,
        policy: RetryPolicy,
    ) -> Result<(), ChannelMgrError> {
        let mut backoff = policy.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.delete_channel(bridge, remote) {
                Err(err) if err.is_busy() && attempt < policy.max_attempts => {
                    thread::sleep(backoff);
                    backoff = policy.next_backoff(backoff);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub fn start_channel(&self, name: &str) -> Result<(), ChannelMgrError> {
        let channel = self.registry.lookup_by_name(name)?;
        let context = self.context.load_full().ok_or_else(|| {
            ChannelMgrError::invalid_args("channel manager has no event dispatcher")
        })?;
        start_channel(&channel, &context)
    }

    /// Stops a channel; stopping an idle channel succeeds.
    pub fn stop_channel(&self, name: &str) -> Result<(), ChannelMgrError> {
        self.registry.lookup_by_name(name)?.stop();
        Ok(())
    }

    pub fn set_controller(
        &self,
        name: &str,
        role: ControllerRole,
        connection_type: ConnectionType,
    ) -> Result<(), ChannelMgrError> {
        self.registry
            .lookup_by_name(name)?
            .set_role(role, connection_type);
        Ok(())
    }

    pub fn role(&self, name: &str) -> Result<ControllerRole, ChannelMgrError> {
        Ok(self.registry.lookup_by_name(name)?.role())
    }

    pub fn connection_type(&self, name: &str) -> Result<ConnectionType, ChannelMgrError> {
        Ok(self.registry.lookup_by_name(name)?.connection_type())
    }

    pub fn set_protocol_version(&self, name: &str, version: u8) -> Result<(), ChannelMgrError> {
        self.registry
            .lookup_by_name(name)?
            .set_protocol_version(version);
        Ok(())
    }

    pub fn protocol_version(&self, name: &str) -> Result<u8, ChannelMgrError> {
        Ok(self.registry.lookup_by_name(name)?.protocol_version())
    }

    /// Binds a channel to a bridge and returns its id there.
    pub fn set_bridge(&self, name: &str, dpid: Dpid) -> Result<u64, ChannelMgrError> {
        self.ensure_bridge(dpid)?;
        self.registry.set_bridge(name, dpid)
    }

    pub fn unset_bridge(&self, name: &str) -> Result<(), ChannelMgrError> {
        self.registry.unset_bridge(name)
    }

    pub fn local_port(&self, name: &str) -> Result<u16, ChannelMgrError> {
        Ok(self.registry.lookup_by_name(name)?.local_port())
    }

    pub fn local_addr(&self, name: &str) -> Result<Option<IpAddr>, ChannelMgrError> {
        Ok(self.registry.lookup_by_name(name)?.local_addr())
    }

    pub fn set_local_port(&self, name: &str, port: u16) -> Result<(), ChannelMgrError> {
        self.registry.lookup_by_name(name)?.set_local_port(port)
    }

    pub fn set_local_addr(&self, name: &str, addr: IpAddr) -> Result<(), ChannelMgrError> {
        self.registry.lookup_by_name(name)?.set_local_addr(addr)
    }

    pub fn set_remote_port(&self, name: &str, port: u16) -> Result<(), ChannelMgrError> {
        self.registry.lookup_by_name(name)?.set_remote_port(port)
    }

    pub fn connection_status(&self, name: &str) -> Result<ConnectionStatus, ChannelMgrError> {
        Ok(self.registry.lookup_by_name(name)?.connection_status())
    }

    pub fn has_alive_channel(&self, dpid: Dpid) -> bool {
        self.registry.has_alive_channel(dpid)
    }

    /// Borrows a channel by name; see [`ChannelGuard`].
    pub fn acquire(&self, name: &str) -> Result<ChannelGuard, ChannelMgrError> {
        self.registry.lookup_by_name(name)?.acquire()
    }

    /// Force-destroys every channel, borrowed or not. Ids restart at 0 afterwards.
    pub fn finalize(&self) -> usize {
        self.registry.finalize()
    }

    fn stop_all(&self) {
        for channel in self.registry.channels() {
            channel.stop();
        }
        self.registry.sweep_retired();
    }
}

impl Module for ChannelManager {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn initialize(&self, dispatcher: &EventDispatcher) -> Result<(), ChannelMgrError> {
        self.set_dispatcher(dispatcher.clone());
        info!(
            event = events::MODULE_INITIALIZE,
            component = COMPONENT,
            module = MODULE_NAME,
            dispatcher = dispatcher.name(),
            "channel manager initialized"
        );
        Ok(())
    }

    /// Starts every configured channel that is idle. Channels that fail to start are logged
    /// and left disconnected.
    fn start(&self) -> Result<(), ChannelMgrError> {
        let context = self.context.load_full().ok_or_else(|| {
            ChannelMgrError::invalid_args("channel manager has no event dispatcher")
        })?;

        let mut started = 0;
        for channel in self.registry.channels() {
            if channel.mode() == ChannelMode::Accepted || channel.state().is_active() {
                continue;
            }
            match start_channel(&channel, &context) {
                Ok(()) => started += 1,
                Err(err) => debug!(
                    event = events::CHANNEL_START_FAILED,
                    component = COMPONENT,
                    channel = channel.name(),
                    err = %err,
                    "channel left disconnected"
                ),
            }
        }
        info!(
            event = events::MODULE_START,
            component = COMPONENT,
            module = MODULE_NAME,
            started,
            "channel manager started"
        );
        Ok(())
    }

    fn shutdown(&self) -> Result<(), ChannelMgrError> {
        self.stop_all();
        info!(
            event = events::MODULE_SHUTDOWN,
            component = COMPONENT,
            module = MODULE_NAME,
            "channel manager shut down"
        );
        Ok(())
    }

    fn stop(&self) -> Result<(), ChannelMgrError> {
        self.stop_all();
        Ok(())
    }

    fn finalize(&self) {
        let destroyed = ChannelManager::finalize(self);
        self.context.store(None);
        if destroyed > 0 {
            warn!(
                event = events::MODULE_FINALIZE,
                component = COMPONENT,
                module = MODULE_NAME,
                channels = destroyed,
                "channels were still registered at finalize"
            );
        } else {
            info!(
                event = events::MODULE_FINALIZE,
                component = COMPONENT,
                module = MODULE_NAME,
                "channel manager finalized"
            );
        }
    }
}
