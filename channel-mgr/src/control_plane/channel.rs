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

//! Channel object: endpoint data, controller metadata and the borrow counter.

use crate::control_plane::channel_guard::ChannelGuard;
use crate::control_plane::channel_state::{ChannelEvent, ChannelState, InvalidTransition};
use crate::error::ChannelMgrError;
use crate::event_loop::dispatcher::EventDispatcher;
use crate::event_loop::interest::RegistrationId;
use crate::observability::{events, fields};
use crate::types::{
    ChannelMode, ConnectionStatus, ConnectionType, ControllerRole, Dpid, Transport,
};
use std::fmt::{Debug, Formatter};
use std::net::{IpAddr, Shutdown, TcpStream as StdTcpStream};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const COMPONENT: &str = "channel";

/// Refcount value marking a channel removed from the registry.
const DETACHED: usize = usize::MAX;

/// Parameters for [`ChannelManager::create`][crate::ChannelManager::create].
///
/// # Examples
///
/// ```
/// use channel_mgr::{ChannelSpec, Transport};
///
/// let spec = ChannelSpec::new("channel1", Transport::Tcp)
///     .local("127.0.0.1".parse().unwrap(), 20032)
///     .remote("127.0.0.1".parse().unwrap(), 6633)
///     .bridge(0xabc);
/// assert_eq!(spec.name(), "channel1");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChannelSpec {
    name: String,
    dpid: Option<Dpid>,
    local_addr: Option<IpAddr>,
    local_port: u16,
    remote_addr: Option<IpAddr>,
    remote_port: u16,
    transport: Transport,
    mode: ChannelMode,
}

impl ChannelSpec {
    pub fn new(name: &str, transport: Transport) -> Self {
        Self {
            name: name.to_string(),
            dpid: None,
            local_addr: None,
            local_port: 0,
            remote_addr: None,
            remote_port: 0,
            transport,
            mode: ChannelMode::Active,
        }
    }

    /// Local binding; port 0 lets the OS pick one on `start`.
    pub fn local(mut self, addr: IpAddr, port: u16) -> Self {
        self.local_addr = Some(addr);
        self.local_port = port;
        self
    }

    pub fn local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    pub fn remote(mut self, addr: IpAddr, port: u16) -> Self {
        self.remote_addr = Some(addr);
        self.remote_port = port;
        self
    }

    pub fn bridge(mut self, dpid: Dpid) -> Self {
        self.dpid = Some(dpid);
        self
    }

    /// Listen on the local binding instead of connecting out.
    pub fn passive(mut self) -> Self {
        self.mode = ChannelMode::Passive;
        self
    }

    pub(crate) fn accepted(mut self) -> Self {
        self.mode = ChannelMode::Accepted;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dpid(&self) -> Option<Dpid> {
        self.dpid
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub(crate) fn validate(&self) -> Result<(), ChannelMgrError> {
        if self.name.is_empty() {
            return Err(ChannelMgrError::invalid_args("channel name is empty"));
        }
        match (self.remote_addr, self.remote_port) {
            (Some(addr), 0) => Err(ChannelMgrError::invalid_args(format!(
                "channel {}: remote address {addr} has no port",
                self.name
            ))),
            (None, port) if port != 0 => Err(ChannelMgrError::invalid_args(format!(
                "channel {}: remote port {port} has no address",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

/// Interest currently armed for a channel.
pub(crate) struct Armed {
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) registration: RegistrationId,
}

/// Fields guarded by the per-channel lock.
pub(crate) struct ChannelInner {
    pub(crate) id: Option<u64>,
    pub(crate) dpid: Option<Dpid>,
    pub(crate) local_addr: Option<IpAddr>,
    pub(crate) local_port: u16,
    pub(crate) remote_addr: Option<IpAddr>,
    pub(crate) remote_port: u16,
    pub(crate) transport: Transport,
    pub(crate) mode: ChannelMode,
    pub(crate) role: ControllerRole,
    pub(crate) connection_type: ConnectionType,
    pub(crate) protocol_version: u8,
    pub(crate) state: ChannelState,
    /// Set by `start`, cleared by `stop`; reconnect timers only re-arm enabled channels.
    pub(crate) enabled: bool,
    pub(crate) armed: Option<Armed>,
    pub(crate) stream: Option<StdTcpStream>,
    /// An inbound session that ended; the registry drops it once nobody borrows it.
    pub(crate) retired: bool,
}

impl ChannelInner {
    pub(crate) fn is_armed_with(&self, registration: RegistrationId) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|armed| armed.registration == registration)
    }

    pub(crate) fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.dispatcher.deregister(armed.registration);
        }
    }
}

/// One control connection between this switch and a controller.
///
/// Channels are owned by the registry and handed out as `Arc<Channel>`; borrowers that
/// hold one across calls take a [`ChannelGuard`] so deletion reports `BUSY` meanwhile.
pub struct Channel {
    name: String,
    refs: AtomicUsize,
    rx_bytes: AtomicU64,
    inner: Mutex<ChannelInner>,
}

impl Debug for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("id", &inner.id)
            .field("dpid", &inner.dpid)
            .field("state", &inner.state)
            .field("mode", &inner.mode)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl Channel {
    pub(crate) fn new(spec: &ChannelSpec, protocol_version: u8) -> Self {
        Self {
            name: spec.name.clone(),
            refs: AtomicUsize::new(0),
            rx_bytes: AtomicU64::new(0),
            inner: Mutex::new(ChannelInner {
                id: None,
                dpid: None,
                local_addr: spec.local_addr,
                local_port: spec.local_port,
                remote_addr: spec.remote_addr,
                remote_port: spec.remote_port,
                transport: spec.transport,
                mode: spec.mode,
                role: ControllerRole::default(),
                connection_type: ConnectionType::default(),
                protocol_version,
                state: ChannelState::Created,
                enabled: false,
                armed: None,
                stream: None,
                retired: false,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ChannelInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-bridge id; `None` while the channel is not bound to a bridge.
    pub fn id(&self) -> Option<u64> {
        self.lock().id
    }

    pub fn dpid(&self) -> Option<Dpid> {
        self.lock().dpid
    }

    pub fn local_addr(&self) -> Option<IpAddr> {
        self.lock().local_addr
    }

    /// Configured port before `start`, bound port afterwards.
    pub fn local_port(&self) -> u16 {
        self.lock().local_port
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.lock().remote_addr
    }

    pub fn remote_port(&self) -> u16 {
        self.lock().remote_port
    }

    pub fn transport(&self) -> Transport {
        self.lock().transport
    }

    pub fn mode(&self) -> ChannelMode {
        self.lock().mode
    }

    pub fn role(&self) -> ControllerRole {
        self.lock().role
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.lock().connection_type
    }

    pub fn protocol_version(&self) -> u8 {
        self.lock().protocol_version
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.lock().state.connection_status()
    }

    pub(crate) fn state(&self) -> ChannelState {
        self.lock().state
    }

    pub fn is_alive(&self) -> bool {
        self.connection_status().is_alive()
    }

    /// Bytes read from the control socket so far.
    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes.load(Ordering::Relaxed)
    }

    pub(crate) fn record_rx(&self, received: usize) {
        self.rx_bytes.fetch_add(received as u64, Ordering::Relaxed);
    }

    /// Stores the controller's role. Several channels of one bridge may claim `Master`.
    pub fn set_role(&self, role: ControllerRole, connection_type: ConnectionType) {
        let mut inner = self.lock();
        inner.role = role;
        inner.connection_type = connection_type;
        debug!(
            event = events::CHANNEL_ROLE_SET,
            component = COMPONENT,
            channel = self.name.as_str(),
            role = %role,
            connection_type = %connection_type,
            "controller role updated"
        );
    }

    pub fn set_protocol_version(&self, version: u8) {
        self.lock().protocol_version = version;
    }

    pub fn set_local_port(&self, port: u16) -> Result<(), ChannelMgrError> {
        let mut inner = self.lock();
        self.ensure_inactive(&inner, "local port")?;
        inner.local_port = port;
        Ok(())
    }

    pub fn set_local_addr(&self, addr: IpAddr) -> Result<(), ChannelMgrError> {
        let mut inner = self.lock();
        self.ensure_inactive(&inner, "local address")?;
        inner.local_addr = Some(addr);
        Ok(())
    }

    pub fn set_remote_port(&self, port: u16) -> Result<(), ChannelMgrError> {
        let mut inner = self.lock();
        self.ensure_inactive(&inner, "remote port")?;
        if port == 0 && inner.remote_addr.is_some() {
            return Err(ChannelMgrError::invalid_args(format!(
                "channel {}: remote port cannot be cleared while a remote address is set",
                self.name
            )));
        }
        inner.remote_port = port;
        Ok(())
    }

    fn ensure_inactive(&self, inner: &ChannelInner, what: &str) -> Result<(), ChannelMgrError> {
        if inner.state.is_active() {
            return Err(ChannelMgrError::busy(format!(
                "channel {}: cannot change {what} while {}",
                self.name, inner.state
            )));
        }
        Ok(())
    }

    /// Applies `event` to the locked state, logging the transition.
    pub(crate) fn transition(
        &self,
        inner: &mut ChannelInner,
        event: ChannelEvent,
    ) -> Result<ChannelState, InvalidTransition> {
        let from = inner.state;
        let to = from.on(event)?;
        inner.state = to;
        if from != to {
            debug!(
                event = events::CHANNEL_STATE_TRANSITION,
                component = COMPONENT,
                channel = self.name.as_str(),
                state_from = %from,
                state_to = %to,
                "channel state changed"
            );
        }
        Ok(to)
    }

    /// Cancels pending interest and closes the socket. Stopping an idle channel is a no-op.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.enabled = false;
        inner.disarm();

        let closing = matches!(
            self.transition(&mut inner, ChannelEvent::Stop),
            Ok(ChannelState::Closing)
        );
        if let Some(stream) = inner.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if closing {
            let _ = self.transition(&mut inner, ChannelEvent::Closed);
            info!(
                event = events::CHANNEL_STOP,
                component = COMPONENT,
                channel = self.name.as_str(),
                dpid = %fields::format_optional_dpid(inner.dpid),
                "channel stopped"
            );
        }
    }

    /// Borrows the channel until the returned guard drops.
    ///
    /// Fails `NOT_FOUND` once the channel has been removed from its registry.
    pub fn acquire(self: &Arc<Self>) -> Result<ChannelGuard, ChannelMgrError> {
        if !self.try_acquire() {
            return Err(ChannelMgrError::not_found(format!(
                "channel {} has been removed",
                self.name
            )));
        }
        Ok(ChannelGuard::new(self.clone()))
    }

    pub fn ref_count(&self) -> usize {
        match self.refs.load(Ordering::Acquire) {
            DETACHED => 0,
            refs => refs,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.refs.load(Ordering::Acquire) == DETACHED
    }

    fn try_acquire(&self) -> bool {
        let mut current = self.refs.load(Ordering::Acquire);
        loop {
            if current == DETACHED || current == DETACHED - 1 {
                return false;
            }
            match self.refs.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn release(&self) {
        let _ = self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |refs| match refs {
                0 | DETACHED => None,
                refs => Some(refs - 1),
            });
    }

    /// Marks the channel removed if nobody borrows it; returns the live count otherwise.
    pub(crate) fn try_detach(&self) -> Result<(), usize> {
        self.refs
            .compare_exchange(0, DETACHED, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    pub(crate) fn force_detach(&self) {
        self.refs.store(DETACHED, Ordering::Release);
    }
}
