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

//! Glue between channels and the event dispatcher.
//!
//! `start` binds synchronously and arms interest; the handler below runs on the
//! dispatcher thread and advances the channel's state machine for each ready event.

use crate::control_plane::channel::{Armed, Channel, ChannelInner, ChannelSpec};
use crate::control_plane::channel_registry::ChannelRegistry;
use crate::control_plane::channel_state::ChannelEvent;
use crate::error::{ChannelMgrError, ErrorCode};
use crate::event_loop::dispatcher::EventDispatcher;
use crate::event_loop::interest::{EventHandler, Interest, ReadyEvent, RegistrationId};
use crate::observability::{events, fields};
use crate::types::{ChannelMode, Transport};
use std::net::{
    IpAddr, Ipv4Addr, SocketAddr, TcpListener as StdTcpListener, TcpStream as StdTcpStream,
};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::TcpSocket;
use tracing::{debug, info, trace, warn};

const COMPONENT: &str = "channel_events";

/// What event callbacks need besides the channel itself.
pub(crate) struct ChannelContext {
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) registry: Weak<ChannelRegistry>,
    pub(crate) reconnect_interval: Option<Duration>,
}

/// Binds the channel's socket and arms connect or accept interest.
pub(crate) fn start_channel(
    channel: &Arc<Channel>,
    context: &Arc<ChannelContext>,
) -> Result<(), ChannelMgrError> {
    let mut inner = channel.lock();
    match arm_start(channel, &mut inner, context) {
        Ok(()) => {
            inner.enabled = true;
            info!(
                event = events::CHANNEL_START,
                component = COMPONENT,
                channel = channel.name(),
                mode = %inner.mode,
                local = %fields::format_endpoint(inner.local_addr, inner.local_port),
                remote = %fields::format_endpoint(inner.remote_addr, inner.remote_port),
                "channel started"
            );
            Ok(())
        }
        Err(err) => {
            warn!(
                event = events::CHANNEL_START_FAILED,
                component = COMPONENT,
                channel = channel.name(),
                err = %err,
                "unable to start channel"
            );
            Err(err)
        }
    }
}

fn arm_start(
    channel: &Arc<Channel>,
    inner: &mut ChannelInner,
    context: &Arc<ChannelContext>,
) -> Result<(), ChannelMgrError> {
    if inner.state.on(ChannelEvent::Start).is_err() {
        return Err(ChannelMgrError::invalid_args(format!(
            "channel {} is already {}",
            channel.name(),
            inner.state
        )));
    }
    if inner.transport == Transport::Tls {
        return Err(ChannelMgrError::fail_with_code(
            ErrorCode::Failure,
            format!(
                "channel {}: tls transport requires a TLS-capable build",
                channel.name()
            ),
        ));
    }

    let interest = match inner.mode {
        ChannelMode::Active => bind_connect(channel.name(), inner)?,
        ChannelMode::Passive => bind_listen(channel.name(), inner)?,
        ChannelMode::Accepted => {
            return Err(ChannelMgrError::invalid_args(format!(
                "channel {} is owned by its listener",
                channel.name()
            )))
        }
    };

    let _ = channel.transition(inner, ChannelEvent::Start);
    if let Err(err) = arm(channel, inner, context, interest) {
        let _ = channel.transition(inner, ChannelEvent::Stop);
        return Err(err);
    }
    Ok(())
}

fn bind_connect(name: &str, inner: &mut ChannelInner) -> Result<Interest, ChannelMgrError> {
    let remote = match (inner.remote_addr, inner.remote_port) {
        (Some(addr), port) if port != 0 => SocketAddr::new(addr, port),
        _ => {
            return Err(ChannelMgrError::invalid_args(format!(
                "channel {name} has no remote endpoint"
            )))
        }
    };
    let local_ip = match inner.local_addr {
        Some(local) if local.is_ipv4() != remote.is_ipv4() => {
            return Err(ChannelMgrError::invalid_args(format!(
                "channel {name}: local address {local} cannot reach {remote}"
            )))
        }
        Some(local) => local,
        None => {
            return Err(ChannelMgrError::invalid_args(format!(
                "channel {name} has no local address to bind"
            )))
        }
    };

    let bind_error = |err| ChannelMgrError::io(format!("channel {name}: bind failed"), err);
    let socket = if remote.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_error)?;
    socket.set_reuseaddr(true).map_err(bind_error)?;
    socket
        .bind(SocketAddr::new(local_ip, inner.local_port))
        .map_err(bind_error)?;
    inner.local_port = socket.local_addr().map_err(bind_error)?.port();

    Ok(Interest::Connect { socket, remote })
}

fn bind_listen(name: &str, inner: &mut ChannelInner) -> Result<Interest, ChannelMgrError> {
    let local_ip = inner
        .local_addr
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let listen_error = |err| ChannelMgrError::io(format!("channel {name}: listen failed"), err);

    let listener = StdTcpListener::bind(SocketAddr::new(local_ip, inner.local_port))
        .map_err(listen_error)?;
    listener.set_nonblocking(true).map_err(listen_error)?;
    inner.local_port = listener.local_addr().map_err(listen_error)?.port();

    Ok(Interest::Accept { listener })
}

fn arm(
    channel: &Arc<Channel>,
    inner: &mut ChannelInner,
    context: &Arc<ChannelContext>,
    interest: Interest,
) -> Result<(), ChannelMgrError> {
    let handler = Arc::new(ChannelEventHandler {
        channel: Arc::downgrade(channel),
        context: context.clone(),
    });
    let registration = context.dispatcher.register(interest, handler)?;
    inner.armed = Some(Armed {
        dispatcher: context.dispatcher.clone(),
        registration,
    });
    Ok(())
}

/// Receives one channel's ready events on the dispatcher thread.
struct ChannelEventHandler {
    channel: Weak<Channel>,
    context: Arc<ChannelContext>,
}

impl EventHandler for ChannelEventHandler {
    fn on_event(&self, registration: RegistrationId, event: ReadyEvent) {
        let Some(channel) = self.channel.upgrade() else {
            trace!(
                event = events::CHANNEL_EVENT_DROPPED,
                component = COMPONENT,
                registration = %registration,
                reason = fields::REASON_CHANNEL_DETACHED,
                "channel dropped before its event was handled"
            );
            return;
        };
        let retired = {
            let Ok(_guard) = channel.acquire() else {
                trace!(
                    event = events::CHANNEL_EVENT_DROPPED,
                    component = COMPONENT,
                    channel = channel.name(),
                    registration = %registration,
                    reason = fields::REASON_CHANNEL_DETACHED,
                    "channel removed before its event was handled"
                );
                return;
            };
            match event {
                ReadyEvent::Accepted { stream, peer } => {
                    self.on_accepted(&channel, registration, stream, peer);
                    false
                }
                event => self.on_channel_event(&channel, registration, event),
            }
        };

        if retired {
            self.retire(&channel);
        }
    }
}

impl ChannelEventHandler {
    fn on_channel_event(
        &self,
        channel: &Arc<Channel>,
        registration: RegistrationId,
        event: ReadyEvent,
    ) -> bool {
        let mut inner = channel.lock();
        if !inner.is_armed_with(registration) {
            trace!(
                event = events::CHANNEL_EVENT_DROPPED,
                component = COMPONENT,
                channel = channel.name(),
                registration = %registration,
                reason = fields::REASON_STALE_REGISTRATION,
                "ignoring event for replaced interest"
            );
            return false;
        }

        match event {
            ReadyEvent::Connected(stream) => {
                inner.armed = None;
                self.on_connected(channel, &mut inner, stream);
            }
            ReadyEvent::ConnectFailed(err) => {
                inner.armed = None;
                let _ = channel.transition(&mut inner, ChannelEvent::ConnectFailed);
                warn!(
                    event = events::CHANNEL_CONNECT_FAILED,
                    component = COMPONENT,
                    channel = channel.name(),
                    remote = %fields::format_endpoint(inner.remote_addr, inner.remote_port),
                    err = %err,
                    "controller connect failed"
                );
                self.schedule_reconnect(channel, &mut inner);
            }
            ReadyEvent::Received(received) => channel.record_rx(received),
            ReadyEvent::PeerClosed => {
                inner.armed = None;
                inner.stream = None;
                let _ = channel.transition(&mut inner, ChannelEvent::PeerClosed);
                info!(
                    event = events::CHANNEL_PEER_CLOSED,
                    component = COMPONENT,
                    channel = channel.name(),
                    remote = %fields::format_endpoint(inner.remote_addr, inner.remote_port),
                    "controller closed the connection"
                );
                if inner.mode == ChannelMode::Accepted {
                    inner.retired = true;
                } else {
                    self.schedule_reconnect(channel, &mut inner);
                }
            }
            ReadyEvent::TimerExpired => {
                inner.armed = None;
                if !inner.enabled {
                    return false;
                }
                if let Err(err) = arm_start(channel, &mut inner, &self.context) {
                    warn!(
                        event = events::CHANNEL_START_FAILED,
                        component = COMPONENT,
                        channel = channel.name(),
                        err = %err,
                        "reconnect attempt failed"
                    );
                    self.schedule_reconnect(channel, &mut inner);
                }
            }
            ReadyEvent::AcceptFailed(err) => warn!(
                event = events::CHANNEL_ACCEPT_FAILED,
                component = COMPONENT,
                channel = channel.name(),
                err = %err,
                "accept failed"
            ),
            ReadyEvent::Accepted { .. } => {}
        }
        inner.retired
    }

    fn on_connected(
        &self,
        channel: &Arc<Channel>,
        inner: &mut ChannelInner,
        stream: StdTcpStream,
    ) {
        if let Err(rejected) = channel.transition(inner, ChannelEvent::ConnectOk) {
            debug!(
                event = events::CHANNEL_STATE_TRANSITION_REJECTED,
                component = COMPONENT,
                channel = channel.name(),
                err = %rejected,
                "dropping late connection"
            );
            return;
        }
        if let Ok(local) = stream.local_addr() {
            inner.local_addr = Some(local.ip());
            inner.local_port = local.port();
        }
        let _ = self.watch(channel, inner, &stream);
        inner.stream = Some(stream);

        info!(
            event = events::CHANNEL_CONNECT_OK,
            component = COMPONENT,
            channel = channel.name(),
            dpid = %fields::format_optional_dpid(inner.dpid),
            local = %fields::format_endpoint(inner.local_addr, inner.local_port),
            remote = %fields::format_endpoint(inner.remote_addr, inner.remote_port),
            "connected to controller"
        );
    }

    /// Arms peer-close detection on a clone of `stream`; `false` when it could not be armed.
    fn watch(
        &self,
        channel: &Arc<Channel>,
        inner: &mut ChannelInner,
        stream: &StdTcpStream,
    ) -> bool {
        let armed = stream
            .try_clone()
            .map_err(|err| ChannelMgrError::io("unable to clone control socket", err))
            .and_then(|watched| {
                arm(channel, inner, &self.context, Interest::Watch { stream: watched })
            });
        if let Err(err) = armed {
            warn!(
                event = events::CHANNEL_EVENT_DROPPED,
                component = COMPONENT,
                channel = channel.name(),
                err = %err,
                "control socket is not watched for peer close"
            );
            return false;
        }
        true
    }

    fn schedule_reconnect(&self, channel: &Arc<Channel>, inner: &mut ChannelInner) {
        let Some(after) = self.context.reconnect_interval else {
            return;
        };
        if !inner.enabled || inner.mode != ChannelMode::Active {
            return;
        }
        match arm(channel, inner, &self.context, Interest::Timer { after }) {
            Ok(()) => debug!(
                event = events::CHANNEL_RECONNECT_SCHEDULED,
                component = COMPONENT,
                channel = channel.name(),
                after_ms = after.as_millis() as u64,
                "reconnect scheduled"
            ),
            Err(err) => warn!(
                event = events::CHANNEL_RECONNECT_SCHEDULED,
                component = COMPONENT,
                channel = channel.name(),
                err = %err,
                "unable to schedule reconnect"
            ),
        }
    }

    fn on_accepted(
        &self,
        listener: &Arc<Channel>,
        registration: RegistrationId,
        stream: StdTcpStream,
        peer: SocketAddr,
    ) {
        let (dpid, transport) = {
            let inner = listener.lock();
            if !inner.is_armed_with(registration) {
                return;
            }
            (inner.dpid, inner.transport)
        };
        let Some(registry) = self.context.registry.upgrade() else {
            return;
        };
        registry.sweep_retired();

        let name = format!("{}:{peer}", listener.name());
        let mut spec = ChannelSpec::new(&name, transport)
            .remote(peer.ip(), peer.port())
            .accepted();
        if let Ok(local) = stream.local_addr() {
            spec = spec.local(local.ip(), local.port());
        }
        if let Some(dpid) = dpid {
            spec = spec.bridge(dpid);
        }

        let accepted = match registry.create(spec) {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(
                    event = events::CHANNEL_ACCEPT_FAILED,
                    component = COMPONENT,
                    channel = listener.name(),
                    remote = %peer,
                    err = %err,
                    "unable to register inbound channel"
                );
                return;
            }
        };

        let mut inner = accepted.lock();
        let _ = accepted.transition(&mut inner, ChannelEvent::Accepted);
        if !self.watch(&accepted, &mut inner, &stream) {
            let _ = accepted.transition(&mut inner, ChannelEvent::PeerClosed);
            inner.retired = true;
            drop(inner);
            drop(stream);
            registry.retire(&accepted);
            return;
        }
        inner.stream = Some(stream);
        info!(
            event = events::CHANNEL_ACCEPT_OK,
            component = COMPONENT,
            channel = accepted.name(),
            listener = listener.name(),
            dpid = %fields::format_optional_dpid(inner.dpid),
            channel_id = %fields::format_optional_id(inner.id),
            remote = %peer,
            "accepted controller connection"
        );
    }

    fn retire(&self, channel: &Arc<Channel>) {
        if let Some(registry) = self.context.registry.upgrade() {
            registry.retire(channel);
        }
    }
}
