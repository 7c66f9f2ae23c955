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

//! Channel registry with name and bridge indices.

use crate::control_plane::channel::{Channel, ChannelInner, ChannelSpec};
use crate::error::ChannelMgrError;
use crate::observability::{events, fields};
use crate::types::{ConnectionStatus, Dpid, DEFAULT_PROTOCOL_VERSION};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::{debug, info};

const COMPONENT: &str = "channel_registry";

/// Channels bound to one bridge, in id order.
#[derive(Default)]
struct BridgeChannels {
    next_id: u64,
    channels: Vec<Weak<Channel>>,
}

impl BridgeChannels {
    fn live(&self) -> impl Iterator<Item = Arc<Channel>> + '_ {
        self.channels.iter().filter_map(Weak::upgrade)
    }

    fn remove(&mut self, channel: &Arc<Channel>) {
        self.channels
            .retain(|entry| entry.as_ptr() != Arc::as_ptr(channel));
    }
}

#[derive(Default)]
struct RegistryTables {
    by_name: HashMap<String, Arc<Channel>>,
    by_bridge: HashMap<Dpid, BridgeChannels>,
}

impl RegistryTables {
    /// Binds a locked channel to `dpid` with the next id of that bridge.
    fn attach(&mut self, channel: &Arc<Channel>, inner: &mut ChannelInner, dpid: Dpid) -> u64 {
        let bridge = self.by_bridge.entry(dpid).or_default();
        let id = bridge.next_id;
        bridge.next_id += 1;
        bridge.channels.push(Arc::downgrade(channel));
        inner.id = Some(id);
        inner.dpid = Some(dpid);
        id
    }

    /// Removes a locked channel from its bridge list. The bridge keeps its id counter.
    fn detach(&mut self, channel: &Arc<Channel>, inner: &mut ChannelInner) {
        if let Some(dpid) = inner.dpid.take() {
            if let Some(bridge) = self.by_bridge.get_mut(&dpid) {
                bridge.remove(channel);
            }
        }
        inner.id = None;
    }

    fn bridge_channels(&self, dpid: Dpid) -> Vec<Arc<Channel>> {
        self.by_bridge
            .get(&dpid)
            .map(|bridge| bridge.live().collect())
            .unwrap_or_default()
    }

    fn find_by_remote(&self, dpid: Dpid, addr: IpAddr) -> Option<Arc<Channel>> {
        self.by_bridge
            .get(&dpid)?
            .live()
            .find(|channel| channel.lock().remote_addr == Some(addr))
    }

    fn name_of(&self, name: &str) -> Result<Arc<Channel>, ChannelMgrError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ChannelMgrError::not_found(format!("channel {name} not found")))
    }
}

/// Registry owning every channel by name, with weak per-bridge lists.
///
/// Lock order is registry before channel. Visitors and channel teardown run with the
/// registry lock released.
pub struct ChannelRegistry {
    tables: RwLock<RegistryTables>,
    protocol_version: u8,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PROTOCOL_VERSION)
    }
}

impl ChannelRegistry {
    /// Creates an empty registry; new channels report `protocol_version` until negotiated.
    pub fn new(protocol_version: u8) -> Self {
        Self {
            tables: RwLock::new(RegistryTables::default()),
            protocol_version,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryTables> {
        self.tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryTables> {
        self.tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create(&self, spec: ChannelSpec) -> Result<Arc<Channel>, ChannelMgrError> {
        spec.validate().inspect_err(|err| log_create_failed(spec.name(), err))?;

        let mut tables = self.write();
        if tables.by_name.contains_key(spec.name()) {
            let err =
                ChannelMgrError::invalid_args(format!("channel {} already exists", spec.name()));
            log_create_failed(spec.name(), &err);
            return Err(err);
        }
        Ok(self.insert_locked(&mut tables, &spec))
    }

    /// Creates a channel on `dpid` from the id it will receive.
    ///
    /// Fails `INVALID_ARGS` when the bridge already has a channel to the same remote address.
    pub(crate) fn create_for_bridge(
        &self,
        dpid: Dpid,
        spec_for_id: impl FnOnce(u64) -> ChannelSpec,
    ) -> Result<Arc<Channel>, ChannelMgrError> {
        let mut tables = self.write();
        let next_id = tables
            .by_bridge
            .get(&dpid)
            .map(|bridge| bridge.next_id)
            .unwrap_or_default();
        let spec = spec_for_id(next_id).bridge(dpid);
        spec.validate().inspect_err(|err| log_create_failed(spec.name(), err))?;

        if let Some(remote) = spec.remote_addr() {
            if tables.find_by_remote(dpid, remote).is_some() {
                let err = ChannelMgrError::invalid_args(format!(
                    "bridge {} already has a channel to {remote}",
                    fields::format_dpid(dpid)
                ));
                log_create_failed(spec.name(), &err);
                return Err(err);
            }
        }
        if tables.by_name.contains_key(spec.name()) {
            let err =
                ChannelMgrError::invalid_args(format!("channel {} already exists", spec.name()));
            log_create_failed(spec.name(), &err);
            return Err(err);
        }
        Ok(self.insert_locked(&mut tables, &spec))
    }

    fn insert_locked(&self, tables: &mut RegistryTables, spec: &ChannelSpec) -> Arc<Channel> {
        let channel = Arc::new(Channel::new(spec, self.protocol_version));
        let id = spec.dpid().map(|dpid| {
            let mut inner = channel.lock();
            tables.attach(&channel, &mut inner, dpid)
        });
        tables
            .by_name
            .insert(spec.name().to_string(), channel.clone());

        info!(
            event = events::CHANNEL_CREATE_OK,
            component = COMPONENT,
            channel = spec.name(),
            dpid = %fields::format_optional_dpid(spec.dpid()),
            channel_id = %fields::format_optional_id(id),
            mode = %spec.mode(),
            "channel created"
        );
        channel
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<Arc<Channel>, ChannelMgrError> {
        self.read().name_of(name)
    }

    pub fn lookup_by_bridge_and_addr(
        &self,
        dpid: Dpid,
        remote: IpAddr,
    ) -> Result<Arc<Channel>, ChannelMgrError> {
        self.read().find_by_remote(dpid, remote).ok_or_else(|| {
            ChannelMgrError::not_found(format!(
                "no channel to {remote} on bridge {}",
                fields::format_dpid(dpid)
            ))
        })
    }

    pub fn lookup_by_bridge_and_id(
        &self,
        dpid: Dpid,
        id: u64,
    ) -> Result<Arc<Channel>, ChannelMgrError> {
        let tables = self.read();
        tables
            .by_bridge
            .get(&dpid)
            .and_then(|bridge| bridge.live().find(|channel| channel.lock().id == Some(id)))
            .ok_or_else(|| {
                ChannelMgrError::not_found(format!(
                    "no channel {id} on bridge {}",
                    fields::format_dpid(dpid)
                ))
            })
    }

    /// Channels bound to `dpid` in id order.
    pub fn list_by_bridge(&self, dpid: Dpid) -> Result<Vec<Arc<Channel>>, ChannelMgrError> {
        let channels = self.read().bridge_channels(dpid);
        if channels.is_empty() {
            return Err(ChannelMgrError::not_found(format!(
                "bridge {} has no channels",
                fields::format_dpid(dpid)
            )));
        }
        Ok(channels)
    }

    /// Visits a snapshot of the bridge's channels; the first visitor error ends the walk.
    ///
    /// Channels added or deleted while the walk runs may or may not be visited.
    pub fn iterate<F>(&self, dpid: Dpid, mut visitor: F) -> Result<(), ChannelMgrError>
    where
        F: FnMut(&Arc<Channel>) -> Result<(), ChannelMgrError>,
    {
        for channel in self.list_by_bridge(dpid)? {
            visitor(&channel)?;
        }
        Ok(())
    }

    /// Every registered channel, in no particular order.
    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.read().by_name.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().by_name.is_empty()
    }

    pub fn has_alive_channel(&self, dpid: Dpid) -> bool {
        self.read()
            .bridge_channels(dpid)
            .iter()
            .any(|channel| channel.is_alive())
    }

    /// Binds a channel to `dpid`. Rebinding to the same bridge is a no-op.
    pub fn set_bridge(&self, name: &str, dpid: Dpid) -> Result<u64, ChannelMgrError> {
        let mut tables = self.write();
        let channel = tables.name_of(name)?;
        let mut inner = channel.lock();

        if inner.dpid == Some(dpid) {
            if let Some(id) = inner.id {
                return Ok(id);
            }
        }
        if inner.dpid.is_some() {
            ensure_disconnected(&channel, &inner)?;
            tables.detach(&channel, &mut inner);
        }
        let id = tables.attach(&channel, &mut inner, dpid);

        debug!(
            event = events::CHANNEL_BRIDGE_SET,
            component = COMPONENT,
            channel = name,
            dpid = %fields::format_dpid(dpid),
            channel_id = id,
            "channel bound to bridge"
        );
        Ok(id)
    }

    /// Unbinds a channel from its bridge; `BUSY` unless the channel is disconnected.
    pub fn unset_bridge(&self, name: &str) -> Result<(), ChannelMgrError> {
        let mut tables = self.write();
        let channel = tables.name_of(name)?;
        let mut inner = channel.lock();

        let Some(dpid) = inner.dpid else {
            return Err(ChannelMgrError::not_found(format!(
                "channel {name} is not bound to a bridge"
            )));
        };
        ensure_disconnected(&channel, &inner)?;
        tables.detach(&channel, &mut inner);

        debug!(
            event = events::CHANNEL_BRIDGE_UNSET,
            component = COMPONENT,
            channel = name,
            dpid = %fields::format_dpid(dpid),
            "channel unbound from bridge"
        );
        Ok(())
    }

    /// Removes and stops a channel by name; `BUSY` while it is borrowed.
    pub fn destroy(&self, name: &str) -> Result<(), ChannelMgrError> {
        let channel = {
            let mut tables = self.write();
            let channel = tables.name_of(name).inspect_err(|_| {
                debug!(
                    event = events::CHANNEL_DELETE_NOT_FOUND,
                    component = COMPONENT,
                    channel = name,
                    "channel to delete not found"
                );
            })?;
            self.remove_locked(&mut tables, channel)?
        };
        channel.stop();
        Ok(())
    }

    /// Removes and stops the bridge's channel to `remote`; `BUSY` while it is borrowed.
    pub fn delete_by_bridge_and_addr(
        &self,
        dpid: Dpid,
        remote: IpAddr,
    ) -> Result<(), ChannelMgrError> {
        let channel = {
            let mut tables = self.write();
            let Some(channel) = tables.find_by_remote(dpid, remote) else {
                debug!(
                    event = events::CHANNEL_DELETE_NOT_FOUND,
                    component = COMPONENT,
                    dpid = %fields::format_dpid(dpid),
                    remote = %remote,
                    "channel to delete not found"
                );
                return Err(ChannelMgrError::not_found(format!(
                    "no channel to {remote} on bridge {}",
                    fields::format_dpid(dpid)
                )));
            };
            self.remove_locked(&mut tables, channel)?
        };
        channel.stop();
        Ok(())
    }

    /// Drops a closed inbound channel.
    ///
    /// Returns `false` while the channel is borrowed; it stays marked and a later
    /// [`sweep_retired`](ChannelRegistry::sweep_retired) removes it.
    pub(crate) fn retire(&self, channel: &Arc<Channel>) -> bool {
        let retired = {
            let mut tables = self.write();
            match tables.by_name.get(channel.name()) {
                Some(current) if Arc::ptr_eq(current, channel) => {}
                _ => return true,
            }
            match self.remove_locked(&mut tables, channel.clone()) {
                Ok(retired) => retired,
                Err(_) => {
                    debug!(
                        event = events::CHANNEL_RETIRE_DEFERRED,
                        component = COMPONENT,
                        channel = channel.name(),
                        reason = fields::REASON_REFERENCED,
                        "closed inbound channel is still borrowed"
                    );
                    return false;
                }
            }
        };
        retired.stop();
        debug!(
            event = events::CHANNEL_RETIRED,
            component = COMPONENT,
            channel = retired.name(),
            "closed inbound channel removed"
        );
        true
    }

    /// Retires every marked channel that is no longer borrowed; returns how many went.
    pub(crate) fn sweep_retired(&self) -> usize {
        self.channels()
            .iter()
            .filter(|channel| channel.lock().retired)
            .filter(|channel| self.retire(channel))
            .count()
    }

    fn remove_locked(
        &self,
        tables: &mut RegistryTables,
        channel: Arc<Channel>,
    ) -> Result<Arc<Channel>, ChannelMgrError> {
        if let Err(ref_count) = channel.try_detach() {
            debug!(
                event = events::CHANNEL_DELETE_BUSY,
                component = COMPONENT,
                channel = channel.name(),
                ref_count,
                reason = fields::REASON_REFERENCED,
                "channel is borrowed; delete deferred to caller retry"
            );
            return Err(ChannelMgrError::busy(format!(
                "channel {} is referenced {ref_count} time(s)",
                channel.name()
            )));
        }

        tables.by_name.remove(channel.name());
        {
            let mut inner = channel.lock();
            tables.detach(&channel, &mut inner);
        }
        info!(
            event = events::CHANNEL_DELETE_OK,
            component = COMPONENT,
            channel = channel.name(),
            "channel deleted"
        );
        Ok(channel)
    }

    /// Drops every channel regardless of borrowers and restarts id assignment.
    ///
    /// Must not run concurrently with `create`.
    pub fn finalize(&self) -> usize {
        let channels: Vec<Arc<Channel>> = {
            let mut tables = self.write();
            tables.by_bridge.clear();
            tables.by_name.drain().map(|(_, channel)| channel).collect()
        };

        for channel in &channels {
            channel.force_detach();
            channel.stop();
            let mut inner = channel.lock();
            inner.id = None;
            inner.dpid = None;
        }
        info!(
            event = events::REGISTRY_FINALIZE,
            component = COMPONENT,
            channels = channels.len(),
            "channel registry finalized"
        );
        channels.len()
    }
}

fn ensure_disconnected(channel: &Channel, inner: &ChannelInner) -> Result<(), ChannelMgrError> {
    let status = inner.state.connection_status();
    if status == ConnectionStatus::Disconnected {
        return Ok(());
    }
    debug!(
        event = events::CHANNEL_BRIDGE_UNSET_BUSY,
        component = COMPONENT,
        channel = channel.name(),
        status = %status,
        reason = fields::REASON_NOT_DISCONNECTED,
        "channel must be disconnected to change its bridge"
    );
    Err(ChannelMgrError::busy(format!(
        "channel {} is {status}",
        channel.name()
    )))
}

fn log_create_failed(name: &str, err: &ChannelMgrError) {
    debug!(
        event = events::CHANNEL_CREATE_FAILED,
        component = COMPONENT,
        channel = name,
        err = %err,
        "channel create rejected"
    );
}

#[cfg(test)]
mod tests {
    use super::ChannelRegistry;
    use crate::control_plane::channel::ChannelSpec;
    use crate::control_plane::channel_state::ChannelState;
    use crate::error::ErrorCode;
    use crate::types::Transport;
    use std::net::IpAddr;

    const DPID: u64 = 0xabc;

    fn addr(text: &str) -> IpAddr {
        text.parse().expect("valid address")
    }

    fn remote_spec(name: &str, remote: &str) -> ChannelSpec {
        ChannelSpec::new(name, Transport::Tcp).remote(addr(remote), 6633)
    }

    #[test]
    fn create_then_lookup_returns_same_channel() {
        let registry = ChannelRegistry::default();

        let created = registry
            .create(remote_spec("channel1", "127.0.0.1"))
            .expect("create channel");
        let found = registry.lookup_by_name("channel1").expect("lookup");

        assert!(std::sync::Arc::ptr_eq(&created, &found));
        assert_eq!(
            registry
                .create(remote_spec("channel1", "127.0.0.2"))
                .map(|_| ())
                .map_err(|err| err.code()),
            Err(ErrorCode::InvalidArgs)
        );
    }

    #[test]
    fn ids_are_sequential_per_bridge_and_not_reused() {
        let registry = ChannelRegistry::default();

        let a = registry
            .create(remote_spec("a", "127.0.0.1").bridge(DPID))
            .expect("create a");
        let b = registry
            .create(remote_spec("b", "127.0.0.2").bridge(DPID))
            .expect("create b");
        let other = registry
            .create(remote_spec("other", "127.0.0.3").bridge(0xdef))
            .expect("create other");
        assert_eq!((a.id(), b.id(), other.id()), (Some(0), Some(1), Some(0)));

        registry.destroy("b").expect("destroy b");
        let c = registry
            .create(remote_spec("c", "127.0.0.4").bridge(DPID))
            .expect("create c");
        assert_eq!(c.id(), Some(2));

        assert_eq!(registry.finalize(), 3);
        let fresh = registry
            .create(remote_spec("fresh", "127.0.0.1").bridge(DPID))
            .expect("create after finalize");
        assert_eq!(fresh.id(), Some(0));
    }

    #[test]
    fn bridge_lookups_and_iteration() {
        let registry = ChannelRegistry::default();
        registry
            .create(remote_spec("v4", "127.0.0.1").bridge(DPID))
            .expect("create v4");
        registry
            .create(remote_spec("v6", "::1").bridge(DPID))
            .expect("create v6");

        let by_addr = registry
            .lookup_by_bridge_and_addr(DPID, addr("::1"))
            .expect("lookup by addr");
        assert_eq!(by_addr.name(), "v6");
        assert_eq!(
            registry
                .lookup_by_bridge_and_id(DPID, 0)
                .expect("lookup by id")
                .name(),
            "v4"
        );
        assert!(registry.lookup_by_bridge_and_id(DPID, 9999).is_err());

        let mut visited = 0;
        registry
            .iterate(DPID, |_| {
                visited += 1;
                Ok(())
            })
            .expect("iterate");
        assert_eq!(visited, 2);

        registry
            .delete_by_bridge_and_addr(DPID, addr("127.0.0.1"))
            .expect("delete v4");
        assert_eq!(registry.list_by_bridge(DPID).expect("list").len(), 1);
        assert_eq!(
            registry
                .list_by_bridge(0xdef)
                .map(|_| ())
                .map_err(|err| err.code()),
            Err(ErrorCode::NotFound)
        );
    }

    #[test]
    fn visitor_error_stops_the_walk() {
        let registry = ChannelRegistry::default();
        registry
            .create(remote_spec("a", "127.0.0.1").bridge(DPID))
            .expect("create a");
        registry
            .create(remote_spec("b", "127.0.0.2").bridge(DPID))
            .expect("create b");

        let mut visited = 0;
        let result = registry.iterate(DPID, |_| {
            visited += 1;
            Err(crate::error::ChannelMgrError::fail_with_code(
                ErrorCode::Failure,
                "visitor gave up",
            ))
        });

        assert_eq!(result.map_err(|err| err.code()), Err(ErrorCode::Failure));
        assert_eq!(visited, 1);
    }

    #[test]
    fn borrowed_channel_delete_is_busy_until_released() {
        let registry = ChannelRegistry::default();
        let channel = registry
            .create(remote_spec("channel1", "127.0.0.1").bridge(DPID))
            .expect("create");

        let guard = channel.acquire().expect("borrow");
        assert_eq!(
            registry.destroy("channel1").map_err(|err| err.code()),
            Err(ErrorCode::Busy)
        );
        assert!(registry.lookup_by_name("channel1").is_ok());
        assert!(registry.lookup_by_bridge_and_id(DPID, 0).is_ok());

        drop(guard);
        registry.destroy("channel1").expect("destroy after release");
        assert_eq!(
            registry
                .lookup_by_name("channel1")
                .map(|_| ())
                .map_err(|err| err.code()),
            Err(ErrorCode::NotFound)
        );
        assert!(channel.acquire().is_err());
    }

    #[test]
    fn unset_bridge_requires_disconnected_channel() {
        let registry = ChannelRegistry::default();
        let channel = registry
            .create(remote_spec("channel1", "127.0.0.1"))
            .expect("create");

        assert_eq!(
            registry.unset_bridge("channel1").map_err(|err| err.code()),
            Err(ErrorCode::NotFound)
        );
        assert_eq!(registry.set_bridge("channel1", DPID).expect("bind"), 0);
        assert_eq!(registry.set_bridge("channel1", DPID).expect("rebind"), 0);

        channel.lock().state = ChannelState::Connecting;
        assert_eq!(
            registry.unset_bridge("channel1").map_err(|err| err.code()),
            Err(ErrorCode::Busy)
        );
        channel.lock().state = ChannelState::Connected;
        assert!(registry.has_alive_channel(DPID));
        assert!(registry.set_bridge("channel1", 0xdef).is_err());

        channel.lock().state = ChannelState::Disconnected;
        assert!(!registry.has_alive_channel(DPID));
        registry.unset_bridge("channel1").expect("unset");
        assert_eq!(channel.dpid(), None);
        assert_eq!(channel.id(), None);

        assert_eq!(registry.set_bridge("channel1", DPID).expect("bind again"), 1);
    }

    #[test]
    fn duplicate_remote_on_bridge_is_rejected() {
        let registry = ChannelRegistry::default();
        let spec_for = |id: u64| remote_spec(&format!("auto-{id}"), "127.0.0.1");

        let first = registry.create_for_bridge(DPID, spec_for).expect("first");
        assert_eq!(first.name(), "auto-0");
        assert_eq!(
            registry
                .create_for_bridge(DPID, spec_for)
                .map(|_| ())
                .map_err(|err| err.code()),
            Err(ErrorCode::InvalidArgs)
        );
    }

    #[test]
    fn retired_channel_leaves_once_unborrowed() {
        let registry = ChannelRegistry::default();
        let channel = registry
            .create(remote_spec("inbound", "10.0.0.9").bridge(DPID))
            .expect("create");
        let listener = registry
            .create(remote_spec("listener", "10.0.0.10").bridge(DPID))
            .expect("create");

        let guard = channel.acquire().expect("borrow");
        channel.lock().retired = true;
        assert!(!registry.retire(&channel));
        assert_eq!(registry.sweep_retired(), 0);
        assert!(registry.lookup_by_name("inbound").is_ok());

        drop(guard);
        assert_eq!(registry.sweep_retired(), 1);
        assert!(registry.lookup_by_name("inbound").is_err());
        assert!(channel.is_detached());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_by_bridge(DPID).expect("listener").len(), 1);
        assert!(!listener.is_detached());
        assert!(registry.retire(&channel));
    }
}
