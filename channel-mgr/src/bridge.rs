/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
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

use crate::types::Dpid;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

///
/// [`Bridge`] names one logical forwarding instance by its datapath id.
///
/// The channel manager only reads bridges; provisioning them belongs to the datapath.
///
/// # Examples
///
/// ```
/// use channel_mgr::Bridge;
///
/// let bridge = Bridge::new("br0", 0xabc);
/// assert_eq!(bridge.dpid(), 0xabc);
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Bridge {
    name: String,
    dpid: Dpid,
}

impl Bridge {
    pub fn new(name: &str, dpid: Dpid) -> Self {
        Self {
            name: name.to_string(),
            dpid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dpid(&self) -> Dpid {
        self.dpid
    }
}

/// Resolves datapath ids to bridges owned by the datapath layer.
pub trait DatapathDirectory: Send + Sync {
    fn lookup_bridge(&self, dpid: Dpid) -> Option<Bridge>;
}

/// In-memory directory for agents that provision bridges from static configuration.
#[derive(Default)]
pub struct StaticDatapathDirectory {
    bridges: RwLock<HashMap<Dpid, Bridge>>,
}

impl StaticDatapathDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and keeps the existing bridge when its dpid is already present.
    pub fn insert(&self, bridge: Bridge) -> bool {
        let mut bridges = self
            .bridges
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match bridges.entry(bridge.dpid()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(bridge);
                true
            }
        }
    }

    pub fn remove(&self, dpid: Dpid) -> Option<Bridge> {
        self.bridges
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&dpid)
    }
}

impl DatapathDirectory for StaticDatapathDirectory {
    fn lookup_bridge(&self, dpid: Dpid) -> Option<Bridge> {
        self.bridges
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&dpid)
            .cloned()
    }
}
