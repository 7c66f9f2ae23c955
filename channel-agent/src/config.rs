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

use channel_mgr::{
    Bridge, ChannelManagerConfig, ChannelMgrError, ChannelSpec, ConnectionType, ControllerRole,
    Dpid, ErrorCode, Transport, DEFAULT_CONTROLLER_PORT,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default)]
    pub(crate) channel_manager: ChannelManagerConfig,
    pub(crate) bridges: Vec<BridgeConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub(crate) name: String,
    pub(crate) dpid: Dpid,
    #[serde(default)]
    pub(crate) controllers: Vec<ControllerConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) remote_addr: Option<IpAddr>,
    #[serde(default)]
    pub(crate) remote_port: Option<u16>,
    #[serde(default)]
    pub(crate) local_addr: Option<IpAddr>,
    #[serde(default)]
    pub(crate) local_port: u16,
    #[serde(default)]
    pub(crate) transport: Transport,
    #[serde(default)]
    pub(crate) mode: ControllerMode,
    #[serde(default)]
    pub(crate) role: ControllerRole,
    #[serde(default)]
    pub(crate) connection_type: ConnectionType,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ControllerMode {
    #[default]
    Active,
    Passive,
}

impl AgentConfig {
    pub fn load(path: &str) -> Result<Self, ChannelMgrError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ChannelMgrError::fail_with_code(
                ErrorCode::NotFound,
                format!("Unable to read config file {path}: {e}"),
            )
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ChannelMgrError> {
        json5::from_str(contents).map_err(|e| {
            ChannelMgrError::invalid_args(format!("Unable to parse config file: {e}"))
        })
    }
}

impl BridgeConfig {
    pub fn bridge(&self) -> Bridge {
        Bridge::new(&self.name, self.dpid)
    }

    /// Channel names are scoped by bridge so controllers can share a name across bridges.
    pub fn channel_name(&self, controller: &ControllerConfig) -> String {
        format!("{}-{}", self.name, controller.name)
    }
}

impl ControllerConfig {
    pub fn spec(&self, channel_name: &str, dpid: Dpid) -> ChannelSpec {
        let mut spec = ChannelSpec::new(channel_name, self.transport).bridge(dpid);
        if let Some(remote) = self.remote_addr {
            spec = spec.remote(remote, self.remote_port.unwrap_or(DEFAULT_CONTROLLER_PORT));
        }
        spec = match self.local_addr {
            Some(local) => spec.local(local, self.local_port),
            None => spec.local_port(self.local_port),
        };
        match self.mode {
            ControllerMode::Active => spec,
            ControllerMode::Passive => spec.passive(),
        }
    }
}
