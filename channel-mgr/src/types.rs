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

//! Value types describing a control channel.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Datapath id of a bridge.
pub type Dpid = u64;

/// OpenFlow 1.3 wire version, assumed until a handshake records another one.
pub const DEFAULT_PROTOCOL_VERSION: u8 = 0x04;

/// IANA-registered OpenFlow controller port used when none is given.
pub const DEFAULT_CONTROLLER_PORT: u16 = 6633;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Tcp,
    Tls,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerRole {
    Master,
    Slave,
    #[default]
    Equal,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    Main,
    Auxiliary,
}

/// Externally visible connection status.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl ConnectionStatus {
    /// Connecting and connected channels count as alive for their bridge.
    pub fn is_alive(self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        )
    }
}

/// How a channel obtains its connection.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Connects out to the remote controller.
    #[default]
    Active,
    /// Listens on the local endpoint and spawns an accepted channel per peer.
    Passive,
    /// Created by a passive channel for one inbound connection.
    Accepted,
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Tcp => write!(f, "tcp"),
            Transport::Tls => write!(f, "tls"),
        }
    }
}

impl Display for ControllerRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerRole::Master => write!(f, "master"),
            ControllerRole::Slave => write!(f, "slave"),
            ControllerRole::Equal => write!(f, "equal"),
        }
    }
}

impl Display for ConnectionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::Main => write!(f, "main"),
            ConnectionType::Auxiliary => write!(f, "auxiliary"),
        }
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Closing => write!(f, "closing"),
        }
    }
}

impl Display for ChannelMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelMode::Active => write!(f, "active"),
            ChannelMode::Passive => write!(f, "passive"),
            ChannelMode::Accepted => write!(f, "accepted"),
        }
    }
}
