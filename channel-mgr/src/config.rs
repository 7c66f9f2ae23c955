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

//! Tunables for a [`ChannelManager`][crate::ChannelManager] instance.

use crate::types::{DEFAULT_CONTROLLER_PORT, DEFAULT_PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DISPATCHER_THREAD_NAME: &str = "ofc-dispatcher";

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ChannelManagerConfig {
    /// Protocol version reported before a handshake records one.
    pub default_protocol_version: u8,
    /// Remote port for channels added by address only.
    pub default_controller_port: u16,
    /// Delay before an active channel retries after a failed or closed connection.
    /// Retries are disabled when unset.
    pub reconnect_interval_ms: Option<u64>,
    pub dispatcher_thread_name: String,
}

impl Default for ChannelManagerConfig {
    fn default() -> Self {
        Self {
            default_protocol_version: DEFAULT_PROTOCOL_VERSION,
            default_controller_port: DEFAULT_CONTROLLER_PORT,
            reconnect_interval_ms: None,
            dispatcher_thread_name: DEFAULT_DISPATCHER_THREAD_NAME.to_string(),
        }
    }
}

impl ChannelManagerConfig {
    pub fn reconnect_interval(&self) -> Option<Duration> {
        self.reconnect_interval_ms
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval_ms = Some(interval.as_millis() as u64);
        self
    }
}
