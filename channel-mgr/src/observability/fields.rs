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

//! Canonical reason values and field formatting helpers.

use crate::types::Dpid;
use std::net::{IpAddr, SocketAddr};

pub const NONE: &str = "none";
pub const REASON_REFERENCED: &str = "referenced";
pub const REASON_NOT_DISCONNECTED: &str = "not_disconnected";
pub const REASON_STALE_REGISTRATION: &str = "stale_registration";
pub const REASON_CHANNEL_DETACHED: &str = "channel_detached";
pub const DEFAULT_THREAD_NAME: &str = "unknown-thread";

/// Formats a datapath id the way switch tooling prints it.
pub fn format_dpid(dpid: Dpid) -> String {
    format!("{dpid:#018x}")
}

pub fn format_optional_dpid(dpid: Option<Dpid>) -> String {
    dpid.map(format_dpid).unwrap_or_else(|| NONE.to_string())
}

pub fn format_optional_id(id: Option<u64>) -> String {
    id.map(|id| id.to_string())
        .unwrap_or_else(|| NONE.to_string())
}

/// Formats an endpoint as `addr:port`, bracketing IPv6 addresses.
pub fn format_endpoint(addr: Option<IpAddr>, port: u16) -> String {
    match addr {
        Some(addr) => SocketAddr::new(addr, port).to_string(),
        None if port == 0 => NONE.to_string(),
        None => format!("*:{port}"),
    }
}

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_THREAD_NAME).to_string()
}

pub fn current_thread_name_or_default() -> String {
    thread_name_or_default(std::thread::current().name())
}
