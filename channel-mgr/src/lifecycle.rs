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

//! Pluggable module lifecycle driven by the hosting agent.

use crate::error::ChannelMgrError;
use crate::event_loop::dispatcher::EventDispatcher;

/// A subsystem the agent initializes, starts and tears down in order.
///
/// The host calls `initialize` and `start` in registration order, then `shutdown`,
/// `stop` and `finalize` in reverse order.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Receives the shared event dispatcher before anything is started.
    fn initialize(&self, dispatcher: &EventDispatcher) -> Result<(), ChannelMgrError>;

    fn start(&self) -> Result<(), ChannelMgrError>;

    /// Requests a graceful stop; in-flight work may still complete.
    fn shutdown(&self) -> Result<(), ChannelMgrError>;

    fn stop(&self) -> Result<(), ChannelMgrError>;

    /// Releases everything the module owns. Called once, after the dispatcher has stopped.
    fn finalize(&self);
}
