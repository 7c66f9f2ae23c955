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

//! # channel-mgr
//!
//! `channel-mgr` creates, tracks and tears down the control channels between a switch
//! and its OpenFlow controllers, and binds those channels to the bridges they serve.
//!
//! Typical usage is API-first and centered on [`ChannelManager`]: channels are created
//! from a [`ChannelSpec`] or added to a [`Bridge`] by controller address, started against
//! an [`EventDispatcher`] pumped on its own thread, and borrowed through a
//! [`ChannelGuard`] while in use.
//!
//! ## Quick start
//!
//! ```
//! use channel_mgr::{ChannelManager, ChannelSpec, ConnectionStatus, EventDispatcher, Transport};
//! use channel_mgr::Module;
//!
//! let dispatcher = EventDispatcher::new("quick-start");
//! let pump = dispatcher.spawn().unwrap();
//!
//! let manager = ChannelManager::default();
//! manager.initialize(&dispatcher).unwrap();
//! manager
//!     .create(
//!         ChannelSpec::new("controller1", Transport::Tcp)
//!             .local("127.0.0.1".parse().unwrap(), 0)
//!             .remote("127.0.0.1".parse().unwrap(), 6633)
//!             .bridge(0xabc),
//!     )
//!     .unwrap();
//!
//! assert_eq!(
//!     manager.connection_status("controller1").unwrap(),
//!     ConnectionStatus::Disconnected
//! );
//! assert_eq!(manager.protocol_version("controller1").unwrap(), 4);
//!
//! manager.destroy("controller1").unwrap();
//! dispatcher.stop();
//! pump.join().unwrap();
//! manager.finalize();
//! ```
//!
//! ## Result codes
//!
//! Every operation returns `Result<_, ChannelMgrError>`; [`ChannelMgrError::code`] is one
//! of `INVALID_ARGS`, `NOT_FOUND`, `BUSY` or `FAILURE`. `BUSY` is advisory: deleting a
//! borrowed channel, or unbinding a channel that is not disconnected, may be retried.
//!
//! ## Internal architecture map
//!
//! - API facade: [`ChannelManager`], [`ChannelSpec`], [`Module`]
//! - Control plane: channel objects, state machine, refcount guard and the registry
//! - Event loop: dispatcher, interest kinds and the callbacks that drive channel state
//! - Runtime: the named thread that pumps a dispatcher
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber` initialization.

mod bridge;
pub use bridge::{Bridge, DatapathDirectory, StaticDatapathDirectory};

mod channel_manager;
pub use channel_manager::{ChannelManager, RetryPolicy};

mod config;
pub use config::{ChannelManagerConfig, DEFAULT_DISPATCHER_THREAD_NAME};

mod control_plane;
pub use control_plane::channel::{Channel, ChannelSpec};
pub use control_plane::channel_guard::ChannelGuard;
pub use control_plane::channel_registry::ChannelRegistry;

mod error;
pub use error::{ChannelMgrError, ErrorCode};

mod event_loop;
pub use event_loop::dispatcher::EventDispatcher;
pub use event_loop::interest::{EventHandler, Interest, ReadyEvent, RegistrationId};

mod lifecycle;
pub use lifecycle::Module;

#[doc(hidden)]
pub mod observability;
mod runtime;

mod types;
pub use types::{
    ChannelMode, ConnectionStatus, ConnectionType, ControllerRole, Dpid, Transport,
    DEFAULT_CONTROLLER_PORT, DEFAULT_PROTOCOL_VERSION,
};
