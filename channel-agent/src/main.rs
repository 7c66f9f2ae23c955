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

mod config;
mod modules;

use crate::config::AgentConfig;
use crate::modules::ModuleRegistry;
use channel_mgr::{ChannelManager, ChannelMgrError, EventDispatcher, StaticDatapathDirectory};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command()]
struct AgentArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), ChannelMgrError> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    info!("Started channel-agent");

    let args = AgentArgs::parse();
    let config = AgentConfig::load(&args.config)?;

    let directory = Arc::new(StaticDatapathDirectory::new());
    for bridge in &config.bridges {
        if !directory.insert(bridge.bridge()) {
            return Err(ChannelMgrError::invalid_args(format!(
                "Duplicate bridge dpid found: {:#x}",
                bridge.dpid
            )));
        }
    }

    let manager = Arc::new(
        ChannelManager::new(config.channel_manager.clone()).with_directory(directory),
    );
    for bridge in &config.bridges {
        for controller in &bridge.controllers {
            let name = bridge.channel_name(controller);
            manager.create(controller.spec(&name, bridge.dpid))?;
            manager.set_controller(&name, controller.role, controller.connection_type)?;
        }
    }

    let dispatcher = EventDispatcher::new("channel-agent");
    let pump = dispatcher.spawn_named(&config.channel_manager.dispatcher_thread_name)?;

    let mut modules = ModuleRegistry::new();
    modules.register(manager.clone());
    modules.initialize(&dispatcher)?;
    modules.start()?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for shutdown signal: {e}");
    }
    info!("Shutting down channel-agent");

    modules.shutdown();
    dispatcher.stop();
    if !matches!(
        tokio::task::spawn_blocking(move || pump.join()).await,
        Ok(Ok(()))
    ) {
        warn!("Dispatcher thread did not exit cleanly");
    }
    modules.finalize();

    Ok(())
}
