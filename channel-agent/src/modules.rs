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

use channel_mgr::{ChannelMgrError, EventDispatcher, Module};
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "module_registry";

/// Runs registered modules through their lifecycle.
///
/// Bring-up walks the modules in registration order; tear-down walks them in reverse.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn Module>) {
        info!(
            component = COMPONENT,
            module = module.name(),
            "module registered"
        );
        self.modules.push(module);
    }

    pub fn initialize(&self, dispatcher: &EventDispatcher) -> Result<(), ChannelMgrError> {
        for module in &self.modules {
            module.initialize(dispatcher)?;
        }
        Ok(())
    }

    pub fn start(&self) -> Result<(), ChannelMgrError> {
        for module in &self.modules {
            module.start()?;
        }
        Ok(())
    }

    /// Shuts down and stops every module, continuing past failures.
    pub fn shutdown(&self) {
        for module in self.modules.iter().rev() {
            if let Err(err) = module.shutdown() {
                warn!(
                    component = COMPONENT,
                    module = module.name(),
                    err = %err,
                    "module shutdown failed"
                );
            }
        }
        for module in self.modules.iter().rev() {
            if let Err(err) = module.stop() {
                warn!(
                    component = COMPONENT,
                    module = module.name(),
                    err = %err,
                    "module stop failed"
                );
            }
        }
    }

    pub fn finalize(&self) {
        for module in self.modules.iter().rev() {
            module.finalize();
        }
    }
}
