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

use channel_mgr::EventDispatcher;
use std::thread::JoinHandle;
use tracing::debug;

/// Event dispatcher pumped on its own thread for the lifetime of a test.
///
/// Dropping the fixture stops the pump and joins its thread.
pub struct DispatcherFixture {
    dispatcher: EventDispatcher,
    pump: Option<JoinHandle<()>>,
}

impl DispatcherFixture {
    pub fn start(name: &str) -> Self {
        let dispatcher = EventDispatcher::new(name);
        let pump = dispatcher
            .spawn_named(&format!("{name}-pump"))
            .expect("dispatcher thread should spawn");
        debug!("dispatcher fixture {name} started");

        Self {
            dispatcher,
            pump: Some(pump),
        }
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Stops the pump and waits for its thread to exit.
    pub fn stop(&mut self) {
        self.dispatcher.stop();
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

impl Drop for DispatcherFixture {
    fn drop(&mut self) {
        self.stop();
    }
}
