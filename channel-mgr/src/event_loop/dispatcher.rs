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

//! Single-threaded event dispatcher shared by every channel.

use crate::config::DEFAULT_DISPATCHER_THREAD_NAME;
use crate::error::ChannelMgrError;
use crate::event_loop::interest::{
    drive_interest, EventHandler, Interest, ReadyEvent, ReadySender, RegistrationId,
};
use crate::observability::{events, fields};
use crate::runtime::dispatcher_runtime::spawn_dispatcher_loop;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tracing::{debug, info, trace};

const COMPONENT: &str = "event_dispatcher";

enum DispatchCommand {
    Arm(RegistrationId, Interest),
    Stop,
}

struct Registration {
    handler: Arc<dyn EventHandler>,
    abort: Option<AbortHandle>,
}

struct PumpQueues {
    commands: UnboundedReceiver<DispatchCommand>,
    ready_rx: UnboundedReceiver<(RegistrationId, ReadyEvent)>,
    ready_tx: ReadySender,
}

struct DispatcherShared {
    name: String,
    commands: UnboundedSender<DispatchCommand>,
    pump: Mutex<Option<PumpQueues>>,
    registrations: Mutex<HashMap<RegistrationId, Registration>>,
    next_id: AtomicU64,
    stopped: AtomicBool,
    running: AtomicBool,
}

///
/// [`EventDispatcher`] owns the queue of ready I/O and timer events and invokes the
/// registered [`EventHandler`] for each one, strictly one at a time, on the thread
/// that pumps it.
///
/// Handles are cheap to clone. Creating one allocates the queues; the caller decides which
/// thread pumps it through [`run`](EventDispatcher::run) or
/// [`spawn`](EventDispatcher::spawn), and ends the pump with [`stop`](EventDispatcher::stop).
/// Interest registered before the pump starts is armed once it runs.
///
/// # Examples
///
/// ```
/// use channel_mgr::EventDispatcher;
///
/// let dispatcher = EventDispatcher::new("doc-dispatcher");
/// let pump = dispatcher.spawn().unwrap();
/// dispatcher.stop();
/// pump.join().unwrap();
/// ```
#[derive(Clone)]
pub struct EventDispatcher {
    shared: Arc<DispatcherShared>,
}

impl EventDispatcher {
    pub fn new(name: &str) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();

        Self {
            shared: Arc::new(DispatcherShared {
                name: name.to_string(),
                commands,
                pump: Mutex::new(Some(PumpQueues {
                    commands: command_rx,
                    ready_rx,
                    ready_tx,
                })),
                registrations: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                stopped: AtomicBool::new(false),
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Number of interests currently armed or waiting to be armed.
    pub fn registered_count(&self) -> usize {
        self.registrations().len()
    }

    fn registrations(&self) -> MutexGuard<'_, HashMap<RegistrationId, Registration>> {
        self.shared
            .registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `interest`; `handler` receives its ready events on the dispatcher thread.
    pub fn register(
        &self,
        interest: Interest,
        handler: Arc<dyn EventHandler>,
    ) -> Result<RegistrationId, ChannelMgrError> {
        if self.is_stopped() {
            return Err(ChannelMgrError::invalid_args(format!(
                "event dispatcher {} is stopped",
                self.shared.name
            )));
        }

        let id = RegistrationId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let kind = interest.kind();
        self.registrations().insert(
            id,
            Registration {
                handler,
                abort: None,
            },
        );

        if self
            .shared
            .commands
            .send(DispatchCommand::Arm(id, interest))
            .is_err()
        {
            self.registrations().remove(&id);
            return Err(ChannelMgrError::invalid_args(format!(
                "event dispatcher {} has exited",
                self.shared.name
            )));
        }

        debug!(
            event = events::DISPATCHER_REGISTER,
            component = COMPONENT,
            dispatcher = self.shared.name.as_str(),
            registration = %id,
            interest = kind,
            "registered interest"
        );
        Ok(id)
    }

    /// Cancels an interest. Its pending events are never delivered afterwards.
    ///
    /// Returns `false` when the registration was already gone.
    pub fn deregister(&self, id: RegistrationId) -> bool {
        let removed = self.registrations().remove(&id);
        let Some(registration) = removed else {
            return false;
        };

        if let Some(abort) = registration.abort {
            abort.abort();
        }
        debug!(
            event = events::DISPATCHER_DEREGISTER,
            component = COMPONENT,
            dispatcher = self.shared.name.as_str(),
            registration = %id,
            "deregistered interest"
        );
        true
    }

    /// Signals the pump to exit once it has finished the event in hand.
    pub fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.shared.commands.send(DispatchCommand::Stop);
    }

    /// Pumps events on the calling thread until [`stop`](EventDispatcher::stop).
    ///
    /// A dispatcher can be pumped once.
    pub fn run(&self) -> Result<(), ChannelMgrError> {
        let queues = self
            .shared
            .pump
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or_else(|| {
                ChannelMgrError::invalid_args(format!(
                    "event dispatcher {} is already pumped",
                    self.shared.name
                ))
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ChannelMgrError::io("unable to build dispatcher runtime", err))?;

        self.shared.running.store(true, Ordering::Release);
        let worker_thread = fields::current_thread_name_or_default();
        info!(
            event = events::DISPATCHER_RUN_START,
            component = COMPONENT,
            dispatcher = self.shared.name.as_str(),
            worker_thread = worker_thread.as_str(),
            "dispatcher pump started"
        );

        runtime.block_on(self.pump(queues));

        for (_, registration) in self.registrations().drain() {
            if let Some(abort) = registration.abort {
                abort.abort();
            }
        }
        self.shared.running.store(false, Ordering::Release);
        info!(
            event = events::DISPATCHER_RUN_STOP,
            component = COMPONENT,
            dispatcher = self.shared.name.as_str(),
            worker_thread = worker_thread.as_str(),
            "dispatcher pump stopped"
        );
        Ok(())
    }

    /// Pumps events on a dedicated thread named [`DEFAULT_DISPATCHER_THREAD_NAME`].
    pub fn spawn(&self) -> Result<thread::JoinHandle<()>, ChannelMgrError> {
        self.spawn_named(DEFAULT_DISPATCHER_THREAD_NAME)
    }

    pub fn spawn_named(
        &self,
        thread_name: &str,
    ) -> Result<thread::JoinHandle<()>, ChannelMgrError> {
        spawn_dispatcher_loop(self.clone(), thread_name)
            .map_err(|err| ChannelMgrError::io("unable to spawn dispatcher thread", err))
    }

    async fn pump(&self, mut queues: PumpQueues) {
        loop {
            tokio::select! {
                biased;
                command = queues.commands.recv() => match command {
                    Some(DispatchCommand::Arm(id, interest)) => {
                        self.arm(id, interest, &queues.ready_tx);
                    }
                    Some(DispatchCommand::Stop) | None => break,
                },
                Some((id, event)) = queues.ready_rx.recv() => self.dispatch(id, event),
            }
        }
    }

    fn arm(&self, id: RegistrationId, interest: Interest, ready_tx: &ReadySender) {
        let task = tokio::spawn(drive_interest(id, interest, ready_tx.clone()));

        let mut registrations = self.registrations();
        match registrations.get_mut(&id) {
            Some(registration) => registration.abort = Some(task.abort_handle()),
            None => task.abort(),
        }
    }

    fn dispatch(&self, id: RegistrationId, event: ReadyEvent) {
        let handler = {
            let mut registrations = self.registrations();
            let handler = registrations
                .get(&id)
                .map(|registration| registration.handler.clone());
            if handler.is_some() && event.is_terminal() {
                registrations.remove(&id);
            }
            handler
        };

        match handler {
            Some(handler) => handler.on_event(id, event),
            None => trace!(
                event = events::DISPATCHER_EVENT_STALE,
                component = COMPONENT,
                dispatcher = self.shared.name.as_str(),
                registration = %id,
                reason = fields::REASON_STALE_REGISTRATION,
                "dropping event for deregistered interest"
            ),
        }
    }
}
