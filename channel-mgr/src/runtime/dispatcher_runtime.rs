//! Runtime helper for pumping an event dispatcher on a dedicated thread.

use crate::event_loop::dispatcher::EventDispatcher;
use crate::observability::{events, fields};
use std::io;
use std::thread;
use tracing::{debug, error, warn};

const COMPONENT: &str = "dispatcher_runtime";

pub(crate) fn spawn_dispatcher_loop(
    dispatcher: EventDispatcher,
    thread_name: &str,
) -> io::Result<thread::JoinHandle<()>> {
    debug!(
        event = events::RUNTIME_SPAWN_START,
        component = COMPONENT,
        dispatcher = dispatcher.name(),
        worker_thread = thread_name,
        "spawning dispatcher thread"
    );

    let spawned = thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            if let Err(err) = dispatcher.run() {
                error!(
                    event = events::DISPATCHER_RUN_STOP,
                    component = COMPONENT,
                    dispatcher = dispatcher.name(),
                    worker_thread = fields::current_thread_name_or_default(),
                    err = %err,
                    "dispatcher pump exited with error"
                );
            }
        });

    match &spawned {
        Ok(_) => debug!(
            event = events::RUNTIME_SPAWN_OK,
            component = COMPONENT,
            worker_thread = thread_name,
            "dispatcher thread spawned"
        ),
        Err(err) => warn!(
            event = events::RUNTIME_SPAWN_FAILED,
            component = COMPONENT,
            worker_thread = thread_name,
            err = %err,
            "unable to spawn dispatcher thread"
        ),
    }
    spawned
}
