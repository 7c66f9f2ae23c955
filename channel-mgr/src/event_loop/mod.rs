//! Event-loop layer.
//!
//! A single dispatcher thread turns socket and timer readiness into callbacks, one at a
//! time. Channels register interest here on `start` and deregister on `stop`.

pub(crate) mod channel_events;
pub(crate) mod dispatcher;
pub(crate) mod interest;
