//! Structured logging vocabulary shared by every layer.
//!
//! Library code emits `tracing` events with an `event` and `component` field and never
//! installs a subscriber; binaries and tests own subscriber initialization.

pub mod events;
pub mod fields;
