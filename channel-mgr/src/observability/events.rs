//! Canonical structured event names used across `channel-mgr`.

// Registry events.
pub const CHANNEL_CREATE_OK: &str = "channel_create_ok";
pub const CHANNEL_CREATE_FAILED: &str = "channel_create_failed";
pub const CHANNEL_DELETE_OK: &str = "channel_delete_ok";
pub const CHANNEL_DELETE_BUSY: &str = "channel_delete_busy";
pub const CHANNEL_DELETE_NOT_FOUND: &str = "channel_delete_not_found";
pub const CHANNEL_BRIDGE_SET: &str = "channel_bridge_set";
pub const CHANNEL_BRIDGE_UNSET: &str = "channel_bridge_unset";
pub const CHANNEL_BRIDGE_UNSET_BUSY: &str = "channel_bridge_unset_busy";
pub const CHANNEL_RETIRED: &str = "channel_retired";
pub const CHANNEL_RETIRE_DEFERRED: &str = "channel_retire_deferred";
pub const REGISTRY_FINALIZE: &str = "registry_finalize";

// Channel lifecycle events.
pub const CHANNEL_START: &str = "channel_start";
pub const CHANNEL_START_FAILED: &str = "channel_start_failed";
pub const CHANNEL_STOP: &str = "channel_stop";
pub const CHANNEL_STATE_TRANSITION: &str = "channel_state_transition";
pub const CHANNEL_STATE_TRANSITION_REJECTED: &str = "channel_state_transition_rejected";
pub const CHANNEL_CONNECT_OK: &str = "channel_connect_ok";
pub const CHANNEL_CONNECT_FAILED: &str = "channel_connect_failed";
pub const CHANNEL_PEER_CLOSED: &str = "channel_peer_closed";
pub const CHANNEL_ACCEPT_OK: &str = "channel_accept_ok";
pub const CHANNEL_ACCEPT_FAILED: &str = "channel_accept_failed";
pub const CHANNEL_RECONNECT_SCHEDULED: &str = "channel_reconnect_scheduled";
pub const CHANNEL_EVENT_DROPPED: &str = "channel_event_dropped";
pub const CHANNEL_ROLE_SET: &str = "channel_role_set";

// Dispatcher events.
pub const DISPATCHER_RUN_START: &str = "dispatcher_run_start";
pub const DISPATCHER_RUN_STOP: &str = "dispatcher_run_stop";
pub const DISPATCHER_REGISTER: &str = "dispatcher_register";
pub const DISPATCHER_DEREGISTER: &str = "dispatcher_deregister";
pub const DISPATCHER_EVENT_STALE: &str = "dispatcher_event_stale";

// Runtime and module lifecycle events.
pub const RUNTIME_SPAWN_START: &str = "runtime_spawn_start";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
pub const MODULE_INITIALIZE: &str = "module_initialize";
pub const MODULE_START: &str = "module_start";
pub const MODULE_SHUTDOWN: &str = "module_shutdown";
pub const MODULE_FINALIZE: &str = "module_finalize";
