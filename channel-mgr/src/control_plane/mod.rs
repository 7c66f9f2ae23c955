//! Control-plane layer.
//!
//! Owns channel objects, their connection state machine and the registry that indexes
//! them by name and by bridge. Everything here is synchronous and safe to call from any
//! thread; socket readiness is delegated to the event-loop layer.
//!
//! ```
//! use channel_mgr::{ChannelRegistry, ChannelSpec, ErrorCode, Transport};
//!
//! let registry = ChannelRegistry::default();
//! let spec = ChannelSpec::new("control-plane-doc", Transport::Tcp)
//!     .remote("127.0.0.1".parse().unwrap(), 6633)
//!     .bridge(0xabc);
//!
//! let channel = registry.create(spec.clone()).unwrap();
//! assert_eq!(channel.id(), Some(0));
//! assert_eq!(registry.create(spec).unwrap_err().code(), ErrorCode::InvalidArgs);
//!
//! registry.destroy("control-plane-doc").unwrap();
//! assert_eq!(
//!     registry.lookup_by_name("control-plane-doc").unwrap_err().code(),
//!     ErrorCode::NotFound
//! );
//! ```

pub(crate) mod channel;
pub(crate) mod channel_guard;
pub(crate) mod channel_registry;
pub(crate) mod channel_state;
