//! Runtime integration layer.
//!
//! Isolates the dispatcher thread boundary so the rest of the crate stays synchronous and
//! never owns a tokio runtime of its own.
//!
//! ```
//! use channel_mgr::EventDispatcher;
//!
//! let dispatcher = EventDispatcher::new("runtime-doc");
//! let pump = dispatcher.spawn_named("runtime-doc-pump").unwrap();
//! dispatcher.stop();
//! pump.join().unwrap();
//! ```

pub(crate) mod dispatcher_runtime;
