//! Scope-bound borrow of a registered channel.

use crate::control_plane::channel::Channel;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Holds one reference on a [`Channel`]; dropping it releases the reference.
///
/// While any guard is alive, deleting the channel reports `BUSY` and leaves it registered.
///
/// ```
/// use channel_mgr::{ChannelManager, ChannelSpec, ErrorCode, Transport};
///
/// let manager = ChannelManager::default();
/// manager
///     .create(ChannelSpec::new("guarded", Transport::Tcp))
///     .unwrap();
///
/// let guard = manager.acquire("guarded").unwrap();
/// assert_eq!(guard.ref_count(), 1);
/// assert_eq!(manager.destroy("guarded").unwrap_err().code(), ErrorCode::Busy);
///
/// drop(guard);
/// manager.destroy("guarded").unwrap();
/// ```
pub struct ChannelGuard {
    channel: Arc<Channel>,
}

impl ChannelGuard {
    pub(crate) fn new(channel: Arc<Channel>) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }
}

impl Deref for ChannelGuard {
    type Target = Channel;

    fn deref(&self) -> &Self::Target {
        &self.channel
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.channel.release();
    }
}

impl Debug for ChannelGuard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ChannelGuard")
            .field(&self.channel.name())
            .finish()
    }
}
