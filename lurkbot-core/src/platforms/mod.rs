// lurkbot-core/src/platforms/mod.rs

pub mod discord;
pub mod twitch_helix;

use async_trait::async_trait;

use crate::Error;

/// One "streamer went live" message, ready to hand to the chat platform.
/// Derived fresh every cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveAnnouncement {
    pub display_name: String,
    pub stream_url: String,
    pub avatar_url: String,
}

/// Destination channel for live announcements.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Resolves the target channel once at startup.
    async fn prepare_channel(&self) -> Result<(), Error>;

    /// Deletes up to `limit` recent messages from the channel and
    /// returns how many were removed.
    async fn purge_history(&self, limit: usize) -> Result<usize, Error>;

    async fn announce(&self, announcement: &LiveAnnouncement) -> Result<(), Error>;
}
