// lurkbot-core/src/tasks/stream_watch.rs

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::platforms::twitch_helix::{AppCredentialStore, HelixClient, HelixStream, HelixUser};
use crate::platforms::{Announcer, LiveAnnouncement};
use crate::{Config, Error};

/// How much old channel history is cleared during startup.
const STARTUP_PURGE_LIMIT: usize = 1000;

/// The poll-and-announce loop. Owns the credential store, so token
/// refreshes can never race: every API call runs on this one task.
pub struct StreamWatcher {
    watchlist: Vec<String>,
    poll_interval: Duration,
    notify_once: bool,
    store: AppCredentialStore,
    helix: HelixClient,
    announcer: Box<dyn Announcer>,
    currently_live: HashSet<String>,
}

impl StreamWatcher {
    pub fn new(
        config: &Config,
        store: AppCredentialStore,
        helix: HelixClient,
        announcer: Box<dyn Announcer>,
    ) -> Self {
        Self {
            watchlist: config.watchlist.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            notify_once: config.notify_once,
            store,
            helix,
            announcer,
            currently_live: HashSet::new(),
        }
    }

    /// Startup sequence: resolve the channel, clear its history, then
    /// run one cycle immediately. Only this part may fail the process;
    /// a failed first poll is logged like any later one.
    pub async fn startup(&mut self) -> Result<(), Error> {
        self.announcer.prepare_channel().await?;
        let purged = self.announcer.purge_history(STARTUP_PURGE_LIMIT).await?;
        info!("cleared {purged} old messages from the announcement channel");
        if let Err(e) = self.run_cycle().await {
            error!("initial poll cycle failed: {e}");
        }
        Ok(())
    }

    /// Runs forever: startup once, then one poll cycle per interval.
    /// A cycle that overruns the period delays the next tick instead of
    /// overlapping it.
    pub async fn run(mut self) -> Result<(), Error> {
        self.startup().await?;

        let mut ticker = time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                error!("poll cycle failed: {e}");
            }
        }
    }

    /// One resolve → poll → announce pass. Errors from the Twitch side
    /// abandon the cycle; a failed delivery only skips that one message.
    pub async fn run_cycle(&mut self) -> Result<(), Error> {
        let users = self.helix.get_users(&mut self.store, &self.watchlist).await?;
        let streams = self.helix.get_streams(&mut self.store, &users).await?;

        let mut announcements = build_announcements(&self.watchlist, &users, &streams);
        if self.notify_once {
            announcements = retain_newly_live(&mut self.currently_live, &streams, announcements);
        }

        for announcement in &announcements {
            info!("{} is live, announcing", announcement.display_name);
            if let Err(e) = self.announcer.announce(announcement).await {
                error!(
                    "failed to deliver announcement for {}: {e}",
                    announcement.display_name
                );
            }
        }
        Ok(())
    }
}

/// Pairs every watched login with its live session, in watchlist order.
/// Logins match case-insensitively; the display name is whatever login
/// casing the platform reported for the stream.
pub fn build_announcements(
    watchlist: &[String],
    users: &HashMap<String, HelixUser>,
    streams: &HashMap<String, HelixStream>,
) -> Vec<LiveAnnouncement> {
    let users_by_login: HashMap<String, &HelixUser> = users
        .iter()
        .map(|(login, user)| (login.trim().to_lowercase(), user))
        .collect();
    let streams_by_login: HashMap<String, &HelixStream> = streams
        .iter()
        .map(|(login, stream)| (login.trim().to_lowercase(), stream))
        .collect();

    let mut announcements = Vec::new();
    for watched in watchlist {
        let cleaned = watched.trim().to_lowercase();
        let (Some(user), Some(stream)) =
            (users_by_login.get(&cleaned), streams_by_login.get(&cleaned))
        else {
            debug!("{watched} is not currently streaming");
            continue;
        };
        debug!("{} is streaming: {}", stream.user_login, stream.title);
        announcements.push(LiveAnnouncement {
            display_name: stream.user_login.clone(),
            stream_url: format!("https://www.twitch.tv/{}", stream.user_login),
            avatar_url: user.profile_image_url.clone(),
        });
    }
    announcements
}

/// Keeps only first-time announcements and updates the live set.
/// Logins that stopped streaming drop out of the set, so they announce
/// again the next time they go live.
pub fn retain_newly_live(
    currently_live: &mut HashSet<String>,
    streams: &HashMap<String, HelixStream>,
    announcements: Vec<LiveAnnouncement>,
) -> Vec<LiveAnnouncement> {
    let live_now: HashSet<String> = streams
        .keys()
        .map(|login| login.trim().to_lowercase())
        .collect();
    currently_live.retain(|login| live_now.contains(login));

    announcements
        .into_iter()
        .filter(|a| currently_live.insert(a.display_name.trim().to_lowercase()))
        .collect()
}
