// lurkbot-core/src/config.rs

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Error;

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_token_state_file() -> PathBuf {
    PathBuf::from("last_token_update.txt")
}

/// Process-wide configuration, loaded once at startup and read-only
/// afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot token for the Discord API.
    pub discord_token: String,

    /// Twitch application client id.
    pub client_id: String,

    /// Twitch application client secret.
    pub client_secret: String,

    /// Discord channel that receives the live announcements.
    pub channel_id: u64,

    /// Twitch login names to watch, in announcement order.
    pub watchlist: Vec<String>,

    /// Seconds between poll cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// File holding the date of the last successful app-token refresh.
    #[serde(default = "default_token_state_file")]
    pub token_state_file: PathBuf,

    /// Announce a streamer only once per live session instead of on
    /// every cycle they remain live.
    #[serde(default)]
    pub notify_once: bool,
}

impl Config {
    /// Reads and validates the JSON config file at `path`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let mut de = serde_json::Deserializer::from_str(&raw);
        let config: Config = serde_path_to_error::deserialize(&mut de)
            .map_err(|e| Error::Config(format!("invalid config field '{}': {}", e.path(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.discord_token.trim().is_empty() {
            return Err(Error::Config("discord_token must not be empty".into()));
        }
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::Config("client_secret must not be empty".into()));
        }
        if self.channel_id == 0 {
            return Err(Error::Config("channel_id must be a non-zero Discord id".into()));
        }
        if self.watchlist.is_empty() {
            return Err(Error::Config("watchlist must contain at least one login".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("poll_interval_secs must be at least 1".into()));
        }

        let mut seen = HashSet::new();
        for login in &self.watchlist {
            let cleaned = login.trim().to_lowercase();
            if cleaned.is_empty() {
                return Err(Error::Config("watchlist entries must not be blank".into()));
            }
            if !seen.insert(cleaned) {
                return Err(Error::Config(format!(
                    "watchlist entry '{login}' appears more than once (logins are case-insensitive)"
                )));
            }
        }
        Ok(())
    }
}
