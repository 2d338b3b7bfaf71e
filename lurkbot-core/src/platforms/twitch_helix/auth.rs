// lurkbot-core/src/platforms/twitch_helix/auth.rs

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::Error;

/// App access tokens live for roughly sixty days; a stamp at or past
/// this age means the token must be replaced before use.
const TOKEN_VALIDITY_DAYS: u64 = 60;

const DEFAULT_ID_BASE: &str = "https://id.twitch.tv";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Matches Twitch's JSON from the token endpoint
#[derive(Deserialize)]
struct TwitchTokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Owns the Twitch app access token and the on-disk record of when it
/// was last refreshed. Single owner; nothing else touches either.
pub struct AppCredentialStore {
    client_id: String,
    client_secret: String,
    stamp_path: PathBuf,
    id_base: String,
    token: Option<String>,
    http: ReqwestClient,
}

impl AppCredentialStore {
    pub fn new(
        client_id: String,
        client_secret: String,
        stamp_path: PathBuf,
    ) -> Result<Self, Error> {
        let http = ReqwestClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client_id,
            client_secret,
            stamp_path,
            id_base: DEFAULT_ID_BASE.to_string(),
            token: None,
            http,
        })
    }

    /// Points token requests at a different identity host.
    pub fn with_id_base(mut self, base: impl Into<String>) -> Self {
        self.id_base = base.into();
        self
    }

    /// Returns the current app token, refreshing first if none is cached
    /// in memory or the persisted refresh date is sixty days old. `None`
    /// means the refresh failed and the caller must skip this cycle.
    pub async fn ensure_token(&mut self) -> Option<String> {
        if self.token.is_none() || self.refresh_due() {
            self.refresh().await;
        }
        self.token.clone()
    }

    /// Unconditionally fetches a new token. Used after the API rejects
    /// the cached one.
    pub async fn force_refresh(&mut self) -> Option<String> {
        self.refresh().await;
        self.token.clone()
    }

    fn refresh_due(&self) -> bool {
        match fs::read_to_string(&self.stamp_path) {
            Ok(contents) => match contents.trim().parse::<NaiveDate>() {
                Ok(last) => stamp_is_stale(last, Utc::now()),
                Err(e) => {
                    warn!(
                        "unreadable token stamp in {}: {e}",
                        self.stamp_path.display()
                    );
                    true
                }
            },
            // No stamp on disk means a refresh is due now.
            Err(_) => true,
        }
    }

    async fn refresh(&mut self) {
        match self.request_token().await {
            Ok(token) => {
                self.token = Some(token);
                if let Err(e) = self.write_stamp() {
                    warn!(
                        "could not persist token refresh date to {}: {e}",
                        self.stamp_path.display()
                    );
                }
            }
            Err(e) => {
                error!("failed to obtain app access token: {e}");
                self.token = None;
            }
        }
    }

    async fn request_token(&self) -> Result<String, Error> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let resp = self
            .http
            .post(format!("{}/oauth2/token", self.id_base))
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<TwitchTokenResponse>()
            .await?;
        debug!(
            "token endpoint granted an app token (expires_in={:?})",
            resp.expires_in
        );
        if resp.access_token.is_empty() {
            return Err(Error::Auth(
                "token endpoint returned an empty access_token".into(),
            ));
        }
        Ok(resp.access_token)
    }

    fn write_stamp(&self) -> Result<(), Error> {
        fs::write(
            &self.stamp_path,
            format!("{}\n", Utc::now().format("%Y-%m-%d")),
        )?;
        Ok(())
    }
}

/// Date-only comparison in UTC: a stamp sixty or more days old is stale,
/// regardless of time of day.
fn stamp_is_stale(last_refresh: NaiveDate, now: DateTime<Utc>) -> bool {
    match last_refresh.checked_add_days(Days::new(TOKEN_VALIDITY_DAYS)) {
        Some(next_due) => now.date_naive() >= next_due,
        None => true,
    }
}
