// lurkbot-core/src/platforms/twitch_helix/client.rs

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::AppCredentialStore;
use crate::Error;

const DEFAULT_HELIX_BASE: &str = "https://api.twitch.tv/helix";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A watched account as the users endpoint reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HelixUser {
    pub login: String,
    pub id: String,
    pub profile_image_url: String,
}

/// One currently-running broadcast. The viewer-count and category
/// fields the API also returns are not used here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HelixStream {
    pub user_login: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub game_name: String,
}

#[derive(Deserialize)]
struct HelixEnvelope<T> {
    data: Vec<T>,
}

/// Thin client for the two Helix endpoints the bot polls. Tokens come
/// from the [`AppCredentialStore`] handed into each call.
pub struct HelixClient {
    client_id: String,
    base_url: String,
    http: ReqwestClient,
}

impl HelixClient {
    pub fn new(client_id: String) -> Result<Self, Error> {
        let http = ReqwestClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client_id,
            base_url: DEFAULT_HELIX_BASE.to_string(),
            http,
        })
    }

    /// Points API requests at a different Helix host.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    /// Resolves watchlist logins to user records with one batched
    /// request. The map is keyed by the login casing the API returns.
    pub async fn get_users(
        &self,
        store: &mut AppCredentialStore,
        logins: &[String],
    ) -> Result<HashMap<String, HelixUser>, Error> {
        let query: Vec<(&str, &str)> = logins.iter().map(|l| ("login", l.as_str())).collect();
        let resp = self.get_with_refresh(store, "users", &query).await?;
        let envelope = resp.json::<HelixEnvelope<HelixUser>>().await?;
        let users: HashMap<String, HelixUser> = envelope
            .data
            .into_iter()
            .map(|user| (user.login.clone(), user))
            .collect();
        debug!("resolved {} of {} watched logins", users.len(), logins.len());
        Ok(users)
    }

    /// Fetches the live sessions for the given users with one batched
    /// request, keyed by login as returned. An absent key means the
    /// account is not broadcasting.
    pub async fn get_streams(
        &self,
        store: &mut AppCredentialStore,
        users: &HashMap<String, HelixUser>,
    ) -> Result<HashMap<String, HelixStream>, Error> {
        let query: Vec<(&str, &str)> =
            users.values().map(|u| ("user_id", u.id.as_str())).collect();
        let resp = self.get_with_refresh(store, "streams", &query).await?;
        let envelope = resp.json::<HelixEnvelope<HelixStream>>().await?;
        Ok(envelope
            .data
            .into_iter()
            .map(|stream| (stream.user_login.clone(), stream))
            .collect())
    }

    /// Issues one authenticated GET. A 401 forces a token refresh and a
    /// single retry of the same request; a second 401 is surfaced as an
    /// auth error. Any other non-2xx fails the current cycle.
    async fn get_with_refresh(
        &self,
        store: &mut AppCredentialStore,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, Error> {
        let token = store
            .ensure_token()
            .await
            .ok_or_else(|| Error::Auth("no app access token available".into()))?;
        let resp = self.send(endpoint, query, &token).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return check_status(endpoint, resp);
        }

        warn!("unauthorized response from helix /{endpoint}, refreshing app token");
        let token = store
            .force_refresh()
            .await
            .ok_or_else(|| Error::Auth("no app access token available".into()))?;
        let resp = self.send(endpoint, query, &token).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth(format!(
                "helix /{endpoint} rejected a freshly refreshed token"
            )));
        }
        check_status(endpoint, resp)
    }

    async fn send(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        token: &str,
    ) -> Result<Response, Error> {
        let resp = self
            .http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(query)
            .bearer_auth(token)
            .header("Client-Id", &self.client_id)
            .send()
            .await?;
        Ok(resp)
    }
}

fn check_status(endpoint: &str, resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Platform(format!(
            "helix /{endpoint} returned {status}"
        )));
    }
    Ok(resp)
}
