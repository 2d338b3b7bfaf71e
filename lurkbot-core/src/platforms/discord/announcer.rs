// lurkbot-core/src/platforms/discord/announcer.rs

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::channel::message::component::{ActionRow, Button, ButtonStyle};
use twilight_model::channel::message::{Component, Embed};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use twilight_util::builder::embed::{EmbedBuilder, ImageSource};

use crate::Error;
use crate::platforms::{Announcer, LiveAnnouncement};

/// discord.py's classic green, kept for continuity with the embeds the
/// community is used to.
const EMBED_COLOR_LIVE: u32 = 0x2ECC71;

const DISCORD_TIMEOUT: Duration = Duration::from_secs(30);

/// Deleting history pages through the newest messages at the API's
/// maximum page size.
const PURGE_PAGE_SIZE: u16 = 100;

/// Posts live announcements into a single Discord channel over the HTTP
/// API. The bot never consumes gateway events, so no shard is opened.
pub struct ChannelAnnouncer {
    http: HttpClient,
    channel_id: Id<ChannelMarker>,
}

impl ChannelAnnouncer {
    pub fn new(token: String, channel_id: u64) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::Discord("Discord token is empty".into()));
        }
        let channel_id = Id::<ChannelMarker>::new_checked(channel_id)
            .ok_or_else(|| Error::Discord("channel id must be non-zero".into()))?;
        let http = ClientBuilder::new()
            .token(token)
            .timeout(DISCORD_TIMEOUT)
            .build();
        Ok(Self { http, channel_id })
    }
}

/// Builds the embed and the link-button row for one announcement.
pub fn build_message(
    announcement: &LiveAnnouncement,
) -> Result<(Embed, Vec<Component>), Error> {
    let thumbnail = ImageSource::url(&announcement.avatar_url).map_err(|e| {
        Error::Discord(format!(
            "bad avatar url for {}: {e}",
            announcement.display_name
        ))
    })?;
    let embed = EmbedBuilder::new()
        .title(format!("{} is now live!", announcement.display_name))
        .description("Click the button below to watch the stream!")
        .color(EMBED_COLOR_LIVE)
        .thumbnail(thumbnail)
        .build();

    let button = Component::Button(Button {
        custom_id: None,
        disabled: false,
        emoji: None,
        label: Some("Watch stream".to_string()),
        style: ButtonStyle::Link,
        url: Some(announcement.stream_url.clone()),
        sku_id: None,
    });
    let row = Component::ActionRow(ActionRow {
        components: vec![button],
    });
    Ok((embed, vec![row]))
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn prepare_channel(&self) -> Result<(), Error> {
        let channel = self
            .http
            .channel(self.channel_id)
            .await
            .map_err(|e| Error::Discord(format!("cannot fetch channel {}: {e}", self.channel_id)))?
            .model()
            .await
            .map_err(|e| Error::Discord(format!("cannot parse channel {}: {e}", self.channel_id)))?;
        info!(
            "announcing into #{} ({})",
            channel.name.unwrap_or_else(|| "<unnamed>".into()),
            self.channel_id
        );
        Ok(())
    }

    async fn purge_history(&self, limit: usize) -> Result<usize, Error> {
        let mut purged = 0usize;
        while purged < limit {
            let page = (limit - purged).min(PURGE_PAGE_SIZE as usize) as u16;
            let messages = self
                .http
                .channel_messages(self.channel_id)
                .limit(page)
                .await
                .map_err(|e| Error::Discord(format!("cannot list channel history: {e}")))?
                .models()
                .await
                .map_err(|e| Error::Discord(format!("cannot parse channel history: {e}")))?;
            if messages.is_empty() {
                break;
            }

            let ids: Vec<Id<MessageMarker>> = messages.iter().map(|m| m.id).collect();
            if ids.len() == 1 {
                self.http
                    .delete_message(self.channel_id, ids[0])
                    .await
                    .map_err(|e| Error::Discord(format!("cannot delete message {}: {e}", ids[0])))?;
            } else if let Err(e) = self.http.delete_messages(self.channel_id, &ids).await {
                // Bulk deletion rejects messages older than two weeks;
                // fall back to removing the page one by one.
                warn!("bulk delete failed ({e}), deleting messages individually");
                for id in &ids {
                    if let Err(e) = self.http.delete_message(self.channel_id, *id).await {
                        warn!("could not delete message {id}: {e}");
                    }
                }
            }
            purged += ids.len();
        }
        Ok(purged)
    }

    async fn announce(&self, announcement: &LiveAnnouncement) -> Result<(), Error> {
        let (embed, components) = build_message(announcement)?;
        self.http
            .create_message(self.channel_id)
            .embeds(&[embed])
            .components(&components)
            .await
            .map_err(|e| {
                Error::Discord(format!(
                    "error sending announcement for {}: {e}",
                    announcement.display_name
                ))
            })?;
        debug!("announced {}", announcement.display_name);
        Ok(())
    }
}
