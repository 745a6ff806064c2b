//! Slash command interaction surface.
//!
//! Wraps an inbound command payload with the reply operations handlers use.
//! The originating HTTP request is acknowledged before any handler runs, so
//! every reply operation goes out-of-band through the REST API: the initial
//! response through the interaction callback endpoint, later edits through
//! the webhook `@original` endpoints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use serde_json::json;

use super::types::{response_type, CommandData, InteractionPayload, ReplyMessage, User};
use crate::api::DiscordApi;
use crate::error::{ForgeError, Result};
use crate::flags::MessageFlags;

/// Milliseconds of the platform epoch (2015-01-01T00:00:00Z).
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Extracts the creation time embedded in a snowflake id.
pub fn snowflake_timestamp(snowflake: &str) -> Option<DateTime<Utc>> {
    let id: u64 = snowflake.parse().ok()?;
    let ms = (id >> 22) + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(ms as i64).single()
}

/// Rich reply options beyond plain text.
#[derive(Debug, Clone, Default)]
pub struct RichReply {
    pub content: String,
    pub tts: bool,
    pub ephemeral: bool,
    pub suppress_embeds: bool,
    pub suppress_notifications: bool,
}

/// Content accepted by [`SlashCommandInteraction::reply`].
#[derive(Debug, Clone)]
pub enum ReplyContent {
    Text(String),
    Rich(RichReply),
}

impl From<&str> for ReplyContent {
    fn from(content: &str) -> Self {
        ReplyContent::Text(content.to_string())
    }
}

impl From<String> for ReplyContent {
    fn from(content: String) -> Self {
        ReplyContent::Text(content)
    }
}

impl From<RichReply> for ReplyContent {
    fn from(reply: RichReply) -> Self {
        ReplyContent::Rich(reply)
    }
}

/// An application command interaction being handled.
pub struct SlashCommandInteraction {
    payload: InteractionPayload,
    api: Arc<DiscordApi>,
    replied: AtomicBool,
    created_at: DateTime<Utc>,
}

impl SlashCommandInteraction {
    pub fn new(payload: InteractionPayload, api: Arc<DiscordApi>) -> Self {
        let created_at = snowflake_timestamp(&payload.id).unwrap_or_else(Utc::now);
        Self {
            payload,
            api,
            replied: AtomicBool::new(false),
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.payload.id
    }

    pub fn token(&self) -> &str {
        &self.payload.token
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.payload.guild_id.as_deref()
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.payload.channel_id.as_deref()
    }

    /// The invoking user, from guild or DM context.
    pub fn user(&self) -> Option<&User> {
        self.payload.user()
    }

    pub fn data(&self) -> Option<&CommandData> {
        self.payload.data.as_ref()
    }

    /// Creation time derived from the interaction's snowflake id.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether a reply or deferral has been issued.
    pub fn replied(&self) -> bool {
        self.replied.load(Ordering::SeqCst)
    }

    /// Replies to the interaction with a message.
    ///
    /// # Errors
    /// `ForgeError::AlreadyReplied` if a reply or deferral was already
    /// issued; raised synchronously, before any network call.
    pub async fn reply(&self, content: impl Into<ReplyContent>) -> Result<()> {
        self.claim_reply()?;

        let data = match content.into() {
            ReplyContent::Text(content) => json!({ "content": content }),
            ReplyContent::Rich(rich) => {
                let mut flags = MessageFlags::default();
                if rich.suppress_embeds {
                    flags |= MessageFlags::SUPPRESS_EMBEDS;
                }
                if rich.ephemeral {
                    flags |= MessageFlags::EPHEMERAL;
                }
                if rich.suppress_notifications {
                    flags |= MessageFlags::SUPPRESS_NOTIFICATIONS;
                }
                json!({
                    "content": rich.content,
                    "tts": rich.tts,
                    "flags": flags.bits(),
                })
            }
        };

        let body = json!({
            "type": response_type::CHANNEL_MESSAGE_WITH_SOURCE,
            "data": data,
        });
        self.api
            .request(Method::POST, &self.callback_endpoint(), Some(&body))
            .await?;
        Ok(())
    }

    /// Defers the interaction without sending a message.
    pub async fn defer(&self, ephemeral: bool) -> Result<()> {
        self.claim_reply()?;

        let flags = if ephemeral {
            MessageFlags::EPHEMERAL.bits()
        } else {
            0
        };
        let body = json!({
            "type": response_type::DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE,
            "data": { "flags": flags },
        });
        self.api
            .request(Method::POST, &self.callback_endpoint(), Some(&body))
            .await?;
        Ok(())
    }

    /// Fetches the reply message, or `None` when nothing was sent yet.
    pub async fn get_reply(&self) -> Result<Option<ReplyMessage>> {
        if !self.replied() {
            return Ok(None);
        }

        let value = self
            .api
            .request(Method::GET, &self.original_endpoint(), None)
            .await?
            .ok_or_else(|| ForgeError::RemoteApi("Empty reply message body".to_string()))?;
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Edits the reply message.
    ///
    /// # Errors
    /// `ForgeError::NotReplied` if no reply or deferral was issued yet.
    pub async fn edit_reply(&self, content: impl Into<String>) -> Result<ReplyMessage> {
        if !self.replied() {
            return Err(ForgeError::NotReplied);
        }

        let body = json!({ "content": content.into() });
        let value = self
            .api
            .request(Method::PATCH, &self.original_endpoint(), Some(&body))
            .await?
            .ok_or_else(|| ForgeError::RemoteApi("Empty reply message body".to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Deletes the reply message.
    pub async fn delete_reply(&self) -> Result<()> {
        if !self.replied() {
            return Err(ForgeError::NotReplied);
        }

        self.api
            .request(Method::DELETE, &self.original_endpoint(), None)
            .await?;
        Ok(())
    }

    /// Marks the interaction replied. Errors when it already was.
    fn claim_reply(&self) -> Result<()> {
        if self.replied.swap(true, Ordering::SeqCst) {
            return Err(ForgeError::AlreadyReplied);
        }
        Ok(())
    }

    fn callback_endpoint(&self) -> String {
        format!(
            "interactions/{}/{}/callback",
            self.payload.id, self.payload.token
        )
    }

    fn original_endpoint(&self) -> String {
        format!(
            "webhooks/{}/{}/messages/@original",
            self.payload.application_id, self.payload.token
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_with_id(id: &str) -> InteractionPayload {
        serde_json::from_value(json!({
            "id": id,
            "application_id": "42",
            "type": 2,
            "token": "tok",
        }))
        .unwrap()
    }

    fn unroutable_interaction() -> SlashCommandInteraction {
        let api = DiscordApi::new("token", "42").with_base_url("http://127.0.0.1:9");
        SlashCommandInteraction::new(payload_with_id("846462639134605312"), Arc::new(api))
    }

    #[test]
    fn test_snowflake_timestamp() {
        // (ms - epoch) << 22, for 2021-05-03T00:00:00Z.
        let ms: u64 = 1_620_000_000_000;
        let snowflake = ((ms - DISCORD_EPOCH_MS) << 22).to_string();
        let ts = snowflake_timestamp(&snowflake).unwrap();
        assert_eq!(ts.timestamp_millis(), ms as i64);
    }

    #[test]
    fn test_snowflake_timestamp_invalid_id() {
        assert!(snowflake_timestamp("not-a-number").is_none());
    }

    #[tokio::test]
    async fn test_double_reply_raises_without_second_call() {
        let interaction = unroutable_interaction();

        // First reply claims the interaction even though the network call
        // cannot succeed against the unroutable stub.
        let first = interaction.reply("hello").await;
        assert!(matches!(first, Err(ForgeError::Http(_))));
        assert!(interaction.replied());

        // The second reply fails synchronously on the guard, not on the
        // network.
        let second = interaction.reply("again").await;
        assert!(matches!(second, Err(ForgeError::AlreadyReplied)));
    }

    #[tokio::test]
    async fn test_defer_after_reply_raises() {
        let interaction = unroutable_interaction();
        let _ = interaction.reply("hello").await;

        let result = interaction.defer(false).await;
        assert!(matches!(result, Err(ForgeError::AlreadyReplied)));
    }

    #[tokio::test]
    async fn test_edit_and_delete_before_reply_raise() {
        let interaction = unroutable_interaction();

        assert!(matches!(
            interaction.edit_reply("x").await,
            Err(ForgeError::NotReplied)
        ));
        assert!(matches!(
            interaction.delete_reply().await,
            Err(ForgeError::NotReplied)
        ));
    }

    #[tokio::test]
    async fn test_get_reply_before_reply_is_none() {
        let interaction = unroutable_interaction();
        assert!(interaction.get_reply().await.unwrap().is_none());
    }
}
