//! Discord REST API client.
//!
//! Thin wrapper over `reqwest` for the v10 REST API: bot-token auth, a fixed
//! User-Agent, JSON in/out, and error mapping that preserves the HTTP status
//! and response body for diagnosis.

use reqwest::Method;
use serde_json::Value;
use tracing::info;

use crate::error::{ForgeError, Result};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const USER_AGENT: &str = "DiscordBot (https://github.com/slashforge/slashforge, 0.2)";

/// Client for the Discord REST API.
#[derive(Debug, Clone)]
pub struct DiscordApi {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    client_id: String,
}

impl DiscordApi {
    /// Creates a client with the given bot credential and application
    /// client id.
    pub fn new(bot_token: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DISCORD_API_BASE.to_string(),
            bot_token: bot_token.into(),
            client_id: client_id.into(),
        }
    }

    /// Overrides the API base URL. Intended for tests against a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Issues one API request.
    ///
    /// # Returns
    /// The decoded JSON body, or `None` for 204/empty responses.
    ///
    /// # Errors
    /// `ForgeError::RemoteApi` for any non-success status, carrying the
    /// status and response body.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut request = self
            .client
            .request(method, &url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json");
        if !self.bot_token.is_empty() {
            request = request.header("Authorization", format!("Bot {}", self.bot_token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ForgeError::RemoteApi(format!(
                "HTTP {} from {}: {}",
                status, endpoint, text
            )));
        }

        if status == reqwest::StatusCode::NO_CONTENT || text.is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&text)?;
        Ok(Some(value))
    }

    /// Bulk-overwrites the application's global command set.
    ///
    /// A non-success response is fatal for startup and carries the remote
    /// error body.
    pub async fn register_commands(&self, commands: &[Value]) -> Result<()> {
        if self.bot_token.is_empty() || self.client_id.is_empty() {
            return Err(ForgeError::Config(
                "No bot token or client id provided for command registration".to_string(),
            ));
        }

        let endpoint = format!("applications/{}/commands", self.client_id);
        self.request(Method::PUT, &endpoint, Some(&Value::Array(commands.to_vec())))
            .await?;

        info!(commands = commands.len(), "Posted command registrations");
        Ok(())
    }
}
