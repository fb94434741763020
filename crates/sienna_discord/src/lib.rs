//! Direct-message delivery over the Discord REST API.

pub mod api;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sienna_core::config::DiscordConfig;
use sienna_core::Messenger;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::api::{split_content, Channel, CreateDmRequest, CreateMessageRequest, RateLimited, MAX_MESSAGE_CHARS};

pub struct DiscordMessenger {
    api_base: String,
    token: String,
    client: reqwest::Client,
    /// user id -> DM channel id
    channels: RwLock<HashMap<String, String>>,
}

impl DiscordMessenger {
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &DiscordConfig) -> Self {
        Self::new(&config.api_base, &config.token)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Open (or reuse) the DM channel with `user_id`.
    pub async fn dm_channel(&self, user_id: &str) -> Result<String> {
        if let Some(id) = self.channels.read().await.get(user_id) {
            return Ok(id.clone());
        }

        let url = format!("{}/users/@me/channels", self.api_base);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&CreateDmRequest { recipient_id: user_id })
            .send()
            .await
            .context("Failed to reach Discord")?;
        let resp = check_status(resp).await.with_context(|| format!("Cannot open DM with {}", user_id))?;
        let channel: Channel = resp.json().await.context("Unexpected DM channel payload")?;

        self.channels
            .write()
            .await
            .insert(user_id.to_string(), channel.id.clone());
        Ok(channel.id)
    }

    /// Post one message to a channel. Content over the Discord limit is sent
    /// as several consecutive messages.
    pub async fn post_message(&self, channel_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        for chunk in split_content(content, MAX_MESSAGE_CHARS) {
            let resp = self
                .client
                .post(&url)
                .header("Authorization", self.auth())
                .json(&CreateMessageRequest { content: &chunk })
                .send()
                .await
                .context("Failed to reach Discord")?;
            check_status(resp).await?;
        }
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let body: Option<RateLimited> = resp.json().await.ok();
        let retry = body.map(|b| b.retry_after).unwrap_or_default();
        anyhow::bail!("Discord rate limited the request (retry after {:.1}s)", retry);
    }
    let body = resp.text().await.unwrap_or_default();
    anyhow::bail!("Discord returned {}: {}", status, body.chars().take(200).collect::<String>())
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send(&self, user_id: &str, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let channel = self.dm_channel(user_id).await?;
        if let Err(e) = self.post_message(&channel, text).await {
            // The cached channel may be stale; open a fresh one next time.
            self.channels.write().await.remove(user_id);
            return Err(e);
        }
        tracing::debug!("Sent DM to {} ({} chars)", user_id, text.chars().count());
        Ok(())
    }
}
