// Discord REST notifier
// Posts the announcement as the bot user, then adds the configured reactions.

use crate::catalog::load_catalog;
use crate::config::NotifierConfig;
use crate::errors::NotifyError;
use crate::notifier::{read_shop, Announcement, Delivery, Notifier};
use crate::secrets::{DiscordSecrets, DISCORD_BOT_TOKEN_ENV, DISCORD_CHANNEL_ID_ENV};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Attempts per reaction, counting the first
const MAX_REACTION_ATTEMPTS: u32 = 3;
/// Wait used when a 429 carries no usable hint
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);
/// Longest wait honoured before giving up on a reaction
const MAX_RETRY_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

/// Wait requested by a 429 response: the JSON `retry_after` field, then the
/// `Retry-After` header, both in seconds
fn retry_after(headers: &HeaderMap, body: &str) -> Duration {
    let from_body = serde_json::from_str::<RateLimited>(body)
        .ok()
        .map(|r| r.retry_after);
    let from_header = || {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
    };
    from_body
        .or_else(from_header)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

pub struct DiscordNotifier {
    client: Client,
    api_base_url: String,
    headline: String,
    reactions: Vec<String>,
    catalog_path: PathBuf,
    secrets: DiscordSecrets,
}

impl DiscordNotifier {
    pub fn new(
        config: &NotifierConfig,
        catalog_path: impl Into<PathBuf>,
        secrets: DiscordSecrets,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("egg-shop-publisher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            headline: config.headline.clone(),
            reactions: config.reactions.clone(),
            catalog_path: catalog_path.into(),
            secrets,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, NotifyError> {
        let mut url = Url::parse(&self.api_base_url)
            .map_err(|e| NotifyError::Http(format!("Invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| NotifyError::Http("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn credentials(&self) -> Result<(&str, &str), NotifyError> {
        let token = self
            .secrets
            .bot_token
            .as_deref()
            .ok_or(NotifyError::MissingSecret(DISCORD_BOT_TOKEN_ENV))?;
        let channel = self
            .secrets
            .channel_id
            .as_deref()
            .ok_or(NotifyError::MissingSecret(DISCORD_CHANNEL_ID_ENV))?;
        if channel.is_empty() || !channel.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NotifyError::InvalidChannelId(channel.to_string()));
        }
        Ok((token, channel))
    }

    /// Post the announcement and return the created message id
    #[instrument(skip(self, token, announcement))]
    async fn post_message(
        &self,
        token: &str,
        channel: &str,
        announcement: &Announcement,
    ) -> Result<String, NotifyError> {
        let url = self.endpoint(&["channels", channel, "messages"])?;
        let body = json!({
            "content": announcement.content,
            "allowed_mentions": {
                "parse": [],
                "roles": announcement.role_ids,
            },
        });

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bot {}", token))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(NotifyError::ChannelNotFound(channel.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedMessage = response.json().await?;
        Ok(created.id)
    }

    async fn add_reaction(
        &self,
        token: &str,
        channel: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), NotifyError> {
        let url = self.endpoint(&[
            "channels",
            channel,
            "messages",
            message_id,
            "reactions",
            emoji,
            "@me",
        ])?;

        let mut attempt = 1;
        loop {
            let response = self
                .client
                .put(url.clone())
                .header("Authorization", format!("Bot {}", token))
                .header("Content-Length", "0")
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();

            // Reactions share a tight per-route limit, so back-to-back PUTs
            // routinely see 429 on the second emoji
            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_REACTION_ATTEMPTS {
                let wait = retry_after(&headers, &body);
                if wait <= MAX_RETRY_AFTER {
                    debug!(
                        emoji = %emoji,
                        attempt = attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Reaction rate limited; retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                    continue;
                }
            }

            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    #[instrument(skip(self))]
    async fn notify(&self, artifact: &Path) -> Result<Delivery, NotifyError> {
        let (token, channel) = self.credentials()?;
        let catalog = load_catalog(&self.catalog_path)?;
        let shop = read_shop(artifact).await?;

        let announcement = Announcement::build(&self.headline, &shop.shop, &catalog, &self.secrets);
        debug!(content = %announcement.content, "Announcement built");

        let message_id = self.post_message(token, channel, &announcement).await?;
        info!(
            channel_id = channel,
            message_id = %message_id,
            eggs = shop.shop.len(),
            mentions = announcement.role_ids.len(),
            "Shop announced"
        );

        // The announcement is already out; a missing reaction is not worth failing the run
        for emoji in &self.reactions {
            if let Err(e) = self.add_reaction(token, channel, &message_id, emoji).await {
                warn!(emoji = %emoji, error = %e, "Failed to add reaction");
            }
        }

        Ok(Delivery {
            message_id: Some(message_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::Secrets;

    fn notifier(base: &str, secrets: DiscordSecrets) -> DiscordNotifier {
        let config = NotifierConfig {
            api_base_url: base.to_string(),
            ..Default::default()
        };
        DiscordNotifier::new(&config, "eggs.csv", secrets).unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let n = notifier("https://discord.com/api/v10/", Default::default());
        let url = n.endpoint(&["channels", "42", "messages"]).unwrap();
        assert_eq!(url.as_str(), "https://discord.com/api/v10/channels/42/messages");
    }

    #[test]
    fn test_endpoint_encodes_emoji() {
        let n = notifier("https://discord.com/api/v10", Default::default());
        let url = n
            .endpoint(&["channels", "1", "messages", "2", "reactions", "🥳", "@me"])
            .unwrap();
        assert!(url.as_str().ends_with("/reactions/%F0%9F%A5%B3/@me"));
    }

    #[test]
    fn test_retry_after_prefers_body() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "3".parse().unwrap());
        assert_eq!(
            retry_after(&headers, r#"{"message":"You are being rate limited.","retry_after":0.25,"global":false}"#),
            Duration::from_millis(250)
        );
        assert_eq!(retry_after(&headers, ""), Duration::from_secs(3));
        assert_eq!(retry_after(&HeaderMap::new(), "not json"), DEFAULT_RETRY_AFTER);
        assert_eq!(
            retry_after(&HeaderMap::new(), r#"{"retry_after":-1}"#),
            DEFAULT_RETRY_AFTER
        );
    }

    #[test]
    fn test_missing_token_reported() {
        let n = notifier("https://discord.com/api/v10", Default::default());
        assert!(matches!(
            n.credentials(),
            Err(NotifyError::MissingSecret(DISCORD_BOT_TOKEN_ENV))
        ));
    }

    #[test]
    fn test_non_numeric_channel_rejected() {
        let secrets =
            Secrets::from_vars([("DISCORD_BOT_TOKEN", "t"), ("DISCORD_CHANNEL_ID", "general")]);
        let n = notifier("https://discord.com/api/v10", secrets.discord);
        assert!(matches!(
            n.credentials(),
            Err(NotifyError::InvalidChannelId(_))
        ));
    }
}
