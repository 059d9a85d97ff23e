// Secret inputs read from the environment
//
// Kept apart from Settings so they never pass through config files or get
// logged. Debug output is redacted.

use std::collections::BTreeMap;
use std::fmt;

pub const REPO_TOKEN_ENV: &str = "REPO_ACCESS_TOKEN";
pub const SECRET_KEY_ENV: &str = "SHOP_SECRET_KEY";
pub const DISCORD_BOT_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";
pub const DISCORD_CHANNEL_ID_ENV: &str = "DISCORD_CHANNEL_ID";
/// Prefix of per-egg role overrides, e.g. `DISCORD_ROLE_LEGENDARY`
pub const DISCORD_ROLE_PREFIX: &str = "DISCORD_ROLE_";

#[derive(Clone, Default)]
pub struct Secrets {
    pub repo_token: Option<String>,
    pub secret_key: Option<String>,
    pub discord: DiscordSecrets,
}

#[derive(Clone, Default)]
pub struct DiscordSecrets {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    /// Role ids keyed by lowercased egg name
    pub role_ids: BTreeMap<String, String>,
}

impl DiscordSecrets {
    /// Role override for an egg, matched case-insensitively
    pub fn role_for(&self, egg: &str) -> Option<&str> {
        self.role_ids.get(&egg.to_lowercase()).map(String::as_str)
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs; blank values count as unset
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut secrets = Secrets::default();
        for (key, value) in vars {
            let value: String = value.into();
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                REPO_TOKEN_ENV => secrets.repo_token = Some(value),
                SECRET_KEY_ENV => secrets.secret_key = Some(value),
                DISCORD_BOT_TOKEN_ENV => secrets.discord.bot_token = Some(value),
                DISCORD_CHANNEL_ID_ENV => secrets.discord.channel_id = Some(value),
                key => {
                    if let Some(egg) = key.strip_prefix(DISCORD_ROLE_PREFIX) {
                        if !egg.is_empty() {
                            secrets.discord.role_ids.insert(egg.to_lowercase(), value);
                        }
                    }
                }
            }
        }
        secrets
    }
}

fn mask(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("repo_token", &mask(&self.repo_token))
            .field("secret_key", &mask(&self.secret_key))
            .field("discord", &self.discord)
            .finish()
    }
}

impl fmt::Debug for DiscordSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordSecrets")
            .field("bot_token", &mask(&self.bot_token))
            .field("channel_id", &self.channel_id)
            .field("roles", &self.role_ids.keys().collect::<Vec<_>>())
            .finish()
    }
}
