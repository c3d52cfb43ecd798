//! Configuration module.
//!
//! `Config` is read once from the environment at startup. `RuntimeSettings`
//! holds the switches owners flip while the bot runs.

mod settings;

pub use settings::RuntimeSettings;

use std::env;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

use crate::modes::tick_delay_from_secs;

/// Bot running mode
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

impl BotMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "webhook" => Self::Webhook,
            _ => Self::Polling,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Owner user IDs (comma-separated).
    /// Owners have every permission and receive monitor forwards.
    pub owner_ids: Vec<u64>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Initial delay between loop sends.
    pub tick_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails if a required variable is missing or a value is malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        let bot_mode = BotMode::parse(&env::var("BOT_MODE").unwrap_or_default());
        let webhook_url = non_empty_var("WEBHOOK_URL");

        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            bail!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        let webhook_port = match non_empty_var("WEBHOOK_PORT") {
            Some(port) => port.parse().context("WEBHOOK_PORT must be a port number")?,
            None => 8443,
        };

        let tick_delay = match non_empty_var("TICK_DELAY_SECS") {
            Some(secs) => parse_delay(&secs)?,
            None => Duration::from_secs(1),
        };

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN must be set")?,
            bot_mode,
            webhook_url,
            webhook_port,
            webhook_secret: non_empty_var("WEBHOOK_SECRET"),
            owner_ids: parse_owner_ids(&env::var("OWNER_IDS").unwrap_or_default()),
            mongodb_uri: env::var("MONGODB_URI").context("MONGODB_URI must be set")?,
            mongodb_database: non_empty_var("MONGODB_DATABASE")
                .unwrap_or_else(|| "loopbot".to_string()),
            tick_delay,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Parse a comma-separated id list, ignoring junk entries.
fn parse_owner_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect()
}

fn parse_delay(raw: &str) -> anyhow::Result<Duration> {
    let secs: f64 = raw.trim().parse().context("TICK_DELAY_SECS must be a number")?;
    tick_delay_from_secs(secs).map_err(|e| anyhow!("TICK_DELAY_SECS: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_ids() {
        assert_eq!(parse_owner_ids("1, 2,x,,3"), vec![1, 2, 3]);
        assert!(parse_owner_ids("").is_empty());
    }

    #[test]
    fn test_bot_mode_parse() {
        assert_eq!(BotMode::parse("WEBHOOK"), BotMode::Webhook);
        assert_eq!(BotMode::parse(""), BotMode::Polling);
        assert_eq!(BotMode::parse("other"), BotMode::Polling);
    }

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_delay("0.25").unwrap(), Duration::from_millis(250));
        assert!(parse_delay("0").is_err());
        assert!(parse_delay("fast").is_err());
    }

    #[test]
    fn test_parse_delay_rejects_out_of_range() {
        assert!(parse_delay("0.0004").is_err());
        assert!(parse_delay("1e30").is_err());
        assert!(parse_delay("inf").is_err());
        assert_eq!(parse_delay("3600").unwrap(), Duration::from_secs(3600));
    }
}
