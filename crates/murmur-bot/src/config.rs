use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

/// Process configuration, read from the environment once at startup.
/// The bot token itself is consumed by `Bot::from_env` (`TELOXIDE_TOKEN`).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// The one user allowed to run the administrative wipe. Unset means the
    /// wipe is disabled entirely.
    pub admin_id: Option<i64>,
    /// How long a pending compose target stays valid.
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var("MURMUR_DB_PATH")
            .unwrap_or_else(|_| "murmur.db".into())
            .into();

        let admin_id = match std::env::var("MURMUR_ADMIN_ID") {
            Ok(raw) => Some(
                raw.parse::<i64>()
                    .context("MURMUR_ADMIN_ID must be a numeric Telegram user id")?,
            ),
            Err(_) => {
                warn!("MURMUR_ADMIN_ID not set; /cleardb is disabled");
                None
            }
        };

        let ttl_secs: u64 = std::env::var("MURMUR_SESSION_TTL_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .context("MURMUR_SESSION_TTL_SECS must be a number of seconds")?;

        Ok(Self {
            db_path,
            admin_id,
            session_ttl: Duration::from_secs(ttl_secs),
        })
    }
}
