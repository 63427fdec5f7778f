use std::time::Duration;

use anyhow::{Context, Result, bail};

use jukebox_mailer::{MailSettings, RetryPolicy};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub web_path: String,
    pub mail: MailSettings,
    /// Unset means mail is written to the log instead of relayed.
    pub mail_relay_url: Option<String>,
    pub mail_retry: RetryPolicy,
}

impl Config {
    /// Read `JUKEBOX_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("JUKEBOX_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("JUKEBOX_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = get("JUKEBOX_PORT", "3000")
            .parse()
            .context("JUKEBOX_PORT must be a port number")?;

        let max_attempts: u32 = get("JUKEBOX_MAIL_MAX_ATTEMPTS", "3")
            .parse()
            .context("JUKEBOX_MAIL_MAX_ATTEMPTS must be a number")?;
        let retry_base_ms: u64 = get("JUKEBOX_MAIL_RETRY_BASE_MS", "500")
            .parse()
            .context("JUKEBOX_MAIL_RETRY_BASE_MS must be a number")?;

        let mail_defaults = MailSettings::default();

        Ok(Self {
            host: get("JUKEBOX_HOST", "0.0.0.0"),
            port,
            db_path: get("JUKEBOX_DB_PATH", "jukebox.db"),
            jwt_secret,
            web_path: get("JUKEBOX_WEB_PATH", &format!("http://localhost:{port}")),
            mail: MailSettings {
                enabled: parse_flag(&get("JUKEBOX_MAIL_ENABLE", "false")),
                from: get("JUKEBOX_MAIL_FROM", &mail_defaults.from),
                from_name: get("JUKEBOX_MAIL_FROM_NAME", &mail_defaults.from_name),
            },
            mail_relay_url: lookup("JUKEBOX_MAIL_RELAY_URL").filter(|u| !u.trim().is_empty()),
            mail_retry: RetryPolicy {
                max_attempts: max_attempts.max(1),
                base_delay: Duration::from_millis(retry_base_ms),
            },
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
