//! Bot configuration.
//!
//! Loaded from environment variables prefixed `TOPBOT`, with `__` separating
//! nested keys (`TOPBOT__TELEGRAM__API_ID`, `TOPBOT__SCAN__MAX_LIMIT`). A `.env`
//! file in the working directory is read first if present.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::scanner::score::ReactionSelector;

const APP_DIR: &str = "telegram-top-bot";

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub paging: PagingSettings,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// Credentials for the two accounts the bot runs: the bot itself, which
/// receives commands and answers them, and a user account, which reads
/// channel history (bots can't).
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSettings {
    pub api_id: i32,
    pub api_hash: String,
    pub bot_token: String,
    /// Phone number of the reading account, in international format.
    pub phone: String,
    /// 2FA password of the reading account. Prompted for when unset.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub session_path: Option<PathBuf>,
    #[serde(default)]
    pub user_session_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Messages scanned when `/top` carries no limit.
    pub default_limit: usize,
    /// Larger requested limits are clamped to this.
    pub max_limit: usize,
    pub batch_size: usize,
    /// Scoring operations in flight per batch.
    pub concurrency: usize,
    /// Progress is reported after this many batches.
    pub progress_every_batches: usize,
    pub progress_pause_ms: u64,
    /// Length of the ranked result set.
    pub top_n: usize,
    /// `*` for all reactions, an emoji, or a custom emoji id.
    pub reaction: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 500,
            batch_size: 100,
            concurrency: 20,
            progress_every_batches: 1,
            progress_pause_ms: 300,
            top_n: 50,
            reaction: "*".to_string(),
        }
    }
}

impl ScanSettings {
    pub fn progress_pause(&self) -> Duration {
        Duration::from_millis(self.progress_pause_ms)
    }

    pub fn selector(&self) -> ReactionSelector {
        ReactionSelector::parse(&self.reaction)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagingSettings {
    pub page_size: usize,
    pub max_sessions: usize,
    pub session_ttl_secs: u64,
}

impl Default for PagingSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_sessions: 1000,
            session_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl PagingSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Load(config::ConfigError),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(e) => write!(f, "failed to load configuration: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Load(e)
    }
}

impl BotConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: BotConfig = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TOPBOT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.telegram.api_id <= 0 {
            return invalid("telegram.api_id must be positive");
        }
        if self.telegram.api_hash.trim().is_empty() {
            return invalid("telegram.api_hash is empty");
        }
        if self.telegram.bot_token.trim().is_empty() {
            return invalid("telegram.bot_token is empty");
        }
        let phone = self.telegram.phone.trim().trim_start_matches('+');
        if phone.is_empty() || !phone.chars().all(|c| c.is_ascii_digit()) {
            return invalid("telegram.phone must be a phone number like +15551234567");
        }

        let scan = &self.scan;
        if scan.batch_size == 0 || scan.concurrency == 0 || scan.progress_every_batches == 0 {
            return invalid("scan batch_size, concurrency and progress_every_batches must be > 0");
        }
        if scan.default_limit == 0 || scan.default_limit > scan.max_limit {
            return invalid("scan.default_limit must be in 1..=max_limit");
        }
        if scan.top_n == 0 {
            return invalid("scan.top_n must be > 0");
        }

        if self.paging.page_size == 0 || self.paging.max_sessions == 0 {
            return invalid("paging page_size and max_sessions must be > 0");
        }
        Ok(())
    }

    pub fn session_path(&self) -> PathBuf {
        self.telegram
            .session_path
            .clone()
            .unwrap_or_else(|| data_dir().join("bot.session"))
    }

    pub fn user_session_path(&self) -> PathBuf {
        self.telegram
            .user_session_path
            .clone()
            .unwrap_or_else(|| data_dir().join("user.session"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("logs"))
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BotConfig {
        BotConfig {
            telegram: TelegramSettings {
                api_id: 12345,
                api_hash: "abcdef".to_string(),
                bot_token: "1:token".to_string(),
                phone: "+15551234567".to_string(),
                password: None,
                session_path: None,
                user_session_path: None,
            },
            scan: ScanSettings::default(),
            paging: PagingSettings::default(),
            log_dir: None,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let scan = ScanSettings::default();
        assert_eq!(scan.default_limit, 100);
        assert_eq!(scan.max_limit, 500);
        assert_eq!(scan.batch_size, 100);
        assert_eq!(scan.concurrency, 20);
        assert_eq!(scan.top_n, 50);
        assert_eq!(scan.selector(), ReactionSelector::All);
        assert_eq!(PagingSettings::default().page_size, 10);
    }

    #[test]
    fn test_empty_token_rejected() {
        let mut cfg = valid();
        cfg.telegram.bot_token = "  ".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_phone_required() {
        let mut cfg = valid();
        cfg.telegram.phone = String::new();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
        cfg.telegram.phone = "+1 555 CALL".to_string();
        assert!(cfg.validate().is_err());
        cfg.telegram.phone = "15551234567".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut cfg = valid();
        cfg.scan.batch_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_default_limit_above_max_rejected() {
        let mut cfg = valid();
        cfg.scan.default_limit = 1000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_default_paths() {
        let cfg = valid();
        assert!(cfg.session_path().to_string_lossy().contains(APP_DIR));
        assert_ne!(cfg.session_path(), cfg.user_session_path());
        assert!(cfg.log_dir().ends_with("logs"));
    }
}
