//! Bot configuration, loaded from `~/.config/reelvault/config.toml`.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::caption::DEFAULT_CAPTION_TEMPLATE;
use crate::metadata::MetadataConfig;
use crate::replication::RetryPolicy;
use crate::transport::TelegramConfig;

pub const ENV_BOT_TOKEN: &str = "REELVAULT_BOT_TOKEN";
pub const ENV_CANONICAL_CHANNEL: &str = "REELVAULT_CANONICAL_CHANNEL";
pub const ENV_ANNOUNCE_CHANNEL: &str = "REELVAULT_ANNOUNCE_CHANNEL";
pub const ENV_TMDB_API_KEY: &str = "REELVAULT_TMDB_API_KEY";
pub const ENV_OMDB_API_KEY: &str = "REELVAULT_OMDB_API_KEY";

const DEFAULT_CHUNK_SIZE: usize = 200;
const DEFAULT_RATE_LIMIT_RETRIES: u32 = 1;
const DEFAULT_MAX_RATE_LIMIT_WAIT_SECS: u64 = 120;
const DEFAULT_RELAY_DELAY_MS: u64 = 500;
const DEFAULT_PRIVATE_THRESHOLD: f64 = 0.85;
const DEFAULT_GROUP_THRESHOLD: f64 = 0.90;
const DEFAULT_CANDIDATE_THRESHOLD: f64 = 0.60;
const DEFAULT_MAX_RESULTS: usize = 10;
/// Upper bound for `replication.chunk_size`.
const MAX_CHUNK_SIZE: usize = 200;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// User ids allowed to run admin commands.
    #[serde(default)]
    pub admins: Vec<i64>,
    #[serde(default)]
    pub replication: ReplicationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// TMDB/OMDb lookup for `/newseries`. Off unless a key is set.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Channel every replicated message is copied into.
    #[serde(default)]
    pub canonical_channel_id: Option<i64>,
    #[serde(default)]
    pub announcement_channel_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,
    #[serde(default = "default_max_rate_limit_wait_secs")]
    pub max_rate_limit_wait_secs: u64,
    /// Pause between messages relayed to a user.
    #[serde(default = "default_relay_delay_ms")]
    pub relay_delay_ms: u64,
    #[serde(default = "default_caption_template")]
    pub default_caption_template: String,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            rate_limit_retries: default_rate_limit_retries(),
            max_rate_limit_wait_secs: default_max_rate_limit_wait_secs(),
            relay_delay_ms: default_relay_delay_ms(),
            default_caption_template: default_caption_template(),
        }
    }
}

impl ReplicationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.rate_limit_retries, self.max_rate_limit_wait_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Abandoned sessions expire after this many seconds. Unset keeps them forever.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Score at which a private-chat query opens the series directly.
    #[serde(default = "default_private_threshold")]
    pub private_threshold: f64,
    /// Stricter direct-open score for group chats.
    #[serde(default = "default_group_threshold")]
    pub group_threshold: f64,
    /// Score at which the best title is offered among the results.
    #[serde(default = "default_candidate_threshold")]
    pub candidate_threshold: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            private_threshold: default_private_threshold(),
            group_threshold: default_group_threshold(),
            candidate_threshold: default_candidate_threshold(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_rate_limit_retries() -> u32 {
    DEFAULT_RATE_LIMIT_RETRIES
}

fn default_max_rate_limit_wait_secs() -> u64 {
    DEFAULT_MAX_RATE_LIMIT_WAIT_SECS
}

fn default_relay_delay_ms() -> u64 {
    DEFAULT_RELAY_DELAY_MS
}

fn default_caption_template() -> String {
    DEFAULT_CAPTION_TEMPLATE.to_string()
}

fn default_private_threshold() -> f64 {
    DEFAULT_PRIVATE_THRESHOLD
}

fn default_group_threshold() -> f64 {
    DEFAULT_GROUP_THRESHOLD
}

fn default_candidate_threshold() -> f64 {
    DEFAULT_CANDIDATE_THRESHOLD
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl BotConfig {
    /// `~/.config/reelvault/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelvault")
            .join("config.toml")
    }

    /// Database file used when `storage.db_path` is unset.
    pub fn default_db_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelvault")
            .join("reelvault.db")
    }

    /// Load from `path`, or the default location. A missing default file
    /// yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.with_env_overrides())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `REELVAULT_*` environment variables over the file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(token) = env_value(ENV_BOT_TOKEN) {
            self.telegram.bot_token = token;
        }
        if let Some(id) = env_value(ENV_CANONICAL_CHANNEL).and_then(|v| v.parse().ok()) {
            self.channels.canonical_channel_id = Some(id);
        }
        if let Some(id) = env_value(ENV_ANNOUNCE_CHANNEL).and_then(|v| v.parse().ok()) {
            self.channels.announcement_channel_id = Some(id);
        }
        if let Some(key) = env_value(ENV_TMDB_API_KEY) {
            self.metadata.tmdb_api_key = Some(key);
        }
        if let Some(key) = env_value(ENV_OMDB_API_KEY) {
            self.metadata.omdb_api_key = Some(key);
        }
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage
            .db_path
            .clone()
            .unwrap_or_else(Self::default_db_path)
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }

    /// Check everything the bot runtime needs.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token is not set (or set {})", ENV_BOT_TOKEN);
        }
        if self
            .telegram
            .bot_username
            .as_deref()
            .is_none_or(|name| name.trim().is_empty())
        {
            bail!("telegram.bot_username is required to build deep links");
        }
        if self.telegram.inspection_chat_id.is_none() {
            bail!("telegram.inspection_chat_id is required to read source messages");
        }
        match self.channels.canonical_channel_id {
            None => bail!(
                "channels.canonical_channel_id is not set (or set {})",
                ENV_CANONICAL_CHANNEL
            ),
            // Range links carry the channel without its sign.
            Some(id) if id >= 0 => bail!(
                "channels.canonical_channel_id must be a channel id (-100...), got {}",
                id
            ),
            Some(_) => {}
        }
        if self.admins.is_empty() {
            bail!("admins must list at least one user id");
        }
        self.replication.validate()?;
        self.search.validate()
    }
}

impl ReplicationConfig {
    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            bail!(
                "replication.chunk_size must be between 1 and {}",
                MAX_CHUNK_SIZE
            );
        }
        Ok(())
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("private_threshold", self.private_threshold),
            ("group_threshold", self.group_threshold),
            ("candidate_threshold", self.candidate_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("search.{} must be between 0 and 1", name);
            }
        }
        if self.candidate_threshold > self.private_threshold {
            bail!("search.candidate_threshold must not exceed private_threshold");
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
admins = [42]

[telegram]
bot_token = "123:abc"
bot_username = "reelvault_bot"
polling_timeout_secs = 20
inspection_chat_id = 42

[channels]
canonical_channel_id = -1001234567890
announcement_channel_id = -1009876543210

[replication]
chunk_size = 100

[session]
ttl_secs = 900

[search]
group_threshold = 0.95

[metadata]
omdb_api_key = "omdb"
"#;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.replication.chunk_size, 200);
        assert_eq!(config.replication.rate_limit_retries, 1);
        assert_eq!(config.replication.max_rate_limit_wait_secs, 120);
        assert_eq!(config.replication.relay_delay_ms, 500);
        assert_eq!(
            config.replication.default_caption_template,
            "<code>{filename}</code>"
        );
        assert_eq!(config.search.private_threshold, 0.85);
        assert_eq!(config.search.group_threshold, 0.90);
        assert_eq!(config.search.candidate_threshold, 0.60);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.session.ttl_secs, None);
        assert!(!config.metadata.is_enabled());
    }

    #[test]
    fn test_parse_partial_sections() {
        let config = BotConfig::from_toml(FULL).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.polling_timeout, 20);
        assert_eq!(config.channels.canonical_channel_id, Some(-1001234567890));
        assert_eq!(config.replication.chunk_size, 100);
        assert_eq!(config.replication.rate_limit_retries, 1);
        assert_eq!(config.session.ttl_secs, Some(900));
        assert_eq!(config.search.group_threshold, 0.95);
        assert_eq!(config.search.private_threshold, 0.85);
        assert_eq!(config.metadata.omdb_api_key.as_deref(), Some("omdb"));
        assert!(config.metadata.is_enabled());
        assert!(config.is_admin(42));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_missing_pieces() {
        let mut config = BotConfig::from_toml(FULL).unwrap();
        config.channels.canonical_channel_id = None;
        assert!(config.validate().is_err());

        let mut config = BotConfig::from_toml(FULL).unwrap();
        config.channels.canonical_channel_id = Some(1001234567890);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("-100"));

        let mut config = BotConfig::from_toml(FULL).unwrap();
        config.replication.chunk_size = 500;
        assert!(config.validate().is_err());

        let mut config = BotConfig::from_toml(FULL).unwrap();
        config.search.candidate_threshold = 0.95;
        assert!(config.validate().is_err());

        assert!(BotConfig::default().validate().is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, FULL).unwrap();

        let config = BotConfig::load_from_path(&path).unwrap();
        assert_eq!(config.admins, vec![42]);
        assert!(BotConfig::load_from_path(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_toml_round_trip_keeps_values() {
        let config = BotConfig::from_toml(FULL).unwrap();
        let reparsed = BotConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed.replication, config.replication);
        assert_eq!(reparsed.search, config.search);
        assert_eq!(reparsed.metadata, config.metadata);
    }
}
