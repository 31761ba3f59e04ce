//! CLI configuration.

use anyhow::{Context, Result};
use pwp_worker::prelude::{LoggingConfig, WorkerConfig};
use serde::{Deserialize, Serialize};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Worker configuration.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where caches and the queue are kept.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound network settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Replay retry settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &str) -> Result<()> {
        let content = if path.ends_with(".json") {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path))
    }
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory, relative to the config file's directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    ".pwp".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Outbound network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Total request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cookie sent with credentialed requests (e.g. a logged-in session).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            cookie: None,
        }
    }
}

/// Retry settings for `pwp sync --watch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum drain attempts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds. Doubles each time.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on the delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Generate a default pwp.toml config file.
pub fn generate_default_config(origin: &str) -> String {
    format!(
        r#"# Offline page worker configuration

[worker]
origin = "{origin}"
cache_name = "pwp"
submission_path = "/wp-comments-post.php"
sync_tag = "comment-sync"
precache = [
    "header.php?fragment=true",
    "./?fragment=true",
    "footer.php?fragment=true",
    "lazy.css",
    "scripts/router.js",
    "scripts/pwp-view.js",
    "scripts/pwp-spinner.js",
]

[logging]
level = "warn"
format = "human"

[storage]
data_dir = ".pwp"

[network]
timeout_secs = 10
# cookie = "wordpress_logged_in_...=..."

[sync]
max_attempts = 5
base_delay_ms = 1000
max_delay_ms = 60000
"#,
        origin = origin,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwp_worker::prelude::LogLevel;

    #[test]
    fn test_generated_config_parses() {
        let config: CliConfig =
            toml::from_str(&generate_default_config("https://blog.example.com/theme/")).unwrap();
        assert_eq!(config.worker.origin.as_str(), "https://blog.example.com/theme/");
        assert_eq!(config.worker.precache.len(), 7);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.sync.max_attempts, 5);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.worker, WorkerConfig::default());
        assert_eq!(config.storage.data_dir, ".pwp");
        assert_eq!(config.network.timeout_secs, 10);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pwp.toml");
        let path = path.to_str().unwrap();

        let mut config = CliConfig::default();
        config.network.cookie = Some("session=abc".to_string());
        config.save(path).unwrap();

        let loaded = CliConfig::load(path).unwrap();
        assert_eq!(loaded.network.cookie.as_deref(), Some("session=abc"));
        assert_eq!(loaded.worker, config.worker);
    }
}
