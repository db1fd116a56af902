use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STORAGE_URI: &str = "memory";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";
pub const DEFAULT_NOTIFIER_WORKERS: usize = 2;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Top-level config (watchclub.toml + WATCHCLUB_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchclubConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `memory`, empty, or `sqlite://<path>`.
    #[serde(default = "default_storage_uri")]
    pub uri: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uri: default_storage_uri(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Prefix for links placed in emails and calendar entries.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Log messages to the console instead of delivering them.
    #[serde(default = "bool_true")]
    pub development_mode: bool,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            development_mode: true,
            from_address: None,
            from_name: None,
        }
    }
}

/// Sizing and retry policy for the outbound notification pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// What to do with a schedule interval quantity of zero or less.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QuantityPolicy {
    /// Substitute 1 and log a warning.
    #[default]
    DefaultToOne,
    /// Fail the request with InvalidArgument.
    Reject,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub zero_quantity: QuantityPolicy,
}

fn bool_true() -> bool {
    true
}
fn default_storage_uri() -> String {
    DEFAULT_STORAGE_URI.to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_workers() -> usize {
    DEFAULT_NOTIFIER_WORKERS
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    200
}
fn default_max_backoff_ms() -> u64 {
    10_000
}

impl WatchclubConfig {
    /// Load config from a TOML file with WATCHCLUB_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `WATCHCLUB_STORAGE__URI`.
    /// A missing file is not an error: every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: WatchclubConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("WATCHCLUB_").split("__"))
            .extract()
            .map_err(|e| crate::error::WatchclubError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.watchclub/watchclub.toml", home)
}
