use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const API_URL_ENV: &str = "BAKERY_API_URL";
pub const ENVIRONMENT_ENV: &str = "BAKERY_ENV";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub display: DisplayConfig,
}

/// Deployment target; each one maps to a backend host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("Unknown environment '{}'", other)),
        }
    }
}

/// What to do with the stored token when the backend answers HTTP 401
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionExpiryPolicy {
    #[default]
    ClearToken,
    Keep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Which host from `hosts` to talk to
    pub environment: Environment,

    /// Explicit base URL, wins over `environment`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub content_type: String,

    /// Request timeout in seconds, 0 disables it
    pub timeout_secs: u64,

    pub on_unauthorized: SessionExpiryPolicy,

    pub hosts: HostsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostsConfig {
    pub development: String,
    pub staging: String,
    pub production: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// State file location (leave unset for the data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,

    /// Keep session state in memory only
    pub ephemeral: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,

    /// Also write logs to a timestamped file in the log directory
    pub log_to_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// "table", "json" or "csv"
    pub default_format: String,

    /// Show the row count under tables
    pub show_row_count: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: None,
            content_type: "application/json".to_string(),
            timeout_secs: 30,
            on_unauthorized: SessionExpiryPolicy::default(),
            hosts: HostsConfig::default(),
        }
    }
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            development: "http://localhost:8000".to_string(),
            staging: "https://staging.bakery-planner.app".to_string(),
            production: "https://api.bakery-planner.app".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_to_file: false,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_format: "table".to_string(),
            show_row_count: true,
        }
    }
}

impl ApiConfig {
    /// Base URL after applying the explicit override
    pub fn resolved_base_url(&self) -> &str {
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return url;
        }
        match self.environment {
            Environment::Development => &self.hosts.development,
            Environment::Staging => &self.hosts.staging,
            Environment::Production => &self.hosts.production,
        }
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // Create default config if it doesn't exist
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config.with_env_overrides());
        }

        Ok(Self::load_from(&config_path)?.with_env_overrides())
    }

    /// Load a specific file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("bakery-client").join("config.toml"))
    }

    /// `BAKERY_API_URL` and `BAKERY_ENV` beat the file
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = Some(url);
            }
        }
        if let Ok(env) = std::env::var(ENVIRONMENT_ENV) {
            match env.parse() {
                Ok(environment) => self.api.environment = environment,
                Err(e) => tracing::warn!(target: "config", "Ignoring {}: {}", ENVIRONMENT_ENV, e),
            }
        }
        self
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Bakery client configuration
# Location: ~/.config/bakery-client/config.toml (Linux)
#           ~/Library/Application Support/bakery-client/config.toml (macOS)
#           %APPDATA%\bakery-client\config.toml (Windows)

[api]
# Which backend to use: "development", "staging" or "production"
# (BAKERY_ENV overrides this)
environment = "production"

# Explicit base URL, wins over environment (BAKERY_API_URL overrides this)
# base_url = "http://192.168.1.20:8000"

content_type = "application/json"

# Request timeout in seconds (0 = no timeout)
timeout_secs = 30

# On HTTP 401: "clear_token" logs you out locally, "keep" leaves the token alone
on_unauthorized = "clear_token"

[api.hosts]
development = "http://localhost:8000"
staging = "https://staging.bakery-planner.app"
production = "https://api.bakery-planner.app"

[storage]
# Where the session token and device state live (default: data directory)
# state_file = "/path/to/state.json"

# Keep everything in memory; nothing survives the process
ephemeral = false

[logging]
# Filter used when RUST_LOG is not set
level = "warn"

# Also write a timestamped log file (see `bakery config path`)
log_to_file = false

[display]
# Output for list commands: "table", "json" or "csv"
default_format = "table"

# Print the number of rows under tables
show_row_count = true
"#
        .to_string()
    }
}
