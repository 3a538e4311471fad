use crate::options::{DataSource, EXCLUDED_ATTRIBUTE_KEYS};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub view: ViewConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the query service
    pub base_url: String,

    /// Request timeout for attribute lookups
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period before a typed search is sent
    pub debounce_ms: u64,

    /// Attribute keys never offered as columns
    pub excluded_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub data_source: DataSource,

    pub aggregate_operator: String,

    /// Column names resolved on first start
    pub initial_columns: Vec<String>,

    /// Width rows are wrapped at before clamping
    pub wrap_width: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store file (defaults to the data directory)
    pub path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3301".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            excluded_keys: EXCLUDED_ATTRIBUTE_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::Logs,
            aggregate_operator: "noop".to_string(),
            initial_columns: Vec::new(),
            wrap_width: 120,
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
            default_config.save()?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&config_path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;

        // The body is always shown; it can't be a column too
        for key in EXCLUDED_ATTRIBUTE_KEYS {
            if !config.search.excluded_keys.iter().any(|k| k == key) {
                config.search.excluded_keys.push(key.to_string());
            }
        }

        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("logview").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# logview configuration file
# Location: ~/.config/logview/config.toml (Linux)
#           ~/Library/Application Support/logview/config.toml (macOS)
#           %APPDATA%\logview\config.toml (Windows)

[api]
# Query service the attribute lookups are sent to
base_url = "http://localhost:3301"

# Seconds before a lookup is abandoned
timeout_secs = 10

[search]
# Quiet period (ms) after typing before the search is sent
debounce_ms = 300

# Attribute keys that are never offered as columns ("body" is always excluded)
excluded_keys = ["body"]

[view]
# traces, logs or metrics
data_source = "logs"

aggregate_operator = "noop"

# Columns selected the first time the view opens, e.g. ["service.name", "host.name"]
initial_columns = []

# Rows are wrapped at this width before being clamped to max lines
wrap_width = 120

[storage]
# Where the view settings are persisted (leave commented to use the data directory)
# path = "/path/to/storage.json"
"#
        .to_string()
    }
}
