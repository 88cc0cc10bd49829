use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use filehash_core::{HashStoreConfig, WorkerMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StoreSettings {
    pub retention_days: u32,
    pub max_attempts: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub default_format: String,
    pub color_enabled: bool,
    pub progress_enabled: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PathsConfig {
    /// Overrides the platform default cache file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let defaults = HashStoreConfig::default();
        Self {
            retention_days: defaults.retention_days,
            max_attempts: defaults.max_attempts,
            initial_retry_delay_ms: defaults.initial_retry_delay.as_millis() as u64,
            max_retry_delay_ms: defaults.max_retry_delay.as_millis() as u64,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            color_enabled: true,
            progress_enabled: true,
        }
    }
}

impl StoreSettings {
    /// Build the store configuration these settings describe
    pub fn to_store_config(&self) -> HashStoreConfig {
        HashStoreConfig::default()
            .with_retention_days(self.retention_days)
            .with_max_attempts(self.max_attempts)
            .with_retry_delays(
                Duration::from_millis(self.initial_retry_delay_ms),
                Duration::from_millis(self.max_retry_delay_ms),
            )
            .with_worker(WorkerMode::Background)
    }
}

impl AppConfig {
    /// Apply CLI argument overrides to the configuration
    pub fn apply_cli_overrides(&mut self, cache_file: Option<PathBuf>) {
        if let Some(path) = cache_file {
            self.paths.cache_file = Some(path);
        }
    }

    /// Cache file in effect: configured override or the platform default
    pub fn cache_file(&self) -> PathBuf {
        self.paths
            .cache_file
            .clone()
            .unwrap_or_else(paths::get_cache_file_path)
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    fn default_config_path() -> PathBuf {
        // XDG_CONFIG_HOME wins on every Unix, including macOS
        #[cfg(not(target_os = "windows"))]
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("filehash/config.toml");
        }

        paths::get_config_path()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        // Layer 2: Config file (if exists)
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed("FILEHASH_").split("__"));

        let config: AppConfig = figment.extract().context("Failed to load configuration")?;
        config
            .store
            .to_store_config()
            .validate()
            .context("Invalid [store] configuration")?;
        Ok(config)
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed_value = Self::parse_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let Some((section, field)) = key.split_once('.') else {
            anyhow::bail!("Invalid key path: {}", key);
        };

        let toml::Value::Table(root) = &mut config else {
            anyhow::bail!("Config file root is not a table");
        };
        let section_value = root
            .entry(section.to_string())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
        let toml::Value::Table(table) = section_value else {
            anyhow::bail!("Invalid key path: expected table at '{}'", section);
        };
        table.insert(field.to_string(), parsed_value);

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(&self.config_path, toml_string)?;

        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    /// Recursively collect all key-value pairs from TOML
    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            _ => {}
        }
    }

    /// Validate `value` for `key` and convert it to its TOML type
    fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
        match key {
            "store.retention_days" | "store.max_attempts" => {
                let n: u32 = value
                    .parse()
                    .with_context(|| format!("{key} must be a positive integer"))?;
                if n == 0 {
                    anyhow::bail!("{} must be at least 1", key);
                }
                Ok(toml::Value::Integer(i64::from(n)))
            }
            "store.initial_retry_delay_ms" | "store.max_retry_delay_ms" => {
                let ms: u32 = value
                    .parse()
                    .with_context(|| format!("{key} must be a non-negative integer"))?;
                Ok(toml::Value::Integer(i64::from(ms)))
            }
            "output.color_enabled" | "output.progress_enabled" => {
                let b: bool = value.parse().context("Value must be 'true' or 'false'")?;
                Ok(toml::Value::Boolean(b))
            }
            "output.default_format" => match value {
                "text" | "json" | "csv" => Ok(toml::Value::String(value.to_string())),
                _ => anyhow::bail!("default_format must be one of: text, json, csv"),
            },
            "paths.cache_file" => {
                if value.is_empty() {
                    anyhow::bail!("cache_file must not be empty");
                }
                Ok(toml::Value::String(value.to_string()))
            }
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        }
    }
}

/// Load configuration from the default location
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}
