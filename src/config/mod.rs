//! Configuration system for Sysdash

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub display: DisplayConfig,
    pub sensors: SensorsConfig,
    pub paths: PathsConfig,
    pub ssd: SsdConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sysdash").join("config.toml"))
    }
}

/// Tick timing and worker pool sizing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Gap between the two `/proc/stat` reads; also the minimum tick length.
    pub interval_ms: u64,
    pub workers: usize,
    pub source_timeout_ms: u64,
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            workers: 4,
            source_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub bar_width: usize,
    pub columns_per_group: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bar_width: 20,
            columns_per_group: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorsConfig {
    /// Lowercase substrings a `tempN_label` must contain to count as a CPU sensor
    pub cpu_keywords: Vec<String>,
    pub show_auxiliary: bool,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            cpu_keywords: ["core", "cpu", "package", "tdie", "tctl"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            show_auxiliary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub proc: PathBuf,
    pub hwmon: PathBuf,
    pub disk_mount: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            proc: PathBuf::from("/proc"),
            hwmon: PathBuf::from("/sys/class/hwmon"),
            disk_mount: PathBuf::from("/"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SsdConfig {
    pub nvme_command: String,
    pub use_sudo: bool,
}

impl Default for SsdConfig {
    fn default() -> Self {
        Self {
            nvme_command: "nvme".to_string(),
            use_sudo: true,
        }
    }
}

/// Write the default configuration to `path`
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("Created {}", path.display());
    Ok(())
}
