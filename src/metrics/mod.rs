//! Metric sources - one table of label/value rows per host subsystem

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod procfs;
pub mod sensors;
pub mod temperature;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;

/// One table row; rows of a section may have different lengths
pub type Row = Vec<String>;

/// What a source hands back when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Rows(Vec<Row>),
    /// Nothing applicable on this host (e.g. no CPU temperature sensor)
    Unavailable(String),
}

/// Outcome of sampling one source during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum MetricResult {
    Section { title: String, rows: Vec<Row> },
    Unavailable { title: String, label: String },
    Failed { title: String, description: String },
}

impl MetricResult {
    pub fn failed(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Failed {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Section { title, .. }
            | Self::Unavailable { title, .. }
            | Self::Failed { title, .. } => title,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Failures a source may hit while reading the host
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: {message}")]
    Parse { file: String, message: String },

    #[error("{file}: missing field {field}")]
    MissingField { file: String, field: String },

    #[error("statvfs {}: {source}", .path.display())]
    Statvfs {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
}

impl SourceError {
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// A self-contained probe producing one dashboard section
pub trait MetricSource: Send + Sync {
    fn title(&self) -> &str;

    /// May block; the CPU usage source sleeps for a full sampling interval.
    fn collect(&self) -> Result<Reading, SourceError>;

    /// Run `collect` and fold any error into the result.
    fn sample(&self) -> MetricResult {
        let title = self.title().to_string();
        match self.collect() {
            Ok(Reading::Rows(rows)) => MetricResult::Section { title, rows },
            Ok(Reading::Unavailable(label)) => MetricResult::Unavailable { title, label },
            Err(e) => {
                tracing::warn!(source = %title, error = %e, "metric source failed");
                MetricResult::Failed {
                    title,
                    description: e.to_string(),
                }
            }
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_dir(path: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let to_err = |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path).map_err(to_err)? {
        entries.push(entry.map_err(to_err)?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Formats an amount already converted to gibibytes, as shown in every table
pub(crate) fn gib(value: f64) -> String {
    format!("{:.2} GiB", value)
}

/// Sources in dashboard order
pub fn default_sources(config: &Config) -> Vec<Arc<dyn MetricSource>> {
    let mut sources: Vec<Arc<dyn MetricSource>> = vec![
        Arc::new(disk::DiskSource::new(config.paths.disk_mount.clone())),
        Arc::new(cpu::CpuUsageSource::new(
            config.paths.proc.clone(),
            config.sampling.interval(),
            config.display.columns_per_group,
        )),
        Arc::new(memory::MemorySource::new(
            config.paths.proc.clone(),
            config.display.bar_width,
        )),
        Arc::new(temperature::TemperatureSource::new(
            config.paths.hwmon.clone(),
            config.sensors.cpu_keywords.clone(),
            config.display.columns_per_group,
        )),
    ];

    if config.sensors.show_auxiliary {
        sources.push(Arc::new(sensors::AuxSensorsSource::new(
            config.paths.hwmon.clone(),
            config.display.columns_per_group,
        )));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl MetricSource for Broken {
        fn title(&self) -> &str {
            "BROKEN"
        }

        fn collect(&self) -> Result<Reading, SourceError> {
            read_file(Path::new("/nonexistent/sysdash/file")).map(|_| Reading::Rows(vec![]))
        }
    }

    struct Empty;

    impl MetricSource for Empty {
        fn title(&self) -> &str {
            "EMPTY"
        }

        fn collect(&self) -> Result<Reading, SourceError> {
            Ok(Reading::Unavailable("Thing".to_string()))
        }
    }

    #[test]
    fn errors_are_folded_at_the_source_boundary() {
        let result = Broken.sample();
        assert_eq!(result.title(), "BROKEN");
        match result {
            MetricResult::Failed { description, .. } => {
                assert!(description.contains("/nonexistent/sysdash/file"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn unavailable_is_not_a_failure() {
        let result = Empty.sample();
        assert!(!result.is_failure());
        assert_eq!(
            result,
            MetricResult::Unavailable {
                title: "EMPTY".to_string(),
                label: "Thing".to_string()
            }
        );
    }

    #[test]
    fn auxiliary_sensors_can_be_disabled() {
        let mut config = Config::default();
        assert_eq!(default_sources(&config).len(), 5);

        config.sensors.show_auxiliary = false;
        let titles: Vec<String> = default_sources(&config)
            .iter()
            .map(|s| s.title().to_string())
            .collect();
        assert_eq!(
            titles,
            vec!["DISK SPACE", "CPU LOAD", "MEMORY", "CPU TEMPERATURE"]
        );
    }
}
