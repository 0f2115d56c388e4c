//! Memory usage from `/proc/meminfo`

use std::collections::HashMap;
use std::path::PathBuf;

use super::procfs::parse_meminfo;
use super::{gib, read_file, MetricSource, Reading, SourceError};

const KIB_PER_GIB: f64 = 1024.0 * 1024.0;

/// Memory figures in kibibytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub total_kb: u64,
    pub available_kb: u64,
    pub used_kb: u64,
    pub used_percent: f64,
}

impl MemoryUsage {
    /// `MemAvailable` is preferred, older kernels only report `MemFree`.
    pub fn from_meminfo(map: &HashMap<String, String>) -> Result<Self, SourceError> {
        let field = |key: &str| -> Result<Option<u64>, SourceError> {
            map.get(key)
                .map(|v| {
                    v.parse::<u64>().map_err(|e| {
                        SourceError::parse("/proc/meminfo", format!("{} {:?}: {}", key, v, e))
                    })
                })
                .transpose()
        };

        let total_kb = field("MemTotal")?.ok_or_else(|| SourceError::MissingField {
            file: "/proc/meminfo".to_string(),
            field: "MemTotal".to_string(),
        })?;
        let available_kb = match field("MemAvailable")? {
            Some(v) => v,
            None => field("MemFree")?.unwrap_or(0),
        };
        let used_kb = total_kb.saturating_sub(available_kb);
        let used_percent = if total_kb > 0 {
            100.0 * used_kb as f64 / total_kb as f64
        } else {
            0.0
        };

        Ok(Self {
            total_kb,
            available_kb,
            used_kb,
            used_percent,
        })
    }
}

/// `[====      ]` with `round(width * percent / 100)` cells filled.
pub fn usage_bar(percent: f64, width: usize) -> String {
    let filled = ((width as f64 * percent / 100.0).round().max(0.0) as usize).min(width);
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width - filled))
}

pub struct MemorySource {
    proc_path: PathBuf,
    bar_width: usize,
}

impl MemorySource {
    pub fn new(proc_path: PathBuf, bar_width: usize) -> Self {
        Self {
            proc_path,
            bar_width,
        }
    }
}

impl MetricSource for MemorySource {
    fn title(&self) -> &str {
        "MEMORY"
    }

    fn collect(&self) -> Result<Reading, SourceError> {
        let content = read_file(&self.proc_path.join("meminfo"))?;
        let usage = MemoryUsage::from_meminfo(&parse_meminfo(&content)?)?;

        Ok(Reading::Rows(vec![
            vec!["Total".into(), gib(usage.total_kb as f64 / KIB_PER_GIB)],
            vec!["Available".into(), gib(usage.available_kb as f64 / KIB_PER_GIB)],
            vec!["Used".into(), gib(usage.used_kb as f64 / KIB_PER_GIB)],
            vec!["Used %".into(), format!("{:.2}%", usage.used_percent)],
            vec!["Usage".into(), usage_bar(usage.used_percent, self.bar_width)],
        ]))
    }
}
