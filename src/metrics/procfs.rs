//! Parsers for the `/proc` files the sources read.
//!
//! Pure functions over file contents so they can be tested with string inputs.

use std::collections::HashMap;

use super::SourceError;

/// Counters of one `cpu*` line of `/proc/stat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuCounters {
    /// `cpu` for the aggregate line, `cpuN` for cores
    pub name: String,
    pub values: Vec<u64>,
}

impl CpuCounters {
    pub fn is_aggregate(&self) -> bool {
        self.name == "cpu"
    }

    /// Field-wise `later - self`; a counter that went backwards yields 0.
    pub fn delta(&self, later: &CpuCounters) -> Vec<u64> {
        self.values
            .iter()
            .zip(&later.values)
            .map(|(before, after)| after.saturating_sub(*before))
            .collect()
    }
}

/// Parses every `cpu*` line of `/proc/stat`.
pub fn parse_cpu_stat(content: &str) -> Result<Vec<CpuCounters>, SourceError> {
    let mut cpus = Vec::new();

    for line in content.lines().filter(|l| l.starts_with("cpu")) {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            continue;
        };

        let values = parts
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| SourceError::parse("/proc/stat", format!("{}: {:?}: {}", name, v, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        cpus.push(CpuCounters {
            name: name.to_string(),
            values,
        });
    }

    if cpus.is_empty() {
        return Err(SourceError::parse("/proc/stat", "no cpu lines"));
    }
    Ok(cpus)
}

/// Collects the `cpu MHz` value of each processor block in `/proc/cpuinfo`.
///
/// Architectures without that key yield an empty list.
pub fn parse_cpu_mhz(content: &str) -> Result<Vec<f64>, SourceError> {
    let mut freqs = Vec::new();

    for block in content.trim().split("\n\n") {
        let mhz = block
            .lines()
            .find(|l| l.starts_with("cpu MHz"))
            .and_then(|l| l.split_once(':'));
        if let Some((_, value)) = mhz {
            let value = value.trim();
            let parsed = value
                .parse::<f64>()
                .map_err(|e| SourceError::parse("/proc/cpuinfo", format!("cpu MHz {:?}: {}", value, e)))?;
            freqs.push(parsed);
        }
    }

    Ok(freqs)
}

/// Maps each `/proc/meminfo` key to the first token of its value (`kB` dropped).
pub fn parse_meminfo(content: &str) -> Result<HashMap<String, String>, SourceError> {
    let mut map = HashMap::new();

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| SourceError::parse("/proc/meminfo", format!("malformed line {:?}", line)))?;
        if let Some(first) = value.split_whitespace().next() {
            map.insert(key.trim().to_string(), first.to_string());
        }
    }

    Ok(map)
}
