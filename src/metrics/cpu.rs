//! Per-core CPU utilisation and frequency

use std::path::PathBuf;
use std::time::Duration;

use super::procfs::{parse_cpu_mhz, parse_cpu_stat, CpuCounters};
use super::{read_file, MetricSource, Reading, SourceError};
use crate::ui::table::column_groups;

/// user, nice, system, idle, iowait, irq, softirq, steal
const COUNTERS: usize = 8;
const IDLE: usize = 3;
const IOWAIT: usize = 4;

/// Utilisation percentage from one core's counter deltas.
pub fn usage_percent(delta: &[u64]) -> f64 {
    if delta.len() < COUNTERS {
        return 0.0;
    }
    let total: u64 = delta[..COUNTERS].iter().sum();
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(delta[IDLE] + delta[IOWAIT]);
    100.0 * used as f64 / total as f64
}

pub struct CpuUsageSource {
    proc_path: PathBuf,
    interval: Duration,
    columns_per_group: usize,
}

impl CpuUsageSource {
    pub fn new(proc_path: PathBuf, interval: Duration, columns_per_group: usize) -> Self {
        Self {
            proc_path,
            interval,
            columns_per_group,
        }
    }

    fn read_counters(&self) -> Result<Vec<CpuCounters>, SourceError> {
        parse_cpu_stat(&read_file(&self.proc_path.join("stat"))?)
    }

    /// Frequencies only decorate the table, so a missing cpuinfo leaves them blank.
    fn read_frequencies(&self) -> Vec<f64> {
        let path = self.proc_path.join("cpuinfo");
        match read_file(&path).and_then(|content| parse_cpu_mhz(&content)) {
            Ok(freqs) => freqs,
            Err(e) => {
                tracing::debug!(error = %e, "cpu frequencies unavailable");
                Vec::new()
            }
        }
    }
}

/// Builds the `Core N` / `NN%` / `x.xxGHz` columns from two `/proc/stat` snapshots.
pub fn core_columns(before: &[CpuCounters], after: &[CpuCounters], freqs_mhz: &[f64]) -> Vec<Vec<String>> {
    before
        .iter()
        .zip(after)
        .filter(|(b, _)| !b.is_aggregate())
        .enumerate()
        .filter_map(|(i, (b, a))| {
            let delta = b.delta(a);
            if delta.len() < COUNTERS {
                return None;
            }
            let freq = freqs_mhz
                .get(i)
                .map(|mhz| format!("{:.2}GHz", mhz / 1000.0))
                .unwrap_or_default();
            Some(vec![
                format!("Core {}", i + 1),
                format!("{:.0}%", usage_percent(&delta)),
                freq,
            ])
        })
        .collect()
}

impl MetricSource for CpuUsageSource {
    fn title(&self) -> &str {
        "CPU LOAD"
    }

    fn collect(&self) -> Result<Reading, SourceError> {
        let before = self.read_counters()?;
        std::thread::sleep(self.interval);
        let after = self.read_counters()?;

        let freqs = self.read_frequencies();
        let columns = core_columns(&before, &after, &freqs);
        Ok(Reading::Rows(column_groups(&columns, self.columns_per_group)))
    }
}
