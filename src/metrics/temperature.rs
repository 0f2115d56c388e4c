//! CPU temperature from the hwmon tree

use std::path::{Path, PathBuf};

use super::{read_dir, read_file, MetricSource, Reading, SourceError};
use crate::ui::table::column_groups;

/// One `tempN_input` reading
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub label: String,
    pub celsius: f64,
}

/// Label from `tempN_label`, or `tempN` when the device does not name it.
fn sensor_label(device: &Path, input_name: &str) -> String {
    let base = input_name.split('_').next().unwrap_or(input_name);
    std::fs::read_to_string(device.join(format!("{}_label", base)))
        .map(|l| l.trim().to_string())
        .ok()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| base.to_string())
}

/// Millidegrees to degrees; non-positive and garbage readings are dropped.
pub fn parse_millidegrees(raw: &str) -> Option<f64> {
    let celsius = raw.trim().parse::<f64>().ok()? / 1000.0;
    (celsius > 0.0).then_some(celsius)
}

pub fn is_cpu_sensor(label: &str, keywords: &[String]) -> bool {
    let lower = label.to_lowercase();
    keywords.iter().any(|kw| lower.contains(kw.as_str()))
}

/// Walks `root/*/temp*_input`, keeps CPU sensors, sorted by label.
pub fn read_cpu_sensors(root: &Path, keywords: &[String]) -> Result<Vec<SensorReading>, SourceError> {
    let mut readings = Vec::new();

    for device in read_dir(root)?.into_iter().filter(|p| p.is_dir()) {
        let inputs = match read_dir(&device) {
            Ok(inputs) => inputs,
            Err(e) => {
                tracing::debug!(error = %e, "skipping hwmon device");
                continue;
            }
        };
        for input in inputs {
            let Some(name) = input.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !(name.starts_with("temp") && name.ends_with("_input")) {
                continue;
            }

            let label = sensor_label(&device, name);
            if !is_cpu_sensor(&label, keywords) {
                continue;
            }

            // Some drivers expose inputs that fail to read while the sensor sleeps.
            match read_file(&input).map(|raw| parse_millidegrees(&raw)) {
                Ok(Some(celsius)) => readings.push(SensorReading { label, celsius }),
                Ok(None) => tracing::trace!(path = %input.display(), "discarding sensor reading"),
                Err(e) => tracing::debug!(error = %e, "skipping unreadable sensor"),
            }
        }
    }

    readings.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(readings)
}

pub struct TemperatureSource {
    hwmon_path: PathBuf,
    keywords: Vec<String>,
    columns_per_group: usize,
}

impl TemperatureSource {
    pub fn new(hwmon_path: PathBuf, keywords: Vec<String>, columns_per_group: usize) -> Self {
        Self {
            hwmon_path,
            keywords,
            columns_per_group,
        }
    }
}

impl MetricSource for TemperatureSource {
    fn title(&self) -> &str {
        "CPU TEMPERATURE"
    }

    fn collect(&self) -> Result<Reading, SourceError> {
        let readings = read_cpu_sensors(&self.hwmon_path, &self.keywords)?;
        if readings.is_empty() {
            return Ok(Reading::Unavailable("CPU temperature".to_string()));
        }

        let columns: Vec<Vec<String>> = readings
            .into_iter()
            .map(|r| vec![r.label, format!("{:.1}°C", r.celsius)])
            .collect();
        Ok(Reading::Rows(column_groups(&columns, self.columns_per_group)))
    }
}
