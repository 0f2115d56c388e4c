//! Battery voltage, fan speed and power draw from the hwmon tree

use std::path::{Path, PathBuf};

use super::{read_dir, read_file, MetricSource, Reading, SourceError};
use crate::ui::table::column_groups;

pub fn voltage_label(volts: f64) -> &'static str {
    if (12.6..=12.8).contains(&volts) {
        "Charged"
    } else if volts > 10.6 && volts < 12.6 {
        "Normal"
    } else if volts < 10.6 {
        "Critical"
    } else {
        "Fault"
    }
}

pub fn fan_label(rpm: u64) -> &'static str {
    match rpm {
        0..=2499 => "Idle",
        2500..=3999 => "Medium load",
        4000..=5999 => "High load",
        _ => "Maximum load",
    }
}

/// Expected battery runtime class for a discharge rate in watts.
pub fn power_label(watts: f64) -> &'static str {
    if watts <= 10.0 {
        "Light (4-8h)"
    } else if watts <= 25.0 {
        "Medium (2-3h)"
    } else if watts <= 35.0 {
        "High (1-1.5h)"
    } else {
        "Maximum (<1h)"
    }
}

fn read_number(path: &Path) -> Result<i64, SourceError> {
    let raw = read_file(path)?;
    raw.trim().parse::<i64>().map_err(|e| {
        SourceError::parse(path.display().to_string(), format!("{:?}: {}", raw.trim(), e))
    })
}

/// `[name, value, label]` for every recognised sensor under `root`
pub fn read_aux_sensors(root: &Path) -> Result<Vec<Vec<String>>, SourceError> {
    let mut columns = Vec::new();

    for device in read_dir(root)?.into_iter().filter(|p| p.is_dir()) {
        let voltage = device.join("in0_input");
        if voltage.exists() {
            let volts = (read_number(&voltage)? as f64 / 1000.0 * 100.0).round() / 100.0;
            columns.push(vec![
                "Battery voltage".to_string(),
                format!("{:.2} V", volts),
                voltage_label(volts).to_string(),
            ]);
        }

        let fan = device.join("fan1_input");
        if fan.exists() {
            let rpm = read_number(&fan)?.max(0) as u64;
            columns.push(vec![
                "Fan speed".to_string(),
                format!("{} RPM", rpm),
                fan_label(rpm).to_string(),
            ]);
        }

        let power = device.join("power1_input");
        if power.exists() {
            let watts = read_number(&power)? as f64 / 1_000_000.0;
            columns.push(vec![
                "Power draw".to_string(),
                format!("{:.3} W", watts),
                power_label(watts).to_string(),
            ]);
        }
    }

    Ok(columns)
}

pub struct AuxSensorsSource {
    hwmon_path: PathBuf,
    columns_per_group: usize,
}

impl AuxSensorsSource {
    pub fn new(hwmon_path: PathBuf, columns_per_group: usize) -> Self {
        Self {
            hwmon_path,
            columns_per_group,
        }
    }
}

impl MetricSource for AuxSensorsSource {
    fn title(&self) -> &str {
        "OTHER SENSORS"
    }

    fn collect(&self) -> Result<Reading, SourceError> {
        let columns = read_aux_sensors(&self.hwmon_path)?;
        if columns.is_empty() {
            return Ok(Reading::Unavailable("Sensors".to_string()));
        }
        Ok(Reading::Rows(column_groups(&columns, self.columns_per_group)))
    }
}
