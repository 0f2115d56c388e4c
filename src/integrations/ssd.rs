//! NVMe SSD health report built from `nvme smart-log`

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::io::Write;
use tokio::process::Command;

use crate::config::SsdConfig;
use crate::ui::table::format_table;

/// `nvme0n1p2` -> `nvme0`
static NAMESPACE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"n\d+p\d+$").expect("valid namespace suffix regex"));

/// Something that temporarily takes over the terminal from the dashboard
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubView: Send {
    /// Runs to completion, including any wait for the user.
    async fn run(&mut self) -> Result<()>;
}

/// Fields of `nvme smart-log --output-format=json` shown in the report
#[derive(Debug, Clone, Deserialize)]
pub struct NvmeSmartLog {
    pub percent_used: u64,
    /// Kelvin
    pub temperature: i64,
    pub avail_spare: u64,
    /// Units of 1000 512-byte sectors
    pub data_units_written: f64,
    pub power_on_hours: u64,
    pub power_cycles: u64,
    pub unsafe_shutdowns: u64,
    pub media_errors: u64,
}

impl NvmeSmartLog {
    pub fn written_tb(&self) -> f64 {
        self.data_units_written * 1000.0 * 512.0 / 1024f64.powi(4)
    }

    pub fn rows(&self) -> Vec<(String, String)> {
        vec![
            ("SSD wear".into(), format!("{}%", self.percent_used)),
            ("Temperature".into(), format!("{}°C", self.temperature - 273)),
            ("Available spare".into(), format!("{}%", self.avail_spare)),
            ("Data written".into(), format!("{:.2} TB", self.written_tb())),
            (
                "Power-on time".into(),
                format!("{}(h)/{}(d)", self.power_on_hours, self.power_on_hours / 24),
            ),
            ("Power cycles".into(), self.power_cycles.to_string()),
            ("Unsafe shutdowns".into(), self.unsafe_shutdowns.to_string()),
            ("Media errors".into(), self.media_errors.to_string()),
        ]
    }
}

pub fn parse_smart_log(json: &str) -> Result<Vec<(String, String)>> {
    let log: NvmeSmartLog =
        serde_json::from_str(json).context("cannot parse nvme smart-log JSON")?;
    Ok(log.rows())
}

/// Second line of `df --output=source /`, namespace/partition suffix removed.
pub fn parse_df_source(stdout: &str) -> Result<String> {
    let source = stdout
        .lines()
        .nth(1)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .context("df printed no source device")?;
    Ok(strip_namespace(source))
}

pub fn strip_namespace(device: &str) -> String {
    NAMESPACE_SUFFIX.replace(device, "").into_owned()
}

/// A device and its health table
#[derive(Debug, Clone)]
pub struct SsdReport {
    pub device: String,
    pub rows: Vec<(String, String)>,
}

impl SsdReport {
    pub fn lines(&self) -> Vec<String> {
        let mut rows = vec![vec!["Parameter".to_string(), "Value".to_string()]];
        rows.extend(self.rows.iter().map(|(k, v)| vec![k.clone(), v.clone()]));
        format_table("SSD HEALTH", &rows).lines
    }
}

/// What the sub-view prints for one report attempt; errors become one line.
pub fn outcome_lines(outcome: &Result<SsdReport>) -> Vec<String> {
    match outcome {
        Ok(report) => {
            let mut lines = vec![format!("Analyzing SSD: {}", report.device)];
            lines.extend(report.lines());
            lines
        }
        Err(e) => vec![format!("Error: {:#}", e)],
    }
}

pub struct SsdHealthView {
    config: SsdConfig,
}

impl SsdHealthView {
    pub fn new(config: SsdConfig) -> Self {
        Self { config }
    }

    async fn root_device(&self) -> Result<String> {
        let output = Command::new("df")
            .args(["--output=source", "/"])
            .output()
            .await
            .context("failed to run df")?;
        if !output.status.success() {
            bail!(
                "df exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        parse_df_source(&String::from_utf8_lossy(&output.stdout))
    }

    /// Raw stdout of the smart-log command for `device`.
    pub async fn smart_log(&self, device: &str) -> Result<String> {
        let mut command = if self.config.use_sudo {
            let mut sudo = Command::new("sudo");
            sudo.arg(&self.config.nvme_command);
            sudo
        } else {
            Command::new(&self.config.nvme_command)
        };
        command.args(["smart-log", device, "--output-format=json"]);

        tracing::debug!(device, command = %self.config.nvme_command, "querying SSD health");
        let output = command
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.config.nvme_command))?;

        if !output.status.success() {
            bail!(
                "{} smart-log failed: {}",
                self.config.nvme_command,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn report(&self) -> Result<SsdReport> {
        let device = self.root_device().await?;
        let json = self.smart_log(&device).await?;
        Ok(SsdReport {
            rows: parse_smart_log(&json)?,
            device,
        })
    }

    /// Prints the report to stdout; errors are left to the caller to report.
    pub async fn print_report(&self) -> Result<()> {
        let report = self.report().await?;
        for line in outcome_lines(&Ok(report)) {
            println!("{}", line);
        }
        Ok(())
    }
}

async fn wait_for_enter() -> Result<()> {
    print!("Press Enter to return to the dashboard...");
    std::io::stdout().flush()?;
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await??;
    Ok(())
}

#[async_trait]
impl SubView for SsdHealthView {
    async fn run(&mut self) -> Result<()> {
        let outcome = self.report().await;
        for line in outcome_lines(&outcome) {
            println!("{}", line);
        }
        wait_for_enter().await?;
        outcome.map(|_| ())
    }
}
