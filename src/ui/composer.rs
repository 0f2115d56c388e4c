//! Assembles section tables and the status line into one screen

use chrono::{DateTime, Local};
use std::time::Duration;
use unicode_width::UnicodeWidthChar;

use crate::metrics::MetricResult;
use crate::ui::table::TableBlock;

/// Key legend shown at the end of the status line
pub const KEY_LEGEND: &str = "[q] Quit | [d] SSD info";

/// Everything the status line reports for one tick
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub updated_at: DateTime<Local>,
    pub latency: Duration,
    pub notice: Option<String>,
}

impl StatusLine {
    pub fn render(&self) -> String {
        let mut line = format!(
            "Updated: {} | Latency: {:.1}s | ",
            self.updated_at.format("%H:%M:%S"),
            self.latency.as_secs_f64()
        );
        if let Some(notice) = &self.notice {
            line.push_str(notice);
            line.push_str(" | ");
        }
        line.push_str(KEY_LEGEND);
        line
    }
}

/// One full paint: body rows from the top, status on the last terminal row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenBuffer {
    pub body: Vec<String>,
    pub status: String,
}

pub struct ScreenComposer;

impl ScreenComposer {
    pub fn compose(results: &[MetricResult], size: (u16, u16), status: &StatusLine) -> ScreenBuffer {
        let (width, height) = size;
        let max_cols = usize::from(width).saturating_sub(1);
        // last row belongs to the status line
        let max_rows = usize::from(height).saturating_sub(1);

        let body = results
            .iter()
            .flat_map(|result| TableBlock::from_result(result).lines)
            .take(max_rows)
            .map(|line| truncate(&line, max_cols))
            .collect();

        ScreenBuffer {
            body,
            status: truncate(&status.render(), max_cols),
        }
    }
}

/// Cuts `text` to at most `max_cols` display columns, never wrapping.
pub fn truncate(text: &str, max_cols: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_cols {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}
