//! Fixed-width bordered text tables

use unicode_width::UnicodeWidthStr;

use crate::metrics::{MetricResult, Row};

const RULE: char = '─';
const BORDER: char = '│';
const PLACEHOLDER_WIDTH: usize = 40;

/// Formatted lines of one dashboard section, trailing blank line included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub lines: Vec<String>,
}

impl TableBlock {
    /// Failures and the "unavailable" sentinel keep their section slot as a one-row table.
    pub fn from_result(result: &MetricResult) -> Self {
        match result {
            MetricResult::Section { title, rows } => format_table(title, rows),
            MetricResult::Unavailable { title, label } => {
                format_table(title, &[vec![label.clone(), "N/A".to_string()]])
            }
            MetricResult::Failed { title, description } => {
                format_table(title, &[vec![format!("Error: {}", description)]])
            }
        }
    }
}

/// Max display width of each column; the column count is the longest row's length.
pub fn column_widths(rows: &[Row]) -> Vec<usize> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }
    widths
}

pub fn format_table(title: &str, rows: &[Row]) -> TableBlock {
    if rows.is_empty() {
        let rule = rule(PLACEHOLDER_WIDTH);
        return TableBlock {
            lines: vec![
                title.to_string(),
                rule.clone(),
                "no data".to_string(),
                rule,
                String::new(),
            ],
        };
    }

    let widths = column_widths(rows);
    // "│" + " cell │" per column
    let total_width = widths.iter().sum::<usize>() + 3 * widths.len() + 1;

    let mut lines = Vec::with_capacity(rows.len() + 4);
    lines.push(center(title, total_width));
    lines.push(rule(total_width));

    for row in rows {
        let mut line = String::from(BORDER);
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            line.push(' ');
            line.push_str(&pad_right(cell, *width));
            line.push(' ');
            line.push(BORDER);
        }
        lines.push(line);
    }

    lines.push(rule(total_width));
    lines.push(String::new());
    TableBlock { lines }
}

/// Dashes as wide as each header, used between column groups.
pub fn separator(headers: &[String]) -> Row {
    headers.iter().map(|h| rule(h.width())).collect()
}

/// Lays out per-item columns (`[header, value, extra...]`) as row groups of at
/// most `cap` items, with a separator row between consecutive groups.
pub fn column_groups(columns: &[Vec<String>], cap: usize) -> Vec<Row> {
    let depth = columns.iter().map(Vec::len).max().unwrap_or(0);
    let chunks: Vec<&[Vec<String>]> = columns.chunks(cap.max(1)).collect();
    let mut rows = Vec::new();

    for (n, chunk) in chunks.iter().enumerate() {
        for level in 0..depth {
            rows.push(
                chunk
                    .iter()
                    .map(|column| column.get(level).cloned().unwrap_or_default())
                    .collect(),
            );
        }
        if n + 1 < chunks.len() {
            let headers: Vec<String> = chunk
                .iter()
                .map(|column| column.first().cloned().unwrap_or_default())
                .collect();
            rows.push(separator(&headers));
        }
    }

    rows
}

fn rule(width: usize) -> String {
    std::iter::repeat(RULE).take(width).collect()
}

fn pad_right(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn center(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    let left = fill / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
}
