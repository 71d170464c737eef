//! CSV export of condensed metrics.
//!
//! Columns follow the same [`ContentDetected`] rules as the console table,
//! but numbers keep full precision.

use super::table::{Column, cell_text, columns_for};
use crate::model::{ContentDetected, MetricRow};
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn csv_cell(row: &MetricRow, column: Column) -> String {
    let stats = row.value.condensed.as_ref().and_then(|c| c.stats.as_ref());
    let text = match (column, stats) {
        (Column::Minimum, Some(s)) => s.minimum.to_string(),
        (Column::Maximum, Some(s)) => s.maximum.to_string(),
        (Column::Average, Some(s)) => s.average.to_string(),
        (Column::StdDeviation, Some(s)) => s.std_deviation.to_string(),
        (Column::Previous, _) => match &row.value.condensed {
            Some(c) => c.previous.to_string(),
            None => row.value.value.to_string(),
        },
        _ => cell_text(row, column),
    };
    escape(&text)
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render rows as CSV with a header line.
pub fn format_csv(rows: &[MetricRow]) -> String {
    let columns = columns_for(&ContentDetected::scan(rows));
    let mut content = String::new();
    let header: Vec<&str> = columns.iter().map(|c| c.title()).collect();
    content.push_str(&header.join(","));
    content.push('\n');
    for row in rows {
        let cells: Vec<String> = columns.iter().map(|c| csv_cell(row, *c)).collect();
        content.push_str(&cells.join(","));
        content.push('\n');
    }
    content
}

/// Export condensed rows as CSV.
pub fn export_csv_report(rows: &[MetricRow], output_path: &Path) -> std::io::Result<()> {
    let mut file = File::create(output_path)?;
    file.write_all(format_csv(rows).as_bytes())?;
    Ok(())
}
