//! Console table of condensed metrics.
//!
//! Column set follows [`ContentDetected`]: file, group, unit and the numeric
//! statistics columns only appear when some row needs them. Widths are fixed
//! for the numeric columns and the remainder of the terminal is shared by the
//! label columns.

use crate::model::{ContentDetected, MetricRow, NumericStats, RawValue};
use std::io::{self, Write};
use std::sync::OnceLock;
use term::color::Color;
use terminal_size::{Width, terminal_size};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// One rendered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    File,
    Group,
    Name,
    Previous,
    Unit,
    Minimum,
    Maximum,
    Average,
    StdDeviation,
    Passed,
    Failed,
}

impl Column {
    pub fn title(&self) -> &'static str {
        match self {
            Column::File => "File",
            Column::Group => "Group",
            Column::Name => "Name",
            Column::Previous => "Previous",
            Column::Unit => "Unit",
            Column::Minimum => "Min",
            Column::Maximum => "Max",
            Column::Average => "Average",
            Column::StdDeviation => "Std dev",
            Column::Passed => "Passed",
            Column::Failed => "Failed",
        }
    }

    fn is_label(&self) -> bool {
        matches!(self, Column::File | Column::Group | Column::Name)
    }
}

/// Columns a report needs for the given content flags, in display order.
pub fn columns_for(detected: &ContentDetected) -> Vec<Column> {
    let mut columns = Vec::new();
    if detected.file_detected {
        columns.push(Column::File);
    }
    if detected.group_detected {
        columns.push(Column::Group);
    }
    columns.push(Column::Name);
    columns.push(Column::Previous);
    if detected.units_detected {
        columns.push(Column::Unit);
    }
    if detected.numeral_detected {
        columns.extend([Column::Minimum, Column::Maximum, Column::Average, Column::StdDeviation]);
    }
    columns.extend([Column::Passed, Column::Failed]);
    columns
}

/// Column layout for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWidths {
    pub columns: Vec<(Column, usize)>,
    pub total: usize, // Total table width including borders
}

impl TableWidths {
    pub fn new(terminal_width: usize, detected: &ContentDetected) -> Self {
        let columns = columns_for(detected);
        let borders = columns.len() + 1;
        let available = terminal_width.saturating_sub(borders);

        let fixed = |c: &Column| match c {
            Column::Unit | Column::Passed | Column::Failed => 8,
            Column::Previous => 12,
            _ => 10,
        };
        let fixed_total: usize = columns.iter().filter(|c| !c.is_label()).map(fixed).sum();
        let labels = columns.iter().filter(|c| c.is_label()).count().max(1);
        // Label columns split what is left, never below a readable minimum
        let label_width = (available.saturating_sub(fixed_total) / labels).max(10);

        let columns: Vec<(Column, usize)> =
            columns.into_iter().map(|c| (c, if c.is_label() { label_width } else { fixed(&c) })).collect();
        let total = columns.iter().map(|(_, w)| w).sum::<usize>() + borders;
        TableWidths { columns, total }
    }
}

/// Get terminal width or default to 120
fn get_terminal_width() -> usize {
    if let Some((Width(w), _)) = terminal_size() {
        w as usize
    } else {
        120 // Default width
    }
}

// Table widths - initialized once per process from the first report's content
static WIDTHS: OnceLock<TableWidths> = OnceLock::new();

pub fn init_table_widths(detected: &ContentDetected) -> &'static TableWidths {
    WIDTHS.get_or_init(|| TableWidths::new(get_terminal_width(), detected))
}

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Pad `s` to exactly `width` columns, cutting it with "..." when too wide.
pub fn truncate_with_padding(s: &str, width: usize) -> String {
    let display_w = display_width(s);
    if display_w <= width {
        return format!("{}{}", s, " ".repeat(width - display_w));
    }

    let target_width = if width >= 3 { width - 3 } else { width };
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let c_width = UnicodeWidthChar::width(c).unwrap_or(1);
        if current_width + c_width > target_width {
            break;
        }
        result.push(c);
        current_width += c_width;
    }
    if width >= 3 {
        result.push_str("...");
        current_width += 3;
    }
    if current_width < width {
        result.push_str(&" ".repeat(width - current_width));
    }
    result
}

/// Compact number rendering: integers without a fraction, others to 3 places.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.3}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn format_raw(value: &RawValue) -> String {
    match value {
        RawValue::Float(f) => format_number(*f),
        other => other.to_string(),
    }
}

/// Text of one cell.
pub fn cell_text(row: &MetricRow, column: Column) -> String {
    let condensed = row.value.condensed.as_ref();
    let stats = condensed.and_then(|c| c.stats.as_ref());
    let stat = |f: fn(&NumericStats) -> f64| stats.map(|s| format_number(f(s))).unwrap_or_default();
    match column {
        Column::File => row.key.file.clone(),
        Column::Group => row.key.group.clone(),
        Column::Name => row.key.name.clone(),
        Column::Previous => format_raw(condensed.map(|c| &c.previous).unwrap_or(&row.value.value)),
        Column::Unit => row.value.unit.clone().unwrap_or_default(),
        Column::Minimum => stat(|s| s.minimum),
        Column::Maximum => stat(|s| s.maximum),
        Column::Average => stat(|s| s.average),
        Column::StdDeviation => stat(|s| s.std_deviation),
        Column::Passed => condensed.map(|c| c.passed.to_string()).unwrap_or_default(),
        Column::Failed => condensed.map(|c| c.failed.to_string()).unwrap_or_default(),
    }
}

fn border(widths: &TableWidths, left: char, mid: char, right: char) -> String {
    let mut line = String::new();
    line.push(left);
    for (i, (_, w)) in widths.columns.iter().enumerate() {
        if i > 0 {
            line.push(mid);
        }
        line.push_str(&"─".repeat(*w));
    }
    line.push(right);
    line
}

fn format_cells(widths: &TableWidths, cells: &[String]) -> String {
    let mut line = String::from("│");
    for ((_, w), cell) in widths.columns.iter().zip(cells) {
        line.push(' ');
        line.push_str(&truncate_with_padding(cell, w.saturating_sub(2)));
        line.push_str(" │");
    }
    line
}

pub fn format_table_header(title: &str, widths: &TableWidths) -> String {
    let titles: Vec<String> = widths.columns.iter().map(|(c, _)| c.title().to_string()).collect();
    format!(
        "{}\n{}\n{}\n{}\n",
        title,
        border(widths, '┌', '┬', '┐'),
        format_cells(widths, &titles),
        border(widths, '├', '┼', '┤')
    )
}

pub fn format_table_footer(widths: &TableWidths) -> String {
    format!("{}\n", border(widths, '└', '┴', '┘'))
}

pub fn format_row(row: &MetricRow, widths: &TableWidths) -> String {
    let cells: Vec<String> = widths.columns.iter().map(|(c, _)| cell_text(row, *c)).collect();
    format_cells(widths, &cells)
}

/// Green when every observation passed, red when none did, yellow otherwise.
pub fn row_color(row: &MetricRow) -> Color {
    match row.value.condensed.as_ref() {
        Some(c) if c.failed == 0 => term::color::BRIGHT_GREEN,
        Some(c) if c.passed == 0 => term::color::BRIGHT_RED,
        Some(_) => term::color::BRIGHT_YELLOW,
        None => term::color::WHITE,
    }
}

/// Writer for table output - configurable for color/plain text
pub struct TableWriter<W: Write> {
    writer: W,
    use_colors: bool,
}

impl<W: Write> TableWriter<W> {
    pub fn new(writer: W, use_colors: bool) -> Self {
        Self { writer, use_colors }
    }

    fn write_colored(&mut self, text: &str, color: Color) -> io::Result<()> {
        if self.use_colors
            && let Some(ref mut t) = term::stdout()
        {
            let _ = t.fg(color);
            let _ = t.write_all(text.as_bytes());
            let _ = t.reset();
            return Ok(());
        }
        write!(self.writer, "{}", text)
    }

    pub fn write_table(&mut self, title: &str, rows: &[MetricRow], widths: &TableWidths) -> io::Result<()> {
        write!(self.writer, "{}", format_table_header(title, widths))?;
        for row in rows {
            self.write_colored(&format_row(row, widths), row_color(row))?;
            writeln!(self.writer)?;
        }
        write!(self.writer, "{}", format_table_footer(widths))?;
        self.writer.flush()
    }
}

/// Print condensed rows to stdout.
pub fn print_condensed_table(title: &str, rows: &[MetricRow]) {
    let detected = ContentDetected::scan(rows);
    let widths = init_table_widths(&detected);
    let stdout = io::stdout();
    let mut writer = TableWriter::new(stdout.lock(), true);
    let _ = writer.write_table(title, rows, widths);
}

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;
