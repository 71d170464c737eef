//! Reporting of condensed metrics.
//!
//! This module handles:
//! - Console table rendering with content-driven optional columns
//! - CSV export
//! - The `BenchmarkResult.json` snapshot (write, and read back through the mapper)
//!
//! # Module Organization
//!
//! - `table` - Column selection, widths, truncation and the colored console writer
//! - `export` - CSV export
//! - `snapshot` - Persisted snapshot format and its mapping schema

mod export;
pub mod snapshot;
mod table;

// Re-export table functions
pub use table::{
    Column, TableWidths, TableWriter, cell_text, columns_for, display_width, format_number, format_row,
    format_table_footer, format_table_header, init_table_widths, print_condensed_table, truncate_with_padding,
};

// Re-export export functions
pub use export::{export_csv_report, format_csv};

pub use snapshot::{SNAPSHOT_FILE, SnapshotRow};
