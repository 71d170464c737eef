//! `BenchmarkResult.json`: the persisted condensed snapshot.
//!
//! The snapshot is written with serde and read back through the JSON mapper
//! with [`SNAPSHOT_SCHEMA`], so a loaded snapshot yields the same condensed
//! values the mapper would produce for any other condensed document.

use crate::error::{MapError, MapResult};
use crate::mapper::{JsonMapper, MapperOptions, ResultMapper};
use crate::model::{MetricKey, MetricRow, RawValue};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

pub const SNAPSHOT_FILE: &str = "BenchmarkResult.json";

/// Top-level group the mapper places snapshot rows under.
const RESULTS_GROUP: &str = "results";

/// Mapping schema of the snapshot document. `file` and `group` nest each row
/// under two groups, which is how keys are recovered on load.
pub const SNAPSHOT_SCHEMA: &str = r#"{
  "type": "object",
  "required": ["results"],
  "properties": {
    "generated": { "type": "string", "role": "parameter" },
    "results": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["file", "group", "name", "previous", "passed", "failed"],
        "properties": {
          "file": { "type": "string", "role": "group" },
          "group": { "type": "string", "role": "group" },
          "name": { "type": "string", "role": "name" },
          "unit": { "type": "string", "role": "unit" },
          "description": { "type": "string", "role": "description" },
          "previous": { "type": "any", "role": "previous", "condensed": true },
          "build": { "type": "integer", "role": "build" },
          "minimum": { "type": "number", "role": "minimum" },
          "maximum": { "type": "number", "role": "maximum" },
          "average": { "type": "number", "role": "average" },
          "stdDeviation": { "type": "number", "role": "stdDeviation" },
          "passed": { "type": "integer", "role": "passed" },
          "failed": { "type": "integer", "role": "failed" }
        }
      }
    }
  }
}"#;

/// One condensed metric as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    pub file: String,
    pub group: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub previous: RawValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_deviation: Option<f64>,
    pub passed: u64,
    pub failed: u64,
}

#[derive(Debug, Serialize)]
struct Snapshot {
    generated: String,
    results: Vec<SnapshotRow>,
}

/// Flatten condensed rows; rows without condensed data are skipped.
pub fn snapshot_rows(rows: &[MetricRow]) -> Vec<SnapshotRow> {
    rows.iter()
        .filter_map(|row| {
            let condensed = row.value.condensed.as_ref()?;
            let stats = condensed.stats.as_ref();
            Some(SnapshotRow {
                file: row.key.file.clone(),
                group: row.key.group.clone(),
                name: row.key.name.clone(),
                unit: row.value.unit.clone(),
                description: row.value.description.clone(),
                previous: condensed.previous.clone(),
                build: condensed.previous_build,
                minimum: stats.map(|s| s.minimum),
                maximum: stats.map(|s| s.maximum),
                average: stats.map(|s| s.average),
                std_deviation: stats.map(|s| s.std_deviation),
                passed: condensed.passed,
                failed: condensed.failed,
            })
        })
        .collect()
}

/// Write the snapshot under an exclusive lock.
pub fn write_snapshot(rows: &[MetricRow], path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
    FileExt::lock_exclusive(&file)?;
    file.set_len(0)?;

    let snapshot = Snapshot { generated: chrono::Local::now().to_rfc3339(), results: snapshot_rows(rows) };
    let mut writer = BufWriter::new(&file);
    serde_json::to_writer_pretty(&mut writer, &snapshot)?;
    writer.flush()?;

    // Unlock is automatic when file goes out of scope
    Ok(())
}

/// Read a snapshot back into condensed rows.
pub fn read_snapshot(path: &Path) -> MapResult<Vec<MetricRow>> {
    let io_err = |source: io::Error| MapError::Io { path: path.to_path_buf(), source };
    let mut file = File::open(path).map_err(io_err)?;
    FileExt::lock_shared(&file).map_err(io_err)?;
    let mut content = String::new();
    file.read_to_string(&mut content).map_err(io_err)?;
    parse_snapshot(&content)
}

pub fn parse_snapshot(content: &str) -> MapResult<Vec<MetricRow>> {
    let tree = JsonMapper::new(SNAPSHOT_SCHEMA, MapperOptions::default())?.map(content)?;

    let mut rows = Vec::new();
    for (id, value) in tree.values() {
        if !value.is_result() {
            continue;
        }
        let path = value.parent().map(|p| tree.group_path(p)).unwrap_or_default();
        let (file, group) = match path.as_slice() {
            [RESULTS_GROUP, file, group] => (*file, *group),
            _ => return Err(MapError::validation(tree.value_path(id), "snapshot row outside results")),
        };
        let mut value = value.clone();
        value.group = (!group.is_empty()).then(|| group.to_string());
        rows.push(MetricRow { key: MetricKey::new(file, group, value.name.clone()), value });
    }
    Ok(rows)
}
