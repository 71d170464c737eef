//! Optional-column detection for renderers.

use super::value::MetricRow;

/// Which optional columns a report needs, computed once per report build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentDetected {
    pub file_detected: bool,
    pub group_detected: bool,
    pub numeral_detected: bool,
    pub units_detected: bool,
}

impl ContentDetected {
    pub fn scan(rows: &[MetricRow]) -> Self {
        let mut detected = ContentDetected::default();
        for row in rows {
            detected.file_detected |= !row.key.file.is_empty();
            detected.group_detected |= !row.key.group.is_empty();
            detected.numeral_detected |= row.value.kind().is_numeric()
                || row.value.condensed.as_ref().is_some_and(|c| c.stats.is_some());
            detected.units_detected |= row.value.unit.as_deref().is_some_and(|u| !u.is_empty());
        }
        detected
    }
}
