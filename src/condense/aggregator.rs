//! Shared key space of condensed metrics.

use super::accumulator::{Accumulator, Retention};
use crate::error::MapResult;
use crate::model::{MetricKey, MetricRow, ResultTree, ResultValue};
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

/// Condensed statistics for every metric key seen since the last reset.
///
/// Merges hold the map's read lock and the key's own mutex, so updates to
/// distinct keys proceed in parallel while updates to one key serialize.
/// [`Aggregator::reset`] takes the write lock and therefore waits for every
/// in-flight merge.
#[derive(Debug, Default)]
pub struct Aggregator {
    retention: Retention,
    keys: RwLock<HashMap<MetricKey, Mutex<Accumulator>>>,
}

impl Aggregator {
    pub fn new(retention: Retention) -> Self {
        Self { retention, keys: RwLock::new(HashMap::new()) }
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Merge every condensable result of one build's tree for file `file`.
    ///
    /// Returns the number of observations merged.
    pub fn merge_tree(&self, build: u64, file: &str, tree: &ResultTree) -> usize {
        let mut merged = 0;
        for row in tree.rows(file) {
            if row.value.condense && row.value.is_result() {
                self.with_key(row.key, &row.value, |acc| acc.observe(build, &row.value));
                merged += 1;
            }
        }
        debug!("build #{}: merged {} observations for '{}'", build, merged, file);
        merged
    }

    /// Merge one build's observation under an explicit key.
    pub fn merge_value(&self, build: u64, key: MetricKey, value: &ResultValue) {
        self.with_key(key, value, |acc| acc.observe(build, value));
    }

    /// Fold an already condensed value (e.g. from a snapshot) into `key`.
    pub fn merge_condensed(&self, key: MetricKey, value: &ResultValue) {
        if value.condensed.is_some() {
            self.with_key(key, value, |acc| acc.seed(value));
        }
    }

    fn with_key(&self, key: MetricKey, template: &ResultValue, update: impl FnOnce(&mut Accumulator)) {
        {
            let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = keys.get(&key) {
                let mut acc = slot.lock().unwrap_or_else(PoisonError::into_inner);
                update(&mut acc);
                return;
            }
        }
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let slot = keys.entry(key).or_insert_with(|| Mutex::new(Accumulator::new(self.retention, template)));
        update(slot.get_mut().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every key.
    pub fn reset(&self) {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        debug!("resetting {} condensed metrics", keys.len());
        keys.clear();
    }

    /// Condensed rows sorted by key.
    pub fn condensed_rows(&self) -> Vec<MetricRow> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<MetricRow> = keys
            .iter()
            .filter_map(|(key, slot)| {
                let acc = slot.lock().unwrap_or_else(PoisonError::into_inner);
                let mut value = acc.to_value()?;
                value.group = (!key.group.is_empty()).then(|| key.group.clone());
                Some(MetricRow { key: key.clone(), value })
            })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        rows
    }

    /// Condensed metrics as a grouping tree: file, then group path, then value.
    pub fn condensed_tree(&self) -> MapResult<ResultTree> {
        let mut tree = ResultTree::new();
        for row in self.condensed_rows() {
            let mut parent = tree.root();
            if !row.key.file.is_empty() {
                parent = tree.group_entry(parent, &row.key.file)?;
            }
            for segment in row.key.group.split('/').filter(|s| !s.is_empty()) {
                parent = tree.group_entry(parent, segment)?;
            }
            let mut value = row.value;
            value.group = None;
            tree.add_value(parent, value)?;
        }
        Ok(tree)
    }
}
