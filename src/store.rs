//! The owning component: current result trees plus condensed history.

use crate::condense::{Aggregator, Retention};
use crate::error::{MapError, MapResult};
use crate::mapper::{self, MapperOptions, ResultMapper};
use crate::model::{MetricRow, ResultTree};
use crate::report::snapshot;
use crate::schema::{Format, Schema};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

/// Newest mapped tree per file label.
type CurrentTrees = BTreeMap<String, (u64, ResultTree)>;

/// Maps result documents and condenses them across builds.
///
/// Safe to share between scan workers: every import goes through the
/// aggregator's per-key locking, and the current trees sit behind their
/// own mutex. Imports hold `epoch` shared for their whole update and
/// `reset_memory` holds it exclusively, so a reset never lands between the
/// aggregator merge and the current-tree update of one import.
pub struct BenchmarkStore {
    mapper: Box<dyn ResultMapper>,
    epoch: RwLock<()>,
    aggregator: Aggregator,
    current: Mutex<CurrentTrees>,
}

impl BenchmarkStore {
    pub fn new(mapper: Box<dyn ResultMapper>, retention: Retention) -> Self {
        Self {
            mapper,
            epoch: RwLock::new(()),
            aggregator: Aggregator::new(retention),
            current: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn mapper(&self) -> &dyn ResultMapper {
        self.mapper.as_ref()
    }

    /// Map the result file at `path` produced by `build` and merge it.
    pub fn import_from_file(&self, build: u64, path: &Path, label: &str) -> MapResult<()> {
        debug!("importing {} for build #{} as '{}'", path.display(), build, label);
        let tree = self.mapper.map_file(path)?;
        self.import_tree(build, label, tree);
        Ok(())
    }

    /// Map in-memory content with this store's mapper and merge it.
    pub fn import_content(&self, build: u64, content: &str, label: &str) -> MapResult<()> {
        let tree = self.mapper.map(content)?;
        self.import_tree(build, label, tree);
        Ok(())
    }

    /// Map in-memory content against a schema document supplied alongside it.
    #[allow(clippy::too_many_arguments)]
    pub fn import_document(
        &self,
        build: u64,
        label: &str,
        schema: &Schema,
        format: Format,
        schema_doc: &str,
        content: &str,
        options: MapperOptions,
    ) -> MapResult<()> {
        let mapper = mapper::build_mapper_from_str(schema, format, schema_doc, options)?;
        let tree = mapper.map(content)?;
        self.import_tree(build, label, tree);
        Ok(())
    }

    /// Merge an already mapped tree.
    pub fn import_tree(&self, build: u64, label: &str, tree: ResultTree) {
        let _epoch = self.epoch.read().unwrap_or_else(PoisonError::into_inner);
        self.aggregator.merge_tree(build, label, &tree);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.get(label) {
            Some((newest, _)) if *newest > build => {}
            _ => {
                current.insert(label.to_string(), (build, tree));
            }
        }
    }

    pub fn number_of_results(&self) -> usize {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.values().map(|(_, tree)| tree.number_of_results()).sum()
    }

    pub fn number_of_parameters(&self) -> usize {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.values().map(|(_, tree)| tree.number_of_parameters()).sum()
    }

    /// Number of distinct condensed metrics.
    pub fn number_of_metrics(&self) -> usize {
        self.aggregator.len()
    }

    /// Discard every tree and all condensed state.
    pub fn reset_memory(&self) {
        let _epoch = self.epoch.write().unwrap_or_else(PoisonError::into_inner);
        self.aggregator.reset();
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clear();
        info!("in-memory results cleared");
    }

    /// The newest tree of every file, each under a group named by its label.
    pub fn current_tree(&self) -> MapResult<ResultTree> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let mut merged = ResultTree::new();
        for (label, (_, tree)) in current.iter() {
            let parent = if label.is_empty() { merged.root() } else { merged.group_entry(merged.root(), label)? };
            merged.graft(parent, tree)?;
        }
        Ok(merged)
    }

    pub fn condensed_rows(&self) -> Vec<MetricRow> {
        self.aggregator.condensed_rows()
    }

    pub fn condensed_tree(&self) -> MapResult<ResultTree> {
        self.aggregator.condensed_tree()
    }

    /// Persist condensed metrics as a `BenchmarkResult.json` snapshot.
    pub fn write_snapshot(&self, path: &Path) -> MapResult<()> {
        let rows = self.condensed_rows();
        snapshot::write_snapshot(&rows, path).map_err(|source| MapError::Io { path: path.to_path_buf(), source })?;
        info!("wrote {} condensed metrics to {}", rows.len(), path.display());
        Ok(())
    }

    /// Seed condensed state from a snapshot. Returns the number of metrics loaded.
    pub fn load_snapshot(&self, path: &Path) -> MapResult<usize> {
        let rows = snapshot::read_snapshot(path)?;
        let _epoch = self.epoch.read().unwrap_or_else(PoisonError::into_inner);
        for row in &rows {
            self.aggregator.merge_condensed(row.key.clone(), &row.value);
        }
        debug!("seeded {} metrics from {}", rows.len(), path.display());
        Ok(rows.len())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
