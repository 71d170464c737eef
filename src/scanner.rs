//! Concurrent historical scan.
//!
//! The build range is cut into contiguous runs, one per worker thread. Each
//! worker walks its run newest to oldest through the history's `previous`
//! chain and imports every configured result file into the shared store.
//! A build that cannot be read or mapped is logged and skipped.

use crate::history::{BuildHistory, BuildRecord};
use crate::paths::{FilePathGroup, assign_relative_paths};
use crate::store::BenchmarkStore;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

pub const DEFAULT_WORKERS: usize = 4;

/// A build-relative result file and the label its metrics are filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSource {
    pub relative: PathBuf,
    pub label: String,
}

impl ScanSource {
    pub fn new(relative: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self { relative: relative.into(), label: label.into() }
    }
}

/// Label configured result files by their minimal distinguishing path.
///
/// A single file needs no label.
pub fn sources_for(files: &[String], marker: &str, case_sensitive: bool) -> Vec<ScanSource> {
    if let [only] = files {
        return vec![ScanSource::new(only, "")];
    }
    let mut groups: Vec<FilePathGroup> = files.iter().map(|f| FilePathGroup::with_marker(f, marker)).collect();
    assign_relative_paths(&mut groups, case_sensitive);
    files.iter().zip(groups).map(|(file, group)| ScanSource::new(file, group.relative_path())).collect()
}

/// Shared stop request, checked by every worker between builds.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Builds walked.
    pub visited: usize,
    /// Result files imported.
    pub imported: usize,
    /// Result files skipped after an error.
    pub failed: usize,
    pub cancelled: bool,
}

impl ScanSummary {
    fn absorb(&mut self, other: ScanSummary) {
        self.visited += other.visited;
        self.imported += other.imported;
        self.failed += other.failed;
        self.cancelled |= other.cancelled;
    }
}

/// One worker's share of the range: from `start` back to, not including, `stop`.
#[derive(Debug, Clone)]
struct Run {
    start: BuildRecord,
    stop: Option<u64>,
}

pub struct HistoryScanner<'a> {
    history: &'a dyn BuildHistory,
    store: &'a BenchmarkStore,
    sources: Vec<ScanSource>,
    workers: usize,
    cancel: CancelFlag,
}

impl<'a> HistoryScanner<'a> {
    pub fn new(history: &'a dyn BuildHistory, store: &'a BenchmarkStore, sources: Vec<ScanSource>) -> Self {
        Self { history, store, sources, workers: DEFAULT_WORKERS, cancel: CancelFlag::new() }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scan from `start` (default: latest build) back to the exclusive `end`
    /// (default: start of history).
    pub fn scan(&self, start: Option<u64>, end: Option<u64>) -> Result<ScanSummary, String> {
        let first = match start {
            Some(number) => {
                self.history.build(number).ok_or_else(|| format!("Build #{} not found in history", number))?
            }
            None => match self.history.latest() {
                Some(build) => build,
                None => {
                    info!("history is empty, nothing to scan");
                    return Ok(ScanSummary::default());
                }
            },
        };

        let runs = self.plan(first, end);
        debug!("scanning with {} workers over {} sources", runs.len(), self.sources.len());

        thread::scope(|scope| -> Result<ScanSummary, String> {
            let mut handles = Vec::with_capacity(runs.len());
            for (index, run) in runs.into_iter().enumerate() {
                let name = format!("scan-worker-{}", index);
                let handle = thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || self.walk(run))
                    .map_err(|e| format!("Failed to start {}: {}", name, e))?;
                handles.push((name, handle));
            }

            let mut summary = ScanSummary::default();
            for (name, handle) in handles {
                let part = handle.join().map_err(|_| format!("{} panicked", name))?;
                summary.absorb(part);
            }
            info!(
                "scan finished: {} builds, {} files imported, {} skipped",
                summary.visited, summary.imported, summary.failed
            );
            Ok(summary)
        })
    }

    /// Cut the range into at most `workers` contiguous runs.
    fn plan(&self, first: BuildRecord, end: Option<u64>) -> Vec<Run> {
        let in_range = |b: &BuildRecord| end.is_none_or(|end| b.number > end);

        let mut chain = Vec::new();
        let mut current = Some(first);
        while let Some(build) = current.filter(in_range) {
            current = self.history.previous(&build);
            chain.push(build);
        }
        if chain.is_empty() {
            return Vec::new();
        }

        let per_worker = chain.len().div_ceil(self.workers);
        let starts: Vec<BuildRecord> = chain.into_iter().step_by(per_worker).collect();
        let stops: Vec<Option<u64>> = starts.iter().skip(1).map(|b| Some(b.number)).chain([end]).collect();
        starts.into_iter().zip(stops).map(|(start, stop)| Run { start, stop }).collect()
    }

    fn walk(&self, run: Run) -> ScanSummary {
        let current_thread = thread::current();
        let worker = current_thread.name().unwrap_or("scan-worker");
        let mut summary = ScanSummary::default();

        let mut current = Some(run.start);
        while let Some(build) = current {
            if run.stop.is_some_and(|stop| build.number <= stop) {
                break;
            }
            if self.cancel.is_cancelled() {
                debug!("[{}] cancelled before build #{}", worker, build.number);
                summary.cancelled = true;
                break;
            }

            summary.visited += 1;
            for source in &self.sources {
                let path = build.artifact(&source.relative);
                match self.store.import_from_file(build.number, &path, &source.label) {
                    Ok(()) => summary.imported += 1,
                    Err(e) => {
                        summary.failed += 1;
                        warn!("[{}] build #{}: skipping {}: {}", worker, build.number, path.display(), e);
                    }
                }
            }
            current = self.history.previous(&build);
        }
        summary
    }
}

#[cfg(test)]
#[path = "scanner_test.rs"]
mod scanner_test;
