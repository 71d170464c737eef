//! Host build history
//!
//! A build history is a backward-linked chain of build records, newest
//! first. The scanner only needs three operations from it: the newest
//! build, a lookup by number, and the predecessor of a build.
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// One historical build and the directory its artifacts live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub number: u64,
    pub root_dir: PathBuf,
}

impl BuildRecord {
    pub fn new(number: u64, root_dir: impl Into<PathBuf>) -> Self {
        Self { number, root_dir: root_dir.into() }
    }

    /// Path of a build-relative artifact.
    pub fn artifact(&self, relative: &Path) -> PathBuf {
        self.root_dir.join(relative)
    }
}

pub trait BuildHistory: Send + Sync {
    fn latest(&self) -> Option<BuildRecord>;

    fn build(&self, number: u64) -> Option<BuildRecord>;

    /// The next older build, or `None` at the start of history.
    fn previous(&self, build: &BuildRecord) -> Option<BuildRecord>;
}

/// History laid out as `<root>/<build-number>/` directories.
///
/// Build numbers are unique and need not be contiguous; entries whose
/// name is not a number are ignored.
#[derive(Debug, Clone)]
pub struct DirectoryHistory {
    root: PathBuf,
    numbers: Vec<u64>,
}

impl DirectoryHistory {
    pub fn open(root: &Path) -> Result<Self, String> {
        let entries = fs::read_dir(root).map_err(|e| format!("Failed to read history {}: {}", root.display(), e))?;

        let mut numbers: Vec<u64> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().and_then(|name| name.parse().ok()))
            .collect();
        numbers.sort_unstable();
        numbers.dedup();

        debug!("history {} holds {} builds", root.display(), numbers.len());
        Ok(Self { root: root.to_path_buf(), numbers })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    fn record(&self, number: u64) -> BuildRecord {
        BuildRecord::new(number, self.root.join(number.to_string()))
    }
}

impl BuildHistory for DirectoryHistory {
    fn latest(&self) -> Option<BuildRecord> {
        self.numbers.last().map(|n| self.record(*n))
    }

    fn build(&self, number: u64) -> Option<BuildRecord> {
        self.numbers.binary_search(&number).ok().map(|_| self.record(number))
    }

    fn previous(&self, build: &BuildRecord) -> Option<BuildRecord> {
        let index = self.numbers.partition_point(|n| *n < build.number);
        index.checked_sub(1).map(|i| self.record(self.numbers[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_history_chain() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["3", "10", "7", "notes", "1"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("12"), "not a build").unwrap();

        let history = DirectoryHistory::open(dir.path()).unwrap();
        assert_eq!(history.len(), 4);

        let mut chain = Vec::new();
        let mut current = history.latest();
        while let Some(build) = current {
            chain.push(build.number);
            current = history.previous(&build);
        }
        assert_eq!(chain, vec![10, 7, 3, 1]);
        assert_eq!(history.build(7).unwrap().root_dir, dir.path().join("7"));
        assert!(history.build(8).is_none());
    }

    #[test]
    fn test_previous_of_unknown_number() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2", "5"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let history = DirectoryHistory::open(dir.path()).unwrap();
        let probe = BuildRecord::new(4, dir.path().join("4"));
        assert_eq!(history.previous(&probe).map(|b| b.number), Some(2));
    }

    #[test]
    fn test_missing_history_dir() {
        let err = DirectoryHistory::open(Path::new("/nonexistent/history")).unwrap_err();
        assert!(err.contains("Failed to read history"));
    }
}
