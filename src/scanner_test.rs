/// Tests for the concurrent historical scan
#[cfg(test)]
mod tests {
    use crate::condense::Retention;
    use crate::history::DirectoryHistory;
    use crate::mapper::{JsonMapper, MapperOptions};
    use crate::scanner::{CancelFlag, HistoryScanner, ScanSource, sources_for};
    use crate::store::BenchmarkStore;
    use std::fs;
    use std::path::Path;

    const SCHEMA: &str = r#"{
        "type": "object",
        "required": ["wall"],
        "properties": { "wall": { "type": "number", "unit": "ms", "condensed": true } }
    }"#;

    fn history_with(builds: u64, broken: &[u64]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for number in 1..=builds {
            let build_dir = dir.path().join(number.to_string());
            fs::create_dir(&build_dir).unwrap();
            let content = if broken.contains(&number) {
                "{ \"wall\": ".to_string()
            } else {
                format!("{{ \"wall\": {} }}", number * 10)
            };
            fs::write(build_dir.join("bench.json"), content).unwrap();
        }
        dir
    }

    fn store() -> BenchmarkStore {
        BenchmarkStore::new(Box::new(JsonMapper::new(SCHEMA, MapperOptions::default()).unwrap()), Retention::Unbounded)
    }

    fn observations(store: &BenchmarkStore) -> u64 {
        store.condensed_rows().iter().map(|r| r.value.condensed.as_ref().unwrap().observations()).sum()
    }

    fn scan(root: &Path, store: &BenchmarkStore, workers: usize, start: Option<u64>, end: Option<u64>) -> crate::scanner::ScanSummary {
        let history = DirectoryHistory::open(root).unwrap();
        HistoryScanner::new(&history, store, vec![ScanSource::new("bench.json", "")])
            .with_workers(workers)
            .scan(start, end)
            .unwrap()
    }

    #[test]
    fn test_one_bad_build_does_not_stop_the_scan() {
        let dir = history_with(8, &[5]);
        let store = store();
        let summary = scan(dir.path(), &store, 3, None, None);

        assert_eq!(summary.visited, 8);
        assert_eq!(summary.imported, 7);
        assert_eq!(summary.failed, 1);
        assert_eq!(observations(&store), 7);

        let condensed = store.condensed_rows().remove(0).value.condensed.unwrap();
        assert_eq!(condensed.previous_build, Some(8));
        assert_eq!(condensed.stats.unwrap().minimum, 10.0);
    }

    #[test]
    fn test_missing_result_file_is_skipped() {
        let dir = history_with(4, &[]);
        fs::remove_file(dir.path().join("2").join("bench.json")).unwrap();
        let store = store();
        let summary = scan(dir.path(), &store, 2, None, None);
        assert_eq!((summary.visited, summary.failed), (4, 1));
        assert_eq!(observations(&store), 3);
    }

    #[test]
    fn test_end_build_is_exclusive() {
        let dir = history_with(8, &[]);
        let store = store();
        let summary = scan(dir.path(), &store, 2, Some(7), Some(3));
        assert_eq!(summary.visited, 4);
        let stats = store.condensed_rows().remove(0).value.condensed.unwrap().stats.unwrap();
        assert_eq!((stats.minimum, stats.maximum), (40.0, 70.0));
    }

    #[test]
    fn test_every_build_visited_once_for_any_worker_count() {
        let dir = history_with(7, &[]);
        for workers in [1, 2, 3, 7, 16] {
            let store = store();
            let summary = scan(dir.path(), &store, workers, None, None);
            assert_eq!(summary.visited, 7, "workers = {}", workers);
            assert_eq!(observations(&store), 7);
        }
    }

    #[test]
    fn test_cancelled_scan_stops_at_iteration_boundary() {
        let dir = history_with(5, &[]);
        let history = DirectoryHistory::open(dir.path()).unwrap();
        let store = store();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let summary = HistoryScanner::new(&history, &store, vec![ScanSource::new("bench.json", "")])
            .with_cancel(cancel)
            .scan(None, None)
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.visited, 0);
        assert_eq!(store.number_of_results(), 0);
    }

    #[test]
    fn test_unknown_start_build() {
        let dir = history_with(2, &[]);
        let history = DirectoryHistory::open(dir.path()).unwrap();
        let store = store();
        let err = HistoryScanner::new(&history, &store, Vec::new()).scan(Some(9), None).unwrap_err();
        assert!(err.contains("#9"));
    }

    #[test]
    fn test_sources_labelled_by_distinguishing_path() {
        let files = vec!["out/a/bench.json".to_string(), "out/b/bench.json".to_string()];
        let sources = sources_for(&files, "workspace", false);
        let sep = std::path::MAIN_SEPARATOR_STR;
        assert_eq!(sources[0].label, format!("out{}a", sep));
        assert_eq!(sources[1].label, format!("out{}b", sep));

        let single = sources_for(&["bench.json".to_string()], "workspace", false);
        assert_eq!(single, vec![ScanSource::new("bench.json", "")]);
    }
}
