/// Tests for path grouping
#[cfg(test)]
mod tests {
    use crate::paths::*;
    use std::path::MAIN_SEPARATOR_STR;

    fn join(parts: &[&str]) -> String {
        parts.join(MAIN_SEPARATOR_STR)
    }

    #[test]
    fn test_full_path_after_workspace_marker() {
        let unix = FilePathGroup::new("/var/lib/ci/jobs/perf/WorkSpace/out/bench/result.json");
        assert_eq!(unix.full_path(), join(&["out", "bench", "result.json"]));

        let windows = FilePathGroup::new(r"C:\ci\jobs\perf\workspace\out\result.json");
        assert_eq!(windows.full_path(), join(&["out", "result.json"]));
    }

    #[test]
    fn test_full_path_empty_without_marker() {
        let group = FilePathGroup::new("/tmp/out/result.json");
        assert_eq!(group.full_path(), "");
        assert_eq!(group.path_segment(), &["tmp", "out", "result.json"]);
    }

    #[test]
    fn test_mixed_separators_split() {
        let group = FilePathGroup::new(r"workspace/a\b/c.json");
        assert_eq!(group.full_path(), join(&["a", "b", "c.json"]));
    }

    #[test]
    fn test_recurse_names_minimal_paths() {
        let mut names: Vec<FilePathGroup> = [
            "/ci/workspace/a/b/c.json",
            "/ci/workspace/a/d/e.json",
            "/ci/workspace/a/d/f.json",
            "/ci/workspace/g/h.json",
            "/ci/workspace/g/i/j.json",
        ]
        .iter()
        .map(|p| FilePathGroup::new(p))
        .collect();

        assign_relative_paths(&mut names, false);

        assert_eq!(names[0].relative_path(), join(&["a", "b"]));
        assert_eq!(names[1].relative_path(), join(&["a", "d", "e.json"]));
        assert_eq!(names[2].relative_path(), join(&["a", "d", "f.json"]));
        assert_eq!(names[3].relative_path(), join(&["g", "h.json"]));
        assert_eq!(names[4].relative_path(), join(&["g", "i"]));
    }

    #[test]
    fn test_final_segment_difference_uses_full_depth() {
        let mut names: Vec<FilePathGroup> =
            ["workspace/x/y/z/one.xml", "workspace/x/y/z/two.xml"].iter().map(|p| FilePathGroup::new(p)).collect();
        assign_relative_paths(&mut names, false);

        // Shared prefix depth 3, plus the distinguishing segment
        for name in &names {
            assert_eq!(name.relative_path().split(MAIN_SEPARATOR_STR).count(), 4);
        }
        assert_ne!(names[0].relative_path(), names[1].relative_path());
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let mut names: Vec<FilePathGroup> =
            ["workspace/Out/a.json", "workspace/out/b.json"].iter().map(|p| FilePathGroup::new(p)).collect();
        assign_relative_paths(&mut names, false);
        assert_eq!(names[0].relative_path(), join(&["Out", "a.json"]));
        assert_eq!(names[1].relative_path(), join(&["Out", "b.json"]));

        assign_relative_paths(&mut names, true);
        assert_eq!(names[0].relative_path(), "Out");
        assert_eq!(names[1].relative_path(), "out");
    }

    #[test]
    fn test_identical_paths_collapse() {
        let mut names: Vec<FilePathGroup> =
            ["workspace/r/x.json", "workspace/r/x.json"].iter().map(|p| FilePathGroup::new(p)).collect();
        assign_relative_paths(&mut names, false);
        assert_eq!(names[0].relative_path(), "r");
        assert_eq!(names[1].relative_path(), "r");
    }
}
