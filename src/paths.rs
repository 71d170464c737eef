//! Path grouping: turn raw result-file paths into short, distinguishing labels.
//!
//! Paths may come from machines with either separator convention. Each path
//! is anchored at the workspace marker segment, then all paths are partitioned
//! level by level until every entry is told apart from its siblings.

use log::debug;
use std::path::MAIN_SEPARATOR_STR;

/// Segment that anchors an absolute build path into a workspace-relative one.
pub const WORKSPACE_MARKER: &str = "workspace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePathGroup {
    path_segment: Vec<String>,
    /// Index of the first segment after the marker, when the marker exists.
    anchor: Option<usize>,
    relative_path: String,
    full_path: String,
}

impl FilePathGroup {
    pub fn new(path: &str) -> Self {
        Self::with_marker(path, WORKSPACE_MARKER)
    }

    /// Split `path` on `/` and `\` and anchor it after `marker` (case-insensitive).
    pub fn with_marker(path: &str, marker: &str) -> Self {
        let path_segment: Vec<String> =
            path.split(['/', '\\']).filter(|s| !s.is_empty()).map(|s| s.to_string()).collect();
        let anchor = path_segment.iter().position(|s| s.eq_ignore_ascii_case(marker)).map(|i| i + 1);
        let full_path = match anchor {
            Some(start) => path_segment[start..].join(MAIN_SEPARATOR_STR),
            None => String::new(),
        };
        Self { path_segment, anchor, relative_path: String::new(), full_path }
    }

    pub fn path_segment(&self) -> &[String] {
        &self.path_segment
    }

    /// Minimal distinguishing label, set by [`recurse_names`].
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Workspace-relative path; empty when the marker is absent.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Segments used for grouping: after the marker if present, else all of them.
    fn grouping_segments(&self) -> &[String] {
        match self.anchor {
            Some(start) => &self.path_segment[start..],
            None => &self.path_segment,
        }
    }
}

/// Assign `relative_path` to every entry, starting at `depth` under `prefix`.
///
/// Entries are partitioned by their segment at `depth`. A partition holding
/// one entry, or entries identical on every remaining segment, becomes a leaf
/// labelled `prefix + segment`; any other partition is split again one level
/// deeper.
pub fn recurse_names(case_sensitive: bool, depth: usize, prefix: &str, names: &mut [FilePathGroup]) {
    let members: Vec<usize> = (0..names.len()).collect();
    recurse(case_sensitive, depth, prefix, names, &members);
}

/// Convenience wrapper for the top-level call.
pub fn assign_relative_paths(names: &mut [FilePathGroup], case_sensitive: bool) {
    recurse_names(case_sensitive, 0, "", names);
}

fn recurse(case_sensitive: bool, depth: usize, prefix: &str, names: &mut [FilePathGroup], members: &[usize]) {
    let fold = |s: &str| if case_sensitive { s.to_string() } else { s.to_lowercase() };

    // (folded key, first-seen spelling, member indices) in first-seen order
    let mut partitions: Vec<(String, String, Vec<usize>)> = Vec::new();
    for &idx in members {
        let Some(segment) = names[idx].grouping_segments().get(depth).cloned() else {
            names[idx].relative_path = prefix.to_string();
            continue;
        };
        let key = fold(&segment);
        match partitions.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, _, part)) => part.push(idx),
            None => partitions.push((key, segment, vec![idx])),
        }
    }

    for (_, segment, part) in partitions {
        let path = if prefix.is_empty() { segment } else { format!("{}{}{}", prefix, MAIN_SEPARATOR_STR, segment) };

        if part.len() == 1 || identical_tails(names, &part, depth + 1, case_sensitive) {
            debug!("path group leaf '{}' ({} entries)", path, part.len());
            for idx in part {
                names[idx].relative_path = path.clone();
            }
        } else {
            recurse(case_sensitive, depth + 1, &path, names, &part);
        }
    }
}

fn identical_tails(names: &[FilePathGroup], part: &[usize], from: usize, case_sensitive: bool) -> bool {
    let tail = |idx: usize| -> Vec<String> {
        names[idx]
            .grouping_segments()
            .iter()
            .skip(from)
            .map(|s| if case_sensitive { s.clone() } else { s.to_lowercase() })
            .collect()
    };
    let first = tail(part[0]);
    part[1..].iter().all(|&idx| tail(idx) == first)
}

#[cfg(test)]
#[path = "paths_test.rs"]
mod paths_test;
