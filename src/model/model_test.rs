/// Tests for the result model
///
/// Covers group uniqueness, back-references, counting and the
/// all-or-nothing statistics invariant of condensed values.
#[cfg(test)]
mod tests {
    use crate::model::*;

    fn sample_tree() -> ResultTree {
        let mut tree = ResultTree::new();
        let root = tree.root();
        let suite = tree.add_group(root, "suite").unwrap();
        tree.add_value(suite, ResultValue::new("latency", RawValue::Float(12.5)).with_unit(Some("ms".into())))
            .unwrap();
        tree.add_value(suite, ResultValue::new("ok", RawValue::Boolean(true))).unwrap();
        tree.add_value(root, ResultValue::parameter("host", RawValue::String("ci-1".into()))).unwrap();
        tree
    }

    #[test]
    fn test_counts_split_results_and_parameters() {
        let tree = sample_tree();
        assert_eq!(tree.number_of_results(), 2);
        assert_eq!(tree.number_of_parameters(), 1);
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_new_tree_is_empty() {
        let tree = ResultTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.number_of_results(), 0);
    }

    #[test]
    fn test_duplicate_names_rejected_per_level() {
        let mut tree = ResultTree::new();
        let root = tree.root();
        tree.add_group(root, "a").unwrap();
        let err = tree.add_value(root, ResultValue::new("a", RawValue::Integer(1))).unwrap_err();
        assert!(err.is_validation());

        // Same name one level down is fine
        let a = tree.group_entry(root, "a").unwrap();
        assert!(tree.add_value(a, ResultValue::new("a", RawValue::Integer(1))).is_ok());
    }

    #[test]
    fn test_back_reference_and_paths() {
        let tree = sample_tree();
        let (id, value) = tree.values().into_iter().find(|(_, v)| v.name == "latency").unwrap();
        let parent = value.parent().unwrap();
        assert_eq!(tree.group(parent).name(), "suite");
        assert_eq!(value.group.as_deref(), Some("suite"));
        assert_eq!(tree.value_path(id), "suite/latency");
    }

    #[test]
    fn test_values_in_document_order() {
        let tree = sample_tree();
        let names: Vec<&str> = tree.values().iter().map(|(_, v)| v.name.as_str()).collect();
        assert_eq!(names, vec!["latency", "ok", "host"]);
    }

    #[test]
    fn test_rows_carry_group_path() {
        let tree = sample_tree();
        let rows = tree.rows("perf.json");
        assert_eq!(rows[0].key, MetricKey::new("perf.json", "suite", "latency"));
        assert_eq!(rows[2].key, MetricKey::new("perf.json", "", "host"));
    }

    #[test]
    fn test_graft_merges_groups() {
        let mut combined = ResultTree::new();
        let root = combined.root();
        let file = combined.add_group(root, "a.json").unwrap();
        combined.graft(file, &sample_tree()).unwrap();
        assert_eq!(combined.number_of_results(), 2);
        assert_eq!(combined.rows("")[0].key.group, "a.json/suite");
    }

    #[test]
    fn test_condensed_requires_all_stats_together() {
        let partial = Condensed::from_parts(RawValue::Float(1.0), Some(3), Some(1.0), None, Some(1.0), Some(0.0), 1, 0);
        assert!(partial.unwrap_err().is_validation());

        let none = Condensed::from_parts(RawValue::Boolean(true), Some(3), None, None, None, None, 2, 1).unwrap();
        assert!(none.stats.is_none());
        assert_eq!(none.observations(), 3);

        let full =
            Condensed::from_parts(RawValue::Float(2.0), None, Some(1.0), Some(3.0), Some(2.0), Some(0.5), 3, 0).unwrap();
        assert_eq!(full.stats.unwrap().maximum, 3.0);
    }

    #[test]
    fn test_pass_policy() {
        let rule = PassPolicy::parse("<= 250").unwrap();
        assert_eq!(rule, PassPolicy::new(Comparison::Le, 250.0));
        assert!(rule.passes(250.0));
        assert!(!rule.passes(250.5));
        assert_eq!(PassPolicy::parse(">-1.5").unwrap(), PassPolicy::new(Comparison::Gt, -1.5));
        assert!(PassPolicy::parse("about 3").is_err());

        let value = ResultValue::new("t", RawValue::Integer(300)).with_pass(Some(rule));
        assert!(!value.passed());
        assert!(ResultValue::new("t", RawValue::Integer(300)).passed());
        assert!(!ResultValue::new("ok", RawValue::Boolean(false)).passed());
    }

    #[test]
    fn test_content_detected() {
        let tree = sample_tree();
        let detected = ContentDetected::scan(&tree.rows(""));
        assert!(!detected.file_detected);
        assert!(detected.group_detected);
        assert!(detected.numeral_detected);
        assert!(detected.units_detected);
    }
}
