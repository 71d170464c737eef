//! Fixed mapping for JUnit reports: suites, cases, pass/fail and durations.
//!
//! Two layouts are accepted: the common `<testsuites>/<testsuite>/<testcase>`
//! report written by most test runners, and the `<result>/<suites>/<suite>`
//! form CI servers persist as `junitResult.xml`.
//!
//! Output layout per suite:
//!
//! ```text
//! <suite>/duration          float, seconds
//! <suite>/failures          integer, passes when 0
//! <suite>/cases/<case>/status    boolean
//! <suite>/cases/<case>/duration  float, seconds
//! ```

use super::xml_dom::{self, Element};
use super::ResultMapper;
use crate::error::{MapError, MapResult};
use crate::model::{Comparison, GroupId, PassPolicy, RawValue, ResultTree, ResultValue};
use log::debug;

/// Default file name of a persisted JUnit result.
pub const JUNIT_RESULT_FILE: &str = "junitResult.xml";

struct CaseOutcome {
    name: String,
    duration: Option<f64>,
    /// `None` when the case was skipped.
    passed: Option<bool>,
}

struct SuiteOutcome {
    name: String,
    duration: Option<f64>,
    cases: Vec<CaseOutcome>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JUnitMapper;

impl JUnitMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn map_element(&self, root: &Element) -> MapResult<ResultTree> {
        let suites = match root.name.as_str() {
            "testsuites" => root.children_named("testsuite").map(read_testsuite).collect::<MapResult<Vec<_>>>()?,
            "testsuite" => vec![read_testsuite(root)?],
            "result" => match root.child("suites") {
                Some(suites) => suites.children_named("suite").map(read_stored_suite).collect::<MapResult<Vec<_>>>()?,
                None => Vec::new(),
            },
            other => {
                return Err(MapError::validation(
                    format!("/{}", other),
                    "expected <testsuites>, <testsuite> or <result> as the root element",
                ));
            }
        };

        let mut tree = ResultTree::new();
        let root_group = tree.root();
        for suite in suites {
            write_suite(&mut tree, root_group, suite)?;
        }
        debug!("mapped JUnit report: {} results", tree.number_of_results());
        Ok(tree)
    }
}

impl ResultMapper for JUnitMapper {
    fn format_name(&self) -> &'static str {
        "JUnit"
    }

    fn map(&self, content: &str) -> MapResult<ResultTree> {
        match xml_dom::parse(content)? {
            Some(root) => self.map_element(&root),
            None => Ok(ResultTree::new()),
        }
    }
}

fn read_testsuite(suite: &Element) -> MapResult<SuiteOutcome> {
    let name = suite.attr("name").unwrap_or("").to_string();
    let path = format!("/testsuite[@name='{}']", name);
    let duration = parse_seconds(suite.attr("time"), &path)?;

    let mut cases = Vec::new();
    for case in suite.children_named("testcase") {
        let case_name = qualified(case.attr("classname"), case.attr("name").unwrap_or(""));
        let case_path = format!("{}/testcase[@name='{}']", path, case_name);
        let skipped = case.child("skipped").is_some();
        let failed = case.child("failure").is_some() || case.child("error").is_some();
        cases.push(CaseOutcome {
            name: case_name,
            duration: parse_seconds(case.attr("time"), &case_path)?,
            passed: if skipped { None } else { Some(!failed) },
        });
    }
    Ok(SuiteOutcome { name, duration, cases })
}

fn read_stored_suite(suite: &Element) -> MapResult<SuiteOutcome> {
    let name = suite.child_text("name").unwrap_or("").to_string();
    let path = format!("/result/suites/suite[name='{}']", name);
    let duration = parse_seconds(suite.child_text("duration"), &path)?;

    let mut cases = Vec::new();
    if let Some(list) = suite.child("cases") {
        for case in list.children_named("case") {
            let case_name = qualified(case.child_text("className"), case.child_text("testName").unwrap_or(""));
            let case_path = format!("{}/case[testName='{}']", path, case_name);
            let skipped = case.child_text("skipped") == Some("true");
            let failed = case.child("errorDetails").is_some() || case.child("errorStackTrace").is_some();
            cases.push(CaseOutcome {
                name: case_name,
                duration: parse_seconds(case.child_text("duration"), &case_path)?,
                passed: if skipped { None } else { Some(!failed) },
            });
        }
    }
    Ok(SuiteOutcome { name, duration, cases })
}

fn write_suite(tree: &mut ResultTree, parent: GroupId, suite: SuiteOutcome) -> MapResult<()> {
    let label = unique_label(tree, parent, if suite.name.is_empty() { "suite" } else { &suite.name });
    let group = tree.add_group(parent, label)?;

    if let Some(duration) = suite.duration {
        tree.add_value(group, seconds("duration", duration))?;
    }
    let failures = suite.cases.iter().filter(|c| c.passed == Some(false)).count() as i64;
    tree.add_value(
        group,
        ResultValue::new("failures", RawValue::Integer(failures))
            .with_condense(true)
            .with_pass(Some(PassPolicy::new(Comparison::Eq, 0.0))),
    )?;

    if suite.cases.is_empty() {
        return Ok(());
    }
    let cases = tree.add_group(group, "cases")?;
    for case in suite.cases {
        let label = unique_label(tree, cases, &case.name);
        let case_group = tree.add_group(cases, label)?;
        match case.passed {
            Some(passed) => {
                tree.add_value(case_group, ResultValue::new("status", RawValue::Boolean(passed)).with_condense(true))?;
            }
            None => {
                tree.add_value(case_group, ResultValue::parameter("skipped", RawValue::Boolean(true)))?;
            }
        }
        if let Some(duration) = case.duration {
            tree.add_value(case_group, seconds("duration", duration))?;
        }
    }
    Ok(())
}

fn seconds(name: &str, value: f64) -> ResultValue {
    ResultValue::new(name, RawValue::Float(value)).with_unit(Some("s".to_string())).with_condense(true)
}

fn qualified(class_name: Option<&str>, name: &str) -> String {
    match class_name {
        Some(class) if !class.is_empty() && !name.starts_with(class) => format!("{}.{}", class, name),
        _ => name.to_string(),
    }
}

/// Duplicate suite or case names get a `#n` suffix.
fn unique_label(tree: &ResultTree, parent: GroupId, base: &str) -> String {
    if tree.child(parent, base).is_none() {
        return base.to_string();
    }
    (2..).map(|n| format!("{}#{}", base, n)).find(|candidate| tree.child(parent, candidate).is_none()).unwrap_or_default()
}

fn parse_seconds(text: Option<&str>, path: &str) -> MapResult<Option<f64>> {
    match text.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) => t
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite())
            .map(Some)
            .ok_or_else(|| MapError::validation(path, format!("duration '{}' is not a finite number", t))),
    }
}
