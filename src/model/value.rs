//! Typed result values and their condensed (cross-build) form.

use super::tree::GroupId;
use crate::error::{MapError, MapResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive type a schema leaf declares and a value carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    Integer,
    Float,
    String,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float)
    }
}

/// A single observed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl RawValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            RawValue::Boolean(_) => ValueKind::Boolean,
            RawValue::Integer(_) => ValueKind::Integer,
            RawValue::Float(_) => ValueKind::Float,
            RawValue::String(_) => ValueKind::String,
        }
    }

    /// Numeric view; booleans and strings have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Boolean(b) => write!(f, "{}", b),
            RawValue::Integer(i) => write!(f, "{}", i),
            RawValue::Float(v) => write!(f, "{}", v),
            RawValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// Whether a value is a measured result or context describing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueRole {
    #[default]
    Result,
    Parameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl std::str::FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" | "lt" => Ok(Comparison::Lt),
            "<=" | "le" => Ok(Comparison::Le),
            ">" | "gt" => Ok(Comparison::Gt),
            ">=" | "ge" => Ok(Comparison::Ge),
            "==" | "=" | "eq" => Ok(Comparison::Eq),
            "!=" | "ne" => Ok(Comparison::Ne),
            other => Err(format!("unknown comparison '{}'", other)),
        }
    }
}

/// Schema-declared rule deciding whether a numeric observation passed.
///
/// An observation passes when `value <op> threshold` holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassPolicy {
    pub op: Comparison,
    pub threshold: f64,
}

impl PassPolicy {
    pub fn new(op: Comparison, threshold: f64) -> Self {
        Self { op, threshold }
    }

    pub fn passes(&self, value: f64) -> bool {
        match self.op {
            Comparison::Lt => value < self.threshold,
            Comparison::Le => value <= self.threshold,
            Comparison::Gt => value > self.threshold,
            Comparison::Ge => value >= self.threshold,
            Comparison::Eq => value == self.threshold,
            Comparison::Ne => value != self.threshold,
        }
    }

    /// Parse the compact `"<= 250"` form used in XML schema attributes.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        let split = text.find(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.').ok_or_else(|| {
            format!("pass rule '{}' has no threshold", text)
        })?;
        let (op, threshold) = text.split_at(split);
        let op: Comparison = op.parse()?;
        let threshold: f64 =
            threshold.trim().parse().map_err(|_| format!("pass rule '{}' has a non-numeric threshold", text))?;
        Ok(Self { op, threshold })
    }
}

/// Minimum, maximum, mean and population standard deviation.
///
/// Held as one struct so the four are always present or absent together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub minimum: f64,
    pub maximum: f64,
    pub average: f64,
    pub std_deviation: f64,
}

/// Statistics of one metric across the builds of the aggregation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condensed {
    /// Value of the most recent contributing build.
    pub previous: RawValue,
    pub previous_build: Option<u64>,
    pub stats: Option<NumericStats>,
    pub passed: u64,
    pub failed: u64,
}

impl Condensed {
    /// Build from loose fields, rejecting a partial set of statistics.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        previous: RawValue,
        previous_build: Option<u64>,
        minimum: Option<f64>,
        maximum: Option<f64>,
        average: Option<f64>,
        std_deviation: Option<f64>,
        passed: u64,
        failed: u64,
    ) -> MapResult<Self> {
        let stats = match (minimum, maximum, average, std_deviation) {
            (Some(minimum), Some(maximum), Some(average), Some(std_deviation)) => {
                if minimum > maximum || std_deviation < 0.0 {
                    return Err(MapError::validation(
                        "stats",
                        format!("inconsistent statistics: min {} max {} stddev {}", minimum, maximum, std_deviation),
                    ));
                }
                Some(NumericStats { minimum, maximum, average, std_deviation })
            }
            (None, None, None, None) => None,
            _ => {
                return Err(MapError::validation(
                    "stats",
                    "minimum, maximum, average and stdDeviation must be given together",
                ));
            }
        };
        Ok(Self { previous, previous_build, stats, passed, failed })
    }

    pub fn observations(&self) -> u64 {
        self.passed + self.failed
    }
}

/// A typed result leaf with its identity and optional condensed statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultValue {
    pub(crate) parent: Option<GroupId>,
    pub group: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub role: ValueRole,
    pub value: RawValue,
    /// Schema asked for historical statistics on this value.
    pub condense: bool,
    pub pass: Option<PassPolicy>,
    pub condensed: Option<Condensed>,
}

impl ResultValue {
    pub fn new(name: impl Into<String>, value: RawValue) -> Self {
        Self {
            parent: None,
            group: None,
            name: name.into(),
            description: None,
            unit: None,
            role: ValueRole::Result,
            value,
            condense: false,
            pass: None,
            condensed: None,
        }
    }

    pub fn parameter(name: impl Into<String>, value: RawValue) -> Self {
        Self { role: ValueRole::Parameter, ..Self::new(name, value) }
    }

    pub fn with_unit(mut self, unit: Option<String>) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_condense(mut self, condense: bool) -> Self {
        self.condense = condense;
        self
    }

    pub fn with_pass(mut self, pass: Option<PassPolicy>) -> Self {
        self.pass = pass;
        self
    }

    /// Owning group, set once when the value is inserted into a tree.
    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    pub fn is_result(&self) -> bool {
        self.role == ValueRole::Result
    }

    /// Evaluate this observation against its pass rule.
    ///
    /// Booleans pass on `true`; numbers pass their declared comparison, or
    /// unconditionally when none is declared; strings always pass.
    pub fn passed(&self) -> bool {
        match &self.value {
            RawValue::Boolean(b) => *b,
            RawValue::Integer(_) | RawValue::Float(_) => match (self.pass, self.value.as_f64()) {
                (Some(policy), Some(v)) => policy.passes(v),
                _ => true,
            },
            RawValue::String(_) => true,
        }
    }
}

/// Identity of a metric across builds: file label, group path, name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricKey {
    pub file: String,
    pub group: String,
    pub name: String,
}

impl MetricKey {
    pub fn new(file: impl Into<String>, group: impl Into<String>, name: impl Into<String>) -> Self {
        Self { file: file.into(), group: group.into(), name: name.into() }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> =
            [self.file.as_str(), self.group.as_str(), self.name.as_str()].into_iter().filter(|p| !p.is_empty()).collect();
        write!(f, "{}", parts.join(" / "))
    }
}

/// A value together with its metric identity, flattened for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub key: MetricKey,
    pub value: ResultValue,
}
