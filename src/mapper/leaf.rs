//! Leaf coercion and record assembly shared by the schema walkers.
//!
//! Walkers hand each matched leaf to a [`Record`] for the enclosing object;
//! once the object is fully walked the record decides where its values land
//! in the tree.

use super::MapperOptions;
use super::schema_node::{LeafType, NodeKind, Role, SchemaNode};
use crate::error::{MapError, MapResult};
use crate::model::{Condensed, GroupId, RawValue, ResultTree, ResultValue};
use std::borrow::Cow;

/// Primitive content as seen by a walker, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Cow<'a, str>),
    Composite,
}

impl Scalar<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "string",
            Scalar::Composite => "structure",
        }
    }
}

/// Coerce content to the leaf's declared type. `None` means "absent" (null).
pub fn coerce(ty: LeafType, scalar: Scalar<'_>, path: &str, options: &MapperOptions) -> MapResult<Option<RawValue>> {
    let mismatch = |found: &Scalar<'_>| {
        MapError::validation(path, format!("expected {}, found {}", ty.as_str(), found.describe()))
    };

    let value = match (ty, scalar) {
        (_, Scalar::Null) => return Ok(None),
        (_, s @ Scalar::Composite) => return Err(mismatch(&s)),

        (LeafType::Boolean, Scalar::Bool(b)) => RawValue::Boolean(b),
        (LeafType::Boolean, Scalar::Text(t)) => match t.trim().to_ascii_lowercase().as_str() {
            "true" => RawValue::Boolean(true),
            "false" => RawValue::Boolean(false),
            _ => return Err(mismatch(&Scalar::Text(t))),
        },

        (LeafType::Integer, Scalar::Int(i)) => RawValue::Integer(i),
        (LeafType::Integer, Scalar::Text(t)) => match t.trim().parse::<i64>() {
            Ok(i) => RawValue::Integer(i),
            Err(_) => return Err(mismatch(&Scalar::Text(t))),
        },

        (LeafType::Float, Scalar::Int(i)) => RawValue::Float(i as f64),
        (LeafType::Float, Scalar::Float(f)) => RawValue::Float(finite(f, path)?),
        (LeafType::Float, Scalar::Text(t)) => match t.trim().parse::<f64>() {
            Ok(f) => RawValue::Float(finite(f, path)?),
            Err(_) => return Err(mismatch(&Scalar::Text(t))),
        },

        (LeafType::String, Scalar::Text(t)) => RawValue::String(t.into_owned()),

        (LeafType::Any, Scalar::Bool(b)) => RawValue::Boolean(b),
        (LeafType::Any, Scalar::Int(i)) => RawValue::Integer(i),
        (LeafType::Any, Scalar::Float(f)) => RawValue::Float(finite(f, path)?),
        (LeafType::Any, Scalar::Text(t)) => RawValue::String(t.into_owned()),

        (_, other) => return Err(mismatch(&other)),
    };

    Ok(Some(truncate(value, options)))
}

/// NaN and infinities parse as `xs:double` but cannot be condensed or persisted.
fn finite(value: f64, path: &str) -> MapResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MapError::validation(path, format!("expected finite float, found {}", value)))
    }
}

/// Apply the string truncation policy; numbers and booleans are never touched.
pub fn truncate(value: RawValue, options: &MapperOptions) -> RawValue {
    match (value, options.truncate_strings) {
        (RawValue::String(s), Some(max)) if s.chars().count() > max => RawValue::String(s.chars().take(max).collect()),
        (value, _) => value,
    }
}

/// Text form of a scalar for labels and pass-through parameters.
pub fn scalar_text(scalar: &Scalar<'_>) -> Option<String> {
    match scalar {
        Scalar::Null | Scalar::Composite => None,
        Scalar::Bool(b) => Some(b.to_string()),
        Scalar::Int(i) => Some(i.to_string()),
        Scalar::Float(f) => Some(f.to_string()),
        Scalar::Text(t) => Some(t.to_string()),
    }
}

#[derive(Debug, Default)]
struct StatFields {
    minimum: Option<f64>,
    maximum: Option<f64>,
    average: Option<f64>,
    std_deviation: Option<f64>,
    passed: Option<u64>,
    failed: Option<u64>,
    build: Option<u64>,
}

impl StatFields {
    fn any(&self) -> bool {
        self.minimum.is_some()
            || self.maximum.is_some()
            || self.average.is_some()
            || self.std_deviation.is_some()
            || self.passed.is_some()
            || self.failed.is_some()
    }
}

/// Leaves collected from one content object.
#[derive(Debug, Default)]
pub struct Record {
    name: Option<String>,
    groups: Vec<String>,
    unit: Option<String>,
    description: Option<String>,
    results: Vec<ResultValue>,
    parameters: Vec<ResultValue>,
    stats: StatFields,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a coerced leaf according to its schema role.
    pub fn push(&mut self, node: &SchemaNode, value: RawValue, path: &str) -> MapResult<()> {
        let NodeKind::Leaf { role, .. } = node.kind else {
            return Err(MapError::Config(format!("schema {}: not a leaf", path)));
        };
        let number = |v: &RawValue| {
            v.as_f64().ok_or_else(|| MapError::validation(path, format!("{} requires a number", node.name)))
        };
        let count = |v: &RawValue| match v {
            RawValue::Integer(i) if *i >= 0 => Ok(*i as u64),
            _ => Err(MapError::validation(path, format!("{} requires a non-negative integer", node.name))),
        };

        match role {
            Role::Result => self.results.push(leaf_value(node, value, false)),
            Role::Parameter => self.parameters.push(leaf_value(node, value, true)),
            Role::Name => self.name = Some(value.to_string()),
            Role::Group => self.groups.push(value.to_string()),
            Role::Unit => self.unit = Some(value.to_string()),
            Role::Description => self.description = Some(value.to_string()),
            Role::Minimum => self.stats.minimum = Some(number(&value)?),
            Role::Maximum => self.stats.maximum = Some(number(&value)?),
            Role::Average => self.stats.average = Some(number(&value)?),
            Role::StdDeviation => self.stats.std_deviation = Some(number(&value)?),
            Role::Passed => self.stats.passed = Some(count(&value)?),
            Role::Failed => self.stats.failed = Some(count(&value)?),
            Role::Build => self.stats.build = Some(count(&value)?),
        }
        Ok(())
    }

    /// Undeclared content key passed through as an untyped string parameter.
    pub fn push_additional(&mut self, key: &str, text: String, options: &MapperOptions) {
        let value = truncate(RawValue::String(text), options);
        self.parameters.push(ResultValue::parameter(key, value));
    }

    /// True when the record is a single named measurement.
    fn collapses(&self) -> bool {
        self.name.is_some() && self.results.len() == 1 && self.parameters.is_empty()
    }

    /// Place the record's values into `tree`.
    ///
    /// `label` is the default group label for the object (`None` for the
    /// document root); a `name` leaf overrides it unless `keyed` is set.
    /// Returns the group that nested composites of this object belong in.
    pub fn finish(
        mut self,
        tree: &mut ResultTree,
        parent: GroupId,
        label: Option<String>,
        keyed: bool,
        has_composites: bool,
        path: &str,
    ) -> MapResult<GroupId> {
        let mut target = parent;
        for group in std::mem::take(&mut self.groups) {
            target = tree.group_entry(target, &group)?;
        }

        let condensed = self.condensed(path)?;

        if self.collapses() && !has_composites {
            let mut value = self.results.remove(0);
            if let Some(name) = self.name.take() {
                value.name = name;
            }
            self.decorate(&mut value);
            value.condensed = condensed;
            tree.add_value(target, value)?;
            return Ok(target);
        }

        let label = if keyed { label.or(self.name.take()) } else { self.name.take().or(label) };
        let group = match label {
            Some(label) => tree.group_entry(target, &label)?,
            None => target,
        };

        let single = self.results.len() == 1;
        for mut value in std::mem::take(&mut self.results) {
            self.decorate(&mut value);
            if single {
                value.condensed = condensed.clone();
            }
            tree.add_value(group, value)?;
        }
        for value in std::mem::take(&mut self.parameters) {
            tree.add_value(group, value)?;
        }
        Ok(group)
    }

    fn decorate(&self, value: &mut ResultValue) {
        if value.unit.is_none() {
            value.unit = self.unit.clone();
        }
        if value.description.is_none() {
            value.description = self.description.clone();
        }
    }

    fn condensed(&self, path: &str) -> MapResult<Option<Condensed>> {
        if !self.stats.any() {
            return Ok(None);
        }
        let previous = self
            .results
            .first()
            .map(|v| v.value.clone())
            .ok_or_else(|| MapError::validation(path, "statistics given without a result value"))?;
        let s = &self.stats;
        Condensed::from_parts(
            previous,
            s.build,
            s.minimum,
            s.maximum,
            s.average,
            s.std_deviation,
            s.passed.unwrap_or(0),
            s.failed.unwrap_or(0),
        )
        .map(Some)
        .map_err(|e| match e {
            MapError::Validation { reason, .. } => MapError::validation(path, reason),
            other => other,
        })
    }
}

/// Value for one element of an array of leaves, named by its label.
pub fn element_value(node: &SchemaNode, value: RawValue, label: String) -> ResultValue {
    let parameter = matches!(node.kind, NodeKind::Leaf { role: Role::Parameter, .. });
    let mut value = leaf_value(node, value, parameter);
    value.name = label;
    value
}

fn leaf_value(node: &SchemaNode, value: RawValue, parameter: bool) -> ResultValue {
    let value = if parameter {
        ResultValue::parameter(node.name.clone(), value)
    } else {
        ResultValue::new(node.name.clone(), value)
    };
    value
        .with_unit(node.unit.clone())
        .with_description(node.description.clone())
        .with_condense(node.condensed && !parameter)
        .with_pass(node.pass)
}
