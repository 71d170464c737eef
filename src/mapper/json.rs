//! JSON schema / JSON content walker.

use super::leaf::{Record, Scalar, coerce, element_value, scalar_text};
use super::schema_node::{NodeKind, SchemaNode};
use super::{MapperOptions, ResultMapper};
use crate::error::{MapError, MapResult};
use crate::model::{GroupId, ResultTree};
use log::debug;
use serde_json::Value as Json;
use std::borrow::Cow;

#[derive(Debug)]
pub struct JsonMapper {
    schema: SchemaNode,
    options: MapperOptions,
}

impl JsonMapper {
    /// Compile a mapper from a JSON schema document.
    pub fn new(schema_doc: &str, options: MapperOptions) -> MapResult<Self> {
        let doc: Json = serde_json::from_str(schema_doc)
            .map_err(|e| MapError::Config(format!("schema is not valid JSON: {}", e)))?;
        Self::from_schema_value(&doc, options)
    }

    pub fn from_schema_value(doc: &Json, options: MapperOptions) -> MapResult<Self> {
        Ok(Self { schema: SchemaNode::from_json(doc)?, options })
    }

    /// Map an already-parsed content document.
    pub fn map_value(&self, content: &Json) -> MapResult<ResultTree> {
        let mut tree = ResultTree::new();
        if content.is_null() {
            return Ok(tree);
        }
        let root = tree.root();
        self.walk(&self.schema, content, &mut tree, root, None, false, "$")?;
        debug!("mapped JSON document: {} results, {} parameters", tree.number_of_results(), tree.number_of_parameters());
        Ok(tree)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        node: &SchemaNode,
        content: &Json,
        tree: &mut ResultTree,
        parent: GroupId,
        label: Option<String>,
        keyed: bool,
        path: &str,
    ) -> MapResult<()> {
        match &node.kind {
            NodeKind::Object { children, additional } => {
                self.walk_object(children, *additional, content, tree, parent, label, keyed, path)
            }
            NodeKind::Array { items, key } => {
                let elements = content
                    .as_array()
                    .ok_or_else(|| MapError::validation(path, format!("expected array, found {}", describe(content))))?;
                let container = match label {
                    Some(label) => tree.group_entry(parent, &label)?,
                    None => parent,
                };
                for (index, element) in elements.iter().enumerate() {
                    let element_path = format!("{}[{}]", path, index);
                    let element_label = match key {
                        Some(key) => key_label(element, key, &element_path)?,
                        None => index.to_string(),
                    };
                    match &items.kind {
                        NodeKind::Leaf { ty, .. } => {
                            if let Some(value) = coerce(*ty, scalar(element), &element_path, &self.options)? {
                                tree.add_value(container, element_value(items, value, element_label))?;
                            }
                        }
                        _ => self.walk(items, element, tree, container, Some(element_label), key.is_some(), &element_path)?,
                    }
                }
                Ok(())
            }
            NodeKind::Leaf { .. } => Err(MapError::Config(format!("schema {}: a leaf cannot be walked as a node", path))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_object(
        &self,
        children: &[SchemaNode],
        additional: bool,
        content: &Json,
        tree: &mut ResultTree,
        parent: GroupId,
        label: Option<String>,
        keyed: bool,
        path: &str,
    ) -> MapResult<()> {
        let object = content
            .as_object()
            .ok_or_else(|| MapError::validation(path, format!("expected object, found {}", describe(content))))?;

        let mut record = Record::new();
        let mut composites = Vec::new();

        for child in children {
            let key = child.content_key();
            let child_path = format!("{}.{}", path, key);
            let value = match object.get(key) {
                None | Some(Json::Null) if child.required => return Err(MapError::missing(child_path)),
                None | Some(Json::Null) => continue,
                Some(value) => value,
            };
            match &child.kind {
                NodeKind::Leaf { ty, .. } => {
                    if let Some(raw) = coerce(*ty, scalar(value), &child_path, &self.options)? {
                        record.push(child, raw, &child_path)?;
                    }
                }
                _ => composites.push((child, value, child_path)),
            }
        }

        for (key, value) in object {
            if children.iter().any(|c| c.content_key() == key) {
                continue;
            }
            if !additional {
                return Err(MapError::validation(format!("{}.{}", path, key), "property not declared in schema"));
            }
            let text = scalar_text(&scalar(value)).unwrap_or_else(|| value.to_string());
            record.push_additional(key, text, &self.options);
        }

        let group = record.finish(tree, parent, label, keyed, !composites.is_empty(), path)?;
        for (child, value, child_path) in composites {
            self.walk(child, value, tree, group, Some(child.name.clone()), false, &child_path)?;
        }
        Ok(())
    }
}

impl ResultMapper for JsonMapper {
    fn format_name(&self) -> &'static str {
        "JSON"
    }

    fn map(&self, content: &str) -> MapResult<ResultTree> {
        if content.trim().is_empty() {
            return Ok(ResultTree::new());
        }
        let doc: Json =
            serde_json::from_str(content).map_err(|e| MapError::Parse { format: "JSON", detail: e.to_string() })?;
        self.map_value(&doc)
    }
}

fn scalar(value: &Json) -> Scalar<'_> {
    match value {
        Json::Null => Scalar::Null,
        Json::Bool(b) => Scalar::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Scalar::Int(i),
            None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Scalar::Text(Cow::Borrowed(s)),
        Json::Array(_) | Json::Object(_) => Scalar::Composite,
    }
}

fn describe(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn key_label(element: &Json, key: &str, path: &str) -> MapResult<String> {
    element
        .get(key)
        .and_then(|v| scalar_text(&scalar(v)))
        .ok_or_else(|| MapError::validation(path, format!("element has no key field '{}'", key)))
}
