//! Format-neutral schema tree compiled from a JSON schema or an XSD subset.

use super::xml_dom::Element;
use crate::error::{MapError, MapResult};
use crate::model::PassPolicy;
use serde_json::Value as Json;
use std::str::FromStr;

/// Declared type of a schema leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    Boolean,
    Integer,
    Float,
    String,
    /// Take whatever primitive the content holds.
    Any,
}

impl LeafType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeafType::Boolean => "boolean",
            LeafType::Integer => "integer",
            LeafType::Float => "float",
            LeafType::String => "string",
            LeafType::Any => "any",
        }
    }

    fn parse(name: &str) -> Option<LeafType> {
        let name = name.rsplit(':').next().unwrap_or(name);
        match name {
            "boolean" | "bool" => Some(LeafType::Boolean),
            "integer" | "int" | "long" | "short" | "byte" | "unsignedInt" | "unsignedLong" | "nonNegativeInteger" => {
                Some(LeafType::Integer)
            }
            "number" | "float" | "double" | "decimal" => Some(LeafType::Float),
            "string" | "token" | "normalizedString" | "dateTime" | "date" | "anyURI" => Some(LeafType::String),
            "any" | "anySimpleType" => Some(LeafType::Any),
            _ => None,
        }
    }
}

/// What a leaf contributes to its enclosing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Result,
    Parameter,
    Name,
    Group,
    Unit,
    Description,
    Minimum,
    Maximum,
    Average,
    StdDeviation,
    Passed,
    Failed,
    Build,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "result" | "value" | "previous" => Ok(Role::Result),
            "parameter" => Ok(Role::Parameter),
            "name" => Ok(Role::Name),
            "group" => Ok(Role::Group),
            "unit" => Ok(Role::Unit),
            "description" => Ok(Role::Description),
            "minimum" => Ok(Role::Minimum),
            "maximum" => Ok(Role::Maximum),
            "average" => Ok(Role::Average),
            "stdDeviation" => Ok(Role::StdDeviation),
            "passed" => Ok(Role::Passed),
            "failed" => Ok(Role::Failed),
            "build" => Ok(Role::Build),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Object {
        children: Vec<SchemaNode>,
        /// Undeclared content keys pass through as string parameters.
        additional: bool,
    },
    Array {
        items: Box<SchemaNode>,
        /// Content field whose value labels each element's group.
        key: Option<String>,
    },
    Leaf {
        ty: LeafType,
        role: Role,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Display name.
    pub name: String,
    /// Content key when it differs from the display name.
    pub mapped: Option<String>,
    pub kind: NodeKind,
    pub required: bool,
    /// XML only: matched against an attribute rather than a child element.
    pub attribute: bool,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub condensed: bool,
    pub pass: Option<PassPolicy>,
}

impl SchemaNode {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            mapped: None,
            kind,
            required: false,
            attribute: false,
            unit: None,
            description: None,
            condensed: false,
            pass: None,
        }
    }

    pub fn content_key(&self) -> &str {
        self.mapped.as_deref().unwrap_or(&self.name)
    }

    pub fn is_composite(&self) -> bool {
        !matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Compile a JSON schema document.
    pub fn from_json(doc: &Json) -> MapResult<SchemaNode> {
        let mut root = parse_json_node("", doc, "$")?;
        root.required = true;
        if !root.is_composite() {
            return Err(MapError::Config("JSON schema root must be an object or array".to_string()));
        }
        Ok(root)
    }

    /// Compile an XSD-subset schema document rooted at `xs:schema`.
    pub fn from_xsd(doc: &Element) -> MapResult<SchemaNode> {
        if doc.local_name() != "schema" {
            return Err(MapError::Config(format!("XML schema root must be xs:schema, found <{}>", doc.name)));
        }
        let root = doc
            .children
            .iter()
            .find(|c| c.local_name() == "element")
            .ok_or_else(|| MapError::Config("xs:schema declares no root element".to_string()))?;
        let mut node = parse_xsd_element(root, "")?;
        node.required = true;
        if !matches!(node.kind, NodeKind::Object { .. }) {
            return Err(MapError::Config(format!("root element '{}' must have a complexType", node.name)));
        }
        Ok(node)
    }
}

fn config_err(path: &str, detail: impl std::fmt::Display) -> MapError {
    MapError::Config(format!("schema {}: {}", path, detail))
}

fn parse_json_node(name: &str, spec: &Json, path: &str) -> MapResult<SchemaNode> {
    let obj = spec.as_object().ok_or_else(|| config_err(path, "schema node must be an object"))?;

    let declared = obj.get("type").and_then(Json::as_str);
    let ty = match declared {
        Some(t) => t,
        None if obj.contains_key("properties") => "object",
        None if obj.contains_key("items") => "array",
        None => return Err(config_err(path, "missing \"type\"")),
    };

    let kind = match ty {
        "object" => {
            let required: Vec<&str> = match obj.get("required") {
                Some(Json::Array(list)) => list.iter().filter_map(Json::as_str).collect(),
                _ => Vec::new(),
            };
            let mut children = Vec::new();
            if let Some(props) = obj.get("properties") {
                let props = props.as_object().ok_or_else(|| config_err(path, "\"properties\" must be an object"))?;
                for (child_name, child_spec) in props {
                    let mut child = parse_json_node(child_name, child_spec, &format!("{}.{}", path, child_name))?;
                    child.required |= required.contains(&child_name.as_str());
                    children.push(child);
                }
            }
            let additional = obj.get("additionalProperties").and_then(Json::as_bool).unwrap_or(false);
            NodeKind::Object { children, additional }
        }
        "array" => {
            let items = obj.get("items").ok_or_else(|| config_err(path, "array without \"items\""))?;
            let items = parse_json_node(name, items, &format!("{}[]", path))?;
            let key = obj.get("key").and_then(Json::as_str).map(str::to_string);
            NodeKind::Array { items: Box::new(items), key }
        }
        other => {
            let ty = LeafType::parse(other).ok_or_else(|| config_err(path, format!("unknown type '{}'", other)))?;
            let role = match obj.get("role").and_then(Json::as_str) {
                Some(r) => r.parse().map_err(|e| config_err(path, e))?,
                None => Role::Result,
            };
            NodeKind::Leaf { ty, role }
        }
    };

    let mut node = SchemaNode::new(name, kind);
    node.required = obj.get("required").and_then(Json::as_bool).unwrap_or(false);
    node.mapped = obj.get("mapped").and_then(Json::as_str).map(str::to_string);
    node.unit = obj.get("unit").and_then(Json::as_str).map(str::to_string);
    node.description = obj.get("description").and_then(Json::as_str).map(str::to_string);
    node.condensed = obj.get("condensed").and_then(Json::as_bool).unwrap_or(false);
    node.pass = match obj.get("pass") {
        None => None,
        Some(Json::String(rule)) => Some(PassPolicy::parse(rule).map_err(|e| config_err(path, e))?),
        Some(rule) => Some(
            serde_json::from_value::<PassPolicy>(rule.clone())
                .map_err(|e| config_err(path, format!("invalid pass rule: {}", e)))?,
        ),
    };
    Ok(node)
}

fn parse_xsd_element(el: &Element, parent_path: &str) -> MapResult<SchemaNode> {
    let name = el.attr("name").ok_or_else(|| config_err(parent_path, "xs:element without a name"))?;
    let path = format!("{}/{}", parent_path, name);

    let complex = el.children.iter().find(|c| c.local_name() == "complexType");
    let kind = match complex {
        Some(ct) => {
            let mut children = Vec::new();
            let mut additional = false;
            collect_xsd_members(ct, &path, &mut children, &mut additional)?;
            NodeKind::Object { children, additional }
        }
        None => {
            let ty = match el.attr("type") {
                Some(t) => LeafType::parse(t).ok_or_else(|| config_err(&path, format!("unsupported type '{}'", t)))?,
                None => LeafType::String,
            };
            NodeKind::Leaf { ty, role: xsd_role(el, &path)? }
        }
    };

    let mut node = SchemaNode::new(name, kind);
    apply_xsd_metadata(&mut node, el, &path)?;
    node.required = el.attr("minOccurs") != Some("0");

    let repeated = match el.attr("maxOccurs") {
        None => false,
        Some("unbounded") => true,
        Some(n) => n.parse::<u64>().map_err(|_| config_err(&path, format!("bad maxOccurs '{}'", n)))? > 1,
    };
    if repeated {
        let (name, mapped, required) = (node.name.clone(), node.mapped.clone(), node.required);
        node.required = true;
        let key = el.attr("key").map(str::to_string);
        let mut array = SchemaNode::new(name, NodeKind::Array { items: Box::new(node), key });
        array.mapped = mapped;
        array.required = required;
        return Ok(array);
    }
    Ok(node)
}

fn collect_xsd_members(
    container: &Element,
    path: &str,
    children: &mut Vec<SchemaNode>,
    additional: &mut bool,
) -> MapResult<()> {
    for member in &container.children {
        match member.local_name() {
            "sequence" | "all" | "choice" => collect_xsd_members(member, path, children, additional)?,
            "element" => children.push(parse_xsd_element(member, path)?),
            "attribute" => {
                let name = member.attr("name").ok_or_else(|| config_err(path, "xs:attribute without a name"))?;
                let attr_path = format!("{}/@{}", path, name);
                let ty = match member.attr("type") {
                    Some(t) => {
                        LeafType::parse(t).ok_or_else(|| config_err(&attr_path, format!("unsupported type '{}'", t)))?
                    }
                    None => LeafType::String,
                };
                let mut node = SchemaNode::new(name, NodeKind::Leaf { ty, role: xsd_role(member, &attr_path)? });
                apply_xsd_metadata(&mut node, member, &attr_path)?;
                node.attribute = true;
                node.required = member.attr("use") == Some("required");
                children.push(node);
            }
            "any" | "anyAttribute" => *additional = true,
            _ => {}
        }
    }
    Ok(())
}

fn xsd_role(el: &Element, path: &str) -> MapResult<Role> {
    match el.attr("role") {
        Some(r) => r.parse().map_err(|e| config_err(path, e)),
        None => Ok(Role::Result),
    }
}

fn apply_xsd_metadata(node: &mut SchemaNode, el: &Element, path: &str) -> MapResult<()> {
    node.mapped = el.attr("mapped").map(str::to_string);
    node.unit = el.attr("unit").map(str::to_string);
    node.description = el.attr("description").map(str::to_string);
    node.condensed = el.attr("condensed").is_some_and(|v| v == "true");
    node.pass = match el.attr("pass") {
        Some(rule) => Some(PassPolicy::parse(rule).map_err(|e| config_err(path, e))?),
        None => None,
    };
    Ok(())
}
