//! XSD-subset schema / XML content walker.

use super::leaf::{Record, Scalar, coerce, element_value};
use super::schema_node::{LeafType, NodeKind, SchemaNode};
use super::xml_dom::{self, Element};
use super::{MapperOptions, ResultMapper};
use crate::error::{MapError, MapResult};
use crate::model::{GroupId, ResultTree};
use log::debug;
use std::borrow::Cow;

#[derive(Debug)]
pub struct XmlMapper {
    schema: SchemaNode,
    options: MapperOptions,
}

impl XmlMapper {
    /// Compile a mapper from an `xs:schema` document.
    pub fn new(schema_doc: &str, options: MapperOptions) -> MapResult<Self> {
        let doc = xml_dom::parse(schema_doc)
            .map_err(|e| MapError::Config(format!("schema is not valid XML: {}", e)))?
            .ok_or_else(|| MapError::Config("schema document is empty".to_string()))?;
        Ok(Self { schema: SchemaNode::from_xsd(&doc)?, options })
    }

    /// Map an already-parsed content element.
    pub fn map_element(&self, root: &Element) -> MapResult<ResultTree> {
        let mut tree = ResultTree::new();
        let path = format!("/{}", self.schema.content_key());
        if root.name != self.schema.content_key() {
            return Err(MapError::validation(
                path,
                format!("expected root element <{}>, found <{}>", self.schema.content_key(), root.name),
            ));
        }
        let NodeKind::Object { children, additional } = &self.schema.kind else {
            return Err(MapError::Config("XML schema root must be a complex element".to_string()));
        };
        let group = tree.root();
        self.walk_object(children, *additional, root, &mut tree, group, None, false, &path)?;
        debug!("mapped XML document: {} results, {} parameters", tree.number_of_results(), tree.number_of_parameters());
        Ok(tree)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_object(
        &self,
        children: &[SchemaNode],
        additional: bool,
        element: &Element,
        tree: &mut ResultTree,
        parent: GroupId,
        label: Option<String>,
        keyed: bool,
        path: &str,
    ) -> MapResult<()> {
        let mut record = Record::new();
        let mut composites: Vec<(&SchemaNode, Vec<&Element>, String)> = Vec::new();

        for child in children {
            let key = child.content_key();

            if child.attribute {
                let child_path = format!("{}/@{}", path, key);
                let NodeKind::Leaf { ty, .. } = child.kind else { continue };
                match element.attr(key) {
                    Some(text) => self.push_text(&mut record, child, ty, text, &child_path)?,
                    None if child.required => return Err(MapError::missing(child_path)),
                    None => {}
                }
                continue;
            }

            let child_path = format!("{}/{}", path, key);
            match &child.kind {
                NodeKind::Leaf { ty, .. } => match single(element, key, &child_path)? {
                    Some(found) => {
                        if !found.children.is_empty() {
                            return Err(MapError::validation(child_path, "expected text, found nested elements"));
                        }
                        self.push_text(&mut record, child, *ty, &found.text, &child_path)?
                    }
                    None if child.required => return Err(MapError::missing(child_path)),
                    None => {}
                },
                NodeKind::Object { .. } => match single(element, key, &child_path)? {
                    Some(found) => composites.push((child, vec![found], child_path)),
                    None if child.required => return Err(MapError::missing(child_path)),
                    None => {}
                },
                NodeKind::Array { items, .. } => {
                    let found: Vec<&Element> = element.children_named(items.content_key()).collect();
                    if found.is_empty() && child.required {
                        return Err(MapError::missing(child_path));
                    }
                    composites.push((child, found, child_path));
                }
            }
        }

        self.collect_additional(children, additional, element, &mut record, path)?;

        let group = record.finish(tree, parent, label, keyed, !composites.is_empty(), path)?;
        for (child, elements, child_path) in composites {
            match &child.kind {
                NodeKind::Object { children, additional } => {
                    let name = Some(child.name.clone());
                    self.walk_object(children, *additional, elements[0], tree, group, name, false, &child_path)?;
                }
                NodeKind::Array { items, key } => {
                    let container = tree.group_entry(group, &child.name)?;
                    for (index, found) in elements.into_iter().enumerate() {
                        let element_path = format!("{}[{}]", child_path, index);
                        let element_label = key
                            .as_deref()
                            .and_then(|k| found.attr(k).or_else(|| found.child_text(k)))
                            .map(str::to_string)
                            .unwrap_or_else(|| index.to_string());
                        match &items.kind {
                            NodeKind::Leaf { ty, .. } => {
                                if let Some(value) = coerce(*ty, text_scalar(*ty, &found.text), &element_path, &self.options)? {
                                    tree.add_value(container, element_value(items, value, element_label))?;
                                }
                            }
                            NodeKind::Object { children, additional } => self.walk_object(
                                children,
                                *additional,
                                found,
                                tree,
                                container,
                                Some(element_label),
                                key.is_some(),
                                &element_path,
                            )?,
                            NodeKind::Array { .. } => {
                                return Err(MapError::Config(format!("schema {}: nested repeats are not supported", element_path)));
                            }
                        }
                    }
                }
                NodeKind::Leaf { .. } => {}
            }
        }
        Ok(())
    }

    fn push_text(&self, record: &mut Record, node: &SchemaNode, ty: LeafType, text: &str, path: &str) -> MapResult<()> {
        match coerce(ty, text_scalar(ty, text), path, &self.options)? {
            Some(value) => record.push(node, value, path),
            None if node.required => Err(MapError::missing(path)),
            None => Ok(()),
        }
    }

    fn collect_additional(
        &self,
        children: &[SchemaNode],
        additional: bool,
        element: &Element,
        record: &mut Record,
        path: &str,
    ) -> MapResult<()> {
        let declared = |name: &str, attribute: bool| {
            children.iter().any(|c| {
                let key = match &c.kind {
                    NodeKind::Array { items, .. } => items.content_key(),
                    _ => c.content_key(),
                };
                c.attribute == attribute && key == name
            })
        };

        for (name, value) in &element.attributes {
            if name.starts_with("xmlns") || name.starts_with("xsi:") || declared(name, true) {
                continue;
            }
            if !additional {
                return Err(MapError::validation(format!("{}/@{}", path, name), "attribute not declared in schema"));
            }
            record.push_additional(name, value.clone(), &self.options);
        }

        for child in &element.children {
            if declared(&child.name, false) {
                continue;
            }
            if !additional {
                return Err(MapError::validation(format!("{}/{}", path, child.name), "element not declared in schema"));
            }
            record.push_additional(&child.name, child.text.trim().to_string(), &self.options);
        }
        Ok(())
    }
}

impl ResultMapper for XmlMapper {
    fn format_name(&self) -> &'static str {
        "XML"
    }

    fn map(&self, content: &str) -> MapResult<ResultTree> {
        match xml_dom::parse(content)? {
            Some(root) => self.map_element(&root),
            None => Ok(ResultTree::new()),
        }
    }
}

/// Empty element text counts as absent for every type but string.
fn text_scalar(ty: LeafType, text: &str) -> Scalar<'_> {
    let text = text.trim();
    if text.is_empty() && ty != LeafType::String {
        Scalar::Null
    } else {
        Scalar::Text(Cow::Borrowed(text))
    }
}

fn single<'a>(element: &'a Element, name: &str, path: &str) -> MapResult<Option<&'a Element>> {
    let mut found = element.children.iter().filter(|c| c.name == name);
    let first = found.next();
    if found.next().is_some() {
        return Err(MapError::validation(path, "expected a single element, found several"));
    }
    Ok(first)
}
