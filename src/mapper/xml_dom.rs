//! Minimal element tree built from `quick-xml` events.

use crate::error::{MapError, MapResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Tag name without a namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed text of a named child element.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }
}

/// Parse a document; `None` when it holds no root element.
pub fn parse(xml: &str) -> MapResult<Option<Element>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(start_element(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = start_element(e)?;
                close(element, &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| parse_err("unbalanced end tag"))?;
                close(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| parse_err(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_err(format!("at byte {}: {}", reader.buffer_position(), e))),
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(parse_err("unexpected end of document"));
    }
    Ok(root)
}

fn start_element(e: &BytesStart<'_>) -> MapResult<Element> {
    let mut element = Element { name: String::from_utf8_lossy(e.name().as_ref()).into_owned(), ..Default::default() };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| parse_err(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| parse_err(e.to_string()))?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn close(element: Element, stack: &mut [Element], root: &mut Option<Element>) -> MapResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(parse_err("more than one root element")),
    }
    Ok(())
}

fn parse_err(detail: impl Into<String>) -> MapError {
    MapError::Parse { format: "XML", detail: detail.into() }
}
