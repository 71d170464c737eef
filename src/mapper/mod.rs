//! Schema-driven mappers: turn a content document into a `ResultTree`.
//!
//! Every mapper implements [`ResultMapper`], whose only contract is
//! "document text in, grouping tree out". Format-specific walking stays
//! behind that trait:
//!
//! - `json` - JSON schema walked in lock-step with JSON content
//! - `xml` - XSD-subset schema walked in lock-step with XML content
//! - `junit` - fixed mapping for JUnit reports, no schema document
//!
//! `schema_node` compiles either schema dialect into one neutral tree and
//! `leaf` holds the coercion and record-placement rules shared by the walkers.

mod json;
mod junit;
mod leaf;
mod schema_node;
mod xml;
mod xml_dom;

pub use json::JsonMapper;
pub use junit::{JUNIT_RESULT_FILE, JUnitMapper};
pub use schema_node::{LeafType, NodeKind, Role, SchemaNode};
pub use xml::XmlMapper;
pub use xml_dom::Element;

use crate::error::{MapError, MapResult};
use crate::model::ResultTree;
use crate::schema::{Format, Schema};
use log::debug;
use std::fs;
use std::path::Path;

/// Mapping policy shared by all walkers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapperOptions {
    /// Cut string values to at most this many characters.
    pub truncate_strings: Option<usize>,
}

/// A document walker producing the result model.
pub trait ResultMapper: Send + Sync {
    /// Human-readable format label for logs.
    fn format_name(&self) -> &'static str;

    /// Map one content document. Empty documents give an empty tree.
    fn map(&self, content: &str) -> MapResult<ResultTree>;

    /// Read and map a content file.
    fn map_file(&self, path: &Path) -> MapResult<ResultTree> {
        let content =
            fs::read_to_string(path).map_err(|source| MapError::Io { path: path.to_path_buf(), source })?;
        self.map(&content)
    }
}

/// Build the mapper `schema` describes for `format`.
///
/// Format bits are checked before the schema document is read, so a
/// misconfigured schema fails without touching any content.
pub fn build_mapper(schema: &Schema, format: Format, options: MapperOptions) -> MapResult<Box<dyn ResultMapper>> {
    schema.require(format)?;
    let document = schema.read_document()?;
    build_mapper_from_str(schema, format, &document, options)
}

/// Like [`build_mapper`] but with the schema document supplied in memory.
pub fn build_mapper_from_str(
    schema: &Schema,
    format: Format,
    document: &str,
    options: MapperOptions,
) -> MapResult<Box<dyn ResultMapper>> {
    schema.require(format)?;
    debug!("building {} mapper for schema '{}'", format.as_str(), schema.name());
    match format {
        Format::Json => Ok(Box::new(JsonMapper::new(document, options)?)),
        Format::Xml => Ok(Box::new(XmlMapper::new(document, options)?)),
    }
}

#[cfg(test)]
#[path = "mapper_test.rs"]
mod mapper_test;
