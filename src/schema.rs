//! Schema model: an immutable description of an expected result resource.
//!
//! A `Schema` names where the schema document lives and which document
//! formats it may drive. Mapper selection goes through [`Schema::require`],
//! so a mapper is never built for a format whose bit is not set.

use crate::error::{MapError, MapResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Document format understood by the mappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Xml,
    Json,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Xml => "XML",
            Format::Json => "JSON",
        }
    }

    /// Guess a format from a file extension (`.json`, `.xml`, `.xsd`).
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Format::Json),
            "xml" | "xsd" => Some(Format::Xml),
            _ => None,
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Format::Xml => FormatMask::XML.0,
            Format::Json => FormatMask::JSON.0,
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            other => Err(format!("unknown format '{}' (expected json or xml)", other)),
        }
    }
}

/// Bit set over {None, XML, JSON}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormatMask(u8);

impl FormatMask {
    pub const NONE: FormatMask = FormatMask(0);
    pub const XML: FormatMask = FormatMask(0b01);
    pub const JSON: FormatMask = FormatMask(0b10);

    pub fn of(formats: &[Format]) -> Self {
        FormatMask(formats.iter().fold(0, |bits, f| bits | f.bit()))
    }

    pub fn contains(&self, format: Format) -> bool {
        self.0 & format.bit() != 0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: FormatMask) -> FormatMask {
        FormatMask(self.0 | other.0)
    }
}

impl fmt::Display for FormatMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "None");
        }
        let labels: Vec<&str> =
            [Format::Xml, Format::Json].iter().filter(|fmt| self.contains(**fmt)).map(|fmt| fmt.as_str()).collect();
        write!(f, "{}", labels.join("|"))
    }
}

/// Immutable description of an expected result resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    location: PathBuf,
    description: Option<String>,
    formats: FormatMask,
}

impl Schema {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<PathBuf>,
        description: Option<String>,
        formats: FormatMask,
    ) -> Self {
        Self { name: name.into(), location: location.into(), description, formats }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn formats(&self) -> FormatMask {
        self.formats
    }

    /// Active format bits rendered as a pipe-joined label, e.g. `XML|JSON`.
    pub fn get_format(&self) -> String {
        self.formats.to_string()
    }

    /// Fail with a configuration error unless `format` is enabled for this schema.
    pub fn require(&self, format: Format) -> MapResult<()> {
        if self.formats.is_none() {
            return Err(MapError::Config(format!("schema '{}' declares no format", self.name)));
        }
        if !self.formats.contains(format) {
            return Err(MapError::Config(format!(
                "schema '{}' supports {} but {} was requested",
                self.name,
                self.get_format(),
                format.as_str()
            )));
        }
        Ok(())
    }

    /// Read the schema document from its location.
    pub fn read_document(&self) -> MapResult<String> {
        fs::read_to_string(&self.location)
            .map_err(|e| MapError::Config(format!("cannot read schema {}: {}", self.location.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_label() {
        assert_eq!(FormatMask::NONE.to_string(), "None");
        assert_eq!(FormatMask::JSON.to_string(), "JSON");
        assert_eq!(FormatMask::of(&[Format::Json, Format::Xml]).to_string(), "XML|JSON");
    }

    #[test]
    fn test_require_rejects_unset_format() {
        let schema = Schema::new("perf", "perf.json", None, FormatMask::JSON);
        assert!(schema.require(Format::Json).is_ok());
        let err = schema.require(Format::Xml).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_require_rejects_empty_mask() {
        let schema = Schema::new("perf", "perf.json", None, FormatMask::NONE);
        assert!(schema.require(Format::Json).unwrap_err().is_config());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a/b.JSON")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("schema.xsd")), Some(Format::Xml));
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }
}
