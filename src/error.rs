//! Error taxonomy for schema mapping and condensation.
//!
//! Missing properties are a separate variant from general validation
//! failures so callers can tell "the step produced no file/field" apart
//! from "the file is malformed".

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    /// Content does not conform to the schema.
    #[error("validation failed at `{path}`: {reason}")]
    Validation { path: String, reason: String },

    /// A required schema property has no counterpart in the content.
    #[error("missing required property `{path}`")]
    MissingProperty { path: String },

    /// Schema or mapper configuration is unusable; raised before any content is read.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be parsed as the expected format at all.
    #[error("malformed {format} document: {detail}")]
    Parse { format: &'static str, detail: String },
}

impl MapError {
    pub fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        MapError::Validation { path: path.into(), reason: reason.into() }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        MapError::MissingProperty { path: path.into() }
    }

    pub fn is_missing_property(&self) -> bool {
        matches!(self, MapError::MissingProperty { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MapError::Validation { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, MapError::Config(_))
    }
}

pub type MapResult<T> = Result<T, MapError>;
