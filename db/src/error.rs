//! Error types for registry, configuration and manifest operations.
//!
//! Covers I/O, serialization, definition problems detected while turning
//! definition files into schemas, and manifest validation.

use std::path::PathBuf;

use attribute_schema_core::{ConversionError, DefinitionError, ValueError};
use thiserror::Error;

/// Errors that can occur while loading or persisting schema artifacts.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The file extension is not one of `json`, `yaml` or `yml`.
    #[error("unsupported definition file: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Invalid attribute name or requirement flags.
    #[error("schema {schema:?}: {source}")]
    Definition {
        schema: String,
        source: DefinitionError,
    },

    /// An attribute declares both a type and nested attributes.
    #[error("schema {schema:?}: {source}")]
    Conversion {
        schema: String,
        source: ConversionError,
    },

    /// A declared default does not match the attribute type.
    #[error("schema {schema:?}: invalid default value: {source}")]
    DefaultValue { schema: String, source: ValueError },

    /// Two definitions share a schema name.
    #[error("duplicate schema name: {0}")]
    DuplicateSchema(String),

    /// Manifest validation failure.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// All configured loader sources failed.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;
