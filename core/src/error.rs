//! Structural error types.
//!
//! Walk results are reported as [`Diagnostics`](crate::Diagnostics). The
//! errors here cover operations that produce no partial result: wire
//! conversion, typed value construction, path lookup and definition checks.

use thiserror::Error;

use crate::AttributePath;

fn label(path: &AttributePath) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

/// Wire schema conversion failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The attribute defines neither a value type nor nested attributes.
    #[error("{}: must have Attributes or Type set", label(.0))]
    MissingTypeOrAttributes(AttributePath),
    /// A definition declares both a value type and nested attributes.
    ///
    /// [`Attribute`](crate::Attribute) cannot hold both, so this is raised
    /// while loading definitions, before an attribute is built.
    #[error("{}: can't have both Attributes and Type set", label(.0))]
    ConflictingTypeAndAttributes(AttributePath),
}

impl ConversionError {
    /// Path of the offending attribute.
    pub fn path(&self) -> &AttributePath {
        match self {
            Self::MissingTypeOrAttributes(path) | Self::ConflictingTypeAndAttributes(path) => path,
        }
    }
}

/// Failure building a typed [`Value`](crate::Value) from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: expected {expected}, found {found}", label(.path))]
pub struct ValueError {
    pub path: AttributePath,
    pub expected: String,
    pub found: String,
}

/// Failure looking up an attribute definition by path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// No attribute with this name exists at the path.
    #[error("{}: no attribute named {name:?}", label(.path))]
    AttributeNotFound { path: AttributePath, name: String },
    /// The path steps past a leaf attribute.
    #[error("{}: attribute has no nested attributes", label(.0))]
    NotNested(AttributePath),
    /// The path does not select an attribute.
    #[error("{}: path does not address an attribute", label(.0))]
    NotAnAttribute(AttributePath),
}

/// Attribute definition problems detected before any walk runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("{}: required and optional cannot both be set", label(.0))]
    RequiredAndOptional(AttributePath),
    #[error("{}: required and computed cannot both be set", label(.0))]
    RequiredAndComputed(AttributePath),
    #[error("{}: one of required, optional or computed must be set", label(.0))]
    NoRequirementFlag(AttributePath),
    #[error(
        "{0}: invalid attribute name, must only use lowercase letters, underscores, and numbers, and must start with a letter"
    )]
    InvalidName(String),
}
