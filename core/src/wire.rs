//! Conversion of attribute trees into wire schema records.
//!
//! The wire schema is the flat, ordering-canonical description a transport
//! layer serializes for the host process. Children are always emitted in
//! lexicographic name order so that repeated conversions of the same tree are
//! byte-identical regardless of map iteration order.
//!
//! # Examples
//!
//! ```
//! use attribute_schema_core::*;
//!
//! let attr = Attribute::optional_nested(NestedAttributes::single([
//!     ("zone", Attribute::optional(ValueType::String)),
//!     ("address", Attribute::required(ValueType::String)),
//! ]));
//!
//! let wire = attr.to_wire("endpoint", &AttributePath::root().with_attribute_name("endpoint"))?;
//! let nested = wire.nested_type.unwrap();
//! assert_eq!(nested.nesting, WireNestingMode::Single);
//! assert_eq!(nested.attributes[0].name, "address");
//! assert_eq!(nested.attributes[1].name, "zone");
//! # Ok::<(), ConversionError>(())
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConversionError;
use crate::types::{AttributeKind, NestingMode};
use crate::{Attribute, AttributePath};

/// Format of a description string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringKind {
    #[default]
    Plain,
    Markdown,
}

/// Nesting mode as published on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireNestingMode {
    Single,
    List,
    Set,
    Map,
}

impl From<NestingMode> for WireNestingMode {
    fn from(mode: NestingMode) -> Self {
        match mode {
            NestingMode::Single => Self::Single,
            NestingMode::List => Self::List,
            NestingMode::Set => Self::Set,
            NestingMode::Map => Self::Map,
        }
    }
}

/// Nested object descriptor of a branch attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNestedObject {
    pub nesting: WireNestingMode,
    pub min_items: u64,
    pub max_items: u64,
    /// Children sorted by name.
    pub attributes: Vec<WireAttribute>,
}

/// Wire record for one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAttribute {
    pub name: String,
    /// Wire type token of a leaf attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_type: Option<WireNestedObject>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub description_kind: StringKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
}

/// Wire record for a whole schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSchema {
    pub version: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub description_kind: StringKind,
    pub deprecated: bool,
    /// Top-level attributes sorted by name.
    pub attributes: Vec<WireAttribute>,
}

/// Picks the published description; markdown wins when both are set.
pub(crate) fn describe(plain: &str, markdown: &str) -> (String, StringKind) {
    if !markdown.is_empty() {
        (markdown.to_string(), StringKind::Markdown)
    } else {
        (plain.to_string(), StringKind::Plain)
    }
}

/// Sorts records by name; an empty name sorts first.
pub(crate) fn sort_canonical(attributes: &mut [WireAttribute]) {
    attributes.sort_by(|a, b| a.name.cmp(&b.name));
}

impl Attribute {
    /// Converts the attribute and its subtree into a wire record.
    ///
    /// `path` locates the attribute for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::MissingTypeOrAttributes`] when this or any
    /// descendant attribute has neither a value type nor nested attributes.
    /// No partial record is returned.
    pub fn to_wire(&self, name: &str, path: &AttributePath) -> Result<WireAttribute, ConversionError> {
        let (description, description_kind) =
            describe(&self.description, &self.markdown_description);
        let mut wire = WireAttribute {
            name: name.to_string(),
            r#type: None,
            nested_type: None,
            description,
            description_kind,
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            deprecated: !self.deprecation_message.is_empty(),
        };

        let Some(kind) = self.defined_kind() else {
            debug!(%path, "cannot convert attribute without type or nested attributes");
            return Err(ConversionError::MissingTypeOrAttributes(path.clone()));
        };

        match kind {
            AttributeKind::Type(value_type) => {
                wire.r#type = Some(value_type.wire_type());
            }
            AttributeKind::Nested(nested) => {
                let mut attributes = nested
                    .sorted_names()
                    .into_iter()
                    .map(|child_name| {
                        nested.attributes[child_name]
                            .to_wire(child_name, &path.with_attribute_name(child_name))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                sort_canonical(&mut attributes);
                wire.nested_type = Some(WireNestedObject {
                    nesting: nested.nesting_mode.into(),
                    min_items: nested.min_items,
                    max_items: nested.max_items,
                    attributes,
                });
            }
        }
        Ok(wire)
    }
}
