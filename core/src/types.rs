//! Attribute tree definitions.
//!
//! An [`Attribute`] is either a leaf carrying a [`ValueType`] or a branch
//! carrying [`NestedAttributes`]. The tree is built once by the schema author
//! and then shared read-only by every walk.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;
use crate::hooks::{AttributePlanModifier, AttributeValidator};
use crate::AttributePath;

/// Value kind of a leaf attribute.
///
/// # Examples
///
/// ```
/// use attribute_schema_core::ValueType;
///
/// let tags = ValueType::Map(Box::new(ValueType::String));
/// assert_eq!(tags.wire_type(), serde_json::json!(["map", "string"]));
/// assert_eq!(tags.to_string(), "map of string");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Bool,
    List(Box<ValueType>),
    Set(Box<ValueType>),
    Map(Box<ValueType>),
    Object(BTreeMap<String, ValueType>),
}

impl ValueType {
    /// Returns the wire type token for this value type.
    ///
    /// Primitives encode as a bare string; collections as a two-element
    /// array of kind and element type; objects as `["object", {..}]`.
    pub fn wire_type(&self) -> serde_json::Value {
        use serde_json::{Value as Json, json};

        match self {
            Self::String => Json::from("string"),
            Self::Number => Json::from("number"),
            Self::Bool => Json::from("bool"),
            Self::List(elem) => json!(["list", elem.wire_type()]),
            Self::Set(elem) => json!(["set", elem.wire_type()]),
            Self::Map(elem) => json!(["map", elem.wire_type()]),
            Self::Object(fields) => {
                let fields: serde_json::Map<String, Json> = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.wire_type()))
                    .collect();
                json!(["object", fields])
            }
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Bool => f.write_str("bool"),
            Self::List(elem) => write!(f, "list of {elem}"),
            Self::Set(elem) => write!(f, "set of {elem}"),
            Self::Map(elem) => write!(f, "map of {elem}"),
            Self::Object(_) => f.write_str("object"),
        }
    }
}

/// How a branch aggregates its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    /// One object.
    Single,
    /// Ordered list of objects.
    List,
    /// Unordered set of unique objects.
    Set,
    /// Objects keyed by string.
    Map,
}

impl fmt::Display for NestingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::List => f.write_str("list"),
            Self::Set => f.write_str("set"),
            Self::Map => f.write_str("map"),
        }
    }
}

/// Children of a branch attribute.
///
/// `min_items` and `max_items` are only published on the wire; zero means
/// unconstrained.
///
/// # Examples
///
/// ```
/// use attribute_schema_core::{Attribute, NestedAttributes, NestingMode, ValueType};
///
/// let rules = NestedAttributes::list([
///     ("port", Attribute::required(ValueType::Number)),
///     ("protocol", Attribute::optional(ValueType::String)),
/// ])
/// .with_max_items(16);
///
/// assert_eq!(rules.nesting_mode, NestingMode::List);
/// assert_eq!(rules.attributes.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NestedAttributes {
    pub nesting_mode: NestingMode,
    pub min_items: u64,
    pub max_items: u64,
    pub attributes: HashMap<String, Attribute>,
}

impl NestedAttributes {
    /// Creates nested attributes with the given mode and children.
    pub fn new<K: Into<String>>(
        nesting_mode: NestingMode,
        attributes: impl IntoIterator<Item = (K, Attribute)>,
    ) -> Self {
        Self {
            nesting_mode,
            min_items: 0,
            max_items: 0,
            attributes: attributes
                .into_iter()
                .map(|(name, attr)| (name.into(), attr))
                .collect(),
        }
    }

    pub fn single<K: Into<String>>(attributes: impl IntoIterator<Item = (K, Attribute)>) -> Self {
        Self::new(NestingMode::Single, attributes)
    }

    pub fn list<K: Into<String>>(attributes: impl IntoIterator<Item = (K, Attribute)>) -> Self {
        Self::new(NestingMode::List, attributes)
    }

    pub fn set<K: Into<String>>(attributes: impl IntoIterator<Item = (K, Attribute)>) -> Self {
        Self::new(NestingMode::Set, attributes)
    }

    pub fn map<K: Into<String>>(attributes: impl IntoIterator<Item = (K, Attribute)>) -> Self {
        Self::new(NestingMode::Map, attributes)
    }

    pub fn with_min_items(mut self, min_items: u64) -> Self {
        self.min_items = min_items;
        self
    }

    pub fn with_max_items(mut self, max_items: u64) -> Self {
        self.max_items = max_items;
        self
    }

    /// Child names in lexicographic order.
    pub fn sorted_names(&self) -> Vec<&str> {
        sorted_keys(&self.attributes)
    }
}

pub(crate) fn sorted_keys(attributes: &HashMap<String, Attribute>) -> Vec<&str> {
    let mut names: Vec<&str> = attributes.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Leaf or branch payload of an [`Attribute`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Type(ValueType),
    Nested(NestedAttributes),
}

/// One field definition in a schema tree.
///
/// Equality compares shape and documentation only; validators and plan
/// modifiers never affect it.
///
/// # Examples
///
/// ```
/// use attribute_schema_core::{Attribute, ValueType};
///
/// let name = Attribute::required(ValueType::String)
///     .with_description("Display name");
/// let other = Attribute::required(ValueType::String)
///     .with_description("Display name");
///
/// assert_eq!(name, other);
/// assert!(name.check_flags(&Default::default()).is_ok());
/// ```
#[derive(Clone, Default)]
pub struct Attribute {
    /// Value type or nested attributes. `None` is a definition bug reported
    /// when the attribute is walked.
    pub kind: Option<AttributeKind>,
    /// Plain text documentation.
    pub description: String,
    /// Markdown documentation; preferred over `description` on the wire.
    pub markdown_description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Obscures the value in practitioner-facing output.
    pub sensitive: bool,
    /// Non-empty marks the attribute deprecated.
    pub deprecation_message: String,
    pub validators: Vec<Arc<dyn AttributeValidator>>,
    pub plan_modifiers: Vec<Arc<dyn AttributePlanModifier>>,
}

impl Attribute {
    fn leaf(value_type: ValueType) -> Self {
        Self {
            kind: Some(AttributeKind::Type(value_type)),
            ..Default::default()
        }
    }

    fn branch(nested: NestedAttributes) -> Self {
        Self {
            kind: Some(AttributeKind::Nested(nested)),
            ..Default::default()
        }
    }

    /// Creates a required leaf attribute.
    pub fn required(value_type: ValueType) -> Self {
        Self {
            required: true,
            ..Self::leaf(value_type)
        }
    }

    /// Creates an optional leaf attribute.
    pub fn optional(value_type: ValueType) -> Self {
        Self {
            optional: true,
            ..Self::leaf(value_type)
        }
    }

    /// Creates a read-only leaf attribute set by the provider.
    pub fn computed(value_type: ValueType) -> Self {
        Self {
            computed: true,
            ..Self::leaf(value_type)
        }
    }

    pub fn required_nested(nested: NestedAttributes) -> Self {
        Self {
            required: true,
            ..Self::branch(nested)
        }
    }

    pub fn optional_nested(nested: NestedAttributes) -> Self {
        Self {
            optional: true,
            ..Self::branch(nested)
        }
    }

    pub fn computed_nested(nested: NestedAttributes) -> Self {
        Self {
            computed: true,
            ..Self::branch(nested)
        }
    }

    /// Lets the provider fill the value when the practitioner omits it.
    pub fn also_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn mark_sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_markdown_description(mut self, description: &str) -> Self {
        self.markdown_description = description.to_string();
        self
    }

    /// Marks the attribute deprecated with an upgrade hint.
    pub fn deprecated(mut self, message: &str) -> Self {
        self.deprecation_message = message.to_string();
        self
    }

    pub fn with_validator(mut self, validator: impl AttributeValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn with_plan_modifier(mut self, modifier: impl AttributePlanModifier + 'static) -> Self {
        self.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Returns the value type of a leaf attribute.
    pub fn value_type(&self) -> Option<&ValueType> {
        match &self.kind {
            Some(AttributeKind::Type(ty)) => Some(ty),
            _ => None,
        }
    }

    /// Returns the nested attributes of a branch attribute.
    pub fn nested_attributes(&self) -> Option<&NestedAttributes> {
        match &self.kind {
            Some(AttributeKind::Nested(nested)) => Some(nested),
            _ => None,
        }
    }

    /// Returns the kind if the attribute is a well-formed leaf or branch.
    ///
    /// A branch without children counts as undefined.
    pub(crate) fn defined_kind(&self) -> Option<&AttributeKind> {
        match &self.kind {
            Some(AttributeKind::Nested(nested)) if nested.attributes.is_empty() => None,
            kind => kind.as_ref(),
        }
    }

    /// Checks the required/optional/computed combination.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] anchored at `path` when required is
    /// combined with optional or computed, or when no flag is set.
    pub fn check_flags(&self, path: &AttributePath) -> Result<(), DefinitionError> {
        if self.required && self.optional {
            return Err(DefinitionError::RequiredAndOptional(path.clone()));
        }
        if self.required && self.computed {
            return Err(DefinitionError::RequiredAndComputed(path.clone()));
        }
        if !self.required && !self.optional && !self.computed {
            return Err(DefinitionError::NoRequirementFlag(path.clone()));
        }
        Ok(())
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.description == other.description
            && self.markdown_description == other.markdown_description
            && self.required == other.required
            && self.optional == other.optional
            && self.computed == other.computed
            && self.sensitive == other.sensitive
            && self.deprecation_message == other.deprecation_message
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let validators: Vec<String> = self.validators.iter().map(|v| v.description()).collect();
        let plan_modifiers: Vec<String> =
            self.plan_modifiers.iter().map(|m| m.description()).collect();
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("markdown_description", &self.markdown_description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("deprecation_message", &self.deprecation_message)
            .field("validators", &validators)
            .field("plan_modifiers", &plan_modifiers)
            .finish()
    }
}

/// Checks that `name` is usable as an attribute name.
///
/// Names use lowercase ASCII letters, digits and underscores and start with a
/// letter.
///
/// # Examples
///
/// ```
/// use attribute_schema_core::validate_attribute_name;
///
/// assert!(validate_attribute_name("listen_port").is_ok());
/// assert!(validate_attribute_name("ListenPort").is_err());
/// assert!(validate_attribute_name("_port").is_err());
/// ```
pub fn validate_attribute_name(name: &str) -> Result<(), DefinitionError> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let rest_valid = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if starts_with_letter && rest_valid {
        Ok(())
    } else {
        Err(DefinitionError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{StringLengthBetween, StringOneOf};

    #[test]
    fn test_equality_ignores_hooks() {
        let plain = Attribute::optional(ValueType::String).with_description("zone");
        let validated = Attribute::optional(ValueType::String)
            .with_description("zone")
            .with_validator(StringLengthBetween::new(1, 8))
            .with_validator(StringOneOf::new(["a", "b"]));

        assert_eq!(plain, validated);
    }

    #[test]
    fn test_equality_compares_flags_and_docs() {
        let base = Attribute::optional(ValueType::String);

        assert_ne!(base, base.clone().also_computed());
        assert_ne!(base, base.clone().mark_sensitive());
        assert_ne!(base, base.clone().deprecated("gone"));
        assert_ne!(base, base.clone().with_markdown_description("**doc**"));
        assert_ne!(base, Attribute::optional(ValueType::Number));
    }

    #[test]
    fn test_equality_is_nil_aware_and_recursive() {
        let nested = |ty: ValueType| {
            Attribute::optional_nested(NestedAttributes::single([(
                "inner",
                Attribute::required(ty),
            )]))
        };

        assert_eq!(nested(ValueType::Bool), nested(ValueType::Bool));
        assert_ne!(nested(ValueType::Bool), nested(ValueType::String));
        assert_ne!(Attribute::default(), Attribute::optional(ValueType::Bool));
        assert_eq!(Attribute::default(), Attribute::default());
    }

    #[test]
    fn test_check_flags() {
        let path = AttributePath::root().with_attribute_name("id");

        assert!(Attribute::computed(ValueType::String).check_flags(&path).is_ok());
        assert!(
            Attribute::optional(ValueType::String)
                .also_computed()
                .check_flags(&path)
                .is_ok()
        );

        let mut both = Attribute::required(ValueType::String);
        both.optional = true;
        assert_eq!(
            both.check_flags(&path),
            Err(DefinitionError::RequiredAndOptional(path.clone()))
        );

        let required_computed = Attribute::required(ValueType::String).also_computed();
        assert_eq!(
            required_computed.check_flags(&path),
            Err(DefinitionError::RequiredAndComputed(path.clone()))
        );

        let mut none = Attribute::required(ValueType::String);
        none.required = false;
        assert_eq!(
            none.check_flags(&path),
            Err(DefinitionError::NoRequirementFlag(path))
        );
    }

    #[test]
    fn test_empty_branch_is_undefined() {
        let empty = Attribute::optional_nested(NestedAttributes::single(
            Vec::<(String, Attribute)>::new(),
        ));
        assert!(empty.defined_kind().is_none());
        assert!(Attribute::default().defined_kind().is_none());
        assert!(
            Attribute::optional(ValueType::Bool)
                .defined_kind()
                .is_some()
        );
    }

    #[test]
    fn test_attribute_names() {
        assert!(validate_attribute_name("a1_b").is_ok());
        assert!(validate_attribute_name("").is_err());
        assert!(validate_attribute_name("1a").is_err());
        assert!(validate_attribute_name("*()-").is_err());
    }

    #[test]
    fn test_object_wire_type() {
        let ty = ValueType::Object(BTreeMap::from([
            ("b".to_string(), ValueType::Number),
            ("a".to_string(), ValueType::List(Box::new(ValueType::Bool))),
        ]));
        assert_eq!(
            ty.wire_type(),
            serde_json::json!(["object", { "a": ["list", "bool"], "b": "number" }])
        );
    }
}
