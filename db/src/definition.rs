//! Declarative schema definition files.
//!
//! A definition file describes one schema in JSON or YAML. Hooks are declared
//! by kind and resolved to the builtin validators and plan modifiers.
//!
//! # Example YAML
//!
//! ```yaml
//! name: network
//! version: 1
//! attributes:
//!   name:
//!     type: string
//!     required: true
//!     plan_modifiers:
//!       - kind: requires_replace
//!   tier:
//!     type: string
//!     optional: true
//!     computed: true
//!     validators:
//!       - kind: string_one_of
//!         values: [standard, premium]
//!     plan_modifiers:
//!       - kind: default_value
//!         value: standard
//!   rules:
//!     optional: true
//!     attributes:
//!       nesting_mode: list
//!       max_items: 16
//!       attributes:
//!         port:
//!           type: number
//!           required: true
//! ```

use std::collections::{BTreeMap, HashMap};

use attribute_schema_core::builtin::{
    DefaultValue, NumberBetween, RequiresReplace, StringLengthBetween, StringOneOf,
    UseStateForUnknown,
};
use attribute_schema_core::{
    Attribute, AttributeKind, AttributePath, ConversionError, NestedAttributes, NestingMode,
    Schema, Value, ValueType,
};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// One schema as written in a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Registry key of the schema.
    pub name: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub markdown_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deprecation_message: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDefinition>,
}

/// One attribute as written in a definition file.
///
/// Exactly one of `type` and `attributes` should be set. Setting both is
/// rejected when the definition is converted; setting neither is accepted
/// and reported when the schema is walked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<NestedDefinition>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub markdown_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deprecation_message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<ValidatorSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plan_modifiers: Vec<PlanModifierSpec>,
}

/// Children of a nested attribute definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedDefinition {
    pub nesting_mode: NestingMode,
    #[serde(default)]
    pub min_items: u64,
    #[serde(default)]
    pub max_items: u64,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDefinition>,
}

/// Builtin validator reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidatorSpec {
    StringLengthBetween { min: usize, max: usize },
    StringOneOf { values: Vec<String> },
    NumberBetween { min: f64, max: f64 },
}

/// Builtin plan modifier reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanModifierSpec {
    UseStateForUnknown,
    RequiresReplace,
    /// `value` is typed by the attribute's declared type.
    DefaultValue { value: serde_json::Value },
}

impl SchemaDefinition {
    /// Builds the engine schema for this definition.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Conversion`] when an attribute sets both `type`
    ///   and `attributes`.
    /// - [`RegistryError::DefaultValue`] when a default does not match its
    ///   attribute type.
    /// - [`RegistryError::Definition`] for invalid attribute names or
    ///   requirement flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use attribute_schema_db::SchemaDefinition;
    ///
    /// let def: SchemaDefinition = serde_yaml::from_str(r#"
    /// name: bucket
    /// attributes:
    ///   name:
    ///     type: string
    ///     required: true
    /// "#).unwrap();
    ///
    /// let schema = def.to_schema().unwrap();
    /// assert!(schema.attributes["name"].required);
    /// ```
    pub fn to_schema(&self) -> Result<Schema> {
        let attributes = convert_attributes(&self.name, &self.attributes, &AttributePath::root())?;
        let schema = Schema {
            version: self.version,
            attributes,
            description: self.description.clone(),
            markdown_description: self.markdown_description.clone(),
            deprecation_message: self.deprecation_message.clone(),
        };
        schema
            .check_definitions()
            .map_err(|source| RegistryError::Definition {
                schema: self.name.clone(),
                source,
            })?;
        Ok(schema)
    }
}

fn convert_attributes(
    schema: &str,
    definitions: &BTreeMap<String, AttributeDefinition>,
    path: &AttributePath,
) -> Result<HashMap<String, Attribute>> {
    definitions
        .iter()
        .map(|(name, def)| {
            let attr = convert_attribute(schema, def, &path.with_attribute_name(name.as_str()))?;
            Ok((name.clone(), attr))
        })
        .collect()
}

fn convert_attribute(
    schema: &str,
    def: &AttributeDefinition,
    path: &AttributePath,
) -> Result<Attribute> {
    let kind = match (&def.value_type, &def.attributes) {
        (Some(_), Some(_)) => {
            return Err(RegistryError::Conversion {
                schema: schema.to_string(),
                source: ConversionError::ConflictingTypeAndAttributes(path.clone()),
            });
        }
        (Some(ty), None) => Some(AttributeKind::Type(ty.clone())),
        (None, Some(nested)) => Some(AttributeKind::Nested(NestedAttributes {
            nesting_mode: nested.nesting_mode,
            min_items: nested.min_items,
            max_items: nested.max_items,
            attributes: convert_attributes(schema, &nested.attributes, path)?,
        })),
        (None, None) => None,
    };

    let mut attr = Attribute {
        kind,
        description: def.description.clone(),
        markdown_description: def.markdown_description.clone(),
        required: def.required,
        optional: def.optional,
        computed: def.computed,
        sensitive: def.sensitive,
        deprecation_message: def.deprecation_message.clone(),
        ..Default::default()
    };

    for spec in &def.validators {
        attr = match spec {
            ValidatorSpec::StringLengthBetween { min, max } => {
                attr.with_validator(StringLengthBetween::new(*min, *max))
            }
            ValidatorSpec::StringOneOf { values } => {
                attr.with_validator(StringOneOf::new(values.iter().cloned()))
            }
            ValidatorSpec::NumberBetween { min, max } => {
                attr.with_validator(NumberBetween::new(*min, *max))
            }
        };
    }

    for spec in &def.plan_modifiers {
        attr = match spec {
            PlanModifierSpec::UseStateForUnknown => attr.with_plan_modifier(UseStateForUnknown),
            PlanModifierSpec::RequiresReplace => attr.with_plan_modifier(RequiresReplace),
            PlanModifierSpec::DefaultValue { value } => {
                let typed = match &def.value_type {
                    Some(ty) => ty.value_from_json(path, value).map_err(|source| {
                        RegistryError::DefaultValue {
                            schema: schema.to_string(),
                            source,
                        }
                    })?,
                    None => Value::from(value.clone()),
                };
                attr.with_plan_modifier(DefaultValue::new(typed))
            }
        };
    }

    Ok(attr)
}

#[cfg(test)]
mod tests {
    use attribute_schema_core::AttributePlanModifier;

    use super::*;

    fn parse(yaml: &str) -> SchemaDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_yaml_definition() {
        let def = parse(
            r#"
name: network
version: 3
description: A network
attributes:
  name:
    type: string
    required: true
    validators:
      - kind: string_length_between
        min: 1
        max: 32
  rules:
    optional: true
    attributes:
      nesting_mode: list
      max_items: 4
      attributes:
        port:
          type: number
          required: true
"#,
        );

        let schema = def.to_schema().unwrap();

        assert_eq!(schema.version, 3);
        assert_eq!(schema.description, "A network");
        assert_eq!(schema.attributes["name"].validators.len(), 1);
        let rules = schema.attributes["rules"].nested_attributes().unwrap();
        assert_eq!(rules.nesting_mode, NestingMode::List);
        assert_eq!(rules.max_items, 4);
        assert_eq!(
            rules.attributes["port"].value_type(),
            Some(&ValueType::Number)
        );
    }

    #[test]
    fn test_json_collection_types() {
        let def: SchemaDefinition = serde_json::from_value(serde_json::json!({
            "name": "tags",
            "attributes": {
                "tags": { "type": { "map": "string" }, "optional": true },
                "ports": { "type": { "set": "number" }, "optional": true }
            }
        }))
        .unwrap();

        let schema = def.to_schema().unwrap();
        assert_eq!(
            schema.attributes["tags"].value_type(),
            Some(&ValueType::Map(Box::new(ValueType::String)))
        );
        assert_eq!(
            schema.attributes["ports"].value_type(),
            Some(&ValueType::Set(Box::new(ValueType::Number)))
        );
    }

    #[test]
    fn test_both_type_and_attributes_rejected() {
        let def = parse(
            r#"
name: broken
attributes:
  both:
    type: string
    optional: true
    attributes:
      nesting_mode: single
      attributes:
        inner:
          type: string
          optional: true
"#,
        );

        let err = def.to_schema().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Conversion {
                source: ConversionError::ConflictingTypeAndAttributes(_),
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "schema \"broken\": both: can't have both Attributes and Type set"
        );
    }

    #[test]
    fn test_neither_type_nor_attributes_is_deferred() {
        let def = parse(
            r#"
name: lazy
attributes:
  empty:
    optional: true
"#,
        );

        let schema = def.to_schema().unwrap();
        assert!(schema.attributes["empty"].kind.is_none());
        assert!(schema.to_wire().is_err());
    }

    #[test]
    fn test_invalid_name_and_flags_rejected() {
        let bad_name = parse(
            r#"
name: bad
attributes:
  BadName:
    type: string
    required: true
"#,
        );
        assert!(matches!(
            bad_name.to_schema(),
            Err(RegistryError::Definition { .. })
        ));

        let bad_flags = parse(
            r#"
name: bad
attributes:
  id:
    type: string
    required: true
    computed: true
"#,
        );
        let err = bad_flags.to_schema().unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema \"bad\": id: required and computed cannot both be set"
        );
    }

    #[test]
    fn test_unknown_nesting_mode_rejected_at_parse() {
        let result: std::result::Result<SchemaDefinition, _> = serde_yaml::from_str(
            r#"
name: odd
attributes:
  group:
    optional: true
    attributes:
      nesting_mode: group
      attributes: {}
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_default_value_is_typed() {
        let def: SchemaDefinition = serde_json::from_value(serde_json::json!({
            "name": "defaults",
            "attributes": {
                "labels": {
                    "type": { "map": "string" },
                    "optional": true,
                    "computed": true,
                    "plan_modifiers": [
                        { "kind": "default_value", "value": { "team": "core" } }
                    ]
                }
            }
        }))
        .unwrap();
        let schema = def.to_schema().unwrap();
        let modifier = &schema.attributes["labels"].plan_modifiers[0];
        assert_eq!(modifier.description(), "Defaults to {\"team\":\"core\"} when not configured.");

        let mismatched: SchemaDefinition = serde_json::from_value(serde_json::json!({
            "name": "defaults",
            "attributes": {
                "count": {
                    "type": "number",
                    "optional": true,
                    "plan_modifiers": [{ "kind": "default_value", "value": "three" }]
                }
            }
        }))
        .unwrap();
        assert!(matches!(
            mismatched.to_schema(),
            Err(RegistryError::DefaultValue { .. })
        ));
    }
}
