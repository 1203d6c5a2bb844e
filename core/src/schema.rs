//! Resource schema root.
//!
//! A [`Schema`] owns the top-level attributes of one resource or data source
//! and runs every walk over all of them: validation, plan modification and
//! wire conversion.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::{ConversionError, DefinitionError, PathError, ValueError};
use crate::plan::{PlanInputs, PlanOutcome, plan_fields};
use crate::types::{AttributeKind, NestedAttributes, NestingMode, ValueType, sorted_keys};
use crate::value::is_unknown_marker;
use crate::wire::{WireSchema, describe, sort_canonical};
use crate::{
    Attribute, AttributePath, Diagnostic, Diagnostics, PathStep, Value, ValueAccessor,
    validate_attribute, validate_attribute_name,
};

/// Top-level attributes of a resource plus schema-wide metadata.
///
/// # Examples
///
/// ```
/// use attribute_schema_core::*;
///
/// let schema = Schema::new([
///     ("name", Attribute::required(ValueType::String)),
///     ("id", Attribute::computed(ValueType::String)),
/// ])
/// .with_version(2);
///
/// let config = Snapshot::new(schema.value_from_json(&serde_json::json!({ "name": "web" }))?);
/// assert!(schema.validate(&config).is_empty());
///
/// let wire = schema.to_wire().unwrap();
/// assert_eq!(wire.version, 2);
/// assert_eq!(wire.attributes[0].name, "id");
/// # Ok::<(), ValueError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// Version of the state layout described by this schema.
    pub version: i64,
    pub attributes: HashMap<String, Attribute>,
    pub description: String,
    pub markdown_description: String,
    pub deprecation_message: String,
}

impl Schema {
    /// Creates a version 0 schema with the given top-level attributes.
    pub fn new<K: Into<String>>(attributes: impl IntoIterator<Item = (K, Attribute)>) -> Self {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(name, attr)| (name.into(), attr))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
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

    pub fn deprecated(mut self, message: &str) -> Self {
        self.deprecation_message = message.to_string();
        self
    }

    /// Top-level attribute names in lexicographic order.
    pub fn sorted_names(&self) -> Vec<&str> {
        sorted_keys(&self.attributes)
    }

    /// Validates every top-level attribute against `config`.
    pub fn validate(&self, config: &dyn ValueAccessor) -> Diagnostics {
        let root = AttributePath::root();
        let mut diags = Diagnostics::new();
        for name in self.sorted_names() {
            diags.append(validate_attribute(
                &self.attributes[name],
                &root.with_attribute_name(name),
                config,
            ));
        }
        debug!(
            attributes = self.attributes.len(),
            diagnostics = diags.len(),
            "validated configuration"
        );
        diags
    }

    /// Runs plan modification over every top-level attribute.
    ///
    /// The planned root object starts as the proposed plan and receives each
    /// attribute's planned value. A null or unknown plan (the resource is
    /// being destroyed) is returned untouched.
    pub fn modify_plan(&self, inputs: &PlanInputs<'_>) -> PlanOutcome {
        let root = AttributePath::root();
        let mut outcome = PlanOutcome::default();
        let mut planned = match inputs.plan.get_attribute(&root) {
            Ok(plan) => plan,
            Err(resolution) => {
                outcome.diagnostics.append(resolution);
                return outcome;
            }
        };

        match &mut planned {
            Value::Object(fields) => plan_fields(&self.attributes, &root, inputs, fields, &mut outcome),
            Value::Null | Value::Unknown => debug!("plan is not known, skipping plan modification"),
            other => outcome.diagnostics.push(Diagnostic::error(
                "Plan Modification Error",
                format!("Expected the proposed plan to be an object, got {}.", other.kind_name()),
            )),
        }

        outcome.planned = planned;
        outcome
    }

    /// Converts the schema into its wire form, top-level attributes sorted
    /// by name.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConversionError`] encountered; no partial schema
    /// is produced.
    pub fn to_wire(&self) -> Result<WireSchema, ConversionError> {
        let root = AttributePath::root();
        let mut attributes = self
            .sorted_names()
            .into_iter()
            .map(|name| self.attributes[name].to_wire(name, &root.with_attribute_name(name)))
            .collect::<Result<Vec<_>, _>>()?;
        sort_canonical(&mut attributes);

        let (description, description_kind) =
            describe(&self.description, &self.markdown_description);
        Ok(WireSchema {
            version: self.version,
            description,
            description_kind,
            deprecated: !self.deprecation_message.is_empty(),
            attributes,
        })
    }

    /// Returns the attribute definition addressed by `path`.
    ///
    /// Names select children. An index step must follow a list nested
    /// attribute and a key step a map nested attribute.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] when the path names a missing attribute, steps
    /// through a leaf, or ends on an element instead of an attribute.
    ///
    /// # Examples
    ///
    /// ```
    /// use attribute_schema_core::*;
    ///
    /// let schema = Schema::new([(
    ///     "rules",
    ///     Attribute::optional_nested(NestedAttributes::list([(
    ///         "port",
    ///         Attribute::required(ValueType::Number),
    ///     )])),
    /// )]);
    /// let path = AttributePath::root()
    ///     .with_attribute_name("rules")
    ///     .with_element_key_int(0)
    ///     .with_attribute_name("port");
    ///
    /// assert!(schema.attribute_at_path(&path).unwrap().required);
    /// ```
    pub fn attribute_at_path(&self, path: &AttributePath) -> Result<&Attribute, PathError> {
        let mut current: Option<&Attribute> = None;
        let mut children = Some(&self.attributes);
        // Children reachable only through an element step.
        let mut pending: Option<&NestedAttributes> = None;

        for (depth, step) in path.steps().iter().enumerate() {
            let here = AttributePath::from_steps(path.steps()[..depth].iter().cloned());
            match step {
                PathStep::AttributeName(name) => {
                    let Some(candidates) = children else {
                        return Err(if pending.is_some() {
                            PathError::NotAnAttribute(here)
                        } else {
                            PathError::NotNested(here)
                        });
                    };
                    let attr = candidates.get(name).ok_or_else(|| PathError::AttributeNotFound {
                        path: here,
                        name: name.clone(),
                    })?;
                    current = Some(attr);
                    children = None;
                    pending = None;
                    match attr.nested_attributes() {
                        Some(nested) if nested.nesting_mode == NestingMode::Single => {
                            children = Some(&nested.attributes);
                        }
                        Some(nested) => pending = Some(nested),
                        None => {}
                    }
                }
                PathStep::ElementKeyInt(_) | PathStep::ElementKeyString(_) => {
                    let keyed = matches!(
                        (pending.map(|n| n.nesting_mode), step),
                        (Some(NestingMode::List), PathStep::ElementKeyInt(_))
                            | (Some(NestingMode::Map), PathStep::ElementKeyString(_))
                    );
                    if !keyed {
                        return Err(PathError::NotAnAttribute(here.with_step(step.clone())));
                    }
                    children = pending.take().map(|n| &n.attributes);
                    current = None;
                }
            }
        }

        current.ok_or_else(|| PathError::NotAnAttribute(path.clone()))
    }

    /// Builds a typed [`Value`] for a whole resource from JSON.
    ///
    /// The schema decides whether JSON objects become objects or maps and
    /// whether arrays become lists or sets. Declared attributes missing from
    /// the input are null, and the [`UNKNOWN_MARKER`](crate::UNKNOWN_MARKER)
    /// object produces an unknown value anywhere.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] at the first JSON value whose shape does not
    /// match the schema, or that names an undeclared attribute.
    pub fn value_from_json(&self, json: &serde_json::Value) -> Result<Value, ValueError> {
        let root = AttributePath::root();
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            json if is_unknown_marker(json) => Ok(Value::Unknown),
            serde_json::Value::Object(fields) => object_from_json(&self.attributes, &root, fields),
            other => Err(mismatch(&root, "object", other)),
        }
    }

    /// Checks attribute names and requirement flags across the whole tree.
    ///
    /// # Errors
    ///
    /// Returns the first [`DefinitionError`] in name order.
    pub fn check_definitions(&self) -> Result<(), DefinitionError> {
        check_attributes(&self.attributes, &AttributePath::root())
    }
}

impl ValueType {
    /// Builds a value of this type from JSON; `path` anchors errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use attribute_schema_core::{AttributePath, Value, ValueType};
    ///
    /// let tags = ValueType::Map(Box::new(ValueType::String));
    /// let value = tags
    ///     .value_from_json(&AttributePath::root(), &serde_json::json!({ "env": "prod" }))
    ///     .unwrap();
    /// assert!(matches!(value, Value::Map(_)));
    /// ```
    pub fn value_from_json(
        &self,
        path: &AttributePath,
        json: &serde_json::Value,
    ) -> Result<Value, ValueError> {
        typed_from_json(self, path, json)
    }
}

fn check_attributes(
    attributes: &HashMap<String, Attribute>,
    path: &AttributePath,
) -> Result<(), DefinitionError> {
    for name in sorted_keys(attributes) {
        validate_attribute_name(name)?;
        let attr = &attributes[name];
        let attr_path = path.with_attribute_name(name);
        attr.check_flags(&attr_path)?;
        if let Some(nested) = attr.nested_attributes() {
            check_attributes(&nested.attributes, &attr_path)?;
        }
    }
    Ok(())
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn mismatch(path: &AttributePath, expected: &str, found: &serde_json::Value) -> ValueError {
    ValueError {
        path: path.clone(),
        expected: expected.to_string(),
        found: json_kind(found).to_string(),
    }
}

fn object_from_json(
    attributes: &HashMap<String, Attribute>,
    path: &AttributePath,
    json: &serde_json::Map<String, serde_json::Value>,
) -> Result<Value, ValueError> {
    if let Some(undeclared) = json.keys().find(|k| !attributes.contains_key(k.as_str())) {
        return Err(ValueError {
            path: path.with_attribute_name(undeclared.as_str()),
            expected: "a declared attribute".to_string(),
            found: "undeclared attribute".to_string(),
        });
    }

    let mut fields = BTreeMap::new();
    for (name, attr) in attributes {
        let field_path = path.with_attribute_name(name.as_str());
        let value = match json.get(name) {
            Some(raw) => attribute_from_json(attr, &field_path, raw)?,
            None => Value::Null,
        };
        fields.insert(name.clone(), value);
    }
    Ok(Value::Object(fields))
}

fn attribute_from_json(
    attribute: &Attribute,
    path: &AttributePath,
    json: &serde_json::Value,
) -> Result<Value, ValueError> {
    match &attribute.kind {
        Some(AttributeKind::Type(ty)) => typed_from_json(ty, path, json),
        Some(AttributeKind::Nested(nested)) => nested_from_json(nested, path, json),
        // Undefined attributes are reported by the walks.
        None => Ok(Value::from(json.clone())),
    }
}

fn typed_from_json(
    ty: &ValueType,
    path: &AttributePath,
    json: &serde_json::Value,
) -> Result<Value, ValueError> {
    use serde_json::Value as Json;

    if json.is_null() {
        return Ok(Value::Null);
    }
    if is_unknown_marker(json) {
        return Ok(Value::Unknown);
    }

    match (ty, json) {
        (ValueType::String, Json::String(s)) => Ok(Value::String(s.clone())),
        (ValueType::Number, Json::Number(n)) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| mismatch(path, "number", json)),
        (ValueType::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
        (ValueType::List(elem), Json::Array(elems)) => {
            Ok(Value::List(typed_elements(elem, path, elems)?))
        }
        (ValueType::Set(elem), Json::Array(elems)) => {
            Ok(Value::Set(typed_elements(elem, path, elems)?))
        }
        (ValueType::Map(elem), Json::Object(entries)) => {
            let mut map = BTreeMap::new();
            for (key, raw) in entries {
                let value = typed_from_json(elem, &path.with_element_key_string(key.as_str()), raw)?;
                map.insert(key.clone(), value);
            }
            Ok(Value::Map(map))
        }
        (ValueType::Object(field_types), Json::Object(entries)) => {
            if let Some(undeclared) = entries.keys().find(|k| !field_types.contains_key(*k)) {
                return Err(ValueError {
                    path: path.with_attribute_name(undeclared.as_str()),
                    expected: "a declared object field".to_string(),
                    found: "undeclared field".to_string(),
                });
            }
            let mut fields = BTreeMap::new();
            for (name, field_ty) in field_types {
                let value = match entries.get(name) {
                    Some(raw) => typed_from_json(field_ty, &path.with_attribute_name(name.as_str()), raw)?,
                    None => Value::Null,
                };
                fields.insert(name.clone(), value);
            }
            Ok(Value::Object(fields))
        }
        (ty, other) => Err(mismatch(path, &ty.to_string(), other)),
    }
}

fn typed_elements(
    elem: &ValueType,
    path: &AttributePath,
    elems: &[serde_json::Value],
) -> Result<Vec<Value>, ValueError> {
    elems
        .iter()
        .enumerate()
        .map(|(index, raw)| typed_from_json(elem, &path.with_element_key_int(index as i64), raw))
        .collect()
}

fn nested_from_json(
    nested: &NestedAttributes,
    path: &AttributePath,
    json: &serde_json::Value,
) -> Result<Value, ValueError> {
    use serde_json::Value as Json;

    if json.is_null() {
        return Ok(Value::Null);
    }
    if is_unknown_marker(json) {
        return Ok(Value::Unknown);
    }

    let element = |element_path: &AttributePath, raw: &Json| match raw {
        Json::Null => Ok(Value::Null),
        raw if is_unknown_marker(raw) => Ok(Value::Unknown),
        Json::Object(fields) => object_from_json(&nested.attributes, element_path, fields),
        other => Err(mismatch(element_path, "object", other)),
    };

    match (nested.nesting_mode, json) {
        (NestingMode::Single, _) => element(path, json),
        (NestingMode::List | NestingMode::Set, Json::Array(elems)) => {
            let values = elems
                .iter()
                .enumerate()
                .map(|(index, raw)| element(&path.with_element_key_int(index as i64), raw))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if nested.nesting_mode == NestingMode::Set {
                Value::Set(values)
            } else {
                Value::List(values)
            })
        }
        (NestingMode::Map, Json::Object(entries)) => {
            let mut map = BTreeMap::new();
            for (key, raw) in entries {
                map.insert(
                    key.clone(),
                    element(&path.with_element_key_string(key.as_str()), raw)?,
                );
            }
            Ok(Value::Map(map))
        }
        (NestingMode::List | NestingMode::Set, other) => Err(mismatch(path, "array", other)),
        (NestingMode::Map, other) => Err(mismatch(path, "object", other)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::builtin::{DefaultValue, RequiresReplace, StringOneOf, UseStateForUnknown};
    use crate::{NestedAttributes, Snapshot};

    fn network() -> Schema {
        Schema::new([
            ("id", Attribute::computed(ValueType::String).with_plan_modifier(UseStateForUnknown)),
            (
                "name",
                Attribute::required(ValueType::String).with_plan_modifier(RequiresReplace),
            ),
            (
                "tier",
                Attribute::optional(ValueType::String)
                    .also_computed()
                    .with_validator(StringOneOf::new(["standard", "premium"]))
                    .with_plan_modifier(DefaultValue::new("standard")),
            ),
            (
                "tags",
                Attribute::optional(ValueType::Map(Box::new(ValueType::String))),
            ),
            (
                "rules",
                Attribute::optional_nested(NestedAttributes::list([
                    ("port", Attribute::required(ValueType::Number)),
                    ("cidrs", Attribute::optional(ValueType::Set(Box::new(ValueType::String)))),
                ])),
            ),
            (
                "endpoints",
                Attribute::optional_nested(NestedAttributes::map([(
                    "address",
                    Attribute::required(ValueType::String),
                )])),
            ),
        ])
        .with_version(1)
    }

    fn snapshot(schema: &Schema, json: serde_json::Value) -> Snapshot {
        Snapshot::new(schema.value_from_json(&json).unwrap())
    }

    #[test]
    fn test_validate_reports_every_attribute() {
        let schema = network();
        let config = snapshot(&schema, json!({ "name": "web", "tier": "gold" }));

        let diags = schema.validate(&config);

        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.attribute.as_ref().unwrap().to_string(), "tier");
    }

    #[test]
    fn test_value_from_json_uses_schema_kinds() {
        let schema = network();
        let value = schema
            .value_from_json(&json!({
                "name": "web",
                "tags": { "env": "prod" },
                "rules": [{ "port": 443, "cidrs": ["10.0.0.0/8"] }],
                "endpoints": { "primary": { "address": "10.0.0.1" } },
                "id": { "$unknown": true }
            }))
            .unwrap();

        let config = Snapshot::new(value);
        let at = |path: AttributePath| config.get_attribute(&path).unwrap();
        let root = AttributePath::root();

        assert!(matches!(at(root.with_attribute_name("tags")), Value::Map(_)));
        assert!(matches!(
            at(root.with_attribute_name("rules").with_element_key_int(0).with_attribute_name("cidrs")),
            Value::Set(_)
        ));
        assert!(matches!(at(root.with_attribute_name("endpoints")), Value::Map(_)));
        assert_eq!(at(root.with_attribute_name("id")), Value::Unknown);
        assert_eq!(at(root.with_attribute_name("tier")), Value::Null);
    }

    #[test]
    fn test_value_from_json_errors() {
        let schema = network();

        let err = schema
            .value_from_json(&json!({ "rules": [{ "port": "https" }] }))
            .unwrap_err();
        assert_eq!(err.path.to_string(), "rules[0].port");
        assert_eq!(err.expected, "number");
        assert_eq!(err.found, "string");

        let err = schema.value_from_json(&json!({ "nope": 1 })).unwrap_err();
        assert_eq!(err.path.to_string(), "nope");

        let err = schema.value_from_json(&json!([1])).unwrap_err();
        assert!(err.path.is_empty());
        assert_eq!(err.to_string(), "<root>: expected object, found array");
    }

    #[test]
    fn test_modify_plan_assembles_root_object() {
        let schema = network();
        let config = snapshot(&schema, json!({ "name": "web" }));
        let state = snapshot(&schema, json!({ "id": "net-1", "name": "old", "tier": "premium" }));
        let plan = snapshot(
            &schema,
            json!({ "id": { "$unknown": true }, "name": "web", "tier": { "$unknown": true } }),
        );

        let outcome = schema.modify_plan(&PlanInputs {
            config: &config,
            state: &state,
            plan: &plan,
            provider_meta: &Value::Null,
        });

        assert!(outcome.diagnostics.is_empty());
        let planned = outcome.planned.to_json();
        assert_eq!(planned["id"], json!("net-1"));
        assert_eq!(planned["tier"], json!("standard"));
        assert_eq!(planned["name"], json!("web"));
        assert_eq!(
            outcome.requires_replace,
            vec![AttributePath::root().with_attribute_name("name")]
        );
    }

    #[test]
    fn test_modify_plan_skips_destroy() {
        let schema = network();
        let outcome = schema.modify_plan(&PlanInputs {
            config: &Snapshot::null(),
            state: &Snapshot::null(),
            plan: &Snapshot::null(),
            provider_meta: &Value::Null,
        });
        assert_eq!(outcome.planned, Value::Null);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_to_wire_is_sorted() {
        let wire = network().to_wire().unwrap();
        let names: Vec<&str> = wire.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["endpoints", "id", "name", "rules", "tags", "tier"]);
        assert_eq!(wire.version, 1);
    }

    #[test]
    fn test_to_wire_reports_broken_attribute() {
        let mut schema = network();
        schema.attributes.insert("broken".to_string(), Attribute::default());
        let err = schema.to_wire().unwrap_err();
        assert_eq!(err, ConversionError::MissingTypeOrAttributes(
            AttributePath::root().with_attribute_name("broken")
        ));
    }

    #[test]
    fn test_to_wire_error_follows_name_order() {
        for _ in 0..32 {
            let schema = Schema::new([
                ("a", Attribute::default()),
                ("m", Attribute::optional(ValueType::Bool)),
                ("z", Attribute::default()),
            ]);
            let err = schema.to_wire().unwrap_err();
            assert_eq!(err.to_string(), "a: must have Attributes or Type set");
        }
    }

    #[test]
    fn test_attribute_at_path() {
        let schema = network();
        let root = AttributePath::root();

        let port = root
            .with_attribute_name("rules")
            .with_element_key_int(3)
            .with_attribute_name("port");
        assert_eq!(
            schema.attribute_at_path(&port).unwrap(),
            &Attribute::required(ValueType::Number)
        );

        let address = root
            .with_attribute_name("endpoints")
            .with_element_key_string("primary")
            .with_attribute_name("address");
        assert!(schema.attribute_at_path(&address).is_ok());

        let missing = root.with_attribute_name("nope");
        assert!(matches!(
            schema.attribute_at_path(&missing),
            Err(PathError::AttributeNotFound { .. })
        ));

        let through_leaf = root.with_attribute_name("name").with_attribute_name("x");
        assert_eq!(
            schema.attribute_at_path(&through_leaf),
            Err(PathError::NotNested(root.with_attribute_name("name")))
        );

        let element = root.with_attribute_name("rules").with_element_key_int(0);
        assert_eq!(
            schema.attribute_at_path(&element),
            Err(PathError::NotAnAttribute(element.clone()))
        );

        let wrong_key = root.with_attribute_name("rules").with_element_key_string("a");
        assert!(matches!(
            schema.attribute_at_path(&wrong_key),
            Err(PathError::NotAnAttribute(_))
        ));

        assert!(schema.attribute_at_path(&root).is_err());
    }

    #[test]
    fn test_check_definitions() {
        assert!(network().check_definitions().is_ok());

        let bad_name = Schema::new([("Name", Attribute::required(ValueType::String))]);
        assert_eq!(
            bad_name.check_definitions(),
            Err(DefinitionError::InvalidName("Name".to_string()))
        );

        let mut nested_flags = Attribute::required(ValueType::String);
        nested_flags.required = false;
        let schema = Schema::new([(
            "outer",
            Attribute::optional_nested(NestedAttributes::single([("inner", nested_flags)])),
        )]);
        assert_eq!(
            schema.check_definitions(),
            Err(DefinitionError::NoRequirementFlag(
                AttributePath::root()
                    .with_attribute_name("outer")
                    .with_attribute_name("inner")
            ))
        );
    }

    #[test]
    fn test_markdown_schema_description() {
        let wire = Schema::new([("a", Attribute::optional(ValueType::Bool))])
            .with_description("plain")
            .with_markdown_description("*md*")
            .deprecated("gone")
            .to_wire()
            .unwrap();
        assert_eq!(wire.description, "*md*");
        assert!(wire.deprecated);
    }
}
