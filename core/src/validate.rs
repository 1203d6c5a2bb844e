//! Configuration validation walk.
//!
//! Walks an attribute tree top-down, resolving the configured value at each
//! path and running every validator. Problems deep in one branch never stop
//! validation of sibling branches, so a practitioner sees every independent
//! problem in a single pass.
//!
//! # Examples
//!
//! ```
//! use attribute_schema_core::*;
//!
//! let attr = Attribute::optional(ValueType::String).deprecated("use bar instead");
//! let path = AttributePath::root().with_attribute_name("foo");
//! let config = Snapshot::new(Value::from(serde_json::json!({ "foo": "x" })));
//!
//! let diags = validate_attribute(&attr, &path, &config);
//! assert_eq!(diags.len(), 1);
//! assert_eq!(diags.warnings().next().unwrap().detail, "use bar instead");
//! ```

use tracing::debug;

use crate::hooks::ValidateAttributeRequest;
use crate::types::{AttributeKind, NestedAttributes, NestingMode};
use crate::{Attribute, AttributePath, Diagnostic, Diagnostics, Value, ValueAccessor};

/// Validates `attribute` and its subtree against the configuration at `path`.
///
/// Always returns; every problem is reported as a diagnostic.
pub fn validate_attribute(
    attribute: &Attribute,
    path: &AttributePath,
    config: &dyn ValueAccessor,
) -> Diagnostics {
    let mut diags = Diagnostics::new();
    walk(attribute, path, config, false, &mut diags);
    diags
}

/// `parent_unknown` is set when the enclosing single-nested object is
/// unknown, so an unknown value here was never configured directly.
fn walk(
    attribute: &Attribute,
    path: &AttributePath,
    config: &dyn ValueAccessor,
    parent_unknown: bool,
    diags: &mut Diagnostics,
) {
    let Some(kind) = attribute.defined_kind() else {
        debug!(%path, "attribute defines neither type nor nested attributes");
        diags.push(invalid_definition(path));
        return;
    };

    let value = match config.get_attribute(path) {
        Ok(value) => value,
        Err(resolution) => {
            debug!(%path, "configuration value could not be resolved");
            diags.append(resolution);
            return;
        }
    };

    let req = ValidateAttributeRequest {
        path,
        config: &value,
    };
    for validator in &attribute.validators {
        diags.append(validator.validate(&req));
    }

    if let AttributeKind::Nested(nested) = kind {
        if !walk_nested(nested, path, &value, config, diags) {
            return;
        }
    }

    let inherited_unknown = parent_unknown && value == Value::Unknown;
    if !attribute.deprecation_message.is_empty() && !value.is_null() && !inherited_unknown {
        diags.push(
            Diagnostic::warning("Attribute Deprecated", attribute.deprecation_message.clone())
                .at(path.clone()),
        );
    }
}

/// Recurses into children. Returns `false` when the subtree must stop.
fn walk_nested(
    nested: &NestedAttributes,
    path: &AttributePath,
    value: &Value,
    config: &dyn ValueAccessor,
    diags: &mut Diagnostics,
) -> bool {
    let names = nested.sorted_names();
    let walk_children = |element: &AttributePath, parent_unknown: bool, diags: &mut Diagnostics| {
        for name in &names {
            walk(
                &nested.attributes[*name],
                &element.with_attribute_name(*name),
                config,
                parent_unknown,
                diags,
            );
        }
    };

    match (nested.nesting_mode, value) {
        (NestingMode::Single, Value::Null | Value::Object(_)) => walk_children(path, false, diags),
        (NestingMode::Single, Value::Unknown) => walk_children(path, true, diags),
        (NestingMode::List, Value::List(elems)) => {
            for index in 0..elems.len() {
                walk_children(&path.with_element_key_int(index as i64), false, diags);
            }
        }
        (NestingMode::Map, Value::Map(entries)) => {
            for key in entries.keys() {
                walk_children(&path.with_element_key_string(key.as_str()), false, diags);
            }
        }
        (NestingMode::List | NestingMode::Map, Value::Null | Value::Unknown) => {}
        (NestingMode::Set, value) => {
            if value.is_known() {
                diags.push(unsupported_set(path, "validation"));
                return false;
            }
        }
        (mode, other) => {
            diags.push(
                Diagnostic::error(
                    "Attribute Validation Error",
                    format!(
                        "Attribute validation cannot walk schema. Report this to the provider developer:\n\n\
                         unknown attribute value type ({}) for nesting mode ({mode}) at path: {path}",
                        other.kind_name(),
                    ),
                )
                .at(path.clone()),
            );
            return false;
        }
    }
    true
}

pub(crate) fn invalid_definition(path: &AttributePath) -> Diagnostic {
    Diagnostic::error(
        "Invalid Attribute Definition",
        "Attribute must define either Attributes or Type. \
         This is always a problem with the provider and should be reported to the provider developer.",
    )
    .at(path.clone())
}

pub(crate) fn unsupported_set(path: &AttributePath, walk: &str) -> Diagnostic {
    Diagnostic::error(
        "Unsupported Nesting Mode",
        format!(
            "Attribute {walk} does not support set nested attributes yet. \
             This is always a problem with the provider and should be reported to the provider developer."
        ),
    )
    .at(path.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::hooks::AttributeValidator;
    use crate::{NestedAttributes, Severity, Snapshot, ValueType};

    /// Records the path of every value it is asked to validate.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn paths(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl AttributeValidator for Recorder {
        fn description(&self) -> String {
            "records paths".to_string()
        }

        fn validate(&self, req: &ValidateAttributeRequest<'_>) -> Diagnostics {
            self.0.lock().unwrap().push(req.path.to_string());
            Diagnostics::new()
        }
    }

    /// Fails every value it sees.
    struct AlwaysFail(&'static str);

    impl AttributeValidator for AlwaysFail {
        fn description(&self) -> String {
            self.0.to_string()
        }

        fn validate(&self, req: &ValidateAttributeRequest<'_>) -> Diagnostics {
            Diagnostic::error("Invalid Attribute Value", self.0)
                .at(req.path.clone())
                .into()
        }
    }

    fn snapshot(json: serde_json::Value) -> Snapshot {
        Snapshot::new(Value::from(json))
    }

    fn foo() -> AttributePath {
        AttributePath::root().with_attribute_name("foo")
    }

    #[test]
    fn test_required_string_without_problems() {
        let attr = Attribute::required(ValueType::String);
        let diags = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": "hello" })));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_undefined_attribute_reports_once_and_stops() {
        let recorder = Recorder::default();
        let mut attr = Attribute::default().with_validator(recorder.clone());
        attr.deprecation_message = "gone".to_string();

        let diags = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": "x" })));

        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.summary, "Invalid Attribute Definition");
        assert_eq!(diag.attribute, Some(foo()));
        assert!(diag.detail.contains("problem with the provider"));
        assert!(recorder.paths().is_empty());
    }

    #[test]
    fn test_empty_nested_attributes_count_as_undefined() {
        let attr = Attribute::optional_nested(NestedAttributes::single(
            Vec::<(String, Attribute)>::new(),
        ));
        let diags = validate_attribute(&attr, &foo(), &snapshot(json!({})));
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.iter().next().unwrap().summary,
            "Invalid Attribute Definition"
        );
    }

    #[test]
    fn test_undefined_child_does_not_stop_siblings() {
        let attr = Attribute::optional_nested(NestedAttributes::single([
            ("broken", Attribute::default()),
            (
                "fine",
                Attribute::optional(ValueType::String).with_validator(AlwaysFail("nope")),
            ),
        ]));
        let diags = validate_attribute(
            &attr,
            &foo(),
            &snapshot(json!({ "foo": { "fine": "x" } })),
        );

        let summaries: Vec<&str> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec!["Invalid Attribute Definition", "Invalid Attribute Value"]
        );
    }

    #[test]
    fn test_deprecation_warning_only_for_non_null() {
        let attr = Attribute::optional(ValueType::String).deprecated("use bar instead");

        let set = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": "x" })));
        assert_eq!(set.len(), 1);
        let warning = set.iter().next().unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.detail, "use bar instead");

        let unset = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": null })));
        assert!(unset.is_empty());
    }

    #[test]
    fn test_deprecation_warning_after_nested_errors() {
        let attr = Attribute::optional_nested(NestedAttributes::single([(
            "inner",
            Attribute::optional(ValueType::String).with_validator(AlwaysFail("bad")),
        )]))
        .deprecated("use bar instead");

        let diags = validate_attribute(
            &attr,
            &foo(),
            &snapshot(json!({ "foo": { "inner": "x" } })),
        );
        let severities: Vec<Severity> = diags.iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Error, Severity::Warning]);
    }

    #[test]
    fn test_all_validators_run() {
        let attr = Attribute::optional(ValueType::String)
            .with_validator(AlwaysFail("first"))
            .with_validator(AlwaysFail("second"));
        let diags = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": "x" })));

        let details: Vec<&str> = diags.iter().map(|d| d.detail.as_str()).collect();
        assert_eq!(details, vec!["first", "second"]);
    }

    #[test]
    fn test_list_visits_every_element_and_child() {
        let recorder = Recorder::default();
        let attr = Attribute::optional_nested(NestedAttributes::list([
            (
                "a",
                Attribute::optional(ValueType::String).with_validator(recorder.clone()),
            ),
            (
                "b",
                Attribute::optional(ValueType::String).with_validator(recorder.clone()),
            ),
        ]));
        let config = snapshot(json!({ "foo": [{ "a": "1", "b": "2" }, { "a": "3" }] }));

        let diags = validate_attribute(&attr, &foo(), &config);

        assert!(diags.is_empty());
        let mut paths = recorder.paths();
        paths.sort();
        assert_eq!(
            paths,
            vec!["foo[0].a", "foo[0].b", "foo[1].a", "foo[1].b"]
        );
    }

    #[test]
    fn test_list_errors_scale_with_elements() {
        let attr = Attribute::optional_nested(NestedAttributes::list([
            (
                "a",
                Attribute::optional(ValueType::String).with_validator(AlwaysFail("a")),
            ),
            (
                "b",
                Attribute::optional(ValueType::String).with_validator(AlwaysFail("b")),
            ),
        ]));
        let config = snapshot(json!({ "foo": [{}, {}, {}] }));

        let diags = validate_attribute(&attr, &foo(), &config);

        assert_eq!(diags.len(), 3 * 2);
        let anchored: Vec<String> = diags
            .iter()
            .map(|d| d.attribute.as_ref().unwrap().to_string())
            .collect();
        assert!(anchored.contains(&"foo[2].b".to_string()));
    }

    #[test]
    fn test_map_visits_every_key() {
        let recorder = Recorder::default();
        let attr = Attribute::optional_nested(NestedAttributes::map([(
            "value",
            Attribute::optional(ValueType::String).with_validator(recorder.clone()),
        )]));
        let mut entries = std::collections::BTreeMap::new();
        for key in ["dev", "prod"] {
            entries.insert(
                key.to_string(),
                Value::Object([("value".to_string(), Value::from(key))].into()),
            );
        }
        let config = Snapshot::new(Value::Object(
            [("foo".to_string(), Value::Map(entries))].into(),
        ));

        assert!(validate_attribute(&attr, &foo(), &config).is_empty());
        let mut paths = recorder.paths();
        paths.sort();
        assert_eq!(paths, vec!["foo[\"dev\"].value", "foo[\"prod\"].value"]);
    }

    #[test]
    fn test_list_mode_with_non_list_value() {
        let recorder = Recorder::default();
        let attr = Attribute::optional_nested(NestedAttributes::list([(
            "a",
            Attribute::optional(ValueType::String).with_validator(recorder.clone()),
        )]))
        .deprecated("old");

        let diags = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": { "a": "x" } })));

        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Attribute Validation Error");
        assert!(diag.detail.contains("nesting mode (list)"));
        assert!(recorder.paths().is_empty());
    }

    #[test]
    fn test_null_list_is_not_walked() {
        let attr = Attribute::optional_nested(NestedAttributes::list([(
            "a",
            Attribute::optional(ValueType::String).with_validator(AlwaysFail("a")),
        )]));
        let diags = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": null })));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_set_nesting_is_reported_as_unsupported() {
        let attr = Attribute::optional_nested(NestedAttributes::set([(
            "a",
            Attribute::optional(ValueType::String),
        )]));
        let config = Snapshot::new(Value::Object(
            [(
                "foo".to_string(),
                Value::Set(vec![Value::Object(Default::default())]),
            )]
            .into(),
        ));

        let diags = validate_attribute(&attr, &foo(), &config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, "Unsupported Nesting Mode");

        let null = validate_attribute(&attr, &foo(), &Snapshot::null());
        assert!(null.is_empty());
    }

    #[test]
    fn test_resolution_failure_stops_subtree() {
        let recorder = Recorder::default();
        let attr = Attribute::optional(ValueType::String).with_validator(recorder.clone());
        let path = foo().with_element_key_int(0);

        let diags = validate_attribute(&attr, &path, &snapshot(json!({ "foo": "scalar" })));

        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, "Value Conversion Error");
        assert!(recorder.paths().is_empty());
    }

    #[test]
    fn test_map_mode_with_non_map_value() {
        let recorder = Recorder::default();
        let attr = Attribute::optional_nested(NestedAttributes::map([(
            "value",
            Attribute::optional(ValueType::String).with_validator(recorder.clone()),
        )]));

        let diags = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": ["x", "y"] })));

        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Attribute Validation Error");
        assert_eq!(diag.attribute, Some(foo()));
        assert!(diag.detail.contains("nesting mode (map)"));
        assert!(recorder.paths().is_empty());
    }

    #[test]
    fn test_single_mode_with_scalar_value() {
        let recorder = Recorder::default();
        let attr = Attribute::optional_nested(NestedAttributes::single([
            (
                "a",
                Attribute::optional(ValueType::String).with_validator(recorder.clone()),
            ),
            ("b", Attribute::optional(ValueType::String)),
        ]));

        let diags = validate_attribute(&attr, &foo(), &snapshot(json!({ "foo": "scalar" })));

        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Attribute Validation Error");
        assert!(diag.detail.contains("nesting mode (single)"));
        assert!(recorder.paths().is_empty());
    }

    #[test]
    fn test_no_deprecation_warning_under_unknown_object() {
        let recorder = Recorder::default();
        let attr = Attribute::optional_nested(NestedAttributes::single([(
            "old",
            Attribute::optional(ValueType::String)
                .with_validator(recorder.clone())
                .deprecated("use new instead"),
        )]));

        let unknown = validate_attribute(
            &attr,
            &foo(),
            &snapshot(json!({ "foo": { "$unknown": true } })),
        );
        assert!(unknown.is_empty());
        assert_eq!(recorder.paths(), vec!["foo.old"]);

        let configured = validate_attribute(
            &attr,
            &foo(),
            &snapshot(json!({ "foo": { "old": { "$unknown": true } } })),
        );
        assert_eq!(configured.warnings().count(), 1);
    }
}
