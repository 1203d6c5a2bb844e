//! Plan modification walk.
//!
//! Runs each attribute's plan modifiers as a pipeline, then descends into
//! nested attributes, threading the evolving plan value: children read their
//! proposed value from the parent's modified plan and write their result back
//! into it.
//!
//! # Examples
//!
//! ```
//! use attribute_schema_core::*;
//! use attribute_schema_core::builtin::DefaultValue;
//!
//! let tier = Attribute::optional(ValueType::String)
//!     .also_computed()
//!     .with_plan_modifier(DefaultValue::new("standard"));
//! let path = AttributePath::root().with_attribute_name("tier");
//! let plan = Snapshot::new(Value::from(serde_json::json!({ "tier": { "$unknown": true } })));
//!
//! let outcome = modify_attribute_plan(
//!     &tier,
//!     &path,
//!     &PlanInputs {
//!         config: &Snapshot::null(),
//!         state: &Snapshot::null(),
//!         plan: &plan,
//!         provider_meta: &Value::Null,
//!     },
//! );
//! assert_eq!(outcome.planned, Value::from("standard"));
//! assert!(outcome.diagnostics.is_empty());
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::hooks::ModifyAttributePlanRequest;
use crate::types::{AttributeKind, NestedAttributes, NestingMode, sorted_keys};
use crate::validate::{invalid_definition, unsupported_set};
use crate::{Attribute, AttributePath, Diagnostic, Diagnostics, Value, ValueAccessor};

/// Value sources for a plan modification walk.
#[derive(Clone, Copy)]
pub struct PlanInputs<'a> {
    pub config: &'a dyn ValueAccessor,
    pub state: &'a dyn ValueAccessor,
    pub plan: &'a dyn ValueAccessor,
    pub provider_meta: &'a Value,
}

/// Result of a plan modification walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutcome {
    /// Planned value for the walked subtree.
    pub planned: Value,
    /// Attributes whose change forces replacement, in walk order.
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Diagnostics,
}

/// Computes the planned value of `attribute` and its subtree at `path`.
///
/// The caller assembles the returned value into the full planned object.
pub fn modify_attribute_plan(
    attribute: &Attribute,
    path: &AttributePath,
    inputs: &PlanInputs<'_>,
) -> PlanOutcome {
    let mut outcome = PlanOutcome::default();
    if let Some(planned) = walk(attribute, path, inputs, None, &mut outcome) {
        outcome.planned = planned;
    }
    outcome
}

fn resolve(
    accessor: &dyn ValueAccessor,
    path: &AttributePath,
    diags: &mut Diagnostics,
) -> Option<Value> {
    match accessor.get_attribute(path) {
        Ok(value) => Some(value),
        Err(resolution) => {
            debug!(%path, "plan input could not be resolved");
            diags.append(resolution);
            None
        }
    }
}

/// Returns `None` when the attribute is undefined or an input could not be
/// resolved.
///
/// `inherited_plan` is the value taken from the parent's modified plan; the
/// root of the walk reads its plan from the accessor instead.
fn walk(
    attribute: &Attribute,
    path: &AttributePath,
    inputs: &PlanInputs<'_>,
    inherited_plan: Option<Value>,
    outcome: &mut PlanOutcome,
) -> Option<Value> {
    let Some(kind) = attribute.defined_kind() else {
        debug!(%path, "attribute defines neither type nor nested attributes");
        outcome.diagnostics.push(invalid_definition(path));
        return None;
    };

    let config = resolve(inputs.config, path, &mut outcome.diagnostics)?;
    let state = resolve(inputs.state, path, &mut outcome.diagnostics)?;
    let mut planned = match inherited_plan {
        Some(plan) => plan,
        None => resolve(inputs.plan, path, &mut outcome.diagnostics)?,
    };

    for modifier in &attribute.plan_modifiers {
        let req = ModifyAttributePlanRequest {
            path,
            config: &config,
            state: &state,
            plan: &planned,
            provider_meta: inputs.provider_meta,
        };
        let resp = modifier.modify(&req);
        planned = resp.plan;
        if resp.requires_replace && !outcome.requires_replace.contains(path) {
            outcome.requires_replace.push(path.clone());
        }
        let failed = resp.diagnostics.has_errors();
        outcome.diagnostics.append(resp.diagnostics);
        if failed {
            debug!(%path, modifier = %modifier.description(), "plan modifier failed");
            return Some(planned);
        }
    }

    if let AttributeKind::Nested(nested) = kind {
        walk_nested(nested, path, inputs, &mut planned, outcome);
    }
    Some(planned)
}

fn walk_nested(
    nested: &NestedAttributes,
    path: &AttributePath,
    inputs: &PlanInputs<'_>,
    planned: &mut Value,
    outcome: &mut PlanOutcome,
) {
    if !planned.is_known() {
        return;
    }
    match nested.nesting_mode {
        NestingMode::Single => walk_element(nested, path, inputs, planned, outcome),
        NestingMode::List => match planned {
            Value::List(elems) => {
                for (index, elem) in elems.iter_mut().enumerate() {
                    let element = path.with_element_key_int(index as i64);
                    walk_element(nested, &element, inputs, elem, outcome);
                }
            }
            other => outcome
                .diagnostics
                .push(cannot_walk(path, other.kind_name(), NestingMode::List)),
        },
        NestingMode::Map => match planned {
            Value::Map(entries) => {
                for (key, elem) in entries.iter_mut() {
                    let element = path.with_element_key_string(key.as_str());
                    walk_element(nested, &element, inputs, elem, outcome);
                }
            }
            other => outcome
                .diagnostics
                .push(cannot_walk(path, other.kind_name(), NestingMode::Map)),
        },
        NestingMode::Set => outcome
            .diagnostics
            .push(unsupported_set(path, "plan modification")),
    }
}

/// Walks the children of one nested object, writing results back into it.
fn walk_element(
    nested: &NestedAttributes,
    element: &AttributePath,
    inputs: &PlanInputs<'_>,
    object: &mut Value,
    outcome: &mut PlanOutcome,
) {
    match object {
        Value::Null | Value::Unknown => {}
        Value::Object(fields) => plan_fields(&nested.attributes, element, inputs, fields, outcome),
        other => {
            let found = other.kind_name();
            outcome
                .diagnostics
                .push(cannot_walk(element, found, nested.nesting_mode));
        }
    }
}

/// Plans each attribute in `attributes` against the matching entry of
/// `fields`, in name order.
pub(crate) fn plan_fields(
    attributes: &HashMap<String, Attribute>,
    element: &AttributePath,
    inputs: &PlanInputs<'_>,
    fields: &mut BTreeMap<String, Value>,
    outcome: &mut PlanOutcome,
) {
    for name in sorted_keys(attributes) {
        let child_path = element.with_attribute_name(name);
        let child_plan = fields.get(name).cloned().unwrap_or_default();
        if let Some(child_planned) = walk(
            &attributes[name],
            &child_path,
            inputs,
            Some(child_plan),
            outcome,
        ) {
            fields.insert(name.to_string(), child_planned);
        }
    }
}

fn cannot_walk(path: &AttributePath, found: &str, mode: NestingMode) -> Diagnostic {
    Diagnostic::error(
        "Attribute Plan Modification Error",
        format!(
            "Attribute plan modification cannot walk schema. Report this to the provider developer:\n\n\
             unknown attribute value type ({found}) for nesting mode ({mode}) at path: {path}"
        ),
    )
    .at(path.clone())
}
