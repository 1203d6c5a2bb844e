//! Ready-made validators and plan modifiers.
//!
//! Validators skip null and unknown values; whether a value must be present
//! is expressed by the attribute's requirement flags, not by validators.

use crate::hooks::{
    AttributePlanModifier, AttributeValidator, ModifyAttributePlanRequest,
    ModifyAttributePlanResponse, ValidateAttributeRequest,
};
use crate::{Diagnostic, Diagnostics, Value};

fn invalid_value(req: &ValidateAttributeRequest<'_>, detail: String) -> Diagnostics {
    Diagnostic::error("Invalid Attribute Value", detail)
        .at(req.path.clone())
        .into()
}

fn invalid_type(req: &ValidateAttributeRequest<'_>, expected: &str) -> Diagnostics {
    Diagnostic::error(
        "Invalid Attribute Type",
        format!(
            "Expected a {expected} value, got {}.",
            req.config.kind_name()
        ),
    )
    .at(req.path.clone())
    .into()
}

/// String length, in characters, must be within `min..=max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLengthBetween {
    pub min: usize,
    pub max: usize,
}

impl StringLengthBetween {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl AttributeValidator for StringLengthBetween {
    fn description(&self) -> String {
        format!(
            "string length must be between {} and {}",
            self.min, self.max
        )
    }

    fn validate(&self, req: &ValidateAttributeRequest<'_>) -> Diagnostics {
        if !req.config.is_known() {
            return Diagnostics::new();
        }
        let Some(s) = req.config.as_str() else {
            return invalid_type(req, "string");
        };
        let len = s.chars().count();
        if len < self.min || len > self.max {
            return invalid_value(
                req,
                format!("Attribute {}, got: {len}", self.description()),
            );
        }
        Diagnostics::new()
    }
}

/// String must equal one of the allowed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringOneOf {
    pub values: Vec<String>,
}

impl StringOneOf {
    pub fn new<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl AttributeValidator for StringOneOf {
    fn description(&self) -> String {
        let quoted: Vec<String> = self.values.iter().map(|v| format!("{v:?}")).collect();
        format!("value must be one of: [{}]", quoted.join(" "))
    }

    fn validate(&self, req: &ValidateAttributeRequest<'_>) -> Diagnostics {
        if !req.config.is_known() {
            return Diagnostics::new();
        }
        let Some(s) = req.config.as_str() else {
            return invalid_type(req, "string");
        };
        if !self.values.iter().any(|v| v == s) {
            return invalid_value(req, format!("Attribute {}, got: {s:?}", self.description()));
        }
        Diagnostics::new()
    }
}

/// Number must be within `min..=max`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberBetween {
    pub min: f64,
    pub max: f64,
}

impl NumberBetween {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl AttributeValidator for NumberBetween {
    fn description(&self) -> String {
        format!("value must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, req: &ValidateAttributeRequest<'_>) -> Diagnostics {
        if !req.config.is_known() {
            return Diagnostics::new();
        }
        let Some(n) = req.config.as_f64() else {
            return invalid_type(req, "number");
        };
        if n < self.min || n > self.max {
            return invalid_value(req, format!("Attribute {}, got: {n}", self.description()));
        }
        Diagnostics::new()
    }
}

/// Keeps the prior state value when the plan would otherwise be unknown.
///
/// Useful for computed attributes that never change after creation, such as
/// identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UseStateForUnknown;

impl AttributePlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify(&self, req: &ModifyAttributePlanRequest<'_>) -> ModifyAttributePlanResponse {
        if req.state.is_null() || !req.plan.is_unknown() || req.config.is_unknown() {
            return ModifyAttributePlanResponse::unchanged(req);
        }
        ModifyAttributePlanResponse::with_plan(req.state.clone())
    }
}

/// Flags the resource for replacement when the planned value differs from
/// state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequiresReplace;

impl AttributePlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this attribute changes, the resource will be replaced.".to_string()
    }

    fn modify(&self, req: &ModifyAttributePlanRequest<'_>) -> ModifyAttributePlanResponse {
        let mut resp = ModifyAttributePlanResponse::unchanged(req);
        // Nothing to replace on create.
        if req.state.is_null() {
            return resp;
        }
        resp.requires_replace = req.plan != req.state;
        resp
    }
}

/// Plans a fixed value when the practitioner leaves the attribute unset.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue {
    pub value: Value,
}

impl DefaultValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl AttributePlanModifier for DefaultValue {
    fn description(&self) -> String {
        format!("Defaults to {} when not configured.", self.value.to_json())
    }

    fn modify(&self, req: &ModifyAttributePlanRequest<'_>) -> ModifyAttributePlanResponse {
        if !req.config.is_null() || req.plan.is_known() {
            return ModifyAttributePlanResponse::unchanged(req);
        }
        ModifyAttributePlanResponse::with_plan(self.value.clone())
    }
}
