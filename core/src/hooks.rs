//! Validator and plan modifier hooks.
//!
//! Each hook has one capability. Validators inspect a configured value and
//! report problems; plan modifiers inspect config, prior state and the
//! proposed plan and return a new plan value. Attributes hold ordered
//! sequences of both as shared trait objects.

use crate::{AttributePath, Diagnostics, Value};

/// Input to [`AttributeValidator::validate`].
#[derive(Debug, Clone)]
pub struct ValidateAttributeRequest<'a> {
    /// Location of the attribute being validated.
    pub path: &'a AttributePath,
    /// Configured value at `path`.
    pub config: &'a Value,
}

/// Inspects a configured value and reports problems.
///
/// # Examples
///
/// ```
/// use attribute_schema_core::{
///     AttributeValidator, Diagnostic, Diagnostics, ValidateAttributeRequest,
/// };
///
/// struct NotEmpty;
///
/// impl AttributeValidator for NotEmpty {
///     fn description(&self) -> String {
///         "value must not be empty".to_string()
///     }
///
///     fn validate(&self, req: &ValidateAttributeRequest<'_>) -> Diagnostics {
///         match req.config.as_str() {
///             Some("") => Diagnostic::error("Invalid Attribute Value", self.description())
///                 .at(req.path.clone())
///                 .into(),
///             _ => Diagnostics::new(),
///         }
///     }
/// }
/// ```
pub trait AttributeValidator: Send + Sync {
    /// Plain text description of what the validator enforces.
    fn description(&self) -> String;

    /// Markdown description; defaults to [`description`](Self::description).
    fn markdown_description(&self) -> String {
        self.description()
    }

    /// Returns the diagnostics for `req.config`; empty when valid.
    fn validate(&self, req: &ValidateAttributeRequest<'_>) -> Diagnostics;
}

/// Input to [`AttributePlanModifier::modify`].
#[derive(Debug, Clone)]
pub struct ModifyAttributePlanRequest<'a> {
    pub path: &'a AttributePath,
    /// Configured value at `path`.
    pub config: &'a Value,
    /// Prior state value at `path`; null on create.
    pub state: &'a Value,
    /// Current plan value; the previous modifier's output.
    pub plan: &'a Value,
    /// Provider metadata supplied by the caller.
    pub provider_meta: &'a Value,
}

/// Output of [`AttributePlanModifier::modify`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifyAttributePlanResponse {
    /// Plan value handed to the next modifier.
    pub plan: Value,
    /// Whether a change to this attribute forces resource replacement.
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

impl ModifyAttributePlanResponse {
    /// Response that keeps the request's plan value.
    pub fn unchanged(req: &ModifyAttributePlanRequest<'_>) -> Self {
        Self {
            plan: req.plan.clone(),
            ..Default::default()
        }
    }

    /// Response that replaces the plan value.
    pub fn with_plan(plan: Value) -> Self {
        Self {
            plan,
            ..Default::default()
        }
    }
}

/// Transforms a proposed plan value.
///
/// Modifiers run as a pipeline: each sees the plan value produced by the
/// previous one, and an error diagnostic stops the pipeline.
pub trait AttributePlanModifier: Send + Sync {
    /// Plain text description of the modification.
    fn description(&self) -> String;

    fn markdown_description(&self) -> String {
        self.description()
    }

    fn modify(&self, req: &ModifyAttributePlanRequest<'_>) -> ModifyAttributePlanResponse;
}
