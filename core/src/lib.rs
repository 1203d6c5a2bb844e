//! Recursive attribute schemas and the walks that run over them.
//!
//! This crate models the configuration surface of a managed resource as a
//! tree of attributes:
//!
//! - [`Attribute`]: a leaf with a [`ValueType`] or a branch with
//!   [`NestedAttributes`], plus requirement flags, documentation, validators
//!   and plan modifiers.
//! - [`Schema`]: the top-level attributes of one resource.
//! - [`AttributePath`]: the location of a value inside configuration, state
//!   or plan.
//!
//! Three walks operate on the tree:
//!
//! - Validation ([`validate_attribute`], [`Schema::validate`]) runs
//!   validators top-down and collects [`Diagnostics`] anchored at paths.
//! - Plan modification ([`modify_attribute_plan`], [`Schema::modify_plan`])
//!   pipes proposed plan values through each attribute's modifiers.
//! - Wire conversion ([`Attribute::to_wire`], [`Schema::to_wire`]) produces
//!   the canonical, name-sorted [`WireSchema`].
//!
//! Values are read through the [`ValueAccessor`] trait; [`Snapshot`] is the
//! accessor over a materialized [`Value`].
//!
//! # Example
//!
//! ```
//! use attribute_schema_core::*;
//! use attribute_schema_core::builtin::StringOneOf;
//!
//! let schema = Schema::new([
//!     (
//!         "protocol",
//!         Attribute::required(ValueType::String)
//!             .with_validator(StringOneOf::new(["tcp", "udp"])),
//!     ),
//!     (
//!         "rules",
//!         Attribute::optional_nested(NestedAttributes::list([(
//!             "port",
//!             Attribute::required(ValueType::Number),
//!         )])),
//!     ),
//! ]);
//!
//! let config = Snapshot::new(Value::from(serde_json::json!({
//!     "protocol": "icmp",
//!     "rules": [{ "port": 22 }],
//! })));
//! let diags = schema.validate(&config);
//! assert_eq!(diags.errors().count(), 1);
//! assert_eq!(diags.iter().next().unwrap().attribute.as_ref().unwrap().to_string(), "protocol");
//!
//! let wire = schema.to_wire().unwrap();
//! assert_eq!(wire.attributes[0].name, "protocol");
//! ```

pub mod builtin;
mod diag;
mod error;
mod hooks;
mod path;
mod plan;
mod schema;
mod types;
mod validate;
mod value;
mod wire;

pub use diag::{Diagnostic, Diagnostics, Severity};
pub use error::{ConversionError, DefinitionError, PathError, ValueError};
pub use hooks::{
    AttributePlanModifier, AttributeValidator, ModifyAttributePlanRequest,
    ModifyAttributePlanResponse, ValidateAttributeRequest,
};
pub use path::{AttributePath, PathStep};
pub use plan::{PlanInputs, PlanOutcome, modify_attribute_plan};
pub use schema::Schema;
pub use types::{
    Attribute, AttributeKind, NestedAttributes, NestingMode, ValueType, validate_attribute_name,
};
pub use validate::validate_attribute;
pub use value::{Snapshot, UNKNOWN_MARKER, Value, ValueAccessor};
pub use wire::{StringKind, WireAttribute, WireNestedObject, WireNestingMode, WireSchema};
