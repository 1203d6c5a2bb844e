//! Dynamic configuration values and path-based access to them.
//!
//! The engine never inspects raw wire data. It asks a [`ValueAccessor`] for
//! the value at a path and receives a [`Value`] or diagnostics explaining why
//! the value could not be resolved. [`Snapshot`] is the accessor over a fully
//! materialized value.
//!
//! # Examples
//!
//! ```
//! use attribute_schema_core::{AttributePath, Snapshot, Value, ValueAccessor};
//!
//! let config = Snapshot::new(Value::from(serde_json::json!({
//!     "rules": [{ "port": 443 }]
//! })));
//! let path = AttributePath::root()
//!     .with_attribute_name("rules")
//!     .with_element_key_int(0)
//!     .with_attribute_name("port");
//!
//! assert_eq!(config.get_attribute(&path).unwrap(), Value::Number(443.0));
//! ```

use std::collections::BTreeMap;

use crate::{AttributePath, Diagnostic, Diagnostics, PathStep};

/// JSON object key marking a value that is not known until apply.
pub const UNKNOWN_MARKER: &str = "$unknown";

/// A configuration, state or plan value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Not set.
    #[default]
    Null,
    /// Set, but not known until apply.
    Unknown,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns `true` for values that are neither null nor unknown.
    pub fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Short kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Unknown => "unknown",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    /// Descends one step into this value.
    ///
    /// Stepping through a null or unknown value yields the same marker.
    /// A missing object attribute, list index or map key yields null.
    ///
    /// # Errors
    ///
    /// Returns a message describing the mismatch when the step does not
    /// apply to this kind of value.
    pub fn step(&self, step: &PathStep) -> Result<Value, String> {
        Ok(self.step_ref(step)?.cloned().unwrap_or_default())
    }

    fn step_ref(&self, step: &PathStep) -> Result<Option<&Value>, String> {
        match (self, step) {
            (Self::Null | Self::Unknown, _) => Ok(Some(self)),
            (Self::Object(fields), PathStep::AttributeName(name)) => Ok(fields.get(name)),
            (Self::List(elems), PathStep::ElementKeyInt(index)) => {
                Ok(usize::try_from(*index).ok().and_then(|i| elems.get(i)))
            }
            (Self::Map(entries), PathStep::ElementKeyString(key)) => Ok(entries.get(key)),
            (value, step) => Err(format!(
                "cannot apply step {step} to {} value",
                value.kind_name()
            )),
        }
    }

    /// Converts back to JSON, encoding unknown values with [`UNKNOWN_MARKER`].
    ///
    /// Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::Unknown => {
                let mut marker = serde_json::Map::new();
                marker.insert(UNKNOWN_MARKER.to_string(), Json::Bool(true));
                Json::Object(marker)
            }
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::String(s) => Json::String(s.clone()),
            Self::List(elems) | Self::Set(elems) => {
                Json::Array(elems.iter().map(Value::to_json).collect())
            }
            Self::Map(entries) | Self::Object(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Returns `true` if `json` is the unknown marker object.
pub(crate) fn is_unknown_marker(json: &serde_json::Value) -> bool {
    json.as_object().is_some_and(|obj| {
        obj.len() == 1 && obj.get(UNKNOWN_MARKER) == Some(&serde_json::Value::Bool(true))
    })
}

/// Untyped conversion: arrays become lists and objects become objects.
///
/// Use [`Schema::value_from_json`](crate::Schema::value_from_json) to build
/// maps and sets where the schema declares them.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        if is_unknown_marker(&json) {
            return Self::Unknown;
        }
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => n.as_f64().map(Self::Number).unwrap_or_default(),
            Json::String(s) => Self::String(s),
            Json::Array(elems) => Self::List(elems.into_iter().map(Value::from).collect()),
            Json::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Resolves the value at a path within one of config, state or plan.
///
/// Implementations must be safe to call from many walks at once.
pub trait ValueAccessor: Send + Sync {
    /// Returns the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns diagnostics when the value cannot be resolved.
    fn get_attribute(&self, path: &AttributePath) -> Result<Value, Diagnostics>;
}

/// [`ValueAccessor`] over a fully materialized root value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    root: Value,
}

impl Snapshot {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Snapshot of an absent value; every path resolves to null.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

impl ValueAccessor for Snapshot {
    fn get_attribute(&self, path: &AttributePath) -> Result<Value, Diagnostics> {
        let mut current = &self.root;
        for step in path.steps() {
            match current.step_ref(step) {
                Ok(Some(next)) => current = next,
                Ok(None) => return Ok(Value::Null),
                Err(err) => {
                    return Err(Diagnostics::from(
                        Diagnostic::error(
                            "Value Conversion Error",
                            format!(
                                "An unexpected error was encountered trying to retrieve the value at this path. \
                                 This is always a problem with the provider and should be reported to the provider developer:\n\n{err}"
                            ),
                        )
                        .at(path.clone()),
                    ));
                }
            }
        }
        Ok(current.clone())
    }
}
