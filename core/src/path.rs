//! Attribute paths addressing values inside nested configuration.
//!
//! An [`AttributePath`] is an immutable sequence of [`PathStep`]s. Extending a
//! path always returns a new value, so a parent path can be reused for every
//! sibling branch during a walk.
//!
//! # Examples
//!
//! ```
//! use attribute_schema_core::AttributePath;
//!
//! let root = AttributePath::root();
//! let rule = root
//!     .with_attribute_name("rules")
//!     .with_element_key_int(0)
//!     .with_attribute_name("port");
//!
//! assert!(root.is_empty());
//! assert_eq!(rule.len(), 3);
//! assert_eq!(rule.to_string(), "rules[0].port");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of an [`AttributePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStep {
    /// Selects a named attribute of an object.
    AttributeName(String),
    /// Selects an element of an ordered container by index.
    ElementKeyInt(i64),
    /// Selects an element of a keyed container by key.
    ElementKeyString(String),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeName(name) => write!(f, "{name}"),
            Self::ElementKeyInt(index) => write!(f, "[{index}]"),
            Self::ElementKeyString(key) => write!(f, "[{key:?}]"),
        }
    }
}

/// Location of a value inside a nested configuration.
///
/// The empty path addresses the root value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    /// Returns the empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from explicit steps.
    pub fn from_steps(steps: impl IntoIterator<Item = PathStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Returns a new path extended by an attribute name step.
    pub fn with_attribute_name(&self, name: impl Into<String>) -> Self {
        self.with_step(PathStep::AttributeName(name.into()))
    }

    /// Returns a new path extended by an integer element key step.
    pub fn with_element_key_int(&self, index: i64) -> Self {
        self.with_step(PathStep::ElementKeyInt(index))
    }

    /// Returns a new path extended by a string element key step.
    pub fn with_element_key_string(&self, key: impl Into<String>) -> Self {
        self.with_step(PathStep::ElementKeyString(key.into()))
    }

    /// Returns a new path extended by `step`.
    pub fn with_step(&self, step: PathStep) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend(self.steps.iter().cloned());
        steps.push(step);
        Self { steps }
    }

    /// Returns the steps in order from the root.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Returns the final step, or `None` for the root path.
    pub fn last_step(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    /// Returns the path without its final step, or `None` for the root path.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.steps.split_last()?;
        Some(Self {
            steps: rest.to_vec(),
        })
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` for the root path.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 && matches!(step, PathStep::AttributeName(_)) {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
