//! Schema registry loading with builder pattern and fallback chains.
//!
//! Provides [`SchemaRegistry`] for name-keyed schema lookup and
//! [`RegistryBuilder`] for constructing a registry from multiple sources with
//! automatic fallback.
//!
//! # Loading patterns
//!
//! ```no_run
//! use attribute_schema_db::SchemaRegistry;
//!
//! // Load from a directory of JSON/YAML definition files
//! let registry = SchemaRegistry::from_dir("schemas/").unwrap();
//! assert!(registry.get("network").is_some());
//!
//! // Load from a single bundle file
//! let registry = SchemaRegistry::from_bundle("schemas.json").unwrap();
//!
//! // Use the builder for a fallback chain
//! let registry = SchemaRegistry::builder()
//!     .from_dir("schemas/")
//!     .from_bundle("schemas.json")
//!     .build()
//!     .unwrap();
//! ```

use std::collections::HashMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use attribute_schema_core::Schema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::definition::SchemaDefinition;
use crate::error::{RegistryError, Result};

/// Describes where a [`SchemaRegistry`] was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrySource {
    /// A directory of individual definition files.
    Directory(PathBuf),
    /// A single [`SchemaBundle`] file.
    Bundle(PathBuf),
    /// Definitions handed over in memory.
    Inline,
    /// A fallback chain of multiple sources.
    Multiple(Vec<RegistrySource>),
}

/// Several schema definitions distributed as one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Bundle format version (e.g., `"1.0"`).
    pub version: String,
    pub schemas: Vec<SchemaDefinition>,
}

/// Reads a definition file, choosing the format from its extension.
///
/// # Errors
///
/// Returns [`RegistryError::UnsupportedFormat`] for extensions other than
/// `json`, `yaml` and `yml`, or an I/O or parse error.
pub fn read_definition_file<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let path = path.as_ref();
    let format = definition_format(path)
        .ok_or_else(|| RegistryError::UnsupportedFormat(path.to_path_buf()))?;
    let reader = BufReader::new(std::fs::File::open(path)?);
    Ok(match format {
        Format::Json => serde_json::from_reader(reader)?,
        Format::Yaml => serde_yaml::from_reader(reader)?,
    })
}

enum Format {
    Json,
    Yaml,
}

fn definition_format(path: &Path) -> Option<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Some(Format::Json),
        Some("yaml" | "yml") => Some(Format::Yaml),
        _ => None,
    }
}

/// Loaded schemas keyed by name.
///
/// # Examples
///
/// ```
/// use attribute_schema_db::{SchemaDefinition, SchemaRegistry};
///
/// let def: SchemaDefinition = serde_json::from_value(serde_json::json!({
///     "name": "bucket",
///     "attributes": { "name": { "type": "string", "required": true } }
/// }))
/// .unwrap();
///
/// let registry = SchemaRegistry::from_definitions([def]).unwrap();
/// assert_eq!(registry.names(), vec!["bucket"]);
/// ```
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
    source: RegistrySource,
}

impl SchemaRegistry {
    /// Returns a new [`RegistryBuilder`] for configuring a fallback chain.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Builds a registry from in-memory definitions.
    ///
    /// # Errors
    ///
    /// Returns the first conversion error, or
    /// [`RegistryError::DuplicateSchema`] when two definitions share a name.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = SchemaDefinition>,
    ) -> Result<Self> {
        let mut registry = Self {
            schemas: HashMap::new(),
            source: RegistrySource::Inline,
        };
        for def in definitions {
            registry.add_definition(&def)?;
        }
        Ok(registry)
    }

    /// Loads every `*.json`, `*.yaml` and `*.yml` file in a directory, one
    /// schema definition per file.
    ///
    /// Files with other extensions are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IoError`] if the directory or a file cannot
    /// be read, a parse error for malformed files, or a definition error for
    /// schemas that fail conversion.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if definition_format(&file_path).is_some() {
                files.push(file_path);
            } else {
                debug!(path = %file_path.display(), "skipping non-definition file");
            }
        }
        files.sort();

        let mut registry = Self {
            schemas: HashMap::new(),
            source: RegistrySource::Directory(path.to_path_buf()),
        };
        for file in &files {
            let def: SchemaDefinition = read_definition_file(file)?;
            registry.add_definition(&def)?;
        }

        info!(
            dir = %path.display(),
            schemas = registry.len(),
            "loaded schema definitions"
        );
        Ok(registry)
    }

    /// Loads a [`SchemaBundle`] JSON or YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IoError`] if the file cannot be read, a parse
    /// error if it is not a bundle, or a definition error.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bundle: SchemaBundle = read_definition_file(path)?;

        let mut registry = Self::from_definitions(bundle.schemas)?;
        registry.source = RegistrySource::Bundle(path.to_path_buf());

        info!(
            bundle = %path.display(),
            version = %bundle.version,
            schemas = registry.len(),
            "loaded schema bundle"
        );
        Ok(registry)
    }

    fn add_definition(&mut self, def: &SchemaDefinition) -> Result<()> {
        if self.schemas.contains_key(&def.name) {
            return Err(RegistryError::DuplicateSchema(def.name.clone()));
        }
        let schema = def.to_schema()?;
        self.schemas.insert(def.name.clone(), schema);
        Ok(())
    }

    /// Looks up a schema by name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Inserts a schema, replacing any existing entry with the same name.
    pub fn insert(&mut self, name: String, schema: Schema) {
        self.schemas.insert(name, schema);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Returns schema names in lexicographic order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &RegistrySource {
        &self.source
    }
}

/// Builder for constructing a [`SchemaRegistry`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`RegistryError::NoSourcesAvailable`] is returned.
pub struct RegistryBuilder {
    sources: Vec<RegistrySource>,
}

impl RegistryBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a directory of definition files as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::Directory(path.into()));
        self
    }

    /// Adds a bundle file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::Bundle(path.into()));
        self
    }

    /// Attempts to load schemas from configured sources in order.
    ///
    /// Returns the first successfully loaded registry. If all sources fail,
    /// returns [`RegistryError::NoSourcesAvailable`].
    pub fn build(self) -> Result<SchemaRegistry> {
        if self.sources.is_empty() {
            return Err(RegistryError::NoSourcesAvailable);
        }

        let all_sources = self.sources.clone();

        for source in &self.sources {
            let result = match source {
                RegistrySource::Directory(path) => SchemaRegistry::from_dir(path),
                RegistrySource::Bundle(path) => SchemaRegistry::from_bundle(path),
                RegistrySource::Inline | RegistrySource::Multiple(_) => continue,
            };

            match result {
                Ok(mut registry) => {
                    registry.source = RegistrySource::Multiple(all_sources);
                    return Ok(registry);
                }
                Err(err) => warn!(?source, error = %err, "schema source failed, trying next"),
            }
        }

        Err(RegistryError::NoSourcesAvailable)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
