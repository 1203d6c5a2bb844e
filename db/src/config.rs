//! Engine configuration.
//!
//! Defines the YAML-serializable configuration that tells tools where schema
//! definitions live, what provider metadata to hand to plan modifiers, and
//! how strictly to treat diagnostics.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! schema_dirs:
//!   - schemas/
//! bundles:
//!   - dist/schemas.json
//! provider_meta:
//!   region: eu-west-1
//! fail_on_warnings: false
//! log_filter: attribute_schema_core=debug
//! jobs: 4
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loader::{RegistryBuilder, SchemaRegistry};

fn default_version() -> String {
    "1.0".to_string()
}

fn default_jobs() -> usize {
    4
}

/// Configuration shared by the schema tools.
///
/// # Examples
///
/// ```
/// use attribute_schema_db::EngineConfig;
///
/// let config: EngineConfig = serde_yaml::from_str("schema_dirs: [schemas/]").unwrap();
/// assert_eq!(config.version, "1.0");
/// assert_eq!(config.jobs, 4);
/// assert!(!config.fail_on_warnings);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Directories of definition files, tried in order.
    #[serde(default)]
    pub schema_dirs: Vec<PathBuf>,
    /// Bundle files, tried after the directories.
    #[serde(default)]
    pub bundles: Vec<PathBuf>,
    /// Provider metadata passed to every plan modifier.
    #[serde(default)]
    pub provider_meta: serde_json::Value,
    /// Treat warning diagnostics as failures.
    #[serde(default)]
    pub fail_on_warnings: bool,
    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    /// Worker threads for batch validation.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            schema_dirs: Vec::new(),
            bundles: Vec::new(),
            provider_meta: serde_json::Value::Null,
            fail_on_warnings: false,
            log_filter: None,
            jobs: default_jobs(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::RegistryError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::RegistryError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns a registry builder with every configured source, directories
    /// first.
    pub fn registry_builder(&self) -> RegistryBuilder {
        let builder = self
            .schema_dirs
            .iter()
            .fold(SchemaRegistry::builder(), |b, dir| b.from_dir(dir.clone()));
        self.bundles
            .iter()
            .fold(builder, |b, bundle| b.from_bundle(bundle.clone()))
    }
}
