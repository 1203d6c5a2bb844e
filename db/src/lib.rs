//! Schema definition files, registry loading and fingerprint manifests.
//!
//! This crate turns declarative JSON/YAML schema definitions into
//! [`attribute_schema_core::Schema`] values, loads them from directories or
//! bundles with fallback chains, and tracks published wire schemas through
//! fingerprint manifests.
//!
//! # Quick start
//!
//! ```no_run
//! use attribute_schema_db::{EngineConfig, FingerprintManifest, SchemaRegistry, wire_fingerprint};
//!
//! // Load definitions from a directory
//! let registry = SchemaRegistry::from_dir("schemas/").unwrap();
//! if let Some(schema) = registry.get("network") {
//!     println!("network has {} attributes", schema.attributes.len());
//! }
//!
//! // Or from the sources named in an engine config
//! let config = EngineConfig::load("attr-schema.yml").unwrap();
//! let registry = config.registry_builder().build().unwrap();
//!
//! // Record what was published
//! let mut manifest = FingerprintManifest::new();
//! let wire = registry.get("network").unwrap().to_wire().unwrap();
//! manifest.update_entry("network", &wire_fingerprint(&wire).unwrap(), wire.version);
//! ```

mod config;
mod definition;
mod error;
mod fingerprint;
mod loader;

pub use config::EngineConfig;
pub use definition::{
    AttributeDefinition, NestedDefinition, PlanModifierSpec, SchemaDefinition, ValidatorSpec,
};
pub use error::{RegistryError, Result};
pub use fingerprint::{FingerprintEntry, FingerprintManifest, MANIFEST_VERSION, wire_fingerprint};
pub use loader::{
    RegistryBuilder, RegistrySource, SchemaBundle, SchemaRegistry, read_definition_file,
};
