//! Wire schema fingerprints and the manifest that records them.
//!
//! A fingerprint is the SHA-256 digest of a schema's canonical wire JSON.
//! Because wire conversion sorts children by name, the fingerprint only
//! changes when the published schema does, which lets CI detect schema
//! changes between releases.
//!
//! # Examples
//!
//! ```no_run
//! use attribute_schema_db::{FingerprintManifest, SchemaRegistry, wire_fingerprint};
//!
//! let registry = SchemaRegistry::from_dir("schemas/").unwrap();
//! let mut manifest = FingerprintManifest::load("fingerprints.json")
//!     .unwrap_or_else(|_| FingerprintManifest::new());
//!
//! for name in registry.names() {
//!     let wire = registry.get(name).unwrap().to_wire().unwrap();
//!     manifest.update_entry(name, &wire_fingerprint(&wire).unwrap(), wire.version);
//! }
//! manifest.save("fingerprints.json").unwrap();
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use attribute_schema_core::WireSchema;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

/// Manifest format version written by this crate.
pub const MANIFEST_VERSION: &str = "1.0";

/// Computes the SHA-256 hex digest of the canonical wire JSON.
///
/// # Errors
///
/// Returns [`JsonError`](RegistryError::JsonError) if serialization fails.
pub fn wire_fingerprint(wire: &WireSchema) -> Result<String> {
    let bytes = serde_json::to_vec(wire)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Recorded fingerprint of one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    /// SHA-256 hex digest of the wire JSON.
    pub fingerprint: String,
    /// Schema version at the time of recording.
    pub schema_version: i64,
    /// RFC 3339 timestamp of when the entry was recorded.
    pub recorded_at: String,
}

/// Fingerprints of all published schemas, persisted as pretty JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintManifest {
    /// Manifest format version.
    pub version: String,
    /// RFC 3339 timestamp of the last update.
    pub updated_at: String,
    /// Entries keyed by schema name.
    pub schemas: BTreeMap<String, FingerprintEntry>,
}

impl Default for FingerprintManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintManifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            updated_at: now_rfc3339(),
            schemas: BTreeMap::new(),
        }
    }

    /// Loads a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](RegistryError::IoError) or
    /// [`JsonError`](RegistryError::JsonError) on read failures, and
    /// [`InvalidManifest`](RegistryError::InvalidManifest) for an
    /// unsupported manifest version.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let manifest: Self = serde_json::from_reader(BufReader::new(file))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(RegistryError::InvalidManifest(format!(
                "unsupported manifest version {:?}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    /// Saves the manifest as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](RegistryError::IoError) if the file cannot be
    /// written, or [`JsonError`](RegistryError::JsonError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Records the fingerprint for `schema` and refreshes `updated_at`.
    pub fn update_entry(&mut self, schema: &str, fingerprint: &str, schema_version: i64) {
        let now = now_rfc3339();
        self.schemas.insert(
            schema.to_string(),
            FingerprintEntry {
                fingerprint: fingerprint.to_string(),
                schema_version,
                recorded_at: now.clone(),
            },
        );
        self.updated_at = now;
    }

    /// Removes the entry for `schema`, returning it if present.
    pub fn remove_entry(&mut self, schema: &str) -> Option<FingerprintEntry> {
        self.schemas.remove(schema)
    }

    pub fn get(&self, schema: &str) -> Option<&FingerprintEntry> {
        self.schemas.get(schema)
    }

    /// Returns the names of schemas whose fingerprints differ between `self`
    /// and `other`, in name order.
    ///
    /// A schema counts as changed if it exists in only one manifest or its
    /// fingerprint differs. Timestamps are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use attribute_schema_db::FingerprintManifest;
    ///
    /// let mut old = FingerprintManifest::new();
    /// old.update_entry("network", "aaa", 1);
    /// old.update_entry("bucket", "bbb", 1);
    ///
    /// let mut new = old.clone();
    /// new.update_entry("network", "ccc", 2);
    ///
    /// assert_eq!(old.changed_schemas(&new), vec!["network".to_string()]);
    /// ```
    pub fn changed_schemas(&self, other: &FingerprintManifest) -> Vec<String> {
        let mut changed: Vec<String> = self
            .schemas
            .iter()
            .filter(|(name, entry)| {
                other
                    .schemas
                    .get(*name)
                    .is_none_or(|o| o.fingerprint != entry.fingerprint)
            })
            .map(|(name, _)| name.clone())
            .collect();
        changed.extend(
            other
                .schemas
                .keys()
                .filter(|name| !self.schemas.contains_key(*name))
                .cloned(),
        );
        changed.sort();
        changed
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
