//! Hint catalog
//!
//! The catalog is assembled once, before any traversal, and is immutable
//! afterwards. Declarations are keyed by the internal name of their trigger;
//! lookups normalize dotted, slashed and descriptor names first.
//!
//! # Manifest format
//!
//! ```toml
//! [[hint]]
//! trigger = "com.example.EnableThing"
//! extract_attributes = ["classes"]
//!
//! [[hint.types]]
//! name = "com.example.ThingRegistrar"
//! access = "CLASS|DECLARED_CONSTRUCTORS"
//!
//! [[hint.proxies]]
//! interfaces = ["com.example.Api", "java.io.Serializable"]
//!
//! [[hint.resources]]
//! patterns = ["META-INF/thing.properties"]
//!
//! [[hint.initialization]]
//! time = "build"
//! types = ["com.example.Constants"]
//! ```
//!
//! A type entry without `access` is inferred from the type's roles when the
//! hint is applied. JSON manifests use the same structure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{
    DependentType, HintDeclaration, InitializationDescriptor, ProxyDescriptor, ResourcesDescriptor,
};
use crate::access::{AccessBits, AccessDescriptor, AccessError, FieldDescriptor, MethodDescriptor};
use crate::names;

/// Errors raised while loading a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Manifest could not be read
    #[error("Failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest extension is neither `.toml` nor `.json`
    #[error("Unsupported catalog format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Access string did not parse
    #[error("Invalid access '{access}' for {type_name} in hint for {trigger}")]
    InvalidAccess {
        trigger: String,
        type_name: String,
        access: String,
    },

    /// Access bits and explicit members conflict
    #[error("Hint for {trigger}: {source}")]
    Access {
        trigger: String,
        #[source]
        source: AccessError,
    },
}

/// Immutable registry of hint declarations
#[derive(Debug, Default)]
pub struct HintCatalog {
    entries: FxHashMap<String, Vec<Arc<HintDeclaration>>>,
}

impl HintCatalog {
    pub fn builder() -> HintCatalogBuilder {
        HintCatalogBuilder::default()
    }

    /// Parse a TOML manifest
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        Ok(Self::builder().add_toml_str(text)?.build())
    }

    /// Parse a JSON manifest
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        Ok(Self::builder().add_json_str(text)?.build())
    }

    /// Load a manifest, choosing the format by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Ok(Self::builder().load(path)?.build())
    }

    /// Declarations triggered by `name` (any name form)
    pub fn find(&self, name: &str) -> &[Arc<HintDeclaration>] {
        let Some(key) = names::normalize(name) else {
            return &[];
        };
        self.entries.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct triggers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Internal names of all triggers
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// One-time construction of a [`HintCatalog`]
#[derive(Debug, Default)]
pub struct HintCatalogBuilder {
    entries: FxHashMap<String, Vec<Arc<HintDeclaration>>>,
}

impl HintCatalogBuilder {
    /// Add a declaration under its trigger
    pub fn add(mut self, declaration: HintDeclaration) -> Self {
        self.entries
            .entry(declaration.trigger.clone())
            .or_default()
            .push(Arc::new(declaration));
        self
    }

    pub fn add_toml_str(self, text: &str) -> Result<Self, CatalogError> {
        let manifest: Manifest = toml::from_str(text)?;
        self.add_manifest(manifest)
    }

    pub fn add_json_str(self, text: &str) -> Result<Self, CatalogError> {
        let manifest: Manifest = serde_json::from_str(text)?;
        self.add_manifest(manifest)
    }

    /// Add every declaration of a `.toml` or `.json` manifest
    pub fn load(self, path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let builder = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => self.add_toml_str(&text)?,
            Some("json") => self.add_json_str(&text)?,
            _ => {
                return Err(CatalogError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        debug!(path = %path.display(), "loaded hint catalog");
        Ok(builder)
    }

    fn add_manifest(mut self, manifest: Manifest) -> Result<Self, CatalogError> {
        for entry in manifest.hints {
            self = self.add(entry.into_declaration()?);
        }
        Ok(self)
    }

    pub fn build(self) -> HintCatalog {
        HintCatalog { entries: self.entries }
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "hint", alias = "hints")]
    hints: Vec<ManifestHint>,
}

#[derive(Debug, Deserialize)]
struct ManifestHint {
    trigger: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    types: Vec<ManifestType>,
    #[serde(default)]
    proxies: Vec<ManifestProxy>,
    #[serde(default)]
    resources: Vec<ResourcesDescriptor>,
    #[serde(default)]
    initialization: Vec<InitializationDescriptor>,
    #[serde(default)]
    skip_if_types_missing: bool,
    #[serde(default)]
    follow: bool,
    #[serde(default)]
    extract_attributes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ManifestType {
    name: String,
    access: Option<String>,
    #[serde(default)]
    methods: Vec<MethodDescriptor>,
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Deserialize)]
struct ManifestProxy {
    interfaces: Vec<String>,
}

impl ManifestHint {
    fn into_declaration(self) -> Result<HintDeclaration, CatalogError> {
        let mut declaration = HintDeclaration::new(&self.trigger)
            .skip_if_types_missing(self.skip_if_types_missing)
            .follow(self.follow)
            .extract_attributes(self.extract_attributes);
        declaration.options.extend(self.options);
        for entry in self.types {
            let dependent = match entry.access {
                None => DependentType::inferred_with_members(&entry.name, entry.methods, entry.fields),
                Some(access) => {
                    let bits = AccessBits::from_combined_str(&access).ok_or_else(|| CatalogError::InvalidAccess {
                        trigger: self.trigger.clone(),
                        type_name: entry.name.clone(),
                        access: access.clone(),
                    })?;
                    let descriptor = AccessDescriptor::new(bits, entry.methods, entry.fields).map_err(|source| {
                        CatalogError::Access {
                            trigger: self.trigger.clone(),
                            source,
                        }
                    })?;
                    DependentType::new(&entry.name, descriptor)
                }
            };
            declaration.dependent_types.push(dependent);
        }
        declaration.proxies = self
            .proxies
            .iter()
            .map(|p| ProxyDescriptor::new(p.interfaces.iter().map(String::as_str)))
            .collect();
        declaration.resources = self.resources;
        declaration.initializations = self
            .initialization
            .into_iter()
            .map(|mut init| {
                init.types = init.types.iter().map(|t| names::to_slashed(t)).collect();
                init
            })
            .collect();
        Ok(declaration)
    }
}
