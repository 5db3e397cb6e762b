//! Analyzer configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! classpath = ["target/classes", "lib/framework.jar"]
//! system_locations = ["jdk/classes"]
//! catalogs = ["hints.toml"]
//!
//! [roles]
//! configuration = "com/acme/Config"
//!
//! [inference]
//! unclassified = "load-and-construct"
//!
//! [walker]
//! max_depth = 8
//! ```
//!
//! Relative paths in a file loaded with [`AnalyzerConfig::load`] are taken
//! relative to that file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hints::{CatalogError, HintCatalog};
use crate::inference::InferenceConfig;
use crate::processor::{TypeProcessor, WalkerConfig};
use crate::system::TypeSystem;
use crate::types::RoleMarkers;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Everything needed to run an analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Application directories and archives, searched in order
    pub classpath: Vec<PathBuf>,
    /// Fallback locations for platform types
    pub system_locations: Vec<PathBuf>,
    /// Hint catalog manifests (`.toml` or `.json`)
    pub catalogs: Vec<PathBuf>,
    pub roles: RoleMarkers,
    pub inference: InferenceConfig,
    pub walker: WalkerConfig,
}

impl AnalyzerConfig {
    /// Parse configuration text
    pub fn from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_str(&std::fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let lists = [&mut self.classpath, &mut self.system_locations, &mut self.catalogs];
        for list in lists {
            for entry in list.iter_mut() {
                if entry.is_relative() {
                    *entry = base.join(&*entry);
                }
            }
        }
    }

    /// Load every catalog into one
    pub fn catalog(&self) -> Result<HintCatalog, CatalogError> {
        let mut builder = HintCatalog::builder();
        for path in &self.catalogs {
            builder = builder.load(path)?;
        }
        Ok(builder.build())
    }

    /// Index the classpath, with the catalogs attached
    pub fn type_system(&self) -> Result<TypeSystem, ConfigError> {
        Ok(TypeSystem::builder()
            .classpath(self.classpath.iter().cloned())
            .system_locations(self.system_locations.iter().cloned())
            .role_markers(self.roles.clone())
            .inference(self.inference.clone())
            .catalog(self.catalog()?)
            .build())
    }

    /// Walker using the configured filters
    pub fn processor(&self) -> TypeProcessor {
        TypeProcessor::from_config(&self.walker)
    }
}
