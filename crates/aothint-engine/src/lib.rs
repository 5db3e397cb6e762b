//! Closed-world reflection analysis
//!
//! Given compiled units on a classpath, decide which of them need reflective
//! access once the program is compiled ahead of time into a single image,
//! and how much.
//!
//! The pieces, leaves first:
//!
//! - [`types`]: lazily computed views of one parsed unit, including its roles
//! - [`system`]: the classpath index and the shared resolution cache
//! - [`inference`]: role based access inference and the properties walk
//! - [`hints`]: catalog declarations, tag-chain collection and application
//! - [`processor`]: the reachability walker
//! - [`registrar`]: where results go
//!
//! ```no_run
//! use aothint_engine::{AnalyzerConfig, CollectingRegistrar, TypeProcessor};
//!
//! let config = AnalyzerConfig::load("aothint.toml")?;
//! let system = config.type_system()?;
//! let mut registrar = CollectingRegistrar::new();
//! TypeProcessor::inferring().process_name("com.example.App", &system, &mut registrar)?;
//! for (name, access) in registrar.access_entries() {
//!     println!("{name}: {access}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(rust_2018_idioms)]

pub mod access;
pub mod config;
pub mod error;
pub mod hints;
pub mod inference;
pub mod names;
pub mod processor;
pub mod registrar;
pub mod system;
pub mod types;

pub use access::{AccessBits, AccessDescriptor, AccessError, FieldDescriptor, MethodDescriptor};
pub use config::{AnalyzerConfig, ConfigError};
pub use error::TypeError;
pub use hints::{
    apply_hints, collect_hints, CatalogError, DependentAccess, DependentType, HintApplication, HintCatalog,
    HintCatalogBuilder, HintDeclaration, InitializationDescriptor, InitializationTime, ProxyDescriptor,
    ResourcesDescriptor,
};
pub use inference::{infer_access, walk_properties, InferenceConfig, PropertyAccess, UnclassifiedPolicy};
pub use processor::{DiscoveryContext, PathElement, ProcessReport, TraversalPath, TypeProcessor, WalkerConfig};
pub use registrar::{CollectingRegistrar, Registrar};
pub use system::{ResolutionStats, TypeSystem, TypeSystemBuilder};
pub use types::{Field, Method, RoleMarkers, Roles, Tag, Type};
