//! Hint declarations and applications
//!
//! A [`HintDeclaration`] says what to register when its trigger (a type or
//! tag name) is met. [`collect_hints`] finds the declarations that apply to
//! one unit by walking its tags and meta-tags, producing one
//! [`HintApplication`] per occurrence; [`apply_hints`] hands applications to
//! a [`crate::registrar::Registrar`].

mod apply;
mod catalog;
mod collect;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use apply::apply_hints;
pub(crate) use apply::register_access;
pub use catalog::{CatalogError, HintCatalog, HintCatalogBuilder};
pub use collect::{collect_hints, extract_type_references};

use crate::access::{AccessDescriptor, FieldDescriptor, MethodDescriptor};
use crate::inference::infer_access;
use crate::names;
use crate::system::TypeSystem;
use crate::types::Type;

/// Access to grant a dependent type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependentAccess {
    /// Exactly this descriptor
    Fixed(AccessDescriptor),
    /// Inferred from the type's roles, narrowed by explicit members
    Inferred {
        methods: Vec<MethodDescriptor>,
        fields: Vec<FieldDescriptor>,
    },
}

/// A type a hint declaration needs registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentType {
    /// Internal name
    pub name: String,
    pub access: DependentAccess,
}

impl DependentType {
    /// Dependent type with fixed access
    pub fn new(name: &str, access: AccessDescriptor) -> Self {
        Self {
            name: internal(name),
            access: DependentAccess::Fixed(access),
        }
    }

    /// Dependent type whose access is inferred when applied
    pub fn inferred(name: &str) -> Self {
        Self::inferred_with_members(name, Vec::new(), Vec::new())
    }

    /// Inferred access plus explicit members
    pub fn inferred_with_members(name: &str, methods: Vec<MethodDescriptor>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: internal(name),
            access: DependentAccess::Inferred { methods, fields },
        }
    }

    /// Concrete descriptor for the resolved type
    pub fn access_for(&self, ty: &Type, system: &TypeSystem) -> AccessDescriptor {
        match &self.access {
            DependentAccess::Fixed(descriptor) => descriptor.clone(),
            DependentAccess::Inferred { methods, fields } => {
                AccessDescriptor::with_inferred_bits(infer_access(ty, system), methods.clone(), fields.clone())
            }
        }
    }
}

/// Interfaces a dynamic proxy implements, in order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    /// Internal interface names
    pub interfaces: Vec<String>,
}

impl ProxyDescriptor {
    pub fn new<'a>(interfaces: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            interfaces: interfaces.into_iter().map(internal).collect(),
        }
    }
}

/// Resource patterns to retain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcesDescriptor {
    pub patterns: Vec<String>,
    /// Patterns name resource bundles rather than files
    #[serde(default)]
    pub bundle: bool,
}

/// When a type's static initialization runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitializationTime {
    Build,
    Run,
}

impl fmt::Display for InitializationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Build => "build",
            Self::Run => "run",
        })
    }
}

/// Types and packages to initialize at build or run time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializationDescriptor {
    pub time: InitializationTime,
    /// Internal type names
    #[serde(default)]
    pub types: Vec<String>,
    /// Dotted package names
    #[serde(default)]
    pub packages: Vec<String>,
}

/// A catalog rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintDeclaration {
    /// Internal name of the triggering type or tag
    pub trigger: String,
    pub options: BTreeSet<String>,
    pub dependent_types: Vec<DependentType>,
    pub proxies: Vec<ProxyDescriptor>,
    pub resources: Vec<ResourcesDescriptor>,
    pub initializations: Vec<InitializationDescriptor>,
    /// Only check that referenced types exist; skip the declaration when a
    /// dependent type is missing
    pub skip_if_types_missing: bool,
    /// Walk the referenced types as well
    pub follow: bool,
    /// Tag attributes scanned for type references besides `value`
    pub extract_attribute_names: Vec<String>,
}

impl HintDeclaration {
    pub fn new(trigger: &str) -> Self {
        Self {
            trigger: internal(trigger),
            ..Self::default()
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.insert(option.into());
        self
    }

    pub fn with_dependent_type(mut self, dependent: DependentType) -> Self {
        self.dependent_types.push(dependent);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyDescriptor) -> Self {
        self.proxies.push(proxy);
        self
    }

    pub fn with_resources(mut self, resources: ResourcesDescriptor) -> Self {
        self.resources.push(resources);
        self
    }

    pub fn with_initialization(mut self, initialization: InitializationDescriptor) -> Self {
        self.initializations.push(initialization);
        self
    }

    pub fn skip_if_types_missing(mut self, skip: bool) -> Self {
        self.skip_if_types_missing = skip;
        self
    }

    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn extract_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extract_attribute_names.extend(names.into_iter().map(Into::into));
        self
    }
}

/// One occurrence of a declaration
#[derive(Debug, Clone)]
pub struct HintApplication {
    /// Units from the inspected root to the one carrying the matched tag
    pub chain: Vec<Arc<Type>>,
    pub declaration: Arc<HintDeclaration>,
    /// Types referenced by the tag occurrence, keyed by internal name
    pub inferred_types: BTreeMap<String, AccessDescriptor>,
    /// References in the tag occurrence that could not be resolved
    pub unresolved: Vec<String>,
}

impl HintApplication {
    /// The chain without the inspected root
    pub fn short_chain(&self) -> &[Arc<Type>] {
        self.chain.get(1..).unwrap_or(&[])
    }

    /// Internal names along the chain
    pub fn chain_names(&self) -> Vec<&str> {
        self.chain.iter().map(|ty| ty.name()).collect()
    }
}

impl fmt::Display for HintApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain: Vec<String> = self.chain.iter().map(|ty| ty.dotted_name()).collect();
        write!(f, "{} via [{}]", names::to_dotted(&self.declaration.trigger), chain.join(", "))
    }
}

fn internal(name: &str) -> String {
    names::normalize(name).unwrap_or_else(|| name.to_string())
}
