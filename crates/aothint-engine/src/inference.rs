//! Access inference
//!
//! [`infer_access`] maps a unit's roles to the smallest access bits that
//! still let the framework use it. Rules are checked in a fixed order and the
//! first match wins:
//!
//! | Role                                   | Access                                   |
//! |----------------------------------------|------------------------------------------|
//! | configuration root, import carrier     | `ALL`                                    |
//! | import selector or registrar           | `LOAD_AND_CONSTRUCT \| RESOURCE`         |
//! | lifecycle post-processor               | `LOAD_AND_CONSTRUCT \| DECLARED_METHODS \| RESOURCE` |
//! | array                                  | `CLASS`                                  |
//! | properties holder                      | `CLASS \| DECLARED_CONSTRUCTORS`, `+FLDS` if validated, `+DMETHS` unless constructor bound |
//! | condition                              | `LOAD_AND_CONSTRUCT \| RESOURCE`         |
//! | component or listener                  | `ALL`                                    |
//! | environment post-processor             | `LOAD_AND_CONSTRUCT`                     |
//! | anything else                          | [`UnclassifiedPolicy`]                   |
//!
//! Properties holders referenced from an enabling tag get a deeper treatment
//! ([`walk_properties`]): their getters' return types are classified too.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::access::AccessBits;
use crate::system::TypeSystem;
use crate::types::{Roles, Type};

/// Access granted to units that match no role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnclassifiedPolicy {
    /// Every reflective category
    #[default]
    FullReflection,
    /// Class metadata and declared constructors only
    LoadAndConstruct,
}

impl UnclassifiedPolicy {
    pub fn access(self) -> AccessBits {
        match self {
            Self::FullReflection => AccessBits::FULL_REFLECTION,
            Self::LoadAndConstruct => AccessBits::LOAD_AND_CONSTRUCT,
        }
    }
}

/// Inference settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Access for units without a recognized role
    pub unclassified: UnclassifiedPolicy,
    /// Property types needing no access at all (value types the binder
    /// converts itself)
    pub opaque_prefixes: Vec<String>,
    /// Property types needing class metadata only; not walked further
    pub class_only_prefixes: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            unclassified: UnclassifiedPolicy::default(),
            opaque_prefixes: ["java/lang/", "java/nio/", "java/io/", "java/net/"]
                .map(String::from)
                .to_vec(),
            class_only_prefixes: [
                "java/util/",
                "java/time/",
                "org/springframework/core/io/",
                "org/springframework/util/unit/DataSize",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl InferenceConfig {
    fn is_opaque(&self, name: &str) -> bool {
        self.opaque_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    fn is_class_only(&self, name: &str) -> bool {
        self.class_only_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

/// Infer the access a unit needs from its roles
pub fn infer_access(ty: &Type, system: &TypeSystem) -> AccessBits {
    let roles = ty.roles(system);
    let access = if roles.contains(Roles::CONFIGURATION) || roles.contains(Roles::IMPORTS) {
        AccessBits::ALL
    } else if roles.contains(Roles::IMPORT_SELECTOR) || roles.contains(Roles::IMPORT_REGISTRAR) {
        AccessBits::LOAD_AND_CONSTRUCT | AccessBits::RESOURCE
    } else if roles.contains(Roles::LIFECYCLE_POST_PROCESSOR) {
        AccessBits::LOAD_AND_CONSTRUCT | AccessBits::DECLARED_METHODS | AccessBits::RESOURCE
    } else if ty.is_array() {
        AccessBits::CLASS
    } else if roles.contains(Roles::PROPERTIES) {
        let mut bits = AccessBits::LOAD_AND_CONSTRUCT;
        if roles.contains(Roles::VALIDATED) {
            bits |= AccessBits::DECLARED_FIELDS;
        }
        if !roles.contains(Roles::CONSTRUCTOR_BINDING) {
            bits |= AccessBits::DECLARED_METHODS;
        }
        bits
    } else if roles.contains(Roles::CONDITION) {
        AccessBits::LOAD_AND_CONSTRUCT | AccessBits::RESOURCE
    } else if roles.contains(Roles::COMPONENT) || roles.contains(Roles::LISTENER) {
        AccessBits::ALL
    } else if roles.contains(Roles::ENVIRONMENT_POST_PROCESSOR) {
        AccessBits::LOAD_AND_CONSTRUCT
    } else {
        system.inference_config().unclassified.access()
    };
    trace!(name = ty.name(), %roles, %access, "inferred access");
    access
}

/// Result of [`walk_properties`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyAccess {
    /// Internal name to access bits, for every type that needs any
    pub types: BTreeMap<String, AccessBits>,
    /// Names that could not be resolved
    pub unresolved: Vec<String>,
}

/// Classify properties holders and, transitively, the return types of
/// their getters
///
/// Each type is visited once. Types classified as class metadata only are
/// terminal: their getters are not followed.
pub fn walk_properties<'a, I>(roots: I, system: &TypeSystem) -> PropertyAccess
where
    I: IntoIterator<Item = &'a str>,
{
    let mut walk = PropertyWalk {
        system,
        visited: FxHashSet::default(),
        result: PropertyAccess::default(),
    };
    for root in roots {
        walk.visit(root);
    }
    walk.result
}

struct PropertyWalk<'s> {
    system: &'s TypeSystem,
    visited: FxHashSet<String>,
    result: PropertyAccess,
}

impl PropertyWalk<'_> {
    fn visit(&mut self, name: &str) {
        if !self.visited.insert(name.to_string()) {
            return;
        }
        let config = self.system.inference_config();
        if config.is_opaque(name) {
            return;
        }
        if config.is_class_only(name) {
            self.result.types.insert(name.to_string(), AccessBits::CLASS);
            return;
        }
        let Some(ty) = self.system.try_resolve(name) else {
            self.result.unresolved.push(name.to_string());
            return;
        };
        let access = property_type_access(&ty, self.system);
        self.result.types.insert(ty.name().to_string(), access);
        if access == AccessBits::CLASS {
            return;
        }
        for method in ty.methods().iter().filter(|m| m.is_getter()) {
            for returned in method.signature_types(true) {
                self.visit(&returned);
            }
        }
    }
}

fn property_type_access(ty: &Type, system: &TypeSystem) -> AccessBits {
    if ty.is_enum() || ty.is_array() {
        return AccessBits::CLASS;
    }
    let roles = ty.roles(system);
    let mut bits = AccessBits::LOAD_AND_CONSTRUCT;
    if roles.contains(Roles::VALIDATED) {
        bits |= AccessBits::DECLARED_FIELDS;
    }
    if !roles.contains(Roles::CONSTRUCTOR_BINDING) {
        bits |= AccessBits::PUBLIC_METHODS;
    }
    bits
}
