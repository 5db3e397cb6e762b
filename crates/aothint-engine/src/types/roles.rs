//! Structural roles
//!
//! A role is what a unit *is* to the framework that loads it: a
//! configuration root, an import selector, a properties holder and so on.
//! Roles are decided by meta-tag walks and hierarchy walks, which are
//! expensive, so each unit computes its [`Roles`] once and caches them.
//!
//! The marker names are data ([`RoleMarkers`]) so a different framework's
//! vocabulary can be plugged in through configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Type;
use crate::names::descriptor_of;
use crate::system::TypeSystem;

/// Role classification bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Roles(u16);

impl Roles {
    pub const NONE: Self = Self(0x0000);
    /// Configuration or aggregation root
    pub const CONFIGURATION: Self = Self(0x0001);
    /// Carries the import tag, directly or through meta-tags
    pub const IMPORTS: Self = Self(0x0002);
    pub const IMPORT_SELECTOR: Self = Self(0x0004);
    pub const IMPORT_REGISTRAR: Self = Self(0x0008);
    pub const LIFECYCLE_POST_PROCESSOR: Self = Self(0x0010);
    /// Externally bound properties holder
    pub const PROPERTIES: Self = Self(0x0020);
    /// Properties holder with validation
    pub const VALIDATED: Self = Self(0x0040);
    /// Properties holder bound through its constructor
    pub const CONSTRUCTOR_BINDING: Self = Self(0x0080);
    pub const CONDITION: Self = Self(0x0100);
    pub const COMPONENT: Self = Self(0x0200);
    pub const LISTENER: Self = Self(0x0400);
    pub const ENVIRONMENT_POST_PROCESSOR: Self = Self(0x0800);

    const NAMED: [(Self, &'static str); 12] = [
        (Self::CONFIGURATION, "configuration"),
        (Self::IMPORTS, "imports"),
        (Self::IMPORT_SELECTOR, "import-selector"),
        (Self::IMPORT_REGISTRAR, "import-registrar"),
        (Self::LIFECYCLE_POST_PROCESSOR, "lifecycle-post-processor"),
        (Self::PROPERTIES, "properties"),
        (Self::VALIDATED, "validated"),
        (Self::CONSTRUCTOR_BINDING, "constructor-binding"),
        (Self::CONDITION, "condition"),
        (Self::COMPONENT, "component"),
        (Self::LISTENER, "listener"),
        (Self::ENVIRONMENT_POST_PROCESSOR, "environment-post-processor"),
    ];

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    fn set_if(&mut self, role: Self, condition: bool) {
        if condition {
            *self = self.union(role);
        }
    }
}

impl std::ops::BitOr for Roles {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Display for Roles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(role, _)| self.contains(*role))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "[]")
        } else {
            write!(f, "[{}]", names.join(", "))
        }
    }
}

/// Internal names of the tags and interfaces that identify each role
///
/// Empty strings disable a marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleMarkers {
    pub configuration: String,
    pub bean_method: String,
    pub import: String,
    pub import_selectors: Vec<String>,
    pub import_registrars: Vec<String>,
    pub lifecycle_post_processors: Vec<String>,
    pub properties: String,
    pub validated: String,
    pub constructor_binding: String,
    pub conditions: Vec<String>,
    pub component: String,
    pub listeners: Vec<String>,
    pub environment_post_processors: Vec<String>,
    /// Tag whose referenced types get the properties deep walk
    pub enable_properties: String,
}

impl Default for RoleMarkers {
    fn default() -> Self {
        const CONTEXT: &str = "org/springframework/context/annotation";
        const BOOT_PROPERTIES: &str = "org/springframework/boot/context/properties";
        Self {
            configuration: format!("{CONTEXT}/Configuration"),
            bean_method: format!("{CONTEXT}/Bean"),
            import: format!("{CONTEXT}/Import"),
            import_selectors: vec![format!("{CONTEXT}/ImportSelector")],
            import_registrars: vec![format!("{CONTEXT}/ImportBeanDefinitionRegistrar")],
            lifecycle_post_processors: vec![
                "org/springframework/beans/factory/config/BeanFactoryPostProcessor".to_string(),
                "org/springframework/beans/factory/config/BeanPostProcessor".to_string(),
            ],
            properties: format!("{BOOT_PROPERTIES}/ConfigurationProperties"),
            validated: "org/springframework/validation/annotation/Validated".to_string(),
            constructor_binding: format!("{BOOT_PROPERTIES}/ConstructorBinding"),
            conditions: vec![format!("{CONTEXT}/Condition")],
            component: "org/springframework/stereotype/Component".to_string(),
            listeners: vec!["org/springframework/context/ApplicationListener".to_string()],
            environment_post_processors: vec!["org/springframework/boot/env/EnvironmentPostProcessor".to_string()],
            enable_properties: format!("{BOOT_PROPERTIES}/EnableConfigurationProperties"),
        }
    }
}

fn meta_tagged(ty: &Type, marker: &str, system: &TypeSystem) -> bool {
    !marker.is_empty() && ty.is_meta_tagged(marker, system)
}

fn implements_any(ty: &Type, interfaces: &[String], system: &TypeSystem) -> bool {
    interfaces
        .iter()
        .filter(|name| !name.is_empty())
        .any(|name| ty.implements_interface(name, system))
}

/// Compute the roles of a unit against the system's markers
pub(crate) fn classify(ty: &Type, system: &TypeSystem) -> Roles {
    let mut roles = Roles::NONE;
    if ty.is_array() {
        return roles;
    }
    let markers = system.role_markers();

    let bean_methods = !markers.bean_method.is_empty()
        && !ty.methods_with_tag(&descriptor_of(&markers.bean_method)).is_empty();
    roles.set_if(
        Roles::CONFIGURATION,
        meta_tagged(ty, &markers.configuration, system) || bean_methods,
    );
    roles.set_if(Roles::IMPORTS, meta_tagged(ty, &markers.import, system));
    roles.set_if(Roles::IMPORT_SELECTOR, implements_any(ty, &markers.import_selectors, system));
    roles.set_if(Roles::IMPORT_REGISTRAR, implements_any(ty, &markers.import_registrars, system));
    roles.set_if(
        Roles::LIFECYCLE_POST_PROCESSOR,
        implements_any(ty, &markers.lifecycle_post_processors, system),
    );

    let properties = meta_tagged(ty, &markers.properties, system);
    roles.set_if(Roles::PROPERTIES, properties);
    roles.set_if(Roles::VALIDATED, meta_tagged(ty, &markers.validated, system));
    roles.set_if(
        Roles::CONSTRUCTOR_BINDING,
        meta_tagged(ty, &markers.constructor_binding, system) || constructor_binding_on_constructor(ty, markers),
    );

    roles.set_if(Roles::CONDITION, implements_any(ty, &markers.conditions, system));
    roles.set_if(Roles::COMPONENT, meta_tagged(ty, &markers.component, system));
    roles.set_if(Roles::LISTENER, implements_any(ty, &markers.listeners, system));
    roles.set_if(
        Roles::ENVIRONMENT_POST_PROCESSOR,
        implements_any(ty, &markers.environment_post_processors, system),
    );
    roles
}

fn constructor_binding_on_constructor(ty: &Type, markers: &RoleMarkers) -> bool {
    if markers.constructor_binding.is_empty() {
        return false;
    }
    let descriptor = descriptor_of(&markers.constructor_binding);
    ty.methods()
        .iter()
        .any(|m| m.is_constructor() && m.has_tag(&descriptor))
}
