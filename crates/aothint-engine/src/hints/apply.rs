//! Handing hint applications to a registrar

use tracing::debug;

use super::HintApplication;
use crate::access::{AccessBits, AccessDescriptor};
use crate::names;
use crate::registrar::Registrar;
use crate::system::TypeSystem;

/// Register everything the applications ask for, returning how many were
/// applied
///
/// An application whose declaration sets `skip_if_types_missing` is skipped
/// entirely when one of its dependent types cannot be resolved. Otherwise
/// missing dependent types are logged and left out.
pub fn apply_hints(system: &TypeSystem, applications: &[HintApplication], registrar: &mut dyn Registrar) -> usize {
    let mut applied = 0;
    for application in applications {
        let declaration = &application.declaration;
        let mut resolved = Vec::new();
        let mut missing = Vec::new();
        for dependent in &declaration.dependent_types {
            match system.try_resolve(&dependent.name) {
                Some(ty) => resolved.push((dependent, ty)),
                None => missing.push(names::to_dotted(&dependent.name)),
            }
        }
        if declaration.skip_if_types_missing && !missing.is_empty() {
            registrar.log(&format!(
                "Skipping hint {application}: missing {}",
                missing.join(", ")
            ));
            continue;
        }
        for name in &missing {
            registrar.log(&format!("Hint {application}: dependent type {name} not found"));
        }

        registrar.log(&format!("Applying hint {application}"));
        for (dependent, ty) in resolved {
            register_access(registrar, ty.name(), &dependent.access_for(&ty, system));
        }
        for (name, access) in &application.inferred_types {
            register_access(registrar, name, access);
        }
        for proxy in &declaration.proxies {
            let interfaces: Vec<String> = proxy.interfaces.iter().map(|i| names::to_dotted(i)).collect();
            registrar.register_proxy(&interfaces);
        }
        for resources in &declaration.resources {
            for pattern in &resources.patterns {
                registrar.register_resource_pattern(pattern, resources.bundle);
            }
        }
        for initialization in &declaration.initializations {
            for name in initialization.types.iter().map(|t| names::to_dotted(t)).chain(initialization.packages.iter().cloned()) {
                registrar.register_initialization(&name, initialization.time);
            }
        }
        applied += 1;
    }
    debug!(applied, total = applications.len(), "applied hints");
    applied
}

/// Register access for an internal name; resource access also retains the
/// class file
pub(crate) fn register_access(registrar: &mut dyn Registrar, name: &str, access: &AccessDescriptor) {
    if access.is_empty() {
        return;
    }
    registrar.register_access(&names::to_dotted(name), access);
    if access.bits().contains(AccessBits::RESOURCE) {
        let (base, _) = names::split_array(name);
        registrar.register_resource_pattern(&format!("{base}.class"), false);
    }
}
