//! Registration sink
//!
//! The engine reports everything it decides through a [`Registrar`]. Type
//! names passed to a registrar are dotted (`a.b.C$D`); resource patterns are
//! slashed paths.

use std::collections::BTreeMap;

use crate::access::AccessDescriptor;
use crate::hints::InitializationTime;

/// Receives access, proxy, resource and initialization registrations
pub trait Registrar {
    /// Record reflective access for a type
    fn register_access(&mut self, type_name: &str, access: &AccessDescriptor);

    /// Record a dynamic proxy over the given interfaces
    fn register_proxy(&mut self, interfaces: &[String]);

    /// Record a resource pattern or bundle name
    fn register_resource_pattern(&mut self, pattern: &str, bundle: bool);

    /// Record when a type or package is initialized
    fn register_initialization(&mut self, name: &str, time: InitializationTime);

    /// Human readable diagnostic for the build log
    fn log(&mut self, message: &str);
}

/// Registrar that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct CollectingRegistrar {
    access: BTreeMap<String, AccessDescriptor>,
    proxies: Vec<Vec<String>>,
    resources: Vec<(String, bool)>,
    initializations: Vec<(String, InitializationTime)>,
    messages: Vec<String>,
}

impl CollectingRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merged access for a dotted type name
    pub fn access(&self, type_name: &str) -> Option<&AccessDescriptor> {
        self.access.get(type_name)
    }

    /// All access registrations, ordered by type name
    pub fn access_entries(&self) -> &BTreeMap<String, AccessDescriptor> {
        &self.access
    }

    pub fn proxies(&self) -> &[Vec<String>] {
        &self.proxies
    }

    /// Registered resource patterns with their bundle flag
    pub fn resource_patterns(&self) -> &[(String, bool)] {
        &self.resources
    }

    pub fn initializations(&self) -> &[(String, InitializationTime)] {
        &self.initializations
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Registrar for CollectingRegistrar {
    fn register_access(&mut self, type_name: &str, access: &AccessDescriptor) {
        let merged = match self.access.get(type_name) {
            Some(existing) => existing.merge(access),
            None => access.clone(),
        };
        self.access.insert(type_name.to_string(), merged);
    }

    fn register_proxy(&mut self, interfaces: &[String]) {
        if !self.proxies.iter().any(|p| p.as_slice() == interfaces) {
            self.proxies.push(interfaces.to_vec());
        }
    }

    fn register_resource_pattern(&mut self, pattern: &str, bundle: bool) {
        let entry = (pattern.to_string(), bundle);
        if !self.resources.contains(&entry) {
            self.resources.push(entry);
        }
    }

    fn register_initialization(&mut self, name: &str, time: InitializationTime) {
        let entry = (name.to_string(), time);
        if !self.initializations.contains(&entry) {
            self.initializations.push(entry);
        }
    }

    fn log(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessBits, MethodDescriptor};

    #[test]
    fn test_access_is_merged_per_type() {
        let mut registrar = CollectingRegistrar::new();
        registrar.register_access("a.B", &AccessDescriptor::from_bits(AccessBits::CLASS));
        let run = AccessDescriptor::new(AccessBits::NONE, vec![MethodDescriptor::new("run", &[])], vec![]).unwrap();
        registrar.register_access("a.B", &run);
        registrar.register_access("a.B", &AccessDescriptor::from_bits(AccessBits::RESOURCE));

        let merged = registrar.access("a.B").unwrap();
        assert_eq!(merged.bits(), AccessBits::CLASS | AccessBits::RESOURCE);
        assert_eq!(merged.methods().len(), 1);
        assert_eq!(registrar.access_entries().len(), 1);
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let mut registrar = CollectingRegistrar::new();
        let interfaces = vec!["a.I".to_string(), "a.J".to_string()];
        registrar.register_proxy(&interfaces);
        registrar.register_proxy(&interfaces);
        registrar.register_resource_pattern("a/B.class", false);
        registrar.register_resource_pattern("a/B.class", false);
        registrar.register_initialization("a.B", InitializationTime::Build);
        registrar.register_initialization("a.B", InitializationTime::Run);
        assert_eq!(registrar.proxies().len(), 1);
        assert_eq!(registrar.resource_patterns().len(), 1);
        assert_eq!(registrar.initializations().len(), 2);
    }
}
