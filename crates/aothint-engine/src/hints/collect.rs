//! Tag-chain hint collection

use std::collections::BTreeMap;
use std::sync::Arc;

use aothint_classfile::ElementValue;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::{HintApplication, HintDeclaration};
use crate::access::{AccessBits, AccessDescriptor};
use crate::inference::{infer_access, walk_properties};
use crate::names;
use crate::system::TypeSystem;
use crate::types::{Tag, Type};

/// Attribute scanned for type references on every matched tag
const VALUE_ATTRIBUTE: &str = "value";

/// Find every hint that applies to `ty`
///
/// Declarations keyed by the unit's own name apply with the chain `[ty]`.
/// Then the unit's tags are walked, and the tags on each tag's own unit,
/// transitively. A declaration keyed by a tag's name yields an application
/// whose chain runs from `ty` to the unit carrying that tag. Each of `ty`'s
/// own tags starts a fresh traversal in which every tag occurrence is
/// examined at most once, so tag cycles terminate while two root tags that
/// share a meta-tag each report their own chain.
pub fn collect_hints(ty: &Arc<Type>, system: &TypeSystem) -> Vec<HintApplication> {
    let mut collector = Collector {
        system,
        visited: FxHashSet::default(),
        chain: vec![ty.clone()],
        applications: Vec::new(),
    };
    for declaration in system.find_hints(ty.name()) {
        collector.applications.push(HintApplication {
            chain: vec![ty.clone()],
            declaration: declaration.clone(),
            inferred_types: BTreeMap::new(),
            unresolved: Vec::new(),
        });
    }
    for (position, tag) in ty.tags().iter().enumerate() {
        collector.visited.clear();
        collector.visit_tag(ty, position, tag);
    }
    debug!(name = ty.name(), count = collector.applications.len(), "collected hints");
    collector.applications
}

struct Collector<'s> {
    system: &'s TypeSystem,
    /// (carrier name, tag position) pairs already examined
    visited: FxHashSet<(String, usize)>,
    chain: Vec<Arc<Type>>,
    applications: Vec<HintApplication>,
}

impl Collector<'_> {
    fn visit_tags(&mut self, carrier: &Arc<Type>) {
        for (position, tag) in carrier.tags().iter().enumerate() {
            self.visit_tag(carrier, position, tag);
        }
    }

    fn visit_tag(&mut self, carrier: &Arc<Type>, position: usize, tag: &Tag) {
        if !self.visited.insert((carrier.name().to_string(), position)) {
            return;
        }
        let system = self.system;
        let Some(tag_type) = system.try_resolve(tag.type_name()) else {
            debug!(tag = tag.type_name(), carrier = carrier.name(), "skipping unresolvable tag");
            return;
        };
        for declaration in system.find_hints(tag_type.name()) {
            trace!(tag = tag_type.name(), carrier = carrier.name(), "matched hint");
            let application = self.apply(tag, declaration);
            self.applications.push(application);
        }
        self.chain.push(tag_type.clone());
        self.visit_tags(&tag_type);
        self.chain.pop();
    }

    fn apply(&self, tag: &Tag, declaration: &Arc<HintDeclaration>) -> HintApplication {
        let references = extract_type_references(tag, &declaration.extract_attribute_names);
        let enables_properties = tag.type_name() == self.system.role_markers().enable_properties;
        let (inferred_types, unresolved) = if enables_properties {
            let walk = walk_properties(references.iter().map(String::as_str), self.system);
            let types = walk
                .types
                .into_iter()
                .map(|(name, bits)| (name, AccessDescriptor::from_bits(bits)))
                .collect();
            (types, walk.unresolved)
        } else {
            self.as_access_map(&references, declaration.skip_if_types_missing)
        };
        HintApplication {
            chain: self.chain.clone(),
            declaration: declaration.clone(),
            inferred_types,
            unresolved,
        }
    }

    /// Access per referenced type: class metadata only for visibility
    /// checks, inferred otherwise
    fn as_access_map(
        &self,
        references: &[String],
        visibility_only: bool,
    ) -> (BTreeMap<String, AccessDescriptor>, Vec<String>) {
        let mut types = BTreeMap::new();
        let mut unresolved = Vec::new();
        for reference in references {
            let Some(ty) = self.system.try_resolve(reference) else {
                debug!(reference = %reference, "unresolvable tag reference");
                unresolved.push(reference.clone());
                continue;
            };
            let bits = if visibility_only {
                AccessBits::CLASS
            } else {
                infer_access(&ty, self.system)
            };
            if !bits.is_empty() {
                types.insert(ty.name().to_string(), AccessDescriptor::from_bits(bits));
            }
        }
        (types, unresolved)
    }
}

/// Internal names referenced by a tag's `value` attribute and the given
/// extra attributes
///
/// Class literals and strings holding type names are both accepted, also
/// inside arrays. Primitive class literals are ignored. Order follows the
/// attributes; duplicates are dropped.
pub fn extract_type_references(tag: &Tag, extra_attributes: &[String]) -> Vec<String> {
    let mut references = Vec::new();
    let attributes = std::iter::once(VALUE_ATTRIBUTE).chain(extra_attributes.iter().map(String::as_str));
    for attribute in attributes {
        if let Some(value) = tag.get(attribute) {
            collect_references(value, &mut references);
        }
    }
    let mut seen = FxHashSet::default();
    references.retain(|name| seen.insert(name.clone()));
    references
}

fn collect_references(value: &ElementValue, out: &mut Vec<String>) {
    match value {
        ElementValue::Class(descriptor) => {
            if names::is_reference_descriptor(descriptor) {
                out.extend(names::normalize(descriptor));
            }
        }
        ElementValue::String(text) if !text.trim().is_empty() => {
            out.extend(names::normalize(text.trim()));
        }
        ElementValue::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}
