//! Unit model
//!
//! A [`Type`] wraps one parsed class file (or an array of one) and exposes
//! typed views of its hierarchy, members and tags. Types are created by a
//! [`TypeSystem`] on first resolution and never change afterwards; derived
//! views are computed lazily, at most once, and cached on the instance.
//!
//! Anything that needs another unit (supertypes, interfaces, meta-tags) goes
//! through the owning [`TypeSystem`], which is passed in explicitly. Missing
//! references degrade to "absent" in these accessors; the `_strict` variants
//! report them as errors instead.

mod member;
mod roles;

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use aothint_classfile::{AccessFlags, ClassFile, ClassSignature};
use rustc_hash::FxHashSet;
use tracing::debug;

pub use aothint_classfile::Annotation as Tag;
pub use member::{Field, Method};
pub use roles::{RoleMarkers, Roles};

use crate::error::TypeError;
use crate::names;
use crate::system::TypeSystem;

/// Internal name of the hierarchy root
pub const OBJECT: &str = "java/lang/Object";

/// Interfaces every array type implements
pub const ARRAY_INTERFACES: [&str; 2] = ["java/lang/Cloneable", "java/io/Serializable"];

/// One compiled unit, or an array of one
pub struct Type {
    name: String,
    dimensions: usize,
    class: Arc<ClassFile>,
    fields: OnceLock<Vec<Field>>,
    methods: OnceLock<Vec<Method>>,
    signature_types: OnceLock<BTreeSet<String>>,
    roles: OnceLock<Roles>,
}

impl Type {
    pub(crate) fn new(class: Arc<ClassFile>) -> Self {
        Self::with_dimensions(class, 0)
    }

    pub(crate) fn with_dimensions(class: Arc<ClassFile>, dimensions: usize) -> Self {
        let mut name = class.this_class.clone();
        for _ in 0..dimensions {
            name.push_str("[]");
        }
        Self {
            name,
            dimensions,
            class,
            fields: OnceLock::new(),
            methods: OnceLock::new(),
            signature_types: OnceLock::new(),
            roles: OnceLock::new(),
        }
    }

    /// Array of this type's element class with `dimensions` dimensions
    pub(crate) fn array_of(&self, dimensions: usize) -> Self {
        Self::with_dimensions(self.class.clone(), dimensions)
    }

    /// Internal name, one `[]` per array dimension
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Internal name of the element class
    pub fn base_name(&self) -> &str {
        &self.class.this_class
    }

    /// Array dimensions, 0 for non-arrays
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_array(&self) -> bool {
        self.dimensions > 0
    }

    /// Parsed class file of the element class
    pub fn class_file(&self) -> &ClassFile {
        &self.class
    }

    /// Reference descriptor (`La/b/C;`, `[La/b/C;`)
    pub fn descriptor(&self) -> String {
        names::descriptor_of(&self.name)
    }

    /// Dotted name (`a.b.C$D[]`)
    pub fn dotted_name(&self) -> String {
        names::to_dotted(&self.name)
    }

    /// Innermost simple name of the element class
    pub fn simple_name(&self) -> &str {
        names::simple_name(self.base_name())
    }

    /// Package in internal form, empty for the default package
    pub fn package_name(&self) -> &str {
        names::package_of(self.base_name())
    }

    pub fn access_flags(&self) -> AccessFlags {
        if self.is_array() {
            AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::ABSTRACT
        } else {
            self.class.access_flags
        }
    }

    pub fn is_interface(&self) -> bool {
        !self.is_array() && self.class.access_flags.contains(AccessFlags::INTERFACE)
    }

    pub fn is_annotation(&self) -> bool {
        !self.is_array() && self.class.access_flags.contains(AccessFlags::ANNOTATION)
    }

    pub fn is_enum(&self) -> bool {
        !self.is_array() && self.class.access_flags.contains(AccessFlags::ENUM)
    }

    pub fn is_abstract(&self) -> bool {
        !self.is_array() && self.class.access_flags.contains(AccessFlags::ABSTRACT)
    }

    /// Internal name of the superclass; arrays report the root object type
    pub fn superclass_name(&self) -> Option<&str> {
        if self.is_array() {
            Some(OBJECT)
        } else {
            self.class.super_class.as_deref()
        }
    }

    /// Internal names of the directly implemented interfaces
    pub fn interface_names(&self) -> Vec<&str> {
        if self.is_array() {
            ARRAY_INTERFACES.to_vec()
        } else {
            self.class.interfaces.iter().map(String::as_str).collect()
        }
    }

    /// Resolved superclass, `None` when absent or unresolvable
    pub fn superclass(&self, system: &TypeSystem) -> Option<Arc<Type>> {
        self.superclass_name().and_then(|name| system.try_resolve(name))
    }

    /// Resolved interfaces; unresolvable ones are omitted
    pub fn interfaces(&self, system: &TypeSystem) -> Vec<Arc<Type>> {
        self.interface_names()
            .into_iter()
            .filter_map(|name| system.try_resolve(name))
            .collect()
    }

    /// Declared fields in class file order (empty for arrays)
    pub fn fields(&self) -> &[Field] {
        self.fields.get_or_init(|| {
            if self.is_array() {
                return Vec::new();
            }
            (0..self.class.fields.len())
                .map(|index| Field::new(self.class.clone(), index))
                .collect()
        })
    }

    /// Declared methods and constructors in class file order (empty for arrays)
    pub fn methods(&self) -> &[Method] {
        self.methods.get_or_init(|| {
            if self.is_array() {
                return Vec::new();
            }
            (0..self.class.methods.len())
                .map(|index| Method::new(self.class.clone(), index))
                .collect()
        })
    }

    /// Declared constructors
    pub fn constructors(&self) -> impl Iterator<Item = &Method> {
        self.methods().iter().filter(|m| m.is_constructor())
    }

    /// Tags applied directly to the unit (empty for arrays)
    pub fn tags(&self) -> &[Tag] {
        if self.is_array() {
            &[]
        } else {
            &self.class.annotations
        }
    }

    /// Directly applied tag with the given descriptor
    pub fn tag(&self, descriptor: &str) -> Option<&Tag> {
        self.tags().iter().find(|tag| tag.type_descriptor == descriptor)
    }

    /// Resolved units of the directly applied tags; unresolvable ones are
    /// omitted
    pub fn tag_types(&self, system: &TypeSystem) -> Vec<Arc<Type>> {
        self.tags()
            .iter()
            .filter_map(|tag| system.try_resolve(tag.type_name()))
            .collect()
    }

    /// Check for a tag by descriptor, optionally through meta-tags
    ///
    /// The meta-tag walk visits each tag type once, so tag cycles are safe.
    pub fn has_tag(&self, descriptor: &str, check_meta: bool, system: &TypeSystem) -> bool {
        if self.tag(descriptor).is_some() {
            return true;
        }
        if !check_meta {
            return false;
        }
        let mut visited = FxHashSet::default();
        visited.insert(self.name.clone());
        find_meta_tag(self.tags(), descriptor, system, &mut visited)
    }

    /// Check for a tag by internal name, directly or through meta-tags
    pub fn is_meta_tagged(&self, tag_name: &str, system: &TypeSystem) -> bool {
        self.has_tag(&names::descriptor_of(tag_name), true, system)
    }

    /// Methods carrying the tag directly
    pub fn methods_with_tag(&self, descriptor: &str) -> Vec<&Method> {
        self.methods().iter().filter(|m| m.has_tag(descriptor)).collect()
    }

    /// Fields carrying the tag directly
    pub fn fields_with_tag(&self, descriptor: &str) -> Vec<&Field> {
        self.fields().iter().filter(|f| f.has_tag(descriptor)).collect()
    }

    /// Internal names of the member classes declared by this unit
    pub fn nested_type_names(&self) -> Vec<&str> {
        if self.is_array() {
            return Vec::new();
        }
        self.class
            .inner_classes
            .iter()
            .filter(|inner| inner.outer_class.as_deref() == Some(self.base_name()))
            .map(|inner| inner.inner_class.as_str())
            .collect()
    }

    /// Resolved member classes; unresolvable ones are omitted
    pub fn nested_types(&self, system: &TypeSystem) -> Vec<Arc<Type>> {
        self.nested_type_names()
            .into_iter()
            .filter_map(|name| system.try_resolve(name))
            .collect()
    }

    /// Class names mentioned by the class signature
    ///
    /// Includes the superclass, the interfaces and their type arguments.
    /// Without a generic signature this is the superclass and interfaces.
    /// Arrays mention nothing.
    pub fn types_in_signature(&self) -> &BTreeSet<String> {
        self.signature_types.get_or_init(|| {
            if self.is_array() {
                return BTreeSet::new();
            }
            if let Some(signature) = &self.class.signature {
                match ClassSignature::parse(signature) {
                    Ok(parsed) => return parsed.class_names(),
                    Err(e) => debug!(name = %self.name, error = %e, "ignoring malformed class signature"),
                }
            }
            self.superclass_name()
                .into_iter()
                .chain(self.interface_names())
                .map(str::to_string)
                .collect()
        })
    }

    /// True if `class_name` is this type or one of its superclasses
    pub fn extends_class(&self, class_name: &str, system: &TypeSystem) -> bool {
        let mut visited = FxHashSet::default();
        let mut current = Some(self.name.clone());
        while let Some(name) = current.take() {
            if name == class_name {
                return true;
            }
            if !visited.insert(name.clone()) {
                break;
            }
            let next = if name == self.name {
                self.superclass_name().map(str::to_string)
            } else {
                system
                    .try_resolve(&name)
                    .and_then(|ty| ty.superclass_name().map(str::to_string))
            };
            current = next;
        }
        false
    }

    /// True if this type is, or transitively implements or extends,
    /// `interface_name`; unresolvable parts of the hierarchy count as "no"
    pub fn implements_interface(&self, interface_name: &str, system: &TypeSystem) -> bool {
        self.walk_hierarchy(interface_name, system, false).unwrap_or(false)
    }

    /// Like [`Type::implements_interface`] but a hierarchy member that cannot
    /// be resolved is an error
    pub fn implements_interface_strict(&self, interface_name: &str, system: &TypeSystem) -> Result<bool, TypeError> {
        self.walk_hierarchy(interface_name, system, true)
    }

    fn walk_hierarchy(&self, target: &str, system: &TypeSystem, strict: bool) -> Result<bool, TypeError> {
        if self.name == target {
            return Ok(true);
        }
        let mut visited = FxHashSet::default();
        visited.insert(self.name.clone());
        let mut pending: Vec<String> = self.hierarchy_names();
        while let Some(name) = pending.pop() {
            if name == target {
                return Ok(true);
            }
            if name == OBJECT || !visited.insert(name.clone()) {
                continue;
            }
            let resolved = if strict {
                Some(system.resolve_required(&name)?)
            } else {
                system.try_resolve(&name)
            };
            if let Some(ty) = resolved {
                pending.extend(ty.hierarchy_names());
            }
        }
        Ok(false)
    }

    fn hierarchy_names(&self) -> Vec<String> {
        self.superclass_name()
            .into_iter()
            .chain(self.interface_names())
            .map(str::to_string)
            .collect()
    }

    /// Cached role classification
    pub fn roles(&self, system: &TypeSystem) -> Roles {
        *self.roles.get_or_init(|| roles::classify(self, system))
    }
}

fn find_meta_tag(tags: &[Tag], descriptor: &str, system: &TypeSystem, visited: &mut FxHashSet<String>) -> bool {
    if tags.iter().any(|tag| tag.type_descriptor == descriptor) {
        return true;
    }
    for tag in tags {
        let tag_name = tag.type_name();
        if !visited.insert(tag_name.to_string()) {
            continue;
        }
        if let Some(tag_type) = system.try_resolve(tag_name) {
            if find_meta_tag(tag_type.tags(), descriptor, system, visited) {
                return true;
            }
        }
    }
    false
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.dimensions == other.dimensions
            && (Arc::ptr_eq(&self.class, &other.class) || self.class == other.class)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.dimensions.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.name)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
