//! Reachability walker
//!
//! A [`TypeProcessor`] walks depth-first from a root unit through its
//! signature types, tags, constructors, fields and methods, calling the
//! configured callbacks for every unit and tag it discovers. Each
//! [`TypeProcessor::process`] call starts with empty seen sets, so a unit or
//! tag is visited at most once per root and cycles through supertypes,
//! interfaces or meta-tags terminate.
//!
//! # Filters
//!
//! Builder methods narrow the default filters; they never widen them.
//!
//! | Filter       | Default                                                   |
//! |--------------|-----------------------------------------------------------|
//! | types        | not `java/lang/Object`, not under `org/hibernate/engine/`, `sun/`, `jdk/` |
//! | constructors | every `<init>`                                            |
//! | methods      | everything except initializers and `$$_hibernate*`        |
//! | fields       | everything except synthetic fields and `$$_hibernate*`    |
//! | tags         | not under `java/lang/annotation/`                          |
//! | inspection   | members of `java/`, `sun/`, `jdk/`, `reactor/` types are not inspected |

mod path;

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use path::{PathElement, TraversalPath};

use crate::access::{AccessBits, AccessDescriptor};
use crate::error::TypeError;
use crate::hints::{apply_hints, collect_hints, register_access};
use crate::inference::infer_access;
use crate::registrar::Registrar;
use crate::system::TypeSystem;
use crate::types::{Field, Method, Type};

type TypePredicate = Box<dyn Fn(&Type) -> bool + Send + Sync>;
type MethodPredicate = Box<dyn Fn(&Type, &Method) -> bool + Send + Sync>;
type FieldPredicate = Box<dyn Fn(&Type, &Field) -> bool + Send + Sync>;

/// Called for every discovered unit or tag
pub type DiscoveryCallback = Box<dyn Fn(&Arc<Type>, &DiscoveryContext<'_>, &mut dyn Registrar) + Send + Sync>;

/// Where a discovery happened
pub struct DiscoveryContext<'a> {
    pub path: &'a TraversalPath,
    pub system: &'a TypeSystem,
}

/// Walker settings loadable from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Deepest hop count processed; unlimited when absent
    pub max_depth: Option<usize>,
    /// Internal names never processed
    pub excluded_types: Vec<String>,
    /// Name prefixes never processed
    pub excluded_type_prefixes: Vec<String>,
    /// Name prefixes processed but not inspected further
    pub uninspected_prefixes: Vec<String>,
    /// Tag name prefixes ignored
    pub ignored_tag_prefixes: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            excluded_types: vec![crate::types::OBJECT.to_string()],
            excluded_type_prefixes: ["org/hibernate/engine/", "sun/", "jdk/"].map(String::from).to_vec(),
            uninspected_prefixes: ["java/", "sun/", "jdk/", "reactor/"].map(String::from).to_vec(),
            ignored_tag_prefixes: vec!["java/lang/annotation/".to_string()],
        }
    }
}

/// What one traversal discovered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Internal names of processed units in discovery order
    pub types: Vec<String>,
    /// Internal names of processed tags in discovery order
    pub tags: Vec<String>,
    /// Hint applications handed to the registrar
    pub hint_applications: usize,
}

/// Configurable depth-first reachability walker
pub struct TypeProcessor {
    name: String,
    type_filter: TypePredicate,
    constructor_filter: MethodPredicate,
    method_filter: MethodPredicate,
    field_filter: FieldPredicate,
    tag_filter: TypePredicate,
    uninspected: TypePredicate,
    max_depth: Option<usize>,
    on_type: Option<DiscoveryCallback>,
    on_tag: Option<DiscoveryCallback>,
    consult_hints: bool,
}

fn has_prefix(name: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| name.starts_with(p.as_str()))
}

impl Default for TypeProcessor {
    fn default() -> Self {
        Self::from_config(&WalkerConfig::default())
    }
}

impl TypeProcessor {
    /// Walker with default filters and no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Walker with filters taken from configuration
    pub fn from_config(config: &WalkerConfig) -> Self {
        let excluded_types = config.excluded_types.clone();
        let excluded_prefixes = config.excluded_type_prefixes.clone();
        let uninspected = config.uninspected_prefixes.clone();
        let ignored_tags = config.ignored_tag_prefixes.clone();
        Self {
            name: "TypeProcessor".to_string(),
            type_filter: Box::new(move |ty| {
                !excluded_types.iter().any(|name| name == ty.name()) && !has_prefix(ty.name(), &excluded_prefixes)
            }),
            constructor_filter: Box::new(|_, method| method.is_constructor()),
            method_filter: Box::new(|_, method| {
                !method.is_constructor() && !method.is_static_initializer() && !method.name().starts_with("$$_hibernate")
            }),
            field_filter: Box::new(|_, field| !field.is_synthetic() && !field.name().starts_with("$$_hibernate")),
            tag_filter: Box::new(move |tag| !has_prefix(tag.name(), &ignored_tags)),
            uninspected: Box::new(move |ty| has_prefix(ty.name(), &uninspected)),
            max_depth: config.max_depth,
            on_type: None,
            on_tag: None,
            consult_hints: false,
        }
    }

    /// Register every discovered unit and tag with fixed access
    pub fn for_access(type_access: AccessDescriptor, tag_access: AccessDescriptor) -> Self {
        Self::new()
            .on_type_discovered(move |ty, _, registrar| {
                registrar.log(&format!("Registering {} with access {type_access}", ty.dotted_name()));
                register_access(registrar, ty.name(), &type_access);
            })
            .on_tag_discovered(move |tag, _, registrar| {
                registrar.log(&format!("Registering {} with access {tag_access}", tag.dotted_name()));
                register_access(registrar, tag.name(), &tag_access);
            })
    }

    /// Register every discovered unit with inferred access, every tag for
    /// annotation access, and apply catalog hints along the way
    pub fn inferring() -> Self {
        Self::new()
            .on_type_discovered(|ty, context, registrar| {
                let access = AccessDescriptor::from_bits(infer_access(ty, context.system));
                register_access(registrar, ty.name(), &access);
            })
            .on_tag_discovered(|tag, _, registrar| {
                register_access(registrar, tag.name(), &AccessDescriptor::from_bits(AccessBits::ANNOTATION));
            })
            .with_hints()
    }

    /// Name used in registrar log lines
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Only process units accepted by `include` as well
    pub fn filter_types(mut self, include: impl Fn(&Type) -> bool + Send + Sync + 'static) -> Self {
        let previous = self.type_filter;
        self.type_filter = Box::new(move |ty| previous(ty) && include(ty));
        self
    }

    /// Do not process units matched by `exclude`
    pub fn skip_types_matching(self, exclude: impl Fn(&Type) -> bool + Send + Sync + 'static) -> Self {
        self.filter_types(move |ty| !exclude(ty))
    }

    pub fn filter_constructors(mut self, include: impl Fn(&Type, &Method) -> bool + Send + Sync + 'static) -> Self {
        let previous = self.constructor_filter;
        self.constructor_filter = Box::new(move |owner, method| previous(owner, method) && include(owner, method));
        self
    }

    pub fn skip_constructor_inspection(mut self) -> Self {
        self.constructor_filter = Box::new(|_, _| false);
        self
    }

    pub fn filter_methods(mut self, include: impl Fn(&Type, &Method) -> bool + Send + Sync + 'static) -> Self {
        let previous = self.method_filter;
        self.method_filter = Box::new(move |owner, method| previous(owner, method) && include(owner, method));
        self
    }

    pub fn skip_methods_matching(self, exclude: impl Fn(&Type, &Method) -> bool + Send + Sync + 'static) -> Self {
        self.filter_methods(move |owner, method| !exclude(owner, method))
    }

    pub fn skip_method_inspection(mut self) -> Self {
        self.method_filter = Box::new(|_, _| false);
        self
    }

    pub fn filter_fields(mut self, include: impl Fn(&Type, &Field) -> bool + Send + Sync + 'static) -> Self {
        let previous = self.field_filter;
        self.field_filter = Box::new(move |owner, field| previous(owner, field) && include(owner, field));
        self
    }

    pub fn skip_fields_matching(self, exclude: impl Fn(&Type, &Field) -> bool + Send + Sync + 'static) -> Self {
        self.filter_fields(move |owner, field| !exclude(owner, field))
    }

    pub fn skip_field_inspection(mut self) -> Self {
        self.field_filter = Box::new(|_, _| false);
        self
    }

    pub fn filter_tags(mut self, include: impl Fn(&Type) -> bool + Send + Sync + 'static) -> Self {
        let previous = self.tag_filter;
        self.tag_filter = Box::new(move |tag| previous(tag) && include(tag));
        self
    }

    pub fn skip_tags_matching(self, exclude: impl Fn(&Type) -> bool + Send + Sync + 'static) -> Self {
        self.filter_tags(move |tag| !exclude(tag))
    }

    pub fn skip_tag_inspection(mut self) -> Self {
        self.tag_filter = Box::new(|_| false);
        self
    }

    /// Stop at paths deeper than `depth` hops
    pub fn limit_inspection_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Process the root and its tags only
    pub fn do_not_follow(self) -> Self {
        self.limit_inspection_depth(0)
    }

    pub fn on_type_discovered(
        mut self,
        callback: impl Fn(&Arc<Type>, &DiscoveryContext<'_>, &mut dyn Registrar) + Send + Sync + 'static,
    ) -> Self {
        self.on_type = Some(Box::new(callback));
        self
    }

    pub fn on_tag_discovered(
        mut self,
        callback: impl Fn(&Arc<Type>, &DiscoveryContext<'_>, &mut dyn Registrar) + Send + Sync + 'static,
    ) -> Self {
        self.on_tag = Some(Box::new(callback));
        self
    }

    /// Collect and apply catalog hints for every processed unit, and walk
    /// the types referenced by declarations marked `follow`
    pub fn with_hints(mut self) -> Self {
        self.consult_hints = true;
        self
    }

    /// Walk from one root
    pub fn process(&self, root: &Arc<Type>, system: &TypeSystem, registrar: &mut dyn Registrar) -> ProcessReport {
        let mut traversal = Traversal {
            processor: self,
            system,
            registrar,
            seen_types: FxHashSet::default(),
            seen_tags: FxHashSet::default(),
            report: ProcessReport::default(),
        };
        traversal.process_type(root, &TraversalPath::root(root));
        traversal.report
    }

    /// Resolve `name` strictly and walk from it
    pub fn process_name(
        &self,
        name: &str,
        system: &TypeSystem,
        registrar: &mut dyn Registrar,
    ) -> Result<ProcessReport, TypeError> {
        let root = system.resolve_required(name)?;
        Ok(self.process(&root, system, registrar))
    }

    /// Walk from each root with fresh state
    pub fn process_all(
        &self,
        roots: &[Arc<Type>],
        system: &TypeSystem,
        registrar: &mut dyn Registrar,
    ) -> Vec<ProcessReport> {
        roots.iter().map(|root| self.process(root, system, registrar)).collect()
    }
}

struct Traversal<'p, 'r> {
    processor: &'p TypeProcessor,
    system: &'p TypeSystem,
    registrar: &'r mut dyn Registrar,
    seen_types: FxHashSet<String>,
    seen_tags: FxHashSet<String>,
    report: ProcessReport,
}

impl Traversal<'_, '_> {
    fn log(&mut self, message: String) {
        trace!("{message}");
        let line = format!("{}: {message}", self.processor.name);
        self.registrar.log(&line);
    }

    fn process_type(&mut self, ty: &Arc<Type>, path: &TraversalPath) {
        let processor = self.processor;
        let system = self.system;
        let unit: &Type = ty;
        if processor.max_depth.is_some_and(|max| path.depth() > max) {
            return;
        }
        if !(processor.type_filter)(unit) {
            self.log(format!("skipping type {} because it was filtered out", ty.dotted_name()));
            return;
        }
        if !self.seen_types.insert(ty.name().to_string()) {
            self.log(format!("skipping type {} because it was already processed", ty.dotted_name()));
            return;
        }
        self.log(format!("processing type {} ({path})", ty.dotted_name()));
        self.report.types.push(ty.name().to_string());

        if let Some(callback) = &processor.on_type {
            callback(ty, &DiscoveryContext { path, system }, &mut *self.registrar);
        }
        if processor.consult_hints {
            self.apply_hints(ty, path);
        }
        if (processor.uninspected)(unit) {
            self.log(format!("skip field and method inspection for type {}", ty.dotted_name()));
            return;
        }

        for name in ty.types_in_signature() {
            if let Some(signature_type) = system.try_resolve(name) {
                self.process_type(&signature_type, &path.then_type(&signature_type));
            }
        }
        for tag_type in ty.tag_types(system) {
            self.process_tag(&tag_type, &path.then_type(&tag_type));
        }
        for constructor in ty.methods().iter().filter(|m| (processor.constructor_filter)(unit, *m)) {
            self.process_method(constructor, path);
        }
        for field in ty.fields() {
            if !(processor.field_filter)(unit, field) {
                self.log(format!("skipping field {} of {}", field.name(), ty.dotted_name()));
                continue;
            }
            self.process_field(field, path);
        }
        for method in ty.methods().iter().filter(|m| (processor.method_filter)(unit, *m)) {
            self.process_method(method, path);
        }
    }

    fn process_field(&mut self, field: &Field, path: &TraversalPath) {
        let system = self.system;
        for name in field.signature_types() {
            if let Some(field_type) = system.try_resolve(&name) {
                self.process_type(&field_type, &path.then_field(field, &field_type));
            }
        }
        for tag in field.tags() {
            if let Some(tag_type) = system.try_resolve(tag.type_name()) {
                self.process_tag(&tag_type, &path.then_field(field, &tag_type));
            }
        }
    }

    fn process_method(&mut self, method: &Method, path: &TraversalPath) {
        let system = self.system;
        self.log(format!("inspecting {} of {}", method.name(), method.owner()));
        let referenced = method.signature_types(true).into_iter().chain(method.parameter_type_names());
        for name in referenced {
            if let Some(referenced_type) = system.try_resolve(&name) {
                self.process_type(&referenced_type, &path.then_method(method, &referenced_type));
            }
        }
        for tag in method.tags() {
            if let Some(tag_type) = system.try_resolve(tag.type_name()) {
                self.process_tag(&tag_type, &path.then_method(method, &tag_type));
            }
        }
        for index in 0..method.parameter_count() {
            for tag in method.parameter_tags(index) {
                if let Some(tag_type) = system.try_resolve(tag.type_name()) {
                    self.process_tag(&tag_type, &path.then_method(method, &tag_type));
                }
            }
        }
    }

    fn process_tag(&mut self, tag: &Arc<Type>, path: &TraversalPath) {
        let processor = self.processor;
        if self.seen_tags.contains(tag.name()) {
            return;
        }
        let unit: &Type = tag;
        if !(processor.tag_filter)(unit) {
            self.log(format!("skipping tag {} because it was filtered out", tag.dotted_name()));
            return;
        }
        self.seen_tags.insert(tag.name().to_string());
        self.report.tags.push(tag.name().to_string());
        self.log(format!("inspecting tag {}", tag.dotted_name()));
        if let Some(callback) = &processor.on_tag {
            callback(tag, &DiscoveryContext { path, system: self.system }, &mut *self.registrar);
        }
        for meta in tag.tag_types(self.system) {
            self.process_tag(&meta, path);
        }
    }

    fn apply_hints(&mut self, ty: &Arc<Type>, path: &TraversalPath) {
        let system = self.system;
        let applications = collect_hints(ty, system);
        if applications.is_empty() {
            return;
        }
        self.report.hint_applications += apply_hints(system, &applications, &mut *self.registrar);
        for application in applications.iter().filter(|a| a.declaration.follow) {
            let referenced = application
                .inferred_types
                .keys()
                .chain(application.declaration.dependent_types.iter().map(|d| &d.name));
            for name in referenced {
                if let Some(followed) = system.try_resolve(name) {
                    self.process_type(&followed, &path.then_type(&followed));
                }
            }
        }
    }
}
