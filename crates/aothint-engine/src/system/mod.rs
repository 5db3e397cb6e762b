//! Resolution and index layer
//!
//! A [`TypeSystem`] owns the classpath index and a shared cache from
//! normalized internal names to units. Every name is resolved at most once
//! per system: hits, misses and malformed units are all remembered, so
//! repeated lookups never go back to storage.
//!
//! # Name forms
//!
//! [`TypeSystem::resolve`] accepts dotted (`a.b.C`), slashed (`a/b/C`),
//! descriptor (`La/b/C;`, `[La/b/C;`) and array (`a/b/C[]`) forms. When a
//! name cannot be found as written and contains package separators, the
//! trailing separators are turned into `$` one at a time so that
//! `a/b/Outer/Inner` finds `a/b/Outer$Inner`.
//!
//! # Concurrency
//!
//! The cache is a [`DashMap`]. Two threads may parse the same unit
//! concurrently; the first one to insert wins and both receive that
//! instance.

mod index;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use aothint_classfile::ClassFile;
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::error::TypeError;
use crate::hints::{HintCatalog, HintDeclaration};
use crate::inference::InferenceConfig;
use crate::names;
use crate::types::{RoleMarkers, Type};
use index::PackageIndex;

#[derive(Clone)]
enum CacheEntry {
    Found(Arc<Type>),
    Missing,
    Malformed(String),
}

impl CacheEntry {
    fn to_result(&self, name: &str) -> Result<Option<Arc<Type>>, TypeError> {
        match self {
            Self::Found(ty) => Ok(Some(ty.clone())),
            Self::Missing => Ok(None),
            Self::Malformed(reason) => Err(TypeError::MalformedUnit {
                name: name.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Counters describing how resolutions were served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolutionStats {
    /// Times the package index was consulted for backing bytes
    pub storage_lookups: usize,
    /// Resolutions answered from the cache
    pub cache_hits: usize,
    /// Names currently cached, misses included
    pub cached_entries: usize,
}

/// Resolves type names against an indexed classpath
pub struct TypeSystem {
    index: PackageIndex,
    cache: DashMap<String, CacheEntry>,
    markers: RoleMarkers,
    inference: InferenceConfig,
    catalog: Arc<HintCatalog>,
    storage_lookups: AtomicUsize,
    cache_hits: AtomicUsize,
    scanned: OnceLock<Vec<String>>,
}

impl TypeSystem {
    /// Index `classpath` with default markers and an empty catalog
    pub fn new<I, P>(classpath: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::builder().classpath(classpath).build()
    }

    /// Start configuring a type system
    pub fn builder() -> TypeSystemBuilder {
        TypeSystemBuilder::default()
    }

    /// Markers used by role classification
    pub fn role_markers(&self) -> &RoleMarkers {
        &self.markers
    }

    /// Settings used by access inference
    pub fn inference_config(&self) -> &InferenceConfig {
        &self.inference
    }

    /// Attached hint catalog
    pub fn catalog(&self) -> &HintCatalog {
        &self.catalog
    }

    /// Hint declarations registered for a type or tag name in any form
    pub fn find_hints(&self, name: &str) -> &[Arc<HintDeclaration>] {
        self.catalog.find(name)
    }

    /// Resolve a name in any supported form
    ///
    /// Returns `Ok(None)` when no location provides the type (or the name is
    /// a primitive descriptor) and an error when the backing bytes are
    /// malformed or unreadable.
    pub fn resolve(&self, name: &str) -> Result<Option<Arc<Type>>, TypeError> {
        match names::normalize(name) {
            Some(normalized) => self.resolve_normalized(&normalized),
            None => Ok(None),
        }
    }

    /// Resolve a name, treating "not found" as [`TypeError::MissingType`]
    pub fn resolve_required(&self, name: &str) -> Result<Arc<Type>, TypeError> {
        self.resolve(name)?.ok_or_else(|| {
            let normalized = names::normalize(name).unwrap_or_else(|| name.to_string());
            TypeError::missing(normalized)
        })
    }

    /// Resolve a name, folding every failure into `None`
    pub fn try_resolve(&self, name: &str) -> Option<Arc<Type>> {
        match self.resolve(name) {
            Ok(ty) => ty,
            Err(e) => {
                debug!(name, error = %e, "unresolvable reference");
                None
            }
        }
    }

    /// Resolve a field descriptor; primitives resolve to `None`
    pub fn resolve_descriptor(&self, descriptor: &str) -> Result<Option<Arc<Type>>, TypeError> {
        if !names::is_reference_descriptor(descriptor) {
            return Ok(None);
        }
        self.resolve(descriptor)
    }

    /// Resolve a dotted name (`a.b.C$D`)
    pub fn resolve_dotted(&self, name: &str) -> Result<Option<Arc<Type>>, TypeError> {
        self.resolve_normalized(&names::to_slashed(name))
    }

    fn resolve_normalized(&self, name: &str) -> Result<Option<Arc<Type>>, TypeError> {
        if let Some(entry) = self.cache.get(name) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return entry.to_result(name);
        }
        let (base, dimensions) = names::split_array(name);
        let entry = if dimensions > 0 {
            match self.resolve_normalized(base)? {
                Some(element) => CacheEntry::Found(Arc::new(element.array_of(dimensions))),
                None => CacheEntry::Missing,
            }
        } else {
            self.load(name)?
        };
        self.remember(name, entry).to_result(name)
    }

    /// Cache an entry unless another writer got there first, returning the
    /// winning entry
    fn remember(&self, name: &str, entry: CacheEntry) -> CacheEntry {
        self.cache.entry(name.to_string()).or_insert(entry).value().clone()
    }

    fn load(&self, name: &str) -> Result<CacheEntry, TypeError> {
        if let Some(entry) = self.load_exact(name)? {
            return Ok(entry);
        }
        let mut candidate = name.to_string();
        while let Some(separator) = candidate.rfind('/') {
            candidate.replace_range(separator..=separator, "$");
            let cached = self.cache.get(&candidate).map(|entry| entry.value().clone());
            match cached {
                Some(CacheEntry::Missing) => continue,
                Some(entry) => return Ok(entry),
                None => {}
            }
            if let Some(entry) = self.load_exact(&candidate)? {
                debug!(requested = name, found = %candidate, "resolved as nested type");
                return Ok(self.remember(&candidate, entry));
            }
        }
        Ok(CacheEntry::Missing)
    }

    fn load_exact(&self, name: &str) -> Result<Option<CacheEntry>, TypeError> {
        self.storage_lookups.fetch_add(1, Ordering::Relaxed);
        let Some(bytes) = self.index.read(name)? else {
            return Ok(None);
        };
        let entry = match ClassFile::parse(&bytes) {
            Ok(class) => {
                if class.this_class != name {
                    warn!(name, declared = %class.this_class, "class file declares a different name");
                }
                CacheEntry::Found(Arc::new(Type::new(Arc::new(class))))
            }
            Err(e) => {
                warn!(name, error = %e, "malformed class file");
                CacheEntry::Malformed(e.to_string())
            }
        };
        Ok(Some(entry))
    }

    /// Resolution counters
    pub fn stats(&self) -> ResolutionStats {
        ResolutionStats {
            storage_lookups: self.storage_lookups.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cached_entries: self.cache.len(),
        }
    }

    /// Supertype and interface names reachable from `name` that cannot be
    /// resolved (including `name` itself)
    pub fn missing_types_in_hierarchy(&self, name: &str) -> BTreeSet<String> {
        let mut missing = BTreeSet::new();
        let mut visited = FxHashSet::default();
        let mut pending = vec![names::normalize(name).unwrap_or_else(|| name.to_string())];
        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            match self.try_resolve(&current) {
                Some(ty) => {
                    pending.extend(ty.superclass_name().map(str::to_string));
                    pending.extend(ty.interface_names().into_iter().map(str::to_string));
                }
                None => {
                    missing.insert(current);
                }
            }
        }
        missing
    }

    /// Names of the application units carrying a tag
    ///
    /// The application locations are listed once per system; the list is
    /// reused by later calls. With `check_meta` the tag may also be reached
    /// through meta-tags.
    pub fn find_types_tagged(&self, descriptor: &str, check_meta: bool) -> Vec<String> {
        let units = self.scanned.get_or_init(|| {
            let names = self.index.class_names();
            debug!(units = names.len(), "listed application units");
            names
        });
        units
            .iter()
            .filter_map(|name| self.try_resolve(name))
            .filter(|ty| ty.has_tag(descriptor, check_meta, self))
            .map(|ty| ty.name().to_string())
            .collect()
    }

    /// Number of application locations that were indexed
    pub fn location_count(&self) -> usize {
        self.index.location_count()
    }
}

/// Builder for [`TypeSystem`]
#[derive(Debug, Default)]
pub struct TypeSystemBuilder {
    classpath: Vec<PathBuf>,
    system_locations: Vec<PathBuf>,
    markers: RoleMarkers,
    inference: InferenceConfig,
    catalog: Arc<HintCatalog>,
}

impl TypeSystemBuilder {
    /// Append application locations, searched in order
    pub fn classpath<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.classpath.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Append fallback locations searched by exact path after the classpath
    pub fn system_locations<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.system_locations.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn role_markers(mut self, markers: RoleMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    pub fn catalog(mut self, catalog: impl Into<Arc<HintCatalog>>) -> Self {
        self.catalog = catalog.into();
        self
    }

    /// Index every location and create the system
    pub fn build(self) -> TypeSystem {
        TypeSystem {
            index: PackageIndex::build(&self.classpath, &self.system_locations),
            cache: DashMap::new(),
            markers: self.markers,
            inference: self.inference,
            catalog: self.catalog,
            storage_lookups: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
            scanned: OnceLock::new(),
        }
    }
}
