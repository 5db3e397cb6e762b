//! Field and method views over a parsed class

use std::collections::BTreeSet;
use std::sync::Arc;

use aothint_classfile::{
    AccessFlags, ClassFile, FieldInfo, FieldType, MethodInfo, MethodSignature, MethodType, TypeSignature,
};
use tracing::debug;

use super::Tag;

/// A declared field
#[derive(Debug, Clone)]
pub struct Field {
    class: Arc<ClassFile>,
    index: usize,
}

impl Field {
    pub(crate) fn new(class: Arc<ClassFile>, index: usize) -> Self {
        Self { class, index }
    }

    fn info(&self) -> &FieldInfo {
        &self.class.fields[self.index]
    }

    /// Internal name of the declaring class
    pub fn owner(&self) -> &str {
        &self.class.this_class
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Raw field descriptor
    pub fn descriptor(&self) -> &str {
        &self.info().descriptor
    }

    /// Generic signature, if the field has one
    pub fn signature(&self) -> Option<&str> {
        self.info().signature.as_deref()
    }

    /// Access flags
    pub fn access_flags(&self) -> AccessFlags {
        self.info().access_flags
    }

    /// True for compiler-generated fields
    pub fn is_synthetic(&self) -> bool {
        self.access_flags().contains(AccessFlags::SYNTHETIC)
    }

    /// Tags applied to the field
    pub fn tags(&self) -> &[Tag] {
        &self.info().annotations
    }

    /// Check for a directly applied tag by descriptor
    pub fn has_tag(&self, descriptor: &str) -> bool {
        self.tags().iter().any(|tag| tag.type_descriptor == descriptor)
    }

    /// Internal names of the class types this field mentions
    ///
    /// Uses the generic signature when present so type arguments are
    /// included, otherwise the descriptor. Array types contribute their
    /// element type; primitives contribute nothing.
    pub fn signature_types(&self) -> BTreeSet<String> {
        if let Some(signature) = self.signature() {
            match TypeSignature::parse(signature) {
                Ok(parsed) => return parsed.class_names(),
                Err(e) => debug!(owner = self.owner(), field = self.name(), error = %e, "ignoring malformed field signature"),
            }
        }
        let mut out = BTreeSet::new();
        if let Some(name) = FieldType::parse(self.descriptor()).ok().as_ref().and_then(FieldType::class_name) {
            out.insert(name.to_string());
        }
        out
    }
}

/// A declared method or constructor
#[derive(Debug, Clone)]
pub struct Method {
    class: Arc<ClassFile>,
    index: usize,
    method_type: Option<MethodType>,
}

impl Method {
    pub(crate) fn new(class: Arc<ClassFile>, index: usize) -> Self {
        let method_type = class.methods[index].method_type().ok();
        Self {
            class,
            index,
            method_type,
        }
    }

    fn info(&self) -> &MethodInfo {
        &self.class.methods[self.index]
    }

    /// Internal name of the declaring class
    pub fn owner(&self) -> &str {
        &self.class.this_class
    }

    /// Method name (`<init>` for constructors)
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Raw method descriptor
    pub fn descriptor(&self) -> &str {
        &self.info().descriptor
    }

    /// Generic signature, if the method has one
    pub fn signature(&self) -> Option<&str> {
        self.info().signature.as_deref()
    }

    /// Access flags
    pub fn access_flags(&self) -> AccessFlags {
        self.info().access_flags
    }

    /// True for compiler-generated methods
    pub fn is_synthetic(&self) -> bool {
        self.access_flags().contains(AccessFlags::SYNTHETIC)
    }

    /// True for instance initializers
    pub fn is_constructor(&self) -> bool {
        self.name() == "<init>"
    }

    /// True for the static initializer
    pub fn is_static_initializer(&self) -> bool {
        self.name() == "<clinit>"
    }

    /// `getX()` style accessor: `get` prefix, no parameters, non-void
    pub fn is_getter(&self) -> bool {
        self.name().starts_with("get")
            && self
                .method_type
                .as_ref()
                .is_some_and(|mt| mt.parameters.is_empty() && mt.return_type.is_some())
    }

    /// Number of declared parameters
    pub fn parameter_count(&self) -> usize {
        self.method_type.as_ref().map_or(0, |mt| mt.parameters.len())
    }

    /// Tags applied to the method
    pub fn tags(&self) -> &[Tag] {
        &self.info().annotations
    }

    /// Tags applied to the parameter at `index`
    pub fn parameter_tags(&self, index: usize) -> &[Tag] {
        self.info()
            .parameter_annotations
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Check for a directly applied tag by descriptor
    pub fn has_tag(&self, descriptor: &str) -> bool {
        self.tags().iter().any(|tag| tag.type_descriptor == descriptor)
    }

    /// Element class names of the parameters, primitives skipped
    pub fn parameter_type_names(&self) -> Vec<String> {
        self.method_type
            .iter()
            .flat_map(|mt| mt.parameters.iter())
            .filter_map(FieldType::class_name)
            .map(str::to_string)
            .collect()
    }

    /// Element class name of the return type, `None` for void or primitives
    pub fn return_type_name(&self) -> Option<String> {
        self.method_type
            .as_ref()
            .and_then(|mt| mt.return_type.as_ref())
            .and_then(FieldType::class_name)
            .map(str::to_string)
    }

    /// Internal names of the class types this method mentions
    ///
    /// With `return_only` set only the return type (and its type arguments)
    /// contributes; otherwise parameters, bounds and thrown types do too.
    pub fn signature_types(&self, return_only: bool) -> BTreeSet<String> {
        if let Some(signature) = self.signature() {
            match MethodSignature::parse(signature) {
                Ok(parsed) => return parsed.class_names(return_only),
                Err(e) => debug!(owner = self.owner(), method = self.name(), error = %e, "ignoring malformed method signature"),
            }
        }
        let mut out: BTreeSet<String> = self.return_type_name().into_iter().collect();
        if !return_only {
            out.extend(self.parameter_type_names());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aothint_classfile::Annotation;

    fn class() -> Arc<ClassFile> {
        Arc::new(
            ClassFile::new("com/example/Holder")
                .with_field(FieldInfo::new("items", "Ljava/util/List;").with_signature("Ljava/util/List<[Lcom/example/Item;>;"))
                .with_field(FieldInfo::new("count", "I"))
                .with_field(FieldInfo::new("grid", "[[Lcom/example/Cell;").with_access(AccessFlags::SYNTHETIC))
                .with_method(MethodInfo::new("getName", "()Ljava/lang/String;"))
                .with_method(
                    MethodInfo::new("lookup", "(Ljava/lang/String;[I)Ljava/util/Map;")
                        .with_signature("(Ljava/lang/String;[I)Ljava/util/Map<Ljava/lang/String;Lcom/example/Value;>;")
                        .with_parameter_annotation(0, Annotation::new("Lcom/example/NotNull;")),
                )
                .with_method(MethodInfo::new("getAll", "(I)Ljava/util/List;"))
                .with_method(MethodInfo::new("<init>", "()V")),
        )
    }

    #[test]
    fn test_field_signature_types() {
        let class = class();
        let items = Field::new(class.clone(), 0);
        assert_eq!(
            items.signature_types().into_iter().collect::<Vec<_>>(),
            vec!["com/example/Item", "java/util/List"]
        );
        assert!(Field::new(class.clone(), 1).signature_types().is_empty());
        let grid = Field::new(class, 2);
        assert!(grid.is_synthetic());
        assert_eq!(grid.signature_types().into_iter().collect::<Vec<_>>(), vec!["com/example/Cell"]);
    }

    #[test]
    fn test_method_signature_types() {
        let class = class();
        let lookup = Method::new(class.clone(), 1);
        assert_eq!(
            lookup.signature_types(true).into_iter().collect::<Vec<_>>(),
            vec!["com/example/Value", "java/lang/String", "java/util/Map"]
        );
        assert_eq!(lookup.parameter_type_names(), vec!["java/lang/String".to_string()]);
        assert_eq!(lookup.parameter_count(), 2);
        assert_eq!(lookup.parameter_tags(0).len(), 1);
        assert!(lookup.parameter_tags(1).is_empty());
    }

    #[test]
    fn test_getter_shape() {
        let class = class();
        assert!(Method::new(class.clone(), 0).is_getter());
        assert!(!Method::new(class.clone(), 1).is_getter());
        // takes a parameter
        assert!(!Method::new(class.clone(), 2).is_getter());
        let ctor = Method::new(class, 3);
        assert!(ctor.is_constructor());
        assert!(!ctor.is_getter());
        assert_eq!(ctor.return_type_name(), None);
    }
}
