//! Resolution tests
//!
//! Exercise the type system against real class directories and jars.

mod common;

use std::sync::Arc;

use aothint_classfile::{AccessFlags, Annotation, ClassFile, ElementValue, InnerClass};
use aothint_engine::types::ARRAY_INTERFACES;
use aothint_engine::{TypeError, TypeSystem};
use common::{interface, tag, tag_type, Fixture};

#[test]
fn test_name_forms_share_one_instance() {
    let mut fixture = Fixture::new();
    fixture.add(ClassFile::new("com/example/Widget"));
    let system = fixture.system();

    let slashed = system.resolve("com/example/Widget").unwrap().unwrap();
    let dotted = system.resolve("com.example.Widget").unwrap().unwrap();
    let descriptor = system.resolve("Lcom/example/Widget;").unwrap().unwrap();
    let via_dotted = system.resolve_dotted("com.example.Widget").unwrap().unwrap();

    assert!(Arc::ptr_eq(&slashed, &dotted));
    assert!(Arc::ptr_eq(&slashed, &descriptor));
    assert!(Arc::ptr_eq(&slashed, &via_dotted));
    assert_eq!(slashed.name(), "com/example/Widget");
    assert_eq!(slashed.dotted_name(), "com.example.Widget");
    assert_eq!(slashed.simple_name(), "Widget");
    assert_eq!(slashed.package_name(), "com/example");
}

#[test]
fn test_missing_names_are_cached() {
    let fixture = Fixture::new();
    let system = fixture.system();

    assert!(system.resolve("com/example/Absent").unwrap().is_none());
    let after_first = system.stats();
    assert!(system.resolve("com.example.Absent").unwrap().is_none());
    let after_second = system.stats();

    assert_eq!(after_first.storage_lookups, after_second.storage_lookups);
    assert_eq!(after_second.cache_hits, after_first.cache_hits + 1);
}

#[test]
fn test_nested_name_fallback() {
    let mut fixture = Fixture::new();
    fixture.add(ClassFile::new("a/b/Outer").with_inner_class(InnerClass {
        inner_class: "a/b/Outer$Inner".to_string(),
        outer_class: Some("a/b/Outer".to_string()),
        inner_name: Some("Inner".to_string()),
        access_flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
    }));
    fixture.add(ClassFile::new("a/b/Outer$Inner"));
    let system = fixture.system();

    let inner = system.resolve("a/b/Outer/Inner").unwrap().unwrap();
    assert_eq!(inner.name(), "a/b/Outer$Inner");
    let direct = system.resolve("a.b.Outer$Inner").unwrap().unwrap();
    assert!(Arc::ptr_eq(&inner, &direct));

    let outer = system.resolve("a/b/Outer").unwrap().unwrap();
    assert_eq!(outer.nested_type_names(), vec!["a/b/Outer$Inner"]);
    assert_eq!(outer.nested_types(&system).len(), 1);
}

#[test]
fn test_array_types() {
    let mut fixture = Fixture::new();
    fixture.add(ClassFile::new("com/example/Foo"));
    let system = fixture.system();

    let array = system.resolve("com/example/Foo[][]").unwrap().unwrap();
    assert!(array.is_array());
    assert_eq!(array.dimensions(), 2);
    assert_eq!(array.base_name(), "com/example/Foo");
    assert_eq!(array.descriptor(), "[[Lcom/example/Foo;");
    assert!(array.tags().is_empty());
    assert!(array.methods().is_empty());
    assert!(array.types_in_signature().is_empty());
    assert_eq!(array.interface_names(), ARRAY_INTERFACES.to_vec());

    let from_descriptor = system.resolve("[[Lcom/example/Foo;").unwrap().unwrap();
    assert!(Arc::ptr_eq(&array, &from_descriptor));

    assert!(system.resolve("com/example/Bar[]").unwrap().is_none());
}

#[test]
fn test_primitive_descriptors_resolve_to_nothing() {
    let system = Fixture::new().system();
    assert!(system.resolve_descriptor("I").unwrap().is_none());
    assert!(system.resolve_descriptor("V").unwrap().is_none());
}

#[test]
fn test_malformed_unit_is_remembered() {
    let mut fixture = Fixture::new();
    fixture.add_raw("com/example/Broken", &[0xCA, 0xFE, 0x00, 0x01]);
    let system = fixture.system();

    let first = system.resolve("com/example/Broken").unwrap_err();
    assert!(matches!(first, TypeError::MalformedUnit { ref name, .. } if name == "com/example/Broken"));
    let lookups = system.stats().storage_lookups;

    let second = system.resolve("com/example/Broken").unwrap_err();
    assert!(matches!(second, TypeError::MalformedUnit { .. }));
    assert_eq!(system.stats().storage_lookups, lookups);
    assert!(system.try_resolve("com/example/Broken").is_none());
}

#[test]
fn test_deeply_nested_unit_is_malformed_in_isolation() {
    let mut value = ElementValue::String("leaf".into());
    for _ in 0..300 {
        value = ElementValue::Array(vec![value]);
    }
    let mut fixture = Fixture::new();
    fixture
        .add(ClassFile::new("com/example/Hostile").with_annotation(Annotation::new("Lcom/example/Tag;").with("value", value)))
        .add(ClassFile::new("com/example/Fine"));
    let system = fixture.system();

    let error = system.resolve("com/example/Hostile").unwrap_err();
    assert!(matches!(error, TypeError::MalformedUnit { ref name, .. } if name == "com/example/Hostile"));
    assert!(system.resolve("com/example/Fine").unwrap().is_some());
}

#[test]
fn test_resolve_required_reports_missing() {
    let system = Fixture::new().system();
    let err = system.resolve_required("com.example.Nowhere").unwrap_err();
    assert!(err.is_missing());
    assert!(matches!(err, TypeError::MissingType { ref name } if name == "com/example/Nowhere"));
}

#[test]
fn test_jar_and_system_locations() {
    let mut fixture = Fixture::new();
    fixture.add(ClassFile::new("com/example/App"));
    fixture.add_jar("lib.jar", &[ClassFile::new("org/lib/Helper")]);

    let platform = tempfile::tempdir().unwrap();
    common::write_class(platform.path(), &ClassFile::new("java/lang/Object").extends(None));

    let system = TypeSystem::builder()
        .classpath(fixture.classpath())
        .system_locations([platform.path()])
        .build();

    assert_eq!(system.location_count(), 2);
    assert!(system.resolve("org.lib.Helper").unwrap().is_some());
    let object = system.resolve("java/lang/Object").unwrap().unwrap();
    assert!(object.superclass_name().is_none());
}

#[test]
fn test_missing_types_in_hierarchy() {
    let mut fixture = Fixture::new();
    fixture.add(
        ClassFile::new("com/example/Child")
            .extends(Some("com/example/Parent"))
            .implements("com/example/Gone"),
    );
    fixture.add(ClassFile::new("com/example/Parent").implements("com/example/Present"));
    fixture.add(interface("com/example/Present"));
    let system = fixture.system();

    let missing = system.missing_types_in_hierarchy("com.example.Child");
    let missing: Vec<&str> = missing.iter().map(String::as_str).collect();
    assert_eq!(missing, vec!["com/example/Gone", "java/lang/Object"]);
}

#[test]
fn test_find_types_tagged() {
    let mut fixture = Fixture::new();
    fixture
        .add(tag_type("com/example/Service"))
        .add(tag_type("com/example/Special").with_annotation(tag("com/example/Service")))
        .add(ClassFile::new("com/example/Direct").with_annotation(tag("com/example/Service")))
        .add(ClassFile::new("com/example/Indirect").with_annotation(tag("com/example/Special")))
        .add(ClassFile::new("com/example/Plain"));
    let system = fixture.system();

    let mut direct = system.find_types_tagged("Lcom/example/Service;", false);
    direct.sort();
    assert_eq!(direct, vec!["com/example/Direct", "com/example/Special"]);

    let mut with_meta = system.find_types_tagged("Lcom/example/Service;", true);
    with_meta.sort();
    assert_eq!(
        with_meta,
        vec!["com/example/Direct", "com/example/Indirect", "com/example/Special"]
    );
}

#[test]
fn test_signature_types_fall_back_to_hierarchy() {
    let mut fixture = Fixture::new();
    fixture.add(
        ClassFile::new("com/example/Repo")
            .extends(Some("com/example/Base"))
            .implements("com/example/Store"),
    );
    fixture.add(
        ClassFile::new("com/example/Typed")
            .implements("java/util/List")
            .with_signature("Ljava/lang/Object;Ljava/util/List<Lcom/example/Item;>;"),
    );
    let system = fixture.system();

    let repo = system.resolve("com/example/Repo").unwrap().unwrap();
    let names: Vec<&str> = repo.types_in_signature().iter().map(String::as_str).collect();
    assert_eq!(names, vec!["com/example/Base", "com/example/Store"]);

    let typed = system.resolve("com/example/Typed").unwrap().unwrap();
    assert!(typed.types_in_signature().contains("com/example/Item"));
    assert!(typed.types_in_signature().contains("java/util/List"));
}
