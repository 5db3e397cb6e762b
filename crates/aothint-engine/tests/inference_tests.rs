//! Access inference tests
//!
//! Role markers are the default Spring names; marker tags do not need to be
//! present on the classpath for direct matches.

mod common;

use aothint_classfile::{ClassFile, FieldInfo, MethodInfo};
use aothint_engine::{infer_access, AccessBits, InferenceConfig, Roles, TypeSystem, UnclassifiedPolicy};
use common::{interface, tag, tag_type, Fixture};

const CONFIGURATION: &str = "org/springframework/context/annotation/Configuration";
const BEAN: &str = "org/springframework/context/annotation/Bean";
const PROPERTIES: &str = "org/springframework/boot/context/properties/ConfigurationProperties";
const CONSTRUCTOR_BINDING: &str = "org/springframework/boot/context/properties/ConstructorBinding";
const VALIDATED: &str = "org/springframework/validation/annotation/Validated";
const COMPONENT: &str = "org/springframework/stereotype/Component";

fn access_of(system: &TypeSystem, name: &str) -> AccessBits {
    let ty = system.resolve(name).unwrap().unwrap();
    infer_access(&ty, system)
}

#[test]
fn test_configuration_roots_get_everything() {
    let mut fixture = Fixture::new();
    fixture
        .add(ClassFile::new("app/Config").with_annotation(tag(CONFIGURATION)))
        .add(ClassFile::new("app/Factory").with_method(
            MethodInfo::new("dataSource", "()Lapp/DataSource;").with_annotation(tag(BEAN)),
        ));
    let system = fixture.system();

    assert_eq!(access_of(&system, "app/Config"), AccessBits::ALL);
    assert_eq!(access_of(&system, "app/Factory"), AccessBits::ALL);
    let config = system.resolve("app/Config").unwrap().unwrap();
    assert!(config.roles(&system).contains(Roles::CONFIGURATION));
}

#[test]
fn test_import_and_lifecycle_roles() {
    let mut fixture = Fixture::new();
    fixture
        .add(ClassFile::new("app/Selector").implements("org/springframework/context/annotation/ImportSelector"))
        .add(
            ClassFile::new("app/BasePostProcessor")
                .implements("org/springframework/beans/factory/config/BeanPostProcessor"),
        )
        .add(ClassFile::new("app/PostProcessor").extends(Some("app/BasePostProcessor")));
    let system = fixture.system();

    assert_eq!(
        access_of(&system, "app/Selector"),
        AccessBits::LOAD_AND_CONSTRUCT | AccessBits::RESOURCE
    );
    assert_eq!(
        access_of(&system, "app/PostProcessor"),
        AccessBits::LOAD_AND_CONSTRUCT | AccessBits::DECLARED_METHODS | AccessBits::RESOURCE
    );
}

#[test]
fn test_properties_variants() {
    let mut fixture = Fixture::new();
    fixture
        .add(ClassFile::new("app/Plain").with_annotation(tag(PROPERTIES)))
        .add(
            ClassFile::new("app/Checked")
                .with_annotation(tag(PROPERTIES))
                .with_annotation(tag(VALIDATED)),
        )
        .add(
            ClassFile::new("app/Bound")
                .with_annotation(tag(PROPERTIES))
                .with_method(MethodInfo::new("<init>", "(Ljava/lang/String;)V").with_annotation(tag(CONSTRUCTOR_BINDING))),
        );
    let system = fixture.system();

    assert_eq!(
        access_of(&system, "app/Plain"),
        AccessBits::LOAD_AND_CONSTRUCT | AccessBits::DECLARED_METHODS
    );
    assert_eq!(
        access_of(&system, "app/Checked"),
        AccessBits::LOAD_AND_CONSTRUCT | AccessBits::DECLARED_METHODS | AccessBits::DECLARED_FIELDS
    );
    assert_eq!(access_of(&system, "app/Bound"), AccessBits::LOAD_AND_CONSTRUCT);
}

#[test]
fn test_condition_component_and_environment_roles() {
    let mut fixture = Fixture::new();
    fixture
        .add(tag_type("app/Service").with_annotation(tag(COMPONENT)))
        .add(ClassFile::new("app/OnCloud").implements("org/springframework/context/annotation/Condition"))
        .add(ClassFile::new("app/Billing").with_annotation(tag("app/Service")))
        .add(ClassFile::new("app/EnvTweaks").implements("org/springframework/boot/env/EnvironmentPostProcessor"));
    let system = fixture.system();

    assert_eq!(
        access_of(&system, "app/OnCloud"),
        AccessBits::LOAD_AND_CONSTRUCT | AccessBits::RESOURCE
    );
    assert_eq!(access_of(&system, "app/Billing"), AccessBits::ALL);
    assert_eq!(access_of(&system, "app/EnvTweaks"), AccessBits::LOAD_AND_CONSTRUCT);
}

#[test]
fn test_unclassified_policy() {
    let mut fixture = Fixture::new();
    fixture.add(ClassFile::new("app/Dto").with_field(FieldInfo::new("id", "J")));

    let system = fixture.system();
    assert_eq!(access_of(&system, "app/Dto"), AccessBits::FULL_REFLECTION);

    let narrow = TypeSystem::builder()
        .classpath(fixture.classpath())
        .inference(InferenceConfig {
            unclassified: UnclassifiedPolicy::LoadAndConstruct,
            ..InferenceConfig::default()
        })
        .build();
    assert_eq!(access_of(&narrow, "app/Dto"), AccessBits::LOAD_AND_CONSTRUCT);
}

#[test]
fn test_arrays_need_class_only() {
    let mut fixture = Fixture::new();
    fixture.add(ClassFile::new("app/Config").with_annotation(tag(CONFIGURATION)));
    let system = fixture.system();

    assert_eq!(access_of(&system, "app/Config[]"), AccessBits::CLASS);
    assert_eq!(access_of(&system, "[[Lapp/Config;"), AccessBits::CLASS);
}

#[test]
fn test_hierarchy_cycles_terminate() {
    let mut fixture = Fixture::new();
    fixture
        .add(interface("app/First").implements("app/Second"))
        .add(interface("app/Second").implements("app/First"))
        .add(ClassFile::new("app/Impl").implements("app/First"))
        .add(ClassFile::new("app/Left").extends(Some("app/Right")))
        .add(ClassFile::new("app/Right").extends(Some("app/Left")));
    let system = fixture.system();

    let implementor = system.resolve("app/Impl").unwrap().unwrap();
    assert!(implementor.implements_interface("app/Second", &system));
    assert!(!implementor.implements_interface("app/Other", &system));

    let left = system.resolve("app/Left").unwrap().unwrap();
    assert!(left.extends_class("app/Right", &system));
    assert!(!left.extends_class("app/Other", &system));
    assert!(!left.implements_interface("app/Other", &system));
}

#[test]
fn test_strict_hierarchy_walk_reports_missing_types() {
    let mut fixture = Fixture::new();
    fixture.add(ClassFile::new("app/Orphan").implements("app/Gone"));
    let system = fixture.system();

    let orphan = system.resolve("app/Orphan").unwrap().unwrap();
    assert!(!orphan.implements_interface("app/Wanted", &system));
    let err = orphan.implements_interface_strict("app/Wanted", &system).unwrap_err();
    assert!(err.is_missing());
    assert!(orphan.implements_interface_strict("app/Gone", &system).unwrap());
}
