//! Hint collection and application tests

mod common;

use aothint_classfile::{AccessFlags, ClassFile, MethodInfo};
use aothint_engine::{
    apply_hints, collect_hints, AccessBits, AccessDescriptor, CollectingRegistrar, DependentType, HintCatalog,
    HintDeclaration, InitializationDescriptor, InitializationTime, MethodDescriptor, ProxyDescriptor,
    ResourcesDescriptor,
};
use common::{tag, tag_type, tag_with_classes, Fixture};

const ENABLE_PROPERTIES: &str = "org/springframework/boot/context/properties/EnableConfigurationProperties";
const CONFIGURATION: &str = "org/springframework/context/annotation/Configuration";

#[test]
fn test_meta_tag_chain() {
    let mut fixture = Fixture::new();
    fixture
        .add(tag_type("app/Meta"))
        .add(tag_type("app/Marker").with_annotation(tag("app/Meta")))
        .add(ClassFile::new("app/Root").with_annotation(tag("app/Marker")));
    let catalog = HintCatalog::builder().add(HintDeclaration::new("app.Meta")).build();
    let system = fixture.system_with(catalog);

    let root = system.resolve("app/Root").unwrap().unwrap();
    let applications = collect_hints(&root, &system);

    assert_eq!(applications.len(), 1);
    let application = &applications[0];
    assert_eq!(application.declaration.trigger, "app/Meta");
    assert_eq!(application.chain_names(), vec!["app/Root", "app/Marker"]);
    assert_eq!(application.short_chain().len(), 1);
    assert_eq!(application.to_string(), "app.Meta via [app.Root, app.Marker]");
}

#[test]
fn test_tag_cycles_terminate() {
    let mut fixture = Fixture::new();
    fixture
        .add(tag_type("app/Ping").with_annotation(tag("app/Pong")))
        .add(tag_type("app/Pong").with_annotation(tag("app/Ping")))
        .add(ClassFile::new("app/Root").with_annotation(tag("app/Ping")));
    let catalog = HintCatalog::builder().add(HintDeclaration::new("app/Ping")).build();
    let system = fixture.system_with(catalog);

    let root = system.resolve("app/Root").unwrap().unwrap();
    let applications = collect_hints(&root, &system);

    let chains: Vec<Vec<&str>> = applications.iter().map(|a| a.chain_names()).collect();
    assert_eq!(
        chains,
        vec![vec!["app/Root"], vec!["app/Root", "app/Ping", "app/Pong"]]
    );
}

#[test]
fn test_shared_meta_tag_reports_every_chain() {
    let mut fixture = Fixture::new();
    fixture
        .add(tag_type("app/Meta"))
        .add(tag_type("app/C").with_annotation(tag("app/Meta")))
        .add(tag_type("app/A").with_annotation(tag("app/C")))
        .add(tag_type("app/B").with_annotation(tag("app/C")))
        .add(
            ClassFile::new("app/Root")
                .with_annotation(tag("app/A"))
                .with_annotation(tag("app/B")),
        );
    let catalog = HintCatalog::builder().add(HintDeclaration::new("app/Meta")).build();
    let system = fixture.system_with(catalog);

    let root = system.resolve("app/Root").unwrap().unwrap();
    let applications = collect_hints(&root, &system);

    let chains: Vec<Vec<&str>> = applications.iter().map(|a| a.chain_names()).collect();
    assert_eq!(
        chains,
        vec![vec!["app/Root", "app/A", "app/C"], vec!["app/Root", "app/B", "app/C"]]
    );
}

#[test]
fn test_direct_hint_and_unresolvable_tags() {
    let mut fixture = Fixture::new();
    fixture.add(ClassFile::new("app/Root").with_annotation(tag("app/NotOnClasspath")));
    let catalog = HintCatalog::builder()
        .add(HintDeclaration::new("app.Root").with_option("aot"))
        .add(HintDeclaration::new("app/NotOnClasspath"))
        .build();
    let system = fixture.system_with(catalog);

    let root = system.resolve("app/Root").unwrap().unwrap();
    let applications = collect_hints(&root, &system);

    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].chain_names(), vec!["app/Root"]);
    assert!(applications[0].declaration.options.contains("aot"));
    assert!(applications[0].short_chain().is_empty());
}

#[test]
fn test_tag_references_are_inferred() {
    let mut fixture = Fixture::new();
    fixture
        .add(tag_type("app/EnableFeature"))
        .add(ClassFile::new("app/FeatureConfig").with_annotation(tag(CONFIGURATION)))
        .add(
            ClassFile::new("app/Root")
                .with_annotation(tag_with_classes("app/EnableFeature", &["app/FeatureConfig", "app/Absent"])),
        );
    let catalog = HintCatalog::builder().add(HintDeclaration::new("app/EnableFeature")).build();
    let system = fixture.system_with(catalog);

    let root = system.resolve("app/Root").unwrap().unwrap();
    let applications = collect_hints(&root, &system);

    assert_eq!(applications.len(), 1);
    let application = &applications[0];
    assert_eq!(
        application.inferred_types.get("app/FeatureConfig").map(AccessDescriptor::bits),
        Some(AccessBits::ALL)
    );
    assert_eq!(application.unresolved, vec!["app/Absent"]);
}

#[test]
fn test_visibility_only_references() {
    let mut fixture = Fixture::new();
    fixture
        .add(tag_type("app/OnClass"))
        .add(ClassFile::new("app/Candidate").with_annotation(tag(CONFIGURATION)))
        .add(ClassFile::new("app/Root").with_annotation(tag_with_classes("app/OnClass", &["app/Candidate"])));
    let catalog = HintCatalog::builder()
        .add(HintDeclaration::new("app/OnClass").skip_if_types_missing(true))
        .build();
    let system = fixture.system_with(catalog);

    let root = system.resolve("app/Root").unwrap().unwrap();
    let applications = collect_hints(&root, &system);
    assert_eq!(
        applications[0].inferred_types.get("app/Candidate").map(AccessDescriptor::bits),
        Some(AccessBits::CLASS)
    );
}

#[test]
fn test_properties_walk() {
    let mut fixture = Fixture::new();
    fixture
        .add(tag_type(ENABLE_PROPERTIES))
        .add(ClassFile::new("app/Root").with_annotation(tag_with_classes(ENABLE_PROPERTIES, &["app/AppProps"])))
        .add(
            ClassFile::new("app/AppProps")
                .with_method(
                    MethodInfo::new("getServers", "()Ljava/util/List;")
                        .with_signature("()Ljava/util/List<Lapp/Server;>;"),
                )
                .with_method(MethodInfo::new("getName", "()Ljava/lang/String;"))
                .with_method(MethodInfo::new("getMode", "()Lapp/Mode;"))
                .with_method(MethodInfo::new("getTimeout", "()Ljava/time/Duration;"))
                .with_method(MethodInfo::new("getNested", "()Lapp/Nested;"))
                .with_method(MethodInfo::new("getMissing", "()Lapp/Missing;"))
                .with_method(MethodInfo::new("setName", "(Ljava/lang/String;)V"))
                .with_method(MethodInfo::new("getIgnored", "(I)Lapp/Ignored;")),
        )
        .add(ClassFile::new("app/Server"))
        .add(
            ClassFile::new("app/Mode")
                .with_access(AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::ENUM)
                .extends(Some("java/lang/Enum"))
                .with_method(MethodInfo::new("getHidden", "()Lapp/Hidden;")),
        )
        .add(ClassFile::new("app/Hidden"))
        .add(ClassFile::new("app/Ignored"))
        .add(ClassFile::new("app/Nested").with_method(MethodInfo::new("getParent", "()Lapp/AppProps;")));
    let catalog = HintCatalog::builder().add(HintDeclaration::new(ENABLE_PROPERTIES)).build();
    let system = fixture.system_with(catalog);

    let root = system.resolve("app/Root").unwrap().unwrap();
    let applications = collect_hints(&root, &system);
    assert_eq!(applications.len(), 1);
    let application = &applications[0];

    let bits: Vec<(&str, AccessBits)> = application
        .inferred_types
        .iter()
        .map(|(name, access)| (name.as_str(), access.bits()))
        .collect();
    let bean = AccessBits::LOAD_AND_CONSTRUCT | AccessBits::PUBLIC_METHODS;
    assert_eq!(
        bits,
        vec![
            ("app/AppProps", bean),
            ("app/Mode", AccessBits::CLASS),
            ("app/Nested", bean),
            ("app/Server", bean),
            ("java/time/Duration", AccessBits::CLASS),
            ("java/util/List", AccessBits::CLASS),
        ]
    );
    assert_eq!(application.unresolved, vec!["app/Missing"]);

    let mut registrar = CollectingRegistrar::new();
    assert_eq!(apply_hints(&system, &applications, &mut registrar), 1);
    assert_eq!(registrar.access("java.util.List").map(AccessDescriptor::bits), Some(AccessBits::CLASS));
    assert_eq!(registrar.access("app.AppProps").map(AccessDescriptor::bits), Some(bean));
    assert!(registrar.access("app.Hidden").is_none());
}

#[test]
fn test_apply_hints_registers_everything() {
    let mut fixture = Fixture::new();
    fixture
        .add(ClassFile::new("app/Root"))
        .add(ClassFile::new("app/Present"))
        .add(ClassFile::new("app/Config").with_annotation(tag(CONFIGURATION)));
    let catalog = HintCatalog::builder()
        .add(
            HintDeclaration::new("app/Root")
                .with_dependent_type(DependentType::new("app.Present", AccessDescriptor::from_bits(AccessBits::ALL)))
                .with_dependent_type(DependentType::inferred_with_members(
                    "app/Config",
                    vec![MethodDescriptor::new("init", &[])],
                    Vec::new(),
                ))
                .with_dependent_type(DependentType::inferred("app/NotThere"))
                .with_proxy(ProxyDescriptor::new(["app.Api", "java/io/Serializable"]))
                .with_resources(ResourcesDescriptor {
                    patterns: vec!["META-INF/app.properties".to_string()],
                    bundle: false,
                })
                .with_initialization(InitializationDescriptor {
                    time: InitializationTime::Build,
                    types: vec!["app/Constants".to_string()],
                    packages: vec!["app.boot".to_string()],
                }),
        )
        .add(
            HintDeclaration::new("app/Root")
                .skip_if_types_missing(true)
                .with_dependent_type(DependentType::inferred("app/Gone"))
                .with_proxy(ProxyDescriptor::new(["app/Skipped"])),
        )
        .build();
    let system = fixture.system_with(catalog);

    let root = system.resolve("app/Root").unwrap().unwrap();
    let applications = collect_hints(&root, &system);
    assert_eq!(applications.len(), 2);

    let mut registrar = CollectingRegistrar::new();
    assert_eq!(apply_hints(&system, &applications, &mut registrar), 1);

    assert_eq!(registrar.access("app.Present").map(AccessDescriptor::bits), Some(AccessBits::ALL));
    let config = registrar.access("app.Config").unwrap();
    assert!(!config.bits().intersects(AccessBits::METHODS));
    assert!(config.bits().contains(AccessBits::DECLARED_FIELDS));
    assert_eq!(config.methods(), &[MethodDescriptor::new("init", &[])]);

    assert_eq!(registrar.proxies(), &[vec!["app.Api".to_string(), "java.io.Serializable".to_string()]]);
    let patterns: Vec<&str> = registrar.resource_patterns().iter().map(|(p, _)| p.as_str()).collect();
    assert!(patterns.contains(&"META-INF/app.properties"));
    assert!(patterns.contains(&"app/Present.class"));
    assert!(patterns.contains(&"app/Config.class"));
    assert_eq!(
        registrar.initializations(),
        &[
            ("app.Constants".to_string(), InitializationTime::Build),
            ("app.boot".to_string(), InitializationTime::Build),
        ]
    );
    assert!(registrar.messages().iter().any(|m| m.starts_with("Skipping hint app.Root")));
    assert!(registrar.messages().iter().any(|m| m.contains("app.NotThere not found")));
}
