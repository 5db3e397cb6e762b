//! Shared fixtures: real class files on disk, written with the classfile
//! crate's writer

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use aothint_classfile::{AccessFlags, Annotation, ClassFile, ElementValue};
use aothint_engine::names::descriptor_of;
use aothint_engine::{HintCatalog, TypeSystem};
use tempfile::TempDir;

/// A temporary classpath: one class directory plus any number of jars
pub struct Fixture {
    dir: TempDir,
    jars: Vec<PathBuf>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("classes")).unwrap();
        Self { dir, jars: Vec::new() }
    }

    pub fn classes_dir(&self) -> PathBuf {
        self.dir.path().join("classes")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a class under the class directory
    pub fn add(&mut self, class: ClassFile) -> &mut Self {
        write_class(&self.classes_dir(), &class);
        self
    }

    /// Write raw bytes as `<name>.class`
    pub fn add_raw(&mut self, name: &str, bytes: &[u8]) -> &mut Self {
        let path = self.classes_dir().join(format!("{name}.class"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
        self
    }

    /// Write classes into a new jar placed after the class directory
    pub fn add_jar(&mut self, file_name: &str, classes: &[ClassFile]) -> PathBuf {
        let path = self.dir.path().join(file_name);
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        for class in classes {
            zip.start_file(format!("{}.class", class.this_class), options).unwrap();
            zip.write_all(&class.to_bytes().unwrap()).unwrap();
        }
        zip.finish().unwrap();
        self.jars.push(path.clone());
        path
    }

    pub fn classpath(&self) -> Vec<PathBuf> {
        let mut classpath = vec![self.classes_dir()];
        classpath.extend(self.jars.iter().cloned());
        classpath
    }

    pub fn system(&self) -> TypeSystem {
        TypeSystem::new(self.classpath())
    }

    pub fn system_with(&self, catalog: HintCatalog) -> TypeSystem {
        TypeSystem::builder().classpath(self.classpath()).catalog(catalog).build()
    }
}

pub fn write_class(root: &Path, class: &ClassFile) {
    let path = root.join(format!("{}.class", class.this_class));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, class.to_bytes().unwrap()).unwrap();
}

/// Tag occurrence for an internal type name
pub fn tag(name: &str) -> Annotation {
    Annotation::new(descriptor_of(name))
}

/// Tag occurrence with class literal values under `value`
pub fn tag_with_classes(name: &str, classes: &[&str]) -> Annotation {
    let values = classes
        .iter()
        .map(|c| ElementValue::Class(descriptor_of(c)))
        .collect();
    tag(name).with("value", ElementValue::Array(values))
}

/// An annotation type declaration
pub fn tag_type(name: &str) -> ClassFile {
    ClassFile::new(name)
        .with_access(AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT | AccessFlags::ANNOTATION)
        .implements("java/lang/annotation/Annotation")
}

pub fn interface(name: &str) -> ClassFile {
    ClassFile::new(name).with_access(AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT)
}
