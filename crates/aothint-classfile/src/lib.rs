//! Class file reading and writing
//!
//! This crate decodes compiled JVM class files into a structured, read-only
//! model suited to static analysis: hierarchy, member declarations,
//! descriptors, generic signatures and runtime-visible annotations. Nothing in
//! the input is executed and no referenced class needs to be available.
//!
//! The [`writer`] module encodes the same model back to bytes, which is how
//! tools and tests synthesize classes without a compiler.

#![warn(rust_2018_idioms)]

pub mod access_flags;
pub mod annotation;
pub mod class_file;
pub mod constant_pool;
pub mod descriptor;
pub mod error;
pub mod mutf8;
pub mod reader;
pub mod signature;
pub mod writer;

pub use access_flags::AccessFlags;
pub use annotation::{Annotation, ElementValue};
pub use class_file::{ClassFile, FieldInfo, InnerClass, MethodInfo, DEFAULT_MAJOR_VERSION, MAGIC};
pub use constant_pool::{Constant, ConstantPool};
pub use descriptor::{BaseType, FieldType, MethodType};
pub use error::{ClassFileError, DescriptorError, SignatureError};
pub use reader::ClassReader;
pub use signature::{ClassSignature, ClassTypeSignature, MethodSignature, TypeArgument, TypeSignature};
pub use writer::ClassWriter;
