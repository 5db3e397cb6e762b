//! Class file data model and parsing entry point

use crate::access_flags::AccessFlags;
use crate::annotation::{parse_annotations, parse_parameter_annotations, Annotation};
use crate::constant_pool::ConstantPool;
use crate::descriptor::{FieldType, MethodType};
use crate::error::{ClassFileError, DescriptorError};
use crate::reader::ClassReader;

/// Magic number at the start of every class file
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Class file major version written by default (Java 8)
pub const DEFAULT_MAJOR_VERSION: u16 = 52;

/// Attribute names understood by the reader
pub(crate) mod attribute {
    pub const SIGNATURE: &str = "Signature";
    pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
    pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
    pub const INNER_CLASSES: &str = "InnerClasses";
}

/// A parsed class file
///
/// Only the structure needed for static analysis is retained: names,
/// hierarchy, member declarations, generic signatures, runtime-visible
/// annotations and the inner class table. Code and other attributes are
/// skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Minor format version
    pub minor_version: u16,
    /// Major format version
    pub major_version: u16,
    /// Class access flags
    pub access_flags: AccessFlags,
    /// Internal name of this class
    pub this_class: String,
    /// Internal name of the superclass, absent only for `java/lang/Object`
    pub super_class: Option<String>,
    /// Directly implemented interfaces, in declaration order
    pub interfaces: Vec<String>,
    /// Declared fields
    pub fields: Vec<FieldInfo>,
    /// Declared methods, constructors included
    pub methods: Vec<MethodInfo>,
    /// Generic class signature
    pub signature: Option<String>,
    /// Runtime-visible class annotations
    pub annotations: Vec<Annotation>,
    /// Entries of the `InnerClasses` attribute
    pub inner_classes: Vec<InnerClass>,
}

/// A declared field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Field access flags
    pub access_flags: AccessFlags,
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Generic field signature
    pub signature: Option<String>,
    /// Runtime-visible field annotations
    pub annotations: Vec<Annotation>,
}

/// A declared method or constructor
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Method access flags
    pub access_flags: AccessFlags,
    /// Method name (`<init>` for constructors)
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Generic method signature
    pub signature: Option<String>,
    /// Runtime-visible method annotations
    pub annotations: Vec<Annotation>,
    /// Runtime-visible annotations per parameter
    pub parameter_annotations: Vec<Vec<Annotation>>,
}

/// One row of the `InnerClasses` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    /// Internal name of the nested class
    pub inner_class: String,
    /// Internal name of the enclosing class, absent for local and anonymous classes
    pub outer_class: Option<String>,
    /// Simple name, absent for anonymous classes
    pub inner_name: Option<String>,
    /// Access flags as declared in source
    pub access_flags: AccessFlags,
}

impl ClassFile {
    /// Parse class file bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = ClassReader::new(bytes);

        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;
        let pool = ConstantPool::parse(&mut reader)?;

        let access_flags = AccessFlags::from_bits(reader.read_u16()?);
        let this_class = pool.class_name(reader.read_u16()?)?.to_string();
        let super_class = pool.optional_class_name(reader.read_u16()?)?.map(str::to_string);

        let interface_count = reader.read_u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(reader.read_u16()?)?.to_string());
        }

        let field_count = reader.read_u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(FieldInfo::parse(&mut reader, &pool)?);
        }

        let method_count = reader.read_u16()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(MethodInfo::parse(&mut reader, &pool)?);
        }

        let mut class = Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            signature: None,
            annotations: Vec::new(),
            inner_classes: Vec::new(),
        };

        let attribute_count = reader.read_u16()?;
        for _ in 0..attribute_count {
            let (name, mut body) = read_attribute(&mut reader, &pool)?;
            match name {
                attribute::SIGNATURE => class.signature = Some(read_signature(&mut body, &pool)?),
                attribute::RUNTIME_VISIBLE_ANNOTATIONS => {
                    class.annotations = parse_annotations(&mut body, &pool)?
                }
                attribute::INNER_CLASSES => class.inner_classes = parse_inner_classes(&mut body, &pool)?,
                _ => {}
            }
        }

        Ok(class)
    }

    /// Start a class with default version, `public super` flags and
    /// `java/lang/Object` as superclass
    pub fn new(this_class: impl Into<String>) -> Self {
        Self {
            minor_version: 0,
            major_version: DEFAULT_MAJOR_VERSION,
            access_flags: AccessFlags::PUBLIC | AccessFlags::SUPER,
            this_class: this_class.into(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            signature: None,
            annotations: Vec::new(),
            inner_classes: Vec::new(),
        }
    }

    /// Replace the access flags
    pub fn with_access(mut self, access_flags: AccessFlags) -> Self {
        self.access_flags = access_flags;
        self
    }

    /// Replace the superclass; `None` only makes sense for the root object type
    pub fn extends(mut self, super_class: Option<&str>) -> Self {
        self.super_class = super_class.map(str::to_string);
        self
    }

    /// Add a directly implemented interface
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Set the generic class signature
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Add a class annotation
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Add a field
    pub fn with_field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method
    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    /// Add an `InnerClasses` row
    pub fn with_inner_class(mut self, inner: InnerClass) -> Self {
        self.inner_classes.push(inner);
        self
    }
}

impl FieldInfo {
    /// A public field with no signature or annotations
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access_flags: AccessFlags::PUBLIC,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            annotations: Vec::new(),
        }
    }

    /// Replace the access flags
    pub fn with_access(mut self, access_flags: AccessFlags) -> Self {
        self.access_flags = access_flags;
        self
    }

    /// Set the generic signature
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Parsed descriptor
    pub fn field_type(&self) -> Result<FieldType, DescriptorError> {
        FieldType::parse(&self.descriptor)
    }

    fn parse(reader: &mut ClassReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let access_flags = AccessFlags::from_bits(reader.read_u16()?);
        let name = pool.utf8(reader.read_u16()?)?.to_string();
        let descriptor = pool.utf8(reader.read_u16()?)?.to_string();
        FieldType::parse(&descriptor)?;

        let mut field = Self {
            access_flags,
            name,
            descriptor,
            signature: None,
            annotations: Vec::new(),
        };
        let attribute_count = reader.read_u16()?;
        for _ in 0..attribute_count {
            let (name, mut body) = read_attribute(reader, pool)?;
            match name {
                attribute::SIGNATURE => field.signature = Some(read_signature(&mut body, pool)?),
                attribute::RUNTIME_VISIBLE_ANNOTATIONS => field.annotations = parse_annotations(&mut body, pool)?,
                _ => {}
            }
        }
        Ok(field)
    }
}

impl MethodInfo {
    /// A public method with no signature or annotations
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access_flags: AccessFlags::PUBLIC,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
        }
    }

    /// Replace the access flags
    pub fn with_access(mut self, access_flags: AccessFlags) -> Self {
        self.access_flags = access_flags;
        self
    }

    /// Set the generic signature
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Add a method annotation
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Add an annotation to the parameter at `index`
    pub fn with_parameter_annotation(mut self, index: usize, annotation: Annotation) -> Self {
        if self.parameter_annotations.len() <= index {
            self.parameter_annotations.resize_with(index + 1, Vec::new);
        }
        self.parameter_annotations[index].push(annotation);
        self
    }

    /// Parsed descriptor
    pub fn method_type(&self) -> Result<MethodType, DescriptorError> {
        MethodType::parse(&self.descriptor)
    }

    /// True for instance initializers
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    fn parse(reader: &mut ClassReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let access_flags = AccessFlags::from_bits(reader.read_u16()?);
        let name = pool.utf8(reader.read_u16()?)?.to_string();
        let descriptor = pool.utf8(reader.read_u16()?)?.to_string();
        MethodType::parse(&descriptor)?;

        let mut method = Self {
            access_flags,
            name,
            descriptor,
            signature: None,
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
        };
        let attribute_count = reader.read_u16()?;
        for _ in 0..attribute_count {
            let (name, mut body) = read_attribute(reader, pool)?;
            match name {
                attribute::SIGNATURE => method.signature = Some(read_signature(&mut body, pool)?),
                attribute::RUNTIME_VISIBLE_ANNOTATIONS => method.annotations = parse_annotations(&mut body, pool)?,
                attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS => {
                    method.parameter_annotations = parse_parameter_annotations(&mut body, pool)?
                }
                _ => {}
            }
        }
        Ok(method)
    }
}

fn read_attribute<'a, 'p>(
    reader: &mut ClassReader<'a>,
    pool: &'p ConstantPool,
) -> Result<(&'p str, ClassReader<'a>), ClassFileError> {
    let name = pool.utf8(reader.read_u16()?)?;
    let len = reader.read_u32()? as usize;
    let body = reader.read_bytes(len)?;
    Ok((name, ClassReader::new(body)))
}

fn read_signature(body: &mut ClassReader<'_>, pool: &ConstantPool) -> Result<String, ClassFileError> {
    Ok(pool.utf8(body.read_u16()?)?.to_string())
}

fn parse_inner_classes(body: &mut ClassReader<'_>, pool: &ConstantPool) -> Result<Vec<InnerClass>, ClassFileError> {
    let count = body.read_u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let inner_class = pool.class_name(body.read_u16()?)?.to_string();
        let outer_class = pool.optional_class_name(body.read_u16()?)?.map(str::to_string);
        let inner_name_index = body.read_u16()?;
        let inner_name = if inner_name_index == 0 {
            None
        } else {
            Some(pool.utf8(inner_name_index)?.to_string())
        };
        let access_flags = AccessFlags::from_bits(body.read_u16()?);
        entries.push(InnerClass {
            inner_class,
            outer_class,
            inner_name,
            access_flags,
        });
    }
    Ok(entries)
}
