//! Class file encoding
//!
//! Produces the subset of the format the reader understands: header,
//! constant pool, hierarchy, members, and the `Signature`,
//! `RuntimeVisibleAnnotations`, `RuntimeVisibleParameterAnnotations` and
//! `InnerClasses` attributes. Methods are written without `Code`.

use rustc_hash::FxHashMap;

use crate::annotation::{Annotation, ElementValue};
use crate::class_file::{attribute, ClassFile, FieldInfo, InnerClass, MethodInfo, MAGIC};
use crate::constant_pool::tag;
use crate::error::ClassFileError;
use crate::mutf8;

/// Big-endian byte buffer
pub struct ClassWriter {
    buffer: Vec<u8>,
}

impl ClassWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Consume the writer and return the bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Emit a raw byte
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 16-bit unsigned integer
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a 32-bit unsigned integer
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a 64-bit unsigned integer
    pub fn emit_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit raw bytes
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}

impl Default for ClassWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
}

/// Interning constant pool under construction
struct PoolBuilder {
    out: ClassWriter,
    next: u16,
    interned: FxHashMap<PoolKey, u16>,
}

impl PoolBuilder {
    fn new() -> Self {
        Self {
            out: ClassWriter::new(),
            next: 1,
            interned: FxHashMap::default(),
        }
    }

    fn intern(&mut self, key: PoolKey) -> Result<u16, ClassFileError> {
        if let Some(index) = self.interned.get(&key) {
            return Ok(*index);
        }
        let index = self.next;
        let slots = match &key {
            PoolKey::Long(_) | PoolKey::Double(_) => 2,
            _ => 1,
        };
        // `next` is written as the pool count, so it must itself fit a u16
        self.next = index.checked_add(slots).ok_or(ClassFileError::TooLarge {
                what: "constant pool entries",
                count: usize::from(index) + usize::from(slots),
            })?;
        match &key {
            PoolKey::Utf8(text) => {
                let bytes = mutf8::encode(text);
                self.out.emit_u8(tag::UTF8);
                self.out.emit_u16(length("Utf8 constant bytes", bytes.len())?);
                self.out.emit_bytes(&bytes);
            }
            PoolKey::Integer(value) => {
                self.out.emit_u8(tag::INTEGER);
                self.out.emit_u32(*value as u32);
            }
            PoolKey::Float(bits) => {
                self.out.emit_u8(tag::FLOAT);
                self.out.emit_u32(*bits);
            }
            PoolKey::Long(value) => {
                self.out.emit_u8(tag::LONG);
                self.out.emit_u64(*value as u64);
            }
            PoolKey::Double(bits) => {
                self.out.emit_u8(tag::DOUBLE);
                self.out.emit_u64(*bits);
            }
            PoolKey::Class(name_index) => {
                self.out.emit_u8(tag::CLASS);
                self.out.emit_u16(*name_index);
            }
        }
        self.interned.insert(key, index);
        Ok(index)
    }

    fn utf8(&mut self, text: &str) -> Result<u16, ClassFileError> {
        self.intern(PoolKey::Utf8(text.to_string()))
    }

    fn class(&mut self, name: &str) -> Result<u16, ClassFileError> {
        let name_index = self.utf8(name)?;
        self.intern(PoolKey::Class(name_index))
    }

    fn integer(&mut self, value: i32) -> Result<u16, ClassFileError> {
        self.intern(PoolKey::Integer(value))
    }
}

/// A length or count that must fit the format's u16 field
fn length(what: &'static str, count: usize) -> Result<u16, ClassFileError> {
    u16::try_from(count).map_err(|_| ClassFileError::TooLarge { what, count })
}

impl ClassFile {
    /// Encode this class file
    ///
    /// Fails with [`ClassFileError::TooLarge`] when a count, a string or the
    /// constant pool exceeds what the format's fixed-width fields can hold.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClassFileError> {
        let mut pool = PoolBuilder::new();
        let mut body = ClassWriter::new();

        body.emit_u16(self.access_flags.bits());
        body.emit_u16(pool.class(&self.this_class)?);
        let super_index = match self.super_class.as_deref() {
            Some(name) => pool.class(name)?,
            None => 0,
        };
        body.emit_u16(super_index);

        body.emit_u16(length("interfaces", self.interfaces.len())?);
        for interface in &self.interfaces {
            body.emit_u16(pool.class(interface)?);
        }

        body.emit_u16(length("fields", self.fields.len())?);
        for field in &self.fields {
            write_field(&mut body, &mut pool, field)?;
        }

        body.emit_u16(length("methods", self.methods.len())?);
        for method in &self.methods {
            write_method(&mut body, &mut pool, method)?;
        }

        let mut attributes = Vec::new();
        if let Some(signature) = &self.signature {
            attributes.push(signature_attribute(&mut pool, signature)?);
        }
        if !self.annotations.is_empty() {
            attributes.push(annotations_attribute(&mut pool, &self.annotations)?);
        }
        if !self.inner_classes.is_empty() {
            attributes.push(inner_classes_attribute(&mut pool, &self.inner_classes)?);
        }
        write_attributes(&mut body, &attributes)?;

        let mut out = ClassWriter::new();
        out.emit_u32(MAGIC);
        out.emit_u16(self.minor_version);
        out.emit_u16(self.major_version);
        out.emit_u16(pool.next);
        out.emit_bytes(&pool.out.into_bytes());
        out.emit_bytes(&body.into_bytes());
        Ok(out.into_bytes())
    }
}

/// An encoded attribute: name index and body
type Attribute = (u16, Vec<u8>);

fn write_attributes(out: &mut ClassWriter, attributes: &[Attribute]) -> Result<(), ClassFileError> {
    out.emit_u16(length("attributes", attributes.len())?);
    for (name_index, body) in attributes {
        let body_len = u32::try_from(body.len()).map_err(|_| ClassFileError::TooLarge {
            what: "attribute bytes",
            count: body.len(),
        })?;
        out.emit_u16(*name_index);
        out.emit_u32(body_len);
        out.emit_bytes(body);
    }
    Ok(())
}

fn write_field(out: &mut ClassWriter, pool: &mut PoolBuilder, field: &FieldInfo) -> Result<(), ClassFileError> {
    out.emit_u16(field.access_flags.bits());
    out.emit_u16(pool.utf8(&field.name)?);
    out.emit_u16(pool.utf8(&field.descriptor)?);

    let mut attributes = Vec::new();
    if let Some(signature) = &field.signature {
        attributes.push(signature_attribute(pool, signature)?);
    }
    if !field.annotations.is_empty() {
        attributes.push(annotations_attribute(pool, &field.annotations)?);
    }
    write_attributes(out, &attributes)
}

fn write_method(out: &mut ClassWriter, pool: &mut PoolBuilder, method: &MethodInfo) -> Result<(), ClassFileError> {
    out.emit_u16(method.access_flags.bits());
    out.emit_u16(pool.utf8(&method.name)?);
    out.emit_u16(pool.utf8(&method.descriptor)?);

    let mut attributes = Vec::new();
    if let Some(signature) = &method.signature {
        attributes.push(signature_attribute(pool, signature)?);
    }
    if !method.annotations.is_empty() {
        attributes.push(annotations_attribute(pool, &method.annotations)?);
    }
    if !method.parameter_annotations.is_empty() {
        let count = method.parameter_annotations.len();
        let count = u8::try_from(count).map_err(|_| ClassFileError::TooLarge {
            what: "annotated parameters",
            count,
        })?;
        let name_index = pool.utf8(attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS)?;
        let mut body = ClassWriter::new();
        body.emit_u8(count);
        for annotations in &method.parameter_annotations {
            write_annotations(&mut body, pool, annotations)?;
        }
        attributes.push((name_index, body.into_bytes()));
    }
    write_attributes(out, &attributes)
}

fn signature_attribute(pool: &mut PoolBuilder, signature: &str) -> Result<Attribute, ClassFileError> {
    let name_index = pool.utf8(attribute::SIGNATURE)?;
    let mut body = ClassWriter::new();
    body.emit_u16(pool.utf8(signature)?);
    Ok((name_index, body.into_bytes()))
}

fn annotations_attribute(pool: &mut PoolBuilder, annotations: &[Annotation]) -> Result<Attribute, ClassFileError> {
    let name_index = pool.utf8(attribute::RUNTIME_VISIBLE_ANNOTATIONS)?;
    let mut body = ClassWriter::new();
    write_annotations(&mut body, pool, annotations)?;
    Ok((name_index, body.into_bytes()))
}

fn inner_classes_attribute(pool: &mut PoolBuilder, inner_classes: &[InnerClass]) -> Result<Attribute, ClassFileError> {
    let name_index = pool.utf8(attribute::INNER_CLASSES)?;
    let mut body = ClassWriter::new();
    body.emit_u16(length("inner classes", inner_classes.len())?);
    for inner in inner_classes {
        body.emit_u16(pool.class(&inner.inner_class)?);
        let outer_index = match inner.outer_class.as_deref() {
            Some(name) => pool.class(name)?,
            None => 0,
        };
        body.emit_u16(outer_index);
        let name_index = match inner.inner_name.as_deref() {
            Some(name) => pool.utf8(name)?,
            None => 0,
        };
        body.emit_u16(name_index);
        body.emit_u16(inner.access_flags.bits());
    }
    Ok((name_index, body.into_bytes()))
}

fn write_annotations(
    out: &mut ClassWriter,
    pool: &mut PoolBuilder,
    annotations: &[Annotation],
) -> Result<(), ClassFileError> {
    out.emit_u16(length("annotations", annotations.len())?);
    for annotation in annotations {
        write_annotation(out, pool, annotation)?;
    }
    Ok(())
}

fn write_annotation(out: &mut ClassWriter, pool: &mut PoolBuilder, annotation: &Annotation) -> Result<(), ClassFileError> {
    out.emit_u16(pool.utf8(&annotation.type_descriptor)?);
    out.emit_u16(length("annotation elements", annotation.elements.len())?);
    for (name, value) in &annotation.elements {
        out.emit_u16(pool.utf8(name)?);
        write_element_value(out, pool, value)?;
    }
    Ok(())
}

fn write_element_value(out: &mut ClassWriter, pool: &mut PoolBuilder, value: &ElementValue) -> Result<(), ClassFileError> {
    out.emit_u8(value.tag());
    match value {
        ElementValue::Byte(v) => out.emit_u16(pool.integer(i32::from(*v))?),
        ElementValue::Char(v) => out.emit_u16(pool.integer(i32::from(*v))?),
        ElementValue::Short(v) => out.emit_u16(pool.integer(i32::from(*v))?),
        ElementValue::Boolean(v) => out.emit_u16(pool.integer(i32::from(*v))?),
        ElementValue::Int(v) => out.emit_u16(pool.integer(*v)?),
        ElementValue::Long(v) => out.emit_u16(pool.intern(PoolKey::Long(*v))?),
        ElementValue::Float(v) => out.emit_u16(pool.intern(PoolKey::Float(v.to_bits()))?),
        ElementValue::Double(v) => out.emit_u16(pool.intern(PoolKey::Double(v.to_bits()))?),
        ElementValue::String(text) => out.emit_u16(pool.utf8(text)?),
        ElementValue::Class(descriptor) => out.emit_u16(pool.utf8(descriptor)?),
        ElementValue::Enum {
            type_descriptor,
            const_name,
        } => {
            out.emit_u16(pool.utf8(type_descriptor)?);
            out.emit_u16(pool.utf8(const_name)?);
        }
        ElementValue::Annotation(nested) => write_annotation(out, pool, nested)?,
        ElementValue::Array(items) => {
            out.emit_u16(length("array elements", items.len())?);
            for item in items {
                write_element_value(out, pool, item)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_flags::AccessFlags;

    #[test]
    fn test_constant_pool_interns_strings() {
        let mut pool = PoolBuilder::new();
        let first = pool.utf8("a/B").unwrap();
        let class = pool.class("a/B").unwrap();
        assert_eq!(pool.utf8("a/B").unwrap(), first);
        assert_eq!(pool.class("a/B").unwrap(), class);
        assert_eq!(pool.next, 3);
    }

    #[test]
    fn test_wide_constants_take_two_slots() {
        let mut pool = PoolBuilder::new();
        assert_eq!(pool.intern(PoolKey::Long(1)).unwrap(), 1);
        assert_eq!(pool.intern(PoolKey::Double(0)).unwrap(), 3);
        assert_eq!(pool.integer(5).unwrap(), 5);
    }

    #[test]
    fn test_written_class_reads_back() {
        let class = ClassFile::new("com/example/Widget")
            .with_access(AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::ENUM)
            .implements("java/io/Serializable")
            .with_signature("Ljava/lang/Enum<Lcom/example/Widget;>;")
            .with_annotation(
                Annotation::new("Lcom/example/Tag;")
                    .with("value", ElementValue::Class("Lcom/example/Other;".to_string()))
                    .with("count", ElementValue::Long(1 << 40))
                    .with("ratio", ElementValue::Double(0.5))
                    .with("flag", ElementValue::Boolean(true))
                    .with(
                        "mode",
                        ElementValue::Enum {
                            type_descriptor: "Lcom/example/Mode;".to_string(),
                            const_name: "FAST".to_string(),
                        },
                    )
                    .with(
                        "nested",
                        ElementValue::Array(vec![ElementValue::Annotation(Annotation::new("Lcom/example/Inner;"))]),
                    ),
            )
            .with_field(FieldInfo::new("items", "Ljava/util/List;").with_signature("Ljava/util/List<Ljava/lang/String;>;"))
            .with_method(
                MethodInfo::new("apply", "(Ljava/lang/String;I)V")
                    .with_parameter_annotation(0, Annotation::new("Lcom/example/NotNull;")),
            )
            .with_inner_class(InnerClass {
                inner_class: "com/example/Widget$Part".to_string(),
                outer_class: Some("com/example/Widget".to_string()),
                inner_name: Some("Part".to_string()),
                access_flags: AccessFlags::PUBLIC | AccessFlags::STATIC,
            });

        let bytes = class.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(ClassFile::parse(&bytes).unwrap(), class);
    }

    #[test]
    fn test_oversized_counts_are_rejected() {
        let mut class = ClassFile::new("com/example/Wide");
        class.interfaces = vec!["java/io/Serializable".to_string(); 70_000];
        assert_eq!(
            class.to_bytes().unwrap_err(),
            ClassFileError::TooLarge {
                what: "interfaces",
                count: 70_000
            }
        );

        let long_name = "a".repeat(70_000);
        let class = ClassFile::new(long_name);
        assert!(matches!(
            class.to_bytes().unwrap_err(),
            ClassFileError::TooLarge {
                what: "Utf8 constant bytes",
                ..
            }
        ));

        let mut method = MethodInfo::new("many", "()V");
        method.parameter_annotations = vec![Vec::new(); 300];
        let class = ClassFile::new("com/example/Params").with_method(method);
        assert!(matches!(
            class.to_bytes().unwrap_err(),
            ClassFileError::TooLarge {
                what: "annotated parameters",
                count: 300
            }
        ));
    }

    #[test]
    fn test_constant_pool_overflow_is_rejected() {
        let mut pool = PoolBuilder::new();
        for value in 0..0xFFFE {
            pool.integer(value).unwrap();
        }
        assert_eq!(pool.next, 0xFFFF);
        assert!(matches!(
            pool.integer(-1).unwrap_err(),
            ClassFileError::TooLarge {
                what: "constant pool entries",
                ..
            }
        ));
        // already interned constants still resolve
        assert_eq!(pool.integer(7).unwrap(), 8);
    }
}

