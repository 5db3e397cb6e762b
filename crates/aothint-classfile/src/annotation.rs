//! Runtime-visible annotations and their element values

use crate::constant_pool::ConstantPool;
use crate::error::ClassFileError;
use crate::reader::ClassReader;

/// Deepest element value nesting accepted before the unit is rejected
pub const MAX_NESTING: usize = 256;

/// An annotation instance: its type descriptor and ordered element values
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type (`Lcom/example/Marker;`)
    pub type_descriptor: String,
    /// Element name/value pairs in class file order
    pub elements: Vec<(String, ElementValue)>,
}

/// Value of a single annotation element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    String(String),
    /// Enum constant: descriptor of the enum type plus constant name
    Enum {
        type_descriptor: String,
        const_name: String,
    },
    /// Class literal, held as a return descriptor (`Lcom/example/Foo;`, `V`)
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl Annotation {
    /// Create an annotation without elements
    pub fn new(type_descriptor: impl Into<String>) -> Self {
        Self {
            type_descriptor: type_descriptor.into(),
            elements: Vec::new(),
        }
    }

    /// Append an element value
    pub fn with(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.elements.push((name.into(), value));
        self
    }

    /// Internal name of the annotation type
    ///
    /// `Lcom/example/Marker;` becomes `com/example/Marker`; anything that is
    /// not an object descriptor is returned unchanged.
    pub fn type_name(&self) -> &str {
        self.type_descriptor
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap_or(&self.type_descriptor)
    }

    /// Value of the named element, if present
    pub fn get(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(element, _)| element == name)
            .map(|(_, value)| value)
    }

    pub(crate) fn parse(reader: &mut ClassReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFileError> {
        Self::parse_nested(reader, pool, 0)
    }

    fn parse_nested(reader: &mut ClassReader<'_>, pool: &ConstantPool, depth: usize) -> Result<Self, ClassFileError> {
        let type_descriptor = pool.utf8(reader.read_u16()?)?.to_string();
        let count = reader.read_u16()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.utf8(reader.read_u16()?)?.to_string();
            let value = ElementValue::parse(reader, pool, depth + 1)?;
            elements.push((name, value));
        }
        Ok(Self {
            type_descriptor,
            elements,
        })
    }
}

impl ElementValue {
    /// Class file tag character for this value
    pub fn tag(&self) -> u8 {
        match self {
            Self::Byte(_) => b'B',
            Self::Char(_) => b'C',
            Self::Double(_) => b'D',
            Self::Float(_) => b'F',
            Self::Int(_) => b'I',
            Self::Long(_) => b'J',
            Self::Short(_) => b'S',
            Self::Boolean(_) => b'Z',
            Self::String(_) => b's',
            Self::Enum { .. } => b'e',
            Self::Class(_) => b'c',
            Self::Annotation(_) => b'@',
            Self::Array(_) => b'[',
        }
    }

    /// String payload of a `String` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Descriptor of a class literal
    pub fn as_class(&self) -> Option<&str> {
        match self {
            Self::Class(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    /// Items of an array value
    pub fn as_array(&self) -> Option<&[ElementValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    fn parse(reader: &mut ClassReader<'_>, pool: &ConstantPool, depth: usize) -> Result<Self, ClassFileError> {
        let offset = reader.position();
        if depth > MAX_NESTING {
            return Err(ClassFileError::NestingTooDeep { offset });
        }
        let tag = reader.read_u8()?;
        let value = match tag {
            b'B' => Self::Byte(pool.integer(reader.read_u16()?)? as i8),
            b'C' => Self::Char(pool.integer(reader.read_u16()?)? as u16),
            b'D' => Self::Double(pool.double(reader.read_u16()?)?),
            b'F' => Self::Float(pool.float(reader.read_u16()?)?),
            b'I' => Self::Int(pool.integer(reader.read_u16()?)?),
            b'J' => Self::Long(pool.long(reader.read_u16()?)?),
            b'S' => Self::Short(pool.integer(reader.read_u16()?)? as i16),
            b'Z' => Self::Boolean(pool.integer(reader.read_u16()?)? != 0),
            b's' => Self::String(pool.utf8(reader.read_u16()?)?.to_string()),
            b'e' => Self::Enum {
                type_descriptor: pool.utf8(reader.read_u16()?)?.to_string(),
                const_name: pool.utf8(reader.read_u16()?)?.to_string(),
            },
            b'c' => Self::Class(pool.utf8(reader.read_u16()?)?.to_string()),
            b'@' => Self::Annotation(Annotation::parse_nested(reader, pool, depth)?),
            b'[' => {
                let count = reader.read_u16()?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(Self::parse(reader, pool, depth + 1)?);
                }
                Self::Array(items)
            }
            other => return Err(ClassFileError::InvalidElementTag { tag: other, offset }),
        };
        Ok(value)
    }
}

/// Decode a `RuntimeVisibleAnnotations` attribute body
pub(crate) fn parse_annotations(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Annotation>, ClassFileError> {
    let count = reader.read_u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(Annotation::parse(reader, pool)?);
    }
    Ok(annotations)
}

/// Decode a `RuntimeVisibleParameterAnnotations` attribute body
pub(crate) fn parse_parameter_annotations(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Vec<Annotation>>, ClassFileError> {
    let count = reader.read_u8()?;
    let mut parameters = Vec::with_capacity(count as usize);
    for _ in 0..count {
        parameters.push(parse_annotations(reader, pool)?);
    }
    Ok(parameters)
}
