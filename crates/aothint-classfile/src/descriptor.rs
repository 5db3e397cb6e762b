//! Field and method descriptors
//!
//! ```text
//! FieldType:  B C D F I J S Z | L<internal name>; | [FieldType
//! MethodType: ( FieldType* ) ( FieldType | V )
//! ```

use std::fmt;

use crate::error::DescriptorError;

/// Primitive field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// Map a descriptor character to its primitive type
    pub fn from_char(c: u8) -> Option<Self> {
        Some(match c {
            b'B' => Self::Byte,
            b'C' => Self::Char,
            b'D' => Self::Double,
            b'F' => Self::Float,
            b'I' => Self::Int,
            b'J' => Self::Long,
            b'S' => Self::Short,
            b'Z' => Self::Boolean,
            _ => return None,
        })
    }

    /// Descriptor character
    pub fn as_char(self) -> char {
        match self {
            Self::Byte => 'B',
            Self::Char => 'C',
            Self::Double => 'D',
            Self::Float => 'F',
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Short => 'S',
            Self::Boolean => 'Z',
        }
    }

    /// Source-level keyword (`int`, `boolean`, ...)
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Boolean => "boolean",
        }
    }
}

/// A parsed field descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Primitive value
    Base(BaseType),
    /// Class or interface, by internal (slashed) name
    Object(String),
    /// Array of the component type
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parse a complete field descriptor
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let (field, end) = parse_field(descriptor, 0)?;
        if end != descriptor.len() {
            return Err(error(descriptor, end, "end of descriptor"));
        }
        Ok(field)
    }

    /// Innermost non-array type
    pub fn element_type(&self) -> &FieldType {
        let mut current = self;
        while let Self::Array(component) = current {
            current = component;
        }
        current
    }

    /// Number of array dimensions
    pub fn dimensions(&self) -> usize {
        let mut dims = 0;
        let mut current = self;
        while let Self::Array(component) = current {
            dims += 1;
            current = component;
        }
        dims
    }

    /// Internal name of the element class, `None` for primitive elements
    pub fn class_name(&self) -> Option<&str> {
        match self.element_type() {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }

    /// Internal name with one `[]` per dimension (`a/b/C[][]`)
    ///
    /// Returns `None` when the element type is primitive.
    pub fn type_name(&self) -> Option<String> {
        let base = self.class_name()?;
        let mut name = String::with_capacity(base.len() + 2 * self.dimensions());
        name.push_str(base);
        for _ in 0..self.dimensions() {
            name.push_str("[]");
        }
        Some(name)
    }

    /// True for primitive values (not arrays of them)
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Base(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(base) => write!(f, "{}", base.as_char()),
            Self::Object(name) => write!(f, "L{};", name),
            Self::Array(component) => write!(f, "[{}", component),
        }
    }
}

/// A parsed method descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodType {
    /// Parameter types in declaration order
    pub parameters: Vec<FieldType>,
    /// Return type, `None` for `void`
    pub return_type: Option<FieldType>,
}

impl MethodType {
    /// Parse a complete method descriptor
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let bytes = descriptor.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(error(descriptor, 0, "'('"));
        }

        let mut pos = 1;
        let mut parameters = Vec::new();
        loop {
            match bytes.get(pos) {
                Some(b')') => {
                    pos += 1;
                    break;
                }
                Some(_) => {
                    let (param, next) = parse_field(descriptor, pos)?;
                    parameters.push(param);
                    pos = next;
                }
                None => return Err(error(descriptor, pos, "')'")),
            }
        }

        let return_type = if bytes.get(pos) == Some(&b'V') {
            pos += 1;
            None
        } else {
            let (ret, next) = parse_field(descriptor, pos)?;
            pos = next;
            Some(ret)
        };

        if pos != bytes.len() {
            return Err(error(descriptor, pos, "end of descriptor"));
        }
        Ok(Self {
            parameters,
            return_type,
        })
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.parameters {
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        match &self.return_type {
            Some(ret) => write!(f, "{}", ret),
            None => f.write_str("V"),
        }
    }
}

fn parse_field(descriptor: &str, start: usize) -> Result<(FieldType, usize), DescriptorError> {
    let bytes = descriptor.as_bytes();
    let mut dims = 0;
    let mut pos = start;
    while bytes.get(pos) == Some(&b'[') {
        dims += 1;
        pos += 1;
    }
    if dims > 255 {
        return Err(error(descriptor, pos, "at most 255 array dimensions"));
    }

    let c = *bytes.get(pos).ok_or_else(|| error(descriptor, pos, "a field type"))?;
    let (mut field, end) = if c == b'L' {
        let rel = descriptor[pos + 1..]
            .find(';')
            .ok_or_else(|| error(descriptor, pos, "';'"))?;
        let name = &descriptor[pos + 1..pos + 1 + rel];
        if name.is_empty() {
            return Err(error(descriptor, pos + 1, "a class name"));
        }
        (FieldType::Object(name.to_string()), pos + rel + 2)
    } else {
        let base = BaseType::from_char(c).ok_or_else(|| error(descriptor, pos, "a field type"))?;
        (FieldType::Base(base), pos + 1)
    };

    for _ in 0..dims {
        field = FieldType::Array(Box::new(field));
    }
    Ok((field, end))
}

fn error(descriptor: &str, position: usize, reason: &'static str) -> DescriptorError {
    DescriptorError {
        descriptor: descriptor.to_string(),
        position,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_array() {
        let field = FieldType::parse("[[Ljava/lang/String;").unwrap();
        assert_eq!(field.dimensions(), 2);
        assert_eq!(field.class_name(), Some("java/lang/String"));
        assert_eq!(field.type_name().as_deref(), Some("java/lang/String[][]"));
        assert_eq!(field.to_string(), "[[Ljava/lang/String;");
    }

    #[test]
    fn test_primitive_array_has_no_type_name() {
        let field = FieldType::parse("[I").unwrap();
        assert_eq!(field.element_type(), &FieldType::Base(BaseType::Int));
        assert_eq!(field.type_name(), None);
        assert!(!field.is_primitive());
    }

    #[test]
    fn test_parse_method_descriptor() {
        let method = MethodType::parse("(IJ[Ljava/util/List;)Ljava/lang/Object;").unwrap();
        assert_eq!(method.parameters.len(), 3);
        assert_eq!(method.parameters[1], FieldType::Base(BaseType::Long));
        assert_eq!(
            method.return_type,
            Some(FieldType::Object("java/lang/Object".to_string()))
        );
        assert_eq!(method.to_string(), "(IJ[Ljava/util/List;)Ljava/lang/Object;");
    }

    #[test]
    fn test_void_return() {
        let method = MethodType::parse("()V").unwrap();
        assert!(method.parameters.is_empty());
        assert_eq!(method.return_type, None);
    }

    #[test]
    fn test_malformed_descriptors() {
        assert!(FieldType::parse("Ljava/lang/String").is_err());
        assert!(FieldType::parse("Q").is_err());
        assert!(FieldType::parse("II").is_err());
        assert!(FieldType::parse("L;").is_err());
        assert!(MethodType::parse("I)V").is_err());
        assert!(MethodType::parse("(I").is_err());
        assert!(MethodType::parse("()VV").is_err());
    }
}
