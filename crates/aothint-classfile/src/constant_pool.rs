//! Constant pool decoding and typed lookups

use crate::error::ClassFileError;
use crate::mutf8;
use crate::reader::ClassReader;

/// Constant pool tags
pub mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

/// A single constant pool entry
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Decoded string data
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    /// Index of the class name
    Class(u16),
    /// Index of the string data
    String(u16),
    /// Member reference: class index, name-and-type index
    MemberRef {
        kind: u8,
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType(u16),
    /// Dynamic or InvokeDynamic entry
    Dynamic {
        kind: u8,
        bootstrap_index: u16,
        name_and_type_index: u16,
    },
    Module(u16),
    Package(u16),
    /// Slot 0 and the second slot of long/double entries
    Unusable,
}

/// The decoded constant pool of one class file
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Decode the pool that follows the version fields
    pub fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.read_u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        let mut index: u16 = 1;
        while index < count {
            let start = reader.position();
            let tag = reader.read_u8()?;
            let constant = match tag {
                tag::UTF8 => {
                    let len = reader.read_u16()? as usize;
                    let bytes = reader.read_bytes(len)?;
                    let text = mutf8::decode(bytes).ok_or(ClassFileError::InvalidUtf8(start))?;
                    Constant::Utf8(text)
                }
                tag::INTEGER => Constant::Integer(reader.read_u32()? as i32),
                tag::FLOAT => Constant::Float(f32::from_bits(reader.read_u32()?)),
                tag::LONG => Constant::Long(reader.read_u64()? as i64),
                tag::DOUBLE => Constant::Double(f64::from_bits(reader.read_u64()?)),
                tag::CLASS => Constant::Class(reader.read_u16()?),
                tag::STRING => Constant::String(reader.read_u16()?),
                tag::FIELD_REF | tag::METHOD_REF | tag::INTERFACE_METHOD_REF => {
                    Constant::MemberRef {
                        kind: tag,
                        class_index: reader.read_u16()?,
                        name_and_type_index: reader.read_u16()?,
                    }
                }
                tag::NAME_AND_TYPE => Constant::NameAndType {
                    name_index: reader.read_u16()?,
                    descriptor_index: reader.read_u16()?,
                },
                tag::METHOD_HANDLE => Constant::MethodHandle {
                    reference_kind: reader.read_u8()?,
                    reference_index: reader.read_u16()?,
                },
                tag::METHOD_TYPE => Constant::MethodType(reader.read_u16()?),
                tag::DYNAMIC | tag::INVOKE_DYNAMIC => Constant::Dynamic {
                    kind: tag,
                    bootstrap_index: reader.read_u16()?,
                    name_and_type_index: reader.read_u16()?,
                },
                tag::MODULE => Constant::Module(reader.read_u16()?),
                tag::PACKAGE => Constant::Package(reader.read_u16()?),
                other => return Err(ClassFileError::InvalidConstantTag { tag: other, index }),
            };

            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            // `index < count`, so the subtraction cannot underflow
            if wide && count - index < 2 {
                return Err(ClassFileError::BadConstantIndex {
                    index,
                    expected: "two-slot constant with room for its second slot",
                });
            }
            entries.push(constant);
            index += 1;
            if wide {
                entries.push(Constant::Unusable);
                index += 1;
            }
        }

        Ok(Self { entries })
    }

    /// Number of slots, including the unusable slot 0
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the pool holds no entries beyond slot 0
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Raw entry at `index`
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize)
    }

    /// String data of a `CONSTANT_Utf8` entry
    pub fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index) {
            Some(Constant::Utf8(text)) => Ok(text),
            _ => Err(bad_index(index, "Utf8")),
        }
    }

    /// Internal name referenced by a `CONSTANT_Class` entry
    pub fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index) {
            Some(Constant::Class(name_index)) => self.utf8(*name_index),
            _ => Err(bad_index(index, "Class")),
        }
    }

    /// Like [`class_name`](Self::class_name) but index 0 means "absent"
    pub fn optional_class_name(&self, index: u16) -> Result<Option<&str>, ClassFileError> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    /// Value of a `CONSTANT_Integer` entry
    pub fn integer(&self, index: u16) -> Result<i32, ClassFileError> {
        match self.get(index) {
            Some(Constant::Integer(value)) => Ok(*value),
            _ => Err(bad_index(index, "Integer")),
        }
    }

    /// Value of a `CONSTANT_Float` entry
    pub fn float(&self, index: u16) -> Result<f32, ClassFileError> {
        match self.get(index) {
            Some(Constant::Float(value)) => Ok(*value),
            _ => Err(bad_index(index, "Float")),
        }
    }

    /// Value of a `CONSTANT_Long` entry
    pub fn long(&self, index: u16) -> Result<i64, ClassFileError> {
        match self.get(index) {
            Some(Constant::Long(value)) => Ok(*value),
            _ => Err(bad_index(index, "Long")),
        }
    }

    /// Value of a `CONSTANT_Double` entry
    pub fn double(&self, index: u16) -> Result<f64, ClassFileError> {
        match self.get(index) {
            Some(Constant::Double(value)) => Ok(*value),
            _ => Err(bad_index(index, "Double")),
        }
    }
}

fn bad_index(index: u16, expected: &'static str) -> ClassFileError {
    ClassFileError::BadConstantIndex { index, expected }
}
