//! Errors raised while decoding class files, descriptors and signatures

use thiserror::Error;

/// Errors that can occur while parsing a class file
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassFileError {
    /// Input ended before a complete structure was read
    #[error("Unexpected end of class file at offset {0}")]
    UnexpectedEnd(usize),

    /// The leading magic number is not 0xCAFEBABE
    #[error("Invalid magic number: 0x{0:08X}")]
    BadMagic(u32),

    /// A constant pool entry carries an unknown tag
    #[error("Invalid constant pool tag {tag} at index {index}")]
    InvalidConstantTag {
        /// Tag byte found in the pool
        tag: u8,
        /// Pool index of the entry
        index: u16,
    },

    /// A constant pool reference points at a missing or mismatched entry
    #[error("Constant pool index {index} is not a valid {expected} entry")]
    BadConstantIndex {
        /// Referenced pool index
        index: u16,
        /// Kind of entry the reference required
        expected: &'static str,
    },

    /// A Utf8 constant is not valid modified UTF-8
    #[error("Invalid modified UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// A field or method descriptor is malformed
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// An annotation element value carries an unknown tag
    #[error("Invalid element value tag '{tag}' at offset {offset}")]
    InvalidElementTag {
        /// Tag byte found in the element value
        tag: u8,
        /// Offset of the tag byte
        offset: usize,
    },

    /// A count, string or pool is too large for its fixed-width field
    #[error("Too many {what} to encode: {count}")]
    TooLarge {
        /// What was being counted
        what: &'static str,
        /// The count that did not fit
        count: usize,
    },

    /// Element values are nested deeper than the parser accepts
    #[error("Element values nested deeper than 256 levels at offset {offset}")]
    NestingTooDeep {
        /// Offset of the value that crossed the limit
        offset: usize,
    },
}

/// Errors raised while parsing a field or method descriptor
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid descriptor '{descriptor}' at position {position}: {reason}")]
pub struct DescriptorError {
    /// The full descriptor text
    pub descriptor: String,
    /// Byte position where parsing stopped
    pub position: usize,
    /// What the parser expected
    pub reason: &'static str,
}

/// Errors raised while parsing a generic signature
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid signature '{signature}' at position {position}: {reason}")]
pub struct SignatureError {
    /// The full signature text
    pub signature: String,
    /// Byte position where parsing stopped
    pub position: usize,
    /// What the parser expected
    pub reason: &'static str,
}
