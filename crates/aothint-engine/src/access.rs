//! Access requirements
//!
//! An [`AccessDescriptor`] states what a closed-world image must retain for
//! one type: class metadata, constructors, methods, fields and the class file
//! as a resource. Blanket categories are bits in [`AccessBits`]; narrower
//! needs are explicit member lists.
//!
//! ## Flags
//!
//! | Bit    | Flag                    | Short   |
//! |--------|-------------------------|---------|
//! | 0x0001 | `RESOURCE`              | RES     |
//! | 0x0002 | `CLASS`                 | CLS     |
//! | 0x0004 | `DECLARED_CONSTRUCTORS` | DCONS   |
//! | 0x0008 | `DECLARED_METHODS`      | DMETHS  |
//! | 0x0010 | `DECLARED_FIELDS`       | FLDS    |
//! | 0x0020 | `PUBLIC_METHODS`        | PMETHS  |
//! | 0x0040 | `PUBLIC_CONSTRUCTORS`   | PCONS   |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access requirement flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AccessBits(u16);

impl AccessBits {
    /// Nothing required
    pub const NONE: Self = Self(0x0000);
    /// Class file readable as a resource
    pub const RESOURCE: Self = Self(0x0001);
    /// Class metadata (`Class.forName`)
    pub const CLASS: Self = Self(0x0002);
    /// All declared constructors
    pub const DECLARED_CONSTRUCTORS: Self = Self(0x0004);
    /// All declared methods
    pub const DECLARED_METHODS: Self = Self(0x0008);
    /// All declared fields
    pub const DECLARED_FIELDS: Self = Self(0x0010);
    /// Public methods, inherited included
    pub const PUBLIC_METHODS: Self = Self(0x0020);
    /// Public constructors
    pub const PUBLIC_CONSTRUCTORS: Self = Self(0x0040);

    // Common combinations
    /// CLASS | DECLARED_CONSTRUCTORS
    pub const LOAD_AND_CONSTRUCT: Self = Self(0x0006);
    /// CLASS | PUBLIC_METHODS
    pub const ANNOTATION: Self = Self(0x0022);
    /// Every reflective category, without the resource bit
    pub const FULL_REFLECTION: Self = Self(0x007E);
    /// FULL_REFLECTION | RESOURCE
    pub const ALL: Self = Self(0x007F);

    /// Bits covering methods
    pub const METHODS: Self = Self(0x0028);
    /// Bits covering constructors
    pub const CONSTRUCTORS: Self = Self(0x0044);
    /// Bits covering fields
    pub const FIELDS: Self = Self(0x0010);

    const NAMED: [(Self, &'static str, &'static str); 7] = [
        (Self::RESOURCE, "RESOURCE", "RES"),
        (Self::CLASS, "CLASS", "CLS"),
        (Self::DECLARED_CONSTRUCTORS, "DECLARED_CONSTRUCTORS", "DCONS"),
        (Self::PUBLIC_CONSTRUCTORS, "PUBLIC_CONSTRUCTORS", "PCONS"),
        (Self::DECLARED_METHODS, "DECLARED_METHODS", "DMETHS"),
        (Self::PUBLIC_METHODS, "PUBLIC_METHODS", "PMETHS"),
        (Self::DECLARED_FIELDS, "DECLARED_FIELDS", "FLDS"),
    ];

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// True if no bit is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check if every bit of `other` is set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any bit of `other` is set
    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Intersection of flags
    pub const fn intersection(&self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Difference (remove flags)
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Parse a single flag or combination name, or a hex/decimal value
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        let named = match upper.as_str() {
            "NONE" => Some(Self::NONE),
            "LOAD_AND_CONSTRUCT" => Some(Self::LOAD_AND_CONSTRUCT),
            "ANNOTATION" => Some(Self::ANNOTATION),
            "FULL_REFLECTION" => Some(Self::FULL_REFLECTION),
            "ALL" => Some(Self::ALL),
            other => Self::NAMED
                .iter()
                .find(|(_, long, short)| *long == other || *short == other)
                .map(|(flag, _, _)| *flag),
        };
        if named.is_some() {
            return named;
        }
        match upper.strip_prefix("0X") {
            Some(hex) => u16::from_str_radix(hex, 16).ok().map(Self::from_bits),
            None => upper.parse::<u16>().ok().map(Self::from_bits),
        }
    }

    /// Parse pipe-separated flags (e.g. "CLASS|DECLARED_CONSTRUCTORS")
    pub fn from_combined_str(s: &str) -> Option<Self> {
        let mut result = Self::NONE;
        for part in s.split('|') {
            result = result.union(Self::from_str(part)?);
        }
        Some(result)
    }

    /// Which of the two values grants more, by bit count then by value
    ///
    /// Used when two sources disagree about one type and only one value may
    /// be kept.
    pub fn compare_access(&self, other: Self) -> std::cmp::Ordering {
        self.0
            .count_ones()
            .cmp(&other.0.count_ones())
            .then(self.0.cmp(&other.0))
    }
}

impl std::ops::BitOr for AccessBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for AccessBits {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for AccessBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, _, short)| *short)
            .collect();
        if names.is_empty() {
            write!(f, "ACS(NONE)")
        } else {
            write!(f, "ACS({})", names.join(" "))
        }
    }
}

/// Member category named by a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberCategory {
    Constructors,
    Methods,
    Fields,
}

impl fmt::Display for MemberCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Constructors => "constructors",
            Self::Methods => "methods",
            Self::Fields => "fields",
        })
    }
}

/// Errors raised when building an access descriptor
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// Both a blanket bit and explicit members were given for one category
    #[error("Access {bits} grants all {category} and also lists individual {category}")]
    Conflict {
        /// Requested bits
        bits: AccessBits,
        /// Category requested twice
        category: MemberCategory,
    },
}

/// Name used for constructors in method descriptors
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// A specific method or constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name, `<init>` for constructors
    pub name: String,
    /// Dotted parameter type names (`java.lang.String`, `char[]`)
    #[serde(default)]
    pub parameter_types: Vec<String>,
}

impl MethodDescriptor {
    /// Describe a method by name and parameter types
    pub fn new(name: impl Into<String>, parameter_types: &[&str]) -> Self {
        Self {
            name: name.into(),
            parameter_types: parameter_types.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Describe a constructor
    pub fn constructor(parameter_types: &[&str]) -> Self {
        Self::new(CONSTRUCTOR_NAME, parameter_types)
    }

    /// True if this names a constructor
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameter_types.join(","))
    }
}

/// A specific field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,
    /// Whether reflective writes are needed
    #[serde(default)]
    pub allow_write: bool,
    /// Whether unsafe (offset-based) access is needed
    #[serde(default)]
    pub allow_unsafe_access: bool,
}

impl FieldDescriptor {
    /// Describe a read-only field
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allow_write: false,
            allow_unsafe_access: false,
        }
    }
}

/// What reflective capability one type needs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessDescriptor {
    bits: AccessBits,
    methods: Vec<MethodDescriptor>,
    fields: Vec<FieldDescriptor>,
}

impl AccessDescriptor {
    /// Build a descriptor, rejecting a blanket bit combined with explicit
    /// members of the same category
    pub fn new(
        bits: AccessBits,
        methods: Vec<MethodDescriptor>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, AccessError> {
        let conflict = |category: MemberCategory| -> Result<Self, AccessError> {
            Err(AccessError::Conflict { bits, category })
        };
        if methods.iter().any(|m| !m.is_constructor()) && bits.intersects(AccessBits::METHODS) {
            return conflict(MemberCategory::Methods);
        }
        if methods.iter().any(MethodDescriptor::is_constructor) && bits.intersects(AccessBits::CONSTRUCTORS) {
            return conflict(MemberCategory::Constructors);
        }
        if !fields.is_empty() && bits.intersects(AccessBits::FIELDS) {
            return conflict(MemberCategory::Fields);
        }
        Ok(Self { bits, methods, fields })
    }

    /// Descriptor with blanket bits only
    pub fn from_bits(bits: AccessBits) -> Self {
        Self {
            bits,
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Blanket bits
    pub fn bits(&self) -> AccessBits {
        self.bits
    }

    /// Explicit methods and constructors
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Explicit fields
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// True if nothing at all is required
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty() && self.methods.is_empty() && self.fields.is_empty()
    }

    /// Combine with another descriptor for the same type
    ///
    /// Bits are unioned; explicit members already covered by a blanket bit
    /// in the result are dropped so the result stays conflict-free.
    pub fn merge(&self, other: &AccessDescriptor) -> AccessDescriptor {
        let bits = self.bits | other.bits;
        let mut methods: Vec<MethodDescriptor> = Vec::new();
        for method in self.methods.iter().chain(&other.methods) {
            let covered = if method.is_constructor() {
                bits.intersects(AccessBits::CONSTRUCTORS)
            } else {
                bits.intersects(AccessBits::METHODS)
            };
            if !covered && !methods.contains(method) {
                methods.push(method.clone());
            }
        }
        let mut fields: Vec<FieldDescriptor> = Vec::new();
        if !bits.intersects(AccessBits::FIELDS) {
            for field in self.fields.iter().chain(&other.fields) {
                if !fields.contains(field) {
                    fields.push(field.clone());
                }
            }
        }
        AccessDescriptor { bits, methods, fields }
    }

    /// Combine inferred bits with explicit members, narrowing the bits so
    /// the result never conflicts
    pub fn with_inferred_bits(
        inferred: AccessBits,
        methods: Vec<MethodDescriptor>,
        fields: Vec<FieldDescriptor>,
    ) -> AccessDescriptor {
        let bits = adjust_for_members(inferred, &methods, &fields);
        AccessDescriptor { bits, methods, fields }
    }
}

impl fmt::Display for AccessDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits)?;
        if !self.methods.is_empty() {
            let methods: Vec<String> = self.methods.iter().map(|m| m.to_string()).collect();
            write!(f, " methods=[{}]", methods.join(" "))?;
        }
        if !self.fields.is_empty() {
            let fields: Vec<&str> = self.fields.iter().map(|fd| fd.name.as_str()).collect();
            write!(f, " fields=[{}]", fields.join(" "))?;
        }
        Ok(())
    }
}

/// Clear blanket bits made redundant by explicit members
///
/// Explicit methods clear both method bits, explicit constructors clear both
/// constructor bits, explicit fields clear the field bit. The result can
/// always be passed to [`AccessDescriptor::new`] with the same members.
pub fn adjust_for_members(
    inferred: AccessBits,
    methods: &[MethodDescriptor],
    fields: &[FieldDescriptor],
) -> AccessBits {
    let mut adjusted = inferred;
    if methods.iter().any(|m| !m.is_constructor()) {
        adjusted = adjusted.difference(AccessBits::METHODS);
    }
    if methods.iter().any(MethodDescriptor::is_constructor) {
        adjusted = adjusted.difference(AccessBits::CONSTRUCTORS);
    }
    if !fields.is_empty() {
        adjusted = adjusted.difference(AccessBits::FIELDS);
    }
    if adjusted != inferred {
        tracing::debug!(from = %inferred, to = %adjusted, "narrowed inferred access for explicit members");
    }
    adjusted
}
