//! Class, field and method access flags

use std::fmt;

/// Access and property flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessFlags(u16);

impl AccessFlags {
    pub const NONE: Self = Self(0x0000);
    pub const PUBLIC: Self = Self(0x0001);
    pub const PRIVATE: Self = Self(0x0002);
    pub const PROTECTED: Self = Self(0x0004);
    pub const STATIC: Self = Self(0x0008);
    pub const FINAL: Self = Self(0x0010);
    /// `ACC_SUPER` on classes, `ACC_SYNCHRONIZED` on methods
    pub const SUPER: Self = Self(0x0020);
    /// `ACC_VOLATILE` on fields, `ACC_BRIDGE` on methods
    pub const VOLATILE: Self = Self(0x0040);
    /// `ACC_TRANSIENT` on fields, `ACC_VARARGS` on methods
    pub const TRANSIENT: Self = Self(0x0080);
    pub const NATIVE: Self = Self(0x0100);
    pub const INTERFACE: Self = Self(0x0200);
    pub const ABSTRACT: Self = Self(0x0400);
    pub const STRICT: Self = Self(0x0800);
    pub const SYNTHETIC: Self = Self(0x1000);
    pub const ANNOTATION: Self = Self(0x2000);
    pub const ENUM: Self = Self(0x4000);
    pub const MODULE: Self = Self(0x8000);

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Check if all bits of `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_and_union() {
        let flags = AccessFlags::PUBLIC | AccessFlags::ENUM | AccessFlags::FINAL;
        assert!(flags.contains(AccessFlags::ENUM));
        assert!(flags.contains(AccessFlags::PUBLIC.union(AccessFlags::FINAL)));
        assert!(!flags.contains(AccessFlags::INTERFACE));
        assert_eq!(flags.bits(), 0x4011);
        assert_eq!(flags.to_string(), "0x4011");
    }
}
