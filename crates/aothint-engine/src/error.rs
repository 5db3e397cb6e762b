//! Resolution errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving a type name to a unit
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// No location on the classpath provides the type
    #[error("Type not found: {name}")]
    MissingType {
        /// Normalized internal name that was requested
        name: String,
    },

    /// Backing bytes exist but are not a valid class file
    #[error("Malformed class file for {name}: {reason}")]
    MalformedUnit {
        /// Internal name of the unit
        name: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Backing storage could not be read
    #[error("Failed to read {}: {reason}", .path.display())]
    Storage {
        /// Directory entry or archive that failed
        path: PathBuf,
        /// I/O or archive diagnostic
        reason: String,
    },
}

impl TypeError {
    /// Shorthand for [`TypeError::MissingType`]
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingType { name: name.into() }
    }

    /// True for [`TypeError::MissingType`]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingType { .. })
    }
}
