//! Traversal paths

use std::fmt;

use crate::names;
use crate::types::{Field, Method, Type};

/// One hop of a traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    /// Reached a type directly (root, signature or tag)
    Type { name: String },
    /// Reached `target` through a method's signature or tags
    Method { name: String, target: String },
    /// Reached `target` through a field's signature or tags
    Field { name: String, target: String },
}

impl PathElement {
    /// Internal name of the type this hop arrives at
    pub fn target(&self) -> &str {
        match self {
            Self::Type { name } => name,
            Self::Method { target, .. } | Self::Field { target, .. } => target,
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { name } => write!(f, "T:{}", names::to_dotted(name)),
            Self::Method { name, .. } => write!(f, "M:{name}"),
            Self::Field { name, .. } => write!(f, "F:{name}"),
        }
    }
}

/// How the walker got from the root to the current type
///
/// Appending returns a new path; the parent stays usable for siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalPath {
    elements: Vec<PathElement>,
}

impl TraversalPath {
    pub fn root(ty: &Type) -> Self {
        Self {
            elements: vec![PathElement::Type {
                name: ty.name().to_string(),
            }],
        }
    }

    pub fn then_type(&self, ty: &Type) -> Self {
        self.append(PathElement::Type {
            name: ty.name().to_string(),
        })
    }

    pub fn then_method(&self, method: &Method, target: &Type) -> Self {
        self.append(PathElement::Method {
            name: method.name().to_string(),
            target: target.name().to_string(),
        })
    }

    pub fn then_field(&self, field: &Field, target: &Type) -> Self {
        self.append(PathElement::Field {
            name: field.name().to_string(),
            target: target.name().to_string(),
        })
    }

    fn append(&self, element: PathElement) -> Self {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend_from_slice(&self.elements);
        elements.push(element);
        Self { elements }
    }

    /// Hops from the root; 0 for the root itself
    pub fn depth(&self) -> usize {
        self.elements.len() - 1
    }

    pub fn is_root(&self) -> bool {
        self.elements.len() == 1
    }

    /// Internal name of the root type
    pub fn root_name(&self) -> &str {
        self.elements[0].target()
    }

    pub fn leaf(&self) -> &PathElement {
        &self.elements[self.elements.len() - 1]
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }
}

impl fmt::Display for TraversalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}
