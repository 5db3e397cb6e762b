//! Generic signatures carried by the `Signature` attribute
//!
//! Only the structure needed to enumerate referenced class types is kept;
//! variance and bounds are preserved so callers can distinguish them if
//! they care to.

use std::collections::BTreeSet;

use crate::descriptor::BaseType;
use crate::error::SignatureError;

/// A Java type signature as it appears in fields, parameters and bounds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    Base(BaseType),
    Class(ClassTypeSignature),
    /// Reference to a type parameter by name
    TypeVariable(String),
    Array(Box<TypeSignature>),
}

/// One segment of a class type, with its type arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleClassType {
    pub name: String,
    pub type_arguments: Vec<TypeArgument>,
}

/// `Lpkg/Outer<..>.Inner<..>;`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassTypeSignature {
    /// Outermost class, name includes the package
    pub outer: SimpleClassType,
    /// Member classes selected with `.`
    pub nested: Vec<SimpleClassType>,
}

/// A type argument inside `<...>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    /// `*`
    Any,
    /// `+T`
    Extends(TypeSignature),
    /// `-T`
    Super(TypeSignature),
    Exact(TypeSignature),
}

/// A formal type parameter with its bounds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<TypeSignature>,
    pub interface_bounds: Vec<TypeSignature>,
}

/// Signature attribute of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub superclass: ClassTypeSignature,
    pub interfaces: Vec<ClassTypeSignature>,
}

/// Signature attribute of a method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<TypeSignature>,
    /// `None` for `void`
    pub return_type: Option<TypeSignature>,
    pub throws: Vec<TypeSignature>,
}

impl TypeSignature {
    /// Parse a field signature (a single reference type)
    pub fn parse(signature: &str) -> Result<Self, SignatureError> {
        let mut parser = Parser::new(signature);
        let sig = parser.reference_type()?;
        parser.finish()?;
        Ok(sig)
    }

    /// Collect the internal names of every class type mentioned, array
    /// brackets stripped to the element type
    pub fn collect_class_names(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Base(_) | Self::TypeVariable(_) => {}
            Self::Class(class) => class.collect_class_names(out),
            Self::Array(component) => component.collect_class_names(out),
        }
    }

    /// Class names mentioned by this signature
    pub fn class_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_class_names(&mut out);
        out
    }
}

impl ClassTypeSignature {
    /// Binary name, nested segments joined with `$`
    pub fn binary_name(&self) -> String {
        let mut name = self.outer.name.clone();
        for segment in &self.nested {
            name.push('$');
            name.push_str(&segment.name);
        }
        name
    }

    /// Collect this class and every class in its type arguments
    pub fn collect_class_names(&self, out: &mut BTreeSet<String>) {
        out.insert(self.binary_name());
        for segment in std::iter::once(&self.outer).chain(&self.nested) {
            for argument in &segment.type_arguments {
                match argument {
                    TypeArgument::Any => {}
                    TypeArgument::Extends(sig) | TypeArgument::Super(sig) | TypeArgument::Exact(sig) => {
                        sig.collect_class_names(out)
                    }
                }
            }
        }
    }
}

impl TypeParameter {
    fn collect_class_names(&self, out: &mut BTreeSet<String>) {
        for bound in self.class_bound.iter().chain(&self.interface_bounds) {
            bound.collect_class_names(out);
        }
    }
}

impl ClassSignature {
    /// Parse a class signature
    pub fn parse(signature: &str) -> Result<Self, SignatureError> {
        let mut parser = Parser::new(signature);
        let type_parameters = parser.type_parameters()?;
        let superclass = parser.class_type()?;
        let mut interfaces = Vec::new();
        while parser.has_more() {
            interfaces.push(parser.class_type()?);
        }
        Ok(Self {
            type_parameters,
            superclass,
            interfaces,
        })
    }

    /// Every class type named in bounds, superclass and interfaces
    pub fn class_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for param in &self.type_parameters {
            param.collect_class_names(&mut out);
        }
        self.superclass.collect_class_names(&mut out);
        for interface in &self.interfaces {
            interface.collect_class_names(&mut out);
        }
        out
    }
}

impl MethodSignature {
    /// Parse a method signature
    pub fn parse(signature: &str) -> Result<Self, SignatureError> {
        let mut parser = Parser::new(signature);
        let type_parameters = parser.type_parameters()?;
        parser.expect(b'(', "'('")?;
        let mut parameters = Vec::new();
        while parser.peek() != Some(b')') {
            parameters.push(parser.java_type()?);
        }
        parser.expect(b')', "')'")?;
        let return_type = if parser.peek() == Some(b'V') {
            parser.bump();
            None
        } else {
            Some(parser.java_type()?)
        };
        let mut throws = Vec::new();
        while parser.peek() == Some(b'^') {
            parser.bump();
            throws.push(parser.reference_type()?);
        }
        parser.finish()?;
        Ok(Self {
            type_parameters,
            parameters,
            return_type,
            throws,
        })
    }

    /// Class names mentioned by the signature
    ///
    /// With `return_only` set only the return type contributes.
    pub fn class_names(&self, return_only: bool) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        if let Some(ret) = &self.return_type {
            ret.collect_class_names(&mut out);
        }
        if return_only {
            return out;
        }
        for param in &self.type_parameters {
            param.collect_class_names(&mut out);
        }
        for sig in self.parameters.iter().chain(&self.throws) {
            sig.collect_class_names(&mut out);
        }
        out
    }
}

/// Deepest nesting of reference types inside one signature
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, reason: &'static str) -> SignatureError {
        SignatureError {
            signature: self.text.to_string(),
            position: self.pos,
            reason,
        }
    }

    fn has_more(&self) -> bool {
        self.pos < self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, byte: u8, reason: &'static str) -> Result<(), SignatureError> {
        if self.peek() == Some(byte) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn finish(&self) -> Result<(), SignatureError> {
        if self.has_more() {
            Err(self.error("end of signature"))
        } else {
            Ok(())
        }
    }

    fn identifier(&mut self, allow_slash: bool) -> Result<String, SignatureError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let stop = matches!(c, b'.' | b';' | b'[' | b'<' | b'>' | b':') || (c == b'/' && !allow_slash);
            if stop {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("an identifier"));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn type_parameters(&mut self) -> Result<Vec<TypeParameter>, SignatureError> {
        let mut params = Vec::new();
        if self.peek() != Some(b'<') {
            return Ok(params);
        }
        self.bump();
        while self.peek() != Some(b'>') {
            let name = self.identifier(false)?;
            self.expect(b':', "':'")?;
            let class_bound = match self.peek() {
                Some(b'L' | b'T' | b'[') => Some(self.reference_type()?),
                _ => None,
            };
            let mut interface_bounds = Vec::new();
            while self.peek() == Some(b':') {
                self.bump();
                interface_bounds.push(self.reference_type()?);
            }
            params.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
        }
        self.bump();
        if params.is_empty() {
            return Err(self.error("at least one type parameter"));
        }
        Ok(params)
    }

    fn java_type(&mut self) -> Result<TypeSignature, SignatureError> {
        match self.peek().and_then(BaseType::from_char) {
            Some(base) => {
                self.bump();
                Ok(TypeSignature::Base(base))
            }
            None => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Result<TypeSignature, SignatureError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("at most 256 nested types"));
        }
        self.depth += 1;
        let sig = self.reference_type_body();
        self.depth -= 1;
        sig
    }

    fn reference_type_body(&mut self) -> Result<TypeSignature, SignatureError> {
        match self.peek() {
            Some(b'L') => Ok(TypeSignature::Class(self.class_type()?)),
            Some(b'T') => {
                self.bump();
                let name = self.identifier(false)?;
                self.expect(b';', "';'")?;
                Ok(TypeSignature::TypeVariable(name))
            }
            Some(b'[') => {
                self.bump();
                Ok(TypeSignature::Array(Box::new(self.java_type()?)))
            }
            _ => Err(self.error("a reference type")),
        }
    }

    fn class_type(&mut self) -> Result<ClassTypeSignature, SignatureError> {
        self.expect(b'L', "'L'")?;
        let outer = self.simple_class_type(true)?;
        let mut nested = Vec::new();
        while self.peek() == Some(b'.') {
            self.bump();
            nested.push(self.simple_class_type(false)?);
        }
        self.expect(b';', "';'")?;
        Ok(ClassTypeSignature { outer, nested })
    }

    fn simple_class_type(&mut self, allow_slash: bool) -> Result<SimpleClassType, SignatureError> {
        let name = self.identifier(allow_slash)?;
        let mut type_arguments = Vec::new();
        if self.peek() == Some(b'<') {
            self.bump();
            while self.peek() != Some(b'>') {
                type_arguments.push(self.type_argument()?);
            }
            self.bump();
            if type_arguments.is_empty() {
                return Err(self.error("at least one type argument"));
            }
        }
        Ok(SimpleClassType {
            name,
            type_arguments,
        })
    }

    fn type_argument(&mut self) -> Result<TypeArgument, SignatureError> {
        match self.peek() {
            Some(b'*') => {
                self.bump();
                Ok(TypeArgument::Any)
            }
            Some(b'+') => {
                self.bump();
                Ok(TypeArgument::Extends(self.reference_type()?))
            }
            Some(b'-') => {
                self.bump();
                Ok(TypeArgument::Super(self.reference_type()?))
            }
            Some(_) => Ok(TypeArgument::Exact(self.reference_type()?)),
            None => Err(self.error("a type argument")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: BTreeSet<String>) -> Vec<String> {
        set.into_iter().collect()
    }

    #[test]
    fn test_field_signature_with_generics() {
        let sig = TypeSignature::parse("Ljava/util/Map<Ljava/lang/String;[Lcom/example/Item;>;").unwrap();
        assert_eq!(
            names(sig.class_names()),
            vec!["com/example/Item", "java/lang/String", "java/util/Map"]
        );
    }

    #[test]
    fn test_nested_class_type_uses_binary_name() {
        let sig = TypeSignature::parse("Lcom/example/Outer<TT;>.Inner<Lcom/example/Value;>;").unwrap();
        assert_eq!(
            names(sig.class_names()),
            vec!["com/example/Outer$Inner", "com/example/Value"]
        );
    }

    #[test]
    fn test_class_signature() {
        let sig = ClassSignature::parse(
            "<T:Ljava/lang/Object;U::Ljava/lang/Comparable<TU;>;>Lcom/example/Base<TT;>;Ljava/util/function/Supplier<TU;>;",
        )
        .unwrap();
        assert_eq!(sig.type_parameters.len(), 2);
        assert!(sig.type_parameters[1].class_bound.is_none());
        assert_eq!(sig.interfaces.len(), 1);
        assert_eq!(
            names(sig.class_names()),
            vec![
                "com/example/Base",
                "java/lang/Comparable",
                "java/lang/Object",
                "java/util/function/Supplier"
            ]
        );
    }

    #[test]
    fn test_method_signature_return_only() {
        let sig = MethodSignature::parse(
            "<T:Ljava/lang/Object;>(Ljava/util/List<+TT;>;I)Ljava/util/Optional<Lcom/example/Result;>;^Ljava/io/IOException;",
        )
        .unwrap();
        assert_eq!(sig.parameters.len(), 2);
        assert_eq!(sig.throws.len(), 1);
        assert_eq!(
            names(sig.class_names(true)),
            vec!["com/example/Result", "java/util/Optional"]
        );
        let all = sig.class_names(false);
        assert!(all.contains("java/util/List"));
        assert!(all.contains("java/io/IOException"));
        assert!(all.contains("java/lang/Object"));
    }

    #[test]
    fn test_void_method_signature() {
        let sig = MethodSignature::parse("(Ljava/util/Set<*>;)V").unwrap();
        assert_eq!(sig.return_type, None);
        assert!(sig.class_names(true).is_empty());
    }

    #[test]
    fn test_malformed_signatures() {
        assert!(TypeSignature::parse("Ljava/util/List<>;").is_err());
        assert!(TypeSignature::parse("Ljava/util/List").is_err());
        assert!(TypeSignature::parse("I").is_err());
        assert!(MethodSignature::parse("(I").is_err());
        assert!(ClassSignature::parse("<>Ljava/lang/Object;").is_err());
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let shallow = format!("{}Ljava/lang/Object;", "[".repeat(200));
        assert!(TypeSignature::parse(&shallow).is_ok());

        let arrays = format!("{}Ljava/lang/Object;", "[".repeat(100_000));
        let err = TypeSignature::parse(&arrays).unwrap_err();
        assert_eq!(err.reason, "at most 256 nested types");

        let generics = format!("{}{}", "Ljava/util/List<".repeat(100_000), ">;".repeat(100_000));
        let err = TypeSignature::parse(&generics).unwrap_err();
        assert_eq!(err.reason, "at most 256 nested types");
    }
}
