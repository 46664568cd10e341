use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
}

impl PrimitiveKind {
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Simple name of the boxed wrapper in `java.lang`.
    pub fn boxed(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Short => "Short",
            PrimitiveKind::Int => "Integer",
            PrimitiveKind::Long => "Long",
            PrimitiveKind::Char => "Character",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::Double => "Double",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "boolean" => PrimitiveKind::Boolean,
            "byte" => PrimitiveKind::Byte,
            "short" => PrimitiveKind::Short,
            "int" => PrimitiveKind::Int,
            "long" => PrimitiveKind::Long,
            "char" => PrimitiveKind::Char,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            _ => return None,
        };
        Some(kind)
    }
}

/// A reference to a declared type together with its type arguments.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct DeclaredType {
    /// Fully qualified name, nested types joined with `.`
    pub name: String,
    pub args: Vec<TypeRef>,
}

impl DeclaredType {
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// A type mirror as it appears in the model.
///
/// The textual form is what model files use:
///
/// * `void`, `int`, `boolean`, ... for void and primitives
/// * `T` (no dot) for a type variable
/// * `java.util.List<com.example.Photo>` for declared types, always qualified
/// * `byte[]`, `java.lang.String[][]` for arrays
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Void,
    Primitive(PrimitiveKind),
    Array(Box<TypeRef>),
    Declared(DeclaredType),
    TypeVar(String),
}

impl TypeRef {
    pub fn declared(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Declared(DeclaredType {
            name: name.into(),
            args,
        })
    }

    /// Declared type without type arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self::declared(name, Vec::new())
    }

    pub fn array_of(component: TypeRef) -> Self {
        TypeRef::Array(Box::new(component))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    /// True for arrays whose component is not a primitive (`String[]`, `int[][]`).
    pub fn is_reference_array(&self) -> bool {
        match self {
            TypeRef::Array(component) => !component.is_primitive(),
            _ => false,
        }
    }

    pub fn as_declared(&self) -> Option<&DeclaredType> {
        match self {
            TypeRef::Declared(declared) => Some(declared),
            _ => None,
        }
    }

    pub fn declared_name(&self) -> Option<&str> {
        self.as_declared().map(|d| d.name.as_str())
    }

    pub fn type_args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Declared(declared) => &declared.args,
            _ => &[],
        }
    }

    /// The only type argument of a single-argument specialization.
    pub fn single_type_arg(&self) -> Option<&TypeRef> {
        match self.type_args() {
            [arg] => Some(arg),
            _ => None,
        }
    }

    /// Drop type arguments everywhere; type variables are kept by name.
    pub fn erasure(&self) -> TypeRef {
        match self {
            TypeRef::Declared(declared) => TypeRef::named(declared.name.clone()),
            TypeRef::Array(component) => TypeRef::array_of(component.erasure()),
            other => other.clone(),
        }
    }

    /// Replace type variables using `bindings`; unbound variables are left as is.
    pub fn substitute(&self, bindings: &HashMap<String, TypeRef>) -> TypeRef {
        match self {
            TypeRef::TypeVar(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Array(component) => TypeRef::array_of(component.substitute(bindings)),
            TypeRef::Declared(declared) => TypeRef::declared(
                declared.name.clone(),
                declared.args.iter().map(|a| a.substitute(bindings)).collect(),
            ),
            other => other.clone(),
        }
    }

    /// Visit every declared type mentioned by this reference, outermost first.
    pub fn for_each_declared<'a>(&'a self, f: &mut dyn FnMut(&'a DeclaredType)) {
        match self {
            TypeRef::Declared(declared) => {
                f(declared);
                for arg in &declared.args {
                    arg.for_each_declared(f);
                }
            }
            TypeRef::Array(component) => component.for_each_declared(f),
            _ => {}
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(kind) => f.write_str(kind.keyword()),
            TypeRef::Array(component) => write!(f, "{}[]", component),
            TypeRef::TypeVar(name) => f.write_str(name),
            TypeRef::Declared(declared) => {
                f.write_str(&declared.name)?;
                if !declared.args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in declared.args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid type reference '{input}' at offset {offset}: {message}")]
pub struct TypeRefParseError {
    pub input: String,
    pub offset: usize,
    pub message: String,
}

struct TypeRefParser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> TypeRefParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> TypeRefParseError {
        TypeRefParseError {
            input: self.input.to_string(),
            offset: self.pos,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> Result<String, TypeRefParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeRefParseError> {
        let mut name = self.identifier()?;
        let mut qualified = false;
        while self.eat('.') {
            name.push('.');
            name.push_str(&self.identifier()?);
            qualified = true;
        }

        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.parse_type()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected ',' or '>'"));
            }
        }

        let mut ty = if qualified {
            TypeRef::declared(name, args)
        } else if !args.is_empty() {
            return Err(self.error(format!(
                "type arguments on unqualified name '{}'; declared types must be fully qualified",
                name
            )));
        } else if name == "void" {
            TypeRef::Void
        } else if let Some(kind) = PrimitiveKind::from_keyword(&name) {
            TypeRef::Primitive(kind)
        } else {
            TypeRef::TypeVar(name)
        };

        while self.eat('[') {
            if !self.eat(']') {
                return Err(self.error("expected ']'"));
            }
            ty = TypeRef::array_of(ty);
        }
        Ok(ty)
    }
}

impl FromStr for TypeRef {
    type Err = TypeRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeRefParser::new(s);
        let ty = parser.parse_type()?;
        if parser.peek().is_some() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeRefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_generics_and_arrays() {
        let ty: TypeRef = "java.util.Map<java.lang.String, java.util.List<com.x.Photo>>[]"
            .parse()
            .unwrap();
        let TypeRef::Array(component) = &ty else {
            panic!("expected array, got {:?}", ty);
        };
        let map = component.as_declared().unwrap();
        assert_eq!(map.name, "java.util.Map");
        assert_eq!(map.args.len(), 2);
        assert_eq!(
            map.args[1].single_type_arg(),
            Some(&TypeRef::named("com.x.Photo"))
        );
        assert_eq!(
            ty.to_string(),
            "java.util.Map<java.lang.String, java.util.List<com.x.Photo>>[]"
        );
    }

    #[test]
    fn unqualified_names_are_primitives_or_type_variables() {
        assert_eq!("int".parse::<TypeRef>().unwrap(), TypeRef::Primitive(PrimitiveKind::Int));
        assert_eq!("void".parse::<TypeRef>().unwrap(), TypeRef::Void);
        assert_eq!("T".parse::<TypeRef>().unwrap(), TypeRef::TypeVar("T".to_string()));
        assert!("byte[]".parse::<TypeRef>().unwrap().is_array());
        assert!(!"byte[]".parse::<TypeRef>().unwrap().is_reference_array());
        assert!("java.lang.String[]".parse::<TypeRef>().unwrap().is_reference_array());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("List<String>".parse::<TypeRef>().is_err());
        assert!("java.util.List<".parse::<TypeRef>().is_err());
        assert!("int[".parse::<TypeRef>().is_err());
        assert!("a.b c".parse::<TypeRef>().is_err());
    }

    #[test]
    fn substitutes_type_variables() {
        let ty: TypeRef = "rx.Observable<T>".parse().unwrap();
        let mut bindings = HashMap::new();
        bindings.insert("T".to_string(), TypeRef::named("com.x.Photo"));
        assert_eq!(ty.substitute(&bindings).to_string(), "rx.Observable<com.x.Photo>");
        assert_eq!(ty.erasure().to_string(), "rx.Observable");
    }
}
