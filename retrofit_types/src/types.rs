use crate::type_ref::TypeRef;
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    #[default]
    Class,
    Interface,
    Enum,
    Annotation,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Abstract,
    Static,
    Final,
    Default,
}

/// Class literal inside an annotation (`converter: { class: com.x.MyConverter }`).
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ClassLiteral {
    pub class: TypeRef,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
#[serde(expecting = "expected bool, integer, string, class literal or list")]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Class(ClassLiteral),
    List(Vec<AnnotationValue>),
}

impl AnnotationValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /* Java lets a single element stand in for a one-element array */
    pub fn as_strings(&self) -> Vec<String> {
        match self {
            AnnotationValue::Str(s) => vec![s.clone()],
            AnnotationValue::List(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Annotation {
    /// Qualified name of the annotation type, nested types joined with `.`
    pub name: String,
    #[serde(default)]
    pub values: IndexMap<String, AnnotationValue>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: IndexMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn with_str(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(key, AnnotationValue::Str(value.into()))
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn value(&self, key: &str) -> Option<&AnnotationValue> {
        self.values.get(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(AnnotationValue::as_str)
    }

    /// String value for `key`, or `""` when absent (the Java default for `String value()`).
    pub fn string_or_empty(&self, key: &str) -> &str {
        self.string(key).unwrap_or("")
    }

    pub fn strings(&self, key: &str) -> Vec<String> {
        self.value(key).map(AnnotationValue::as_strings).unwrap_or_default()
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.value(key) {
            Some(AnnotationValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TypeParam {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<TypeRef>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

fn void_type() -> TypeRef {
    TypeRef::Void
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default = "void_type")]
    pub returns: TypeRef,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, returns: TypeRef) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
            returns,
            params: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Public abstract method, the common shape in annotated types.
    pub fn abstract_method(name: impl Into<String>, returns: TypeRef) -> Self {
        Self::new(name, returns).with_modifiers(&[Modifier::Public, Modifier::Abstract])
    }

    pub fn with_modifiers(mut self, modifiers: &[Modifier]) -> Self {
        self.modifiers.extend_from_slice(modifiers);
        self
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn is_abstract(&self) -> bool {
        self.has_modifier(Modifier::Abstract)
    }

    pub fn is_private(&self) -> bool {
        self.has_modifier(Modifier::Private)
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    /* Compile-time constant value, if the initializer is one */
    #[serde(default)]
    pub constant: Option<AnnotationValue>,
}

impl FieldDecl {
    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TypeDecl {
    /// Simple name
    pub name: String,
    /// Overrides the package of the containing model file
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub kind: ElementKind,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub superclass: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub nested: Vec<TypeDecl>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, package: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            package: Some(package.into()),
            kind,
            modifiers: Vec::new(),
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            annotations: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self::new(name, package, ElementKind::Class)
    }

    pub fn interface(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self::new(name, package, ElementKind::Interface)
    }

    pub fn with_modifiers(mut self, modifiers: &[Modifier]) -> Self {
        self.modifiers.extend_from_slice(modifiers);
        self
    }

    pub fn extends(mut self, superclass: TypeRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn type_param(mut self, name: impl Into<String>, bounds: Vec<TypeRef>) -> Self {
        self.type_params.push(TypeParam {
            name: name.into(),
            bounds,
        });
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn nest(mut self, nested: TypeDecl) -> Self {
        self.nested.push(nested);
        self
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_model_declaration() {
        let yaml = r#"
name: PhotoService
kind: interface
annotations:
  - name: retrofit.http.Retrofit
    values:
      value: https://api.example.com
  - name: retrofit.http.Retrofit.Converter
    values:
      value: { class: retrofit.converter.GsonConverter }
methods:
  - name: list
    returns: java.util.List<com.x.Photo>
    annotations:
      - name: retrofit.http.Retrofit.GET
        values:
          value: /photos
          permissions: [read, list]
    params:
      - name: page
        type: int
  - name: reset
"#;
        let decl: TypeDecl = serde_yml::from_str(yaml).unwrap();
        assert_eq!(decl.kind, ElementKind::Interface);
        assert_eq!(decl.package, None);
        assert_eq!(
            decl.annotation("retrofit.http.Retrofit").unwrap().string_or_empty("value"),
            "https://api.example.com"
        );
        assert_eq!(
            decl.annotations[1].value("value"),
            Some(&AnnotationValue::Class(ClassLiteral {
                class: TypeRef::named("retrofit.converter.GsonConverter"),
            }))
        );

        let list = &decl.methods[0];
        let get = list.annotation("retrofit.http.Retrofit.GET").unwrap();
        assert_eq!(get.strings("permissions"), vec!["read", "list"]);
        assert_eq!(get.strings("value"), vec!["/photos"]);
        assert_eq!(list.params[0].ty, TypeRef::Primitive(crate::PrimitiveKind::Int));
        assert_eq!(decl.methods[1].returns, TypeRef::Void);
    }

    #[test]
    fn annotation_defaults_follow_java() {
        let annotation = Annotation::new("retrofit.http.Retrofit.Authenticated")
            .with("required", AnnotationValue::Bool(true));
        assert_eq!(annotation.simple_name(), "Authenticated");
        assert_eq!(annotation.string_or_empty("value"), "");
        assert_eq!(annotation.bool("required"), Some(true));
        assert!(annotation.strings("value").is_empty());
    }
}
