/* Host type-graph collaborator and the model-backed snapshot implementing it */

use indexmap::IndexMap;
use retrofit_types::{
  Annotation, AnnotationValue, DeclaredType, ElementKind, Modifier, TypeDecl, TypeRef,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const JAVA_LANG_OBJECT: &str = "java.lang.Object";

/* A declared type as seen by the processor: the declaration plus where it lives */
#[derive(Debug, Clone, PartialEq)]
pub struct TypeElement {
  pub qualified_name: String,
  pub package: String,
  /* Simple names of the enclosing types, outermost first */
  pub enclosing: Vec<String>,
  /* Qualified names of directly nested types */
  pub nested: Vec<String>,
  pub decl: TypeDecl,
}

impl TypeElement {
  pub fn simple_name(&self) -> &str {
    &self.decl.name
  }

  /* Name relative to the package: `Outer.Inner` */
  pub fn class_name(&self) -> String {
    let mut parts = self.enclosing.clone();
    parts.push(self.decl.name.clone());
    parts.join(".")
  }

  pub fn kind(&self) -> ElementKind {
    self.decl.kind
  }

  /* The type with its own type variables as arguments */
  pub fn as_type_ref(&self) -> TypeRef {
    TypeRef::declared(
      self.qualified_name.clone(),
      self
        .decl
        .type_params
        .iter()
        .map(|p| TypeRef::TypeVar(p.name.clone()))
        .collect(),
    )
  }

  pub fn raw_type(&self) -> TypeRef {
    TypeRef::named(self.qualified_name.clone())
  }

  /* Bind this element's type parameters to the arguments of `instance` */
  pub fn bindings_for(&self, instance: &DeclaredType) -> HashMap<String, TypeRef> {
    if instance.args.len() != self.decl.type_params.len() {
      return HashMap::new();
    }
    self
      .decl
      .type_params
      .iter()
      .zip(instance.args.iter())
      .map(|(param, arg)| (param.name.clone(), arg.clone()))
      .collect()
  }
}

/* Capabilities the processor consumes from the host compiler */
pub trait TypeHost {
  /* Qualified names of types carrying `marker`, in declaration order */
  fn annotated_types(&self, marker: &str) -> Vec<String>;

  fn type_element(&self, qualified_name: &str) -> Option<&TypeElement>;

  fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool;

  /* Class-literal value of an annotation element, whether or not the named type exists yet */
  fn resolve_class_value(&self, annotation: &Annotation, key: &str) -> Option<TypeRef> {
    match annotation.value(key)? {
      AnnotationValue::Class(literal) => Some(literal.class.clone()),
      AnnotationValue::Str(text) => text.parse().ok(),
      _ => None,
    }
  }
}

/* Indexed snapshot of loaded declarations; rebuilt for every pass */
#[derive(Debug, Default)]
pub struct ModelGraph {
  elements: IndexMap<String, TypeElement>,
}

impl ModelGraph {
  pub fn new(decls: impl IntoIterator<Item = TypeDecl>) -> Self {
    let mut graph = Self::default();
    for decl in decls {
      let package = decl.package.clone().unwrap_or_default();
      graph.insert(decl, &package, &[]);
    }
    debug!(types = graph.elements.len(), "built type graph snapshot");
    graph
  }

  fn insert(&mut self, mut decl: TypeDecl, package: &str, enclosing: &[String]) -> String {
    let qualified_name = match (package.is_empty(), enclosing.is_empty()) {
      (true, true) => decl.name.clone(),
      (false, true) => format!("{}.{}", package, decl.name),
      (true, false) => format!("{}.{}", enclosing.join("."), decl.name),
      (false, false) => format!("{}.{}.{}", package, enclosing.join("."), decl.name),
    };

    normalize(&mut decl, &qualified_name);
    decl.package = Some(package.to_string());

    let mut inner_enclosing = enclosing.to_vec();
    inner_enclosing.push(decl.name.clone());
    let nested_decls = std::mem::take(&mut decl.nested);
    let nested = nested_decls
      .into_iter()
      .map(|nested| self.insert(nested, package, &inner_enclosing))
      .collect();

    let element = TypeElement {
      qualified_name: qualified_name.clone(),
      package: package.to_string(),
      enclosing: enclosing.to_vec(),
      nested,
      decl,
    };
    if self.elements.insert(qualified_name.clone(), element).is_some() {
      debug!("duplicate declaration of {}, keeping the last one", qualified_name);
    }
    qualified_name
  }

  pub fn len(&self) -> usize {
    self.elements.len()
  }

  pub fn is_empty(&self) -> bool {
    self.elements.is_empty()
  }

  pub fn elements(&self) -> impl Iterator<Item = &TypeElement> {
    self.elements.values()
  }

  /* Supertype of `sub` whose erasure is `target`, with type arguments substituted along the way */
  pub fn find_supertype(&self, sub: &DeclaredType, target: &str) -> Option<TypeRef> {
    let mut visited = HashSet::new();
    self.find_supertype_inner(sub, target, &mut visited)
  }

  fn find_supertype_inner(
    &self,
    sub: &DeclaredType,
    target: &str,
    visited: &mut HashSet<String>,
  ) -> Option<TypeRef> {
    if sub.name == target {
      return Some(TypeRef::Declared(sub.clone()));
    }
    if !visited.insert(sub.name.clone()) {
      return None;
    }
    let element = self.elements.get(&sub.name)?;
    let raw = sub.args.is_empty() && !element.decl.type_params.is_empty();
    let bindings = element.bindings_for(sub);

    let supertypes = element.decl.superclass.iter().chain(element.decl.interfaces.iter());
    for supertype in supertypes {
      /* raw types have raw supertypes */
      let supertype = if raw {
        supertype.erasure()
      } else {
        supertype.substitute(&bindings)
      };
      if let TypeRef::Declared(declared) = &supertype {
        if let Some(found) = self.find_supertype_inner(declared, target, visited) {
          return Some(found);
        }
      }
    }
    None
  }
}

/* Interface members are implicitly abstract; classes implicitly extend Object */
fn normalize(decl: &mut TypeDecl, qualified_name: &str) {
  match decl.kind {
    ElementKind::Interface => {
      for method in &mut decl.methods {
        let concrete = method.has_modifier(Modifier::Default) || method.has_modifier(Modifier::Static);
        if !concrete && !method.is_abstract() {
          method.modifiers.push(Modifier::Abstract);
        }
      }
    }
    ElementKind::Class | ElementKind::Enum => {
      if decl.superclass.is_none() && qualified_name != JAVA_LANG_OBJECT {
        decl.superclass = Some(TypeRef::named(JAVA_LANG_OBJECT));
      }
    }
    ElementKind::Annotation => {}
  }
}

impl TypeHost for ModelGraph {
  fn annotated_types(&self, marker: &str) -> Vec<String> {
    self
      .elements
      .values()
      .filter(|element| element.decl.has_annotation(marker))
      .map(|element| element.qualified_name.clone())
      .collect()
  }

  fn type_element(&self, qualified_name: &str) -> Option<&TypeElement> {
    self.elements.get(qualified_name)
  }

  fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
    match (sub, sup) {
      (TypeRef::Void, TypeRef::Void) => true,
      (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a == b,
      (TypeRef::TypeVar(a), TypeRef::TypeVar(b)) => a == b,
      (TypeRef::TypeVar(_), TypeRef::Declared(target)) => target.name == JAVA_LANG_OBJECT,
      (TypeRef::Array(a), TypeRef::Array(b)) => {
        if a.is_primitive() || b.is_primitive() {
          a == b
        } else {
          self.is_subtype(a, b)
        }
      }
      (TypeRef::Array(_), TypeRef::Declared(target)) => matches!(
        target.name.as_str(),
        JAVA_LANG_OBJECT | "java.io.Serializable" | "java.lang.Cloneable"
      ),
      (TypeRef::Declared(source), TypeRef::Declared(target)) => {
        if target.name == JAVA_LANG_OBJECT && target.args.is_empty() {
          return true;
        }
        match self.find_supertype(source, &target.name) {
          /* generics are invariant; a raw target accepts any instantiation */
          Some(found) => target.args.is_empty() || found.type_args() == target.args.as_slice(),
          None => false,
        }
      }
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use retrofit_types::{Annotation, ClassLiteral, MethodDecl};

  fn graph() -> ModelGraph {
    ModelGraph::new(vec![
      TypeDecl::class("Object", "java.lang")
        .method(MethodDecl::new("toString", TypeRef::named("java.lang.String"))),
      TypeDecl::class("Observable", "rx").type_param("T", vec![]),
      TypeDecl::class("PhotoStream", "com.x")
        .type_param("E", vec![])
        .extends("rx.Observable<E>".parse().unwrap()),
      TypeDecl::class("Photo", "com.x"),
      TypeDecl::interface("Api", "com.x")
        .method(MethodDecl::new("list", TypeRef::Void))
        .nest(TypeDecl::interface("Builder", "ignored")),
    ])
  }

  #[test]
  fn indexes_nested_types_with_enclosing_chain() {
    let graph = graph();
    let builder = graph.type_element("com.x.Api.Builder").unwrap();
    assert_eq!(builder.package, "com.x");
    assert_eq!(builder.enclosing, vec!["Api".to_string()]);
    assert_eq!(builder.class_name(), "Api.Builder");
    assert_eq!(
      graph.type_element("com.x.Api").unwrap().nested,
      vec!["com.x.Api.Builder".to_string()]
    );
  }

  #[test]
  fn interface_methods_become_abstract() {
    let graph = graph();
    let api = graph.type_element("com.x.Api").unwrap();
    assert!(api.decl.methods[0].is_abstract());
    assert!(api.decl.superclass.is_none());
    let photo = graph.type_element("com.x.Photo").unwrap();
    assert_eq!(photo.decl.superclass, Some(TypeRef::named(JAVA_LANG_OBJECT)));
  }

  #[test]
  fn subtyping_substitutes_type_arguments() {
    let graph = graph();
    let stream: TypeRef = "com.x.PhotoStream<com.x.Photo>".parse().unwrap();
    assert!(graph.is_subtype(&stream, &"rx.Observable<com.x.Photo>".parse().unwrap()));
    assert!(!graph.is_subtype(&stream, &"rx.Observable<java.lang.Object>".parse().unwrap()));
    assert!(graph.is_subtype(&stream, &TypeRef::named("rx.Observable")));
    assert!(graph.is_subtype(&stream, &TypeRef::named(JAVA_LANG_OBJECT)));
    assert!(!graph.is_subtype(&TypeRef::named("com.x.Photo"), &TypeRef::named("rx.Observable")));
  }

  #[test]
  fn class_values_resolve_without_the_type_existing() {
    let graph = graph();
    let annotation = Annotation::new("retrofit.http.Retrofit.Converter").with(
      "value",
      AnnotationValue::Class(ClassLiteral {
        class: TypeRef::named("com.x.NotYetGenerated"),
      }),
    );
    assert_eq!(
      graph.resolve_class_value(&annotation, "value"),
      Some(TypeRef::named("com.x.NotYetGenerated"))
    );
    assert!(graph.type_element("com.x.NotYetGenerated").is_none());
  }
}
