/* Type graph walker: the override-resolved method set of a type */

use crate::host::{TypeElement, TypeHost};
use indexmap::IndexMap;
use retrofit_types::{DeclaredType, MethodDecl, ParamDecl, TypeRef};
use serde_derive::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Method name plus erased parameter types.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
  pub name: String,
  pub params: Vec<String>,
}

impl MethodSignature {
  pub fn of(method: &MethodDecl) -> Self {
    Self {
      name: method.name.clone(),
      params: method.params.iter().map(|p| erased(&p.ty)).collect(),
    }
  }
}

impl fmt::Display for MethodSignature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({})", self.name, self.params.join(", "))
  }
}

/* Type variables left unbound erase to Object */
fn erased(ty: &TypeRef) -> String {
  match ty {
    TypeRef::TypeVar(_) => crate::host::JAVA_LANG_OBJECT.to_string(),
    TypeRef::Array(component) => format!("{}[]", erased(component)),
    other => other.erasure().to_string(),
  }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodEntry {
  /* Qualified name of the declaring type */
  pub owner: String,
  /* The declaration, with the owner's type arguments substituted */
  #[serde(skip)]
  pub method: MethodDecl,
  pub signature: MethodSignature,
  /* Owners of the entries this one displaced */
  pub overrides: Vec<String>,
}

impl MethodEntry {
  pub fn is_abstract(&self) -> bool {
    self.method.is_abstract()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
  Added,
  Duplicate,
  Overrode,
}

/* Method table keyed by signature */
#[derive(Debug, Default)]
pub struct MethodTable {
  entries: IndexMap<MethodSignature, MethodEntry>,
}

impl MethodTable {
  pub fn new() -> Self {
    Self::default()
  }

  /* `is_subtype(a, b)` tells whether type `a` is a subtype of type `b` */
  pub fn insert(
    &mut self,
    owner: &str,
    method: MethodDecl,
    is_subtype: impl Fn(&str, &str) -> bool,
  ) -> Insertion {
    let signature = MethodSignature::of(&method);
    let Some(existing) = self.entries.get(&signature) else {
      self.entries.insert(
        signature.clone(),
        MethodEntry {
          owner: owner.to_string(),
          method,
          signature,
          overrides: Vec::new(),
        },
      );
      return Insertion::Added;
    };

    /* seen on another inheritance path, or the existing entry is already more specific */
    if existing.owner == owner || is_subtype(&existing.owner, owner) {
      return Insertion::Duplicate;
    }

    let Some(displaced) = self.entries.shift_remove(&signature) else {
      return Insertion::Duplicate;
    };
    let mut overridden = displaced.overrides;
    overridden.push(displaced.owner);
    self.entries.insert(
      signature.clone(),
      MethodEntry {
        owner: owner.to_string(),
        method,
        signature,
        overrides: overridden,
      },
    );
    Insertion::Overrode
  }

  pub fn get(&self, signature: &MethodSignature) -> Option<&MethodEntry> {
    self.entries.get(signature)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn entries(&self) -> impl Iterator<Item = &MethodEntry> {
    self.entries.values()
  }

  pub fn into_entries(self) -> Vec<MethodEntry> {
    self.entries.into_values().collect()
  }
}

/// Collects every non-private method `type_name` declares or inherits:
/// superinterfaces first, then the superclass, then the type itself.
/// Supertypes missing from the snapshot are skipped.
pub fn collect_methods(host: &dyn TypeHost, type_name: &str) -> Vec<MethodEntry> {
  let Some(element) = host.type_element(type_name) else {
    return Vec::new();
  };
  let mut table = MethodTable::new();
  let mut visiting = HashSet::new();
  let root = DeclaredType {
    name: element.qualified_name.clone(),
    args: Vec::new(),
  };
  walk(host, element, &root, &mut table, &mut visiting);
  debug!(type_name, methods = table.len(), "collected methods");
  table.into_entries()
}

fn walk(
  host: &dyn TypeHost,
  element: &TypeElement,
  instance: &DeclaredType,
  table: &mut MethodTable,
  visiting: &mut HashSet<String>,
) {
  if !visiting.insert(element.qualified_name.clone()) {
    return;
  }
  let bindings = element.bindings_for(instance);

  let supertypes = element
    .decl
    .interfaces
    .iter()
    .chain(element.decl.superclass.iter());
  for supertype in supertypes {
    let TypeRef::Declared(declared) = supertype.substitute(&bindings) else {
      continue;
    };
    match host.type_element(&declared.name) {
      Some(super_element) => walk(host, super_element, &declared, table, visiting),
      None => debug!("skipping supertype {} missing from snapshot", declared.name),
    }
  }

  let is_subtype = |sub: &str, sup: &str| host.is_subtype(&TypeRef::named(sub), &TypeRef::named(sup));
  for method in &element.decl.methods {
    if method.is_private() {
      continue;
    }
    let method = substitute_method(method, &bindings);
    table.insert(&element.qualified_name, method, is_subtype);
  }

  visiting.remove(&element.qualified_name);
}

fn substitute_method(method: &MethodDecl, bindings: &HashMap<String, TypeRef>) -> MethodDecl {
  if bindings.is_empty() {
    return method.clone();
  }
  MethodDecl {
    returns: method.returns.substitute(bindings),
    params: method
      .params
      .iter()
      .map(|p| ParamDecl {
        ty: p.ty.substitute(bindings),
        ..p.clone()
      })
      .collect(),
    ..method.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::ModelGraph;
  use retrofit_types::{Modifier, PrimitiveKind, TypeDecl};

  fn names(entries: &[MethodEntry]) -> Vec<String> {
    entries
      .iter()
      .map(|e| format!("{}#{}", e.owner.rsplit('.').next().unwrap_or(""), e.signature))
      .collect()
  }

  #[test]
  fn diamond_inheritance_yields_one_entry() {
    let graph = ModelGraph::new(vec![
      TypeDecl::interface("Base", "com.x").method(MethodDecl::new("id", TypeRef::named("java.lang.String"))),
      TypeDecl::interface("Left", "com.x").implements(TypeRef::named("com.x.Base")),
      TypeDecl::interface("Right", "com.x").implements(TypeRef::named("com.x.Base")),
      TypeDecl::interface("Api", "com.x")
        .implements(TypeRef::named("com.x.Left"))
        .implements(TypeRef::named("com.x.Right")),
    ]);
    let entries = collect_methods(&graph, "com.x.Api");
    assert_eq!(names(&entries), vec!["Base#id()"]);
  }

  #[test]
  fn redeclaration_on_one_path_is_not_undone_by_another() {
    let graph = ModelGraph::new(vec![
      TypeDecl::interface("Base", "com.x").method(MethodDecl::new("id", TypeRef::named("java.lang.String"))),
      TypeDecl::interface("Left", "com.x")
        .implements(TypeRef::named("com.x.Base"))
        .method(MethodDecl::new("id", TypeRef::named("java.lang.String"))),
      TypeDecl::interface("Right", "com.x").implements(TypeRef::named("com.x.Base")),
      TypeDecl::interface("Api", "com.x")
        .implements(TypeRef::named("com.x.Left"))
        .implements(TypeRef::named("com.x.Right")),
    ]);
    let entries = collect_methods(&graph, "com.x.Api");
    assert_eq!(names(&entries), vec!["Left#id()"]);
    assert_eq!(entries[0].overrides, vec!["com.x.Base".to_string()]);
  }

  #[test]
  fn concrete_superclass_method_removes_abstract_declaration() {
    let graph = ModelGraph::new(vec![
      TypeDecl::interface("Named", "com.x").method(MethodDecl::new("name", TypeRef::named("java.lang.String"))),
      TypeDecl::class("BaseImpl", "com.x")
        .with_modifiers(&[Modifier::Abstract])
        .method(MethodDecl::new("name", TypeRef::named("java.lang.String")).with_modifiers(&[Modifier::Public])),
      TypeDecl::class("Api", "com.x")
        .with_modifiers(&[Modifier::Abstract])
        .extends(TypeRef::named("com.x.BaseImpl"))
        .implements(TypeRef::named("com.x.Named"))
        .method(MethodDecl::abstract_method("count", TypeRef::Primitive(PrimitiveKind::Int))),
    ]);
    let entries = collect_methods(&graph, "com.x.Api");
    assert_eq!(names(&entries), vec!["BaseImpl#name()", "Api#count()"]);
    assert!(!entries[0].is_abstract());
    assert_eq!(entries[0].overrides, vec!["com.x.Named".to_string()]);
  }

  #[test]
  fn private_methods_and_missing_supertypes_are_skipped() {
    let graph = ModelGraph::new(vec![TypeDecl::class("Api", "com.x")
      .implements(TypeRef::named("com.x.NotThereYet"))
      .method(MethodDecl::new("helper", TypeRef::Void).with_modifiers(&[Modifier::Private]))
      .method(MethodDecl::abstract_method("list", TypeRef::Void))]);
    let entries = collect_methods(&graph, "com.x.Api");
    assert_eq!(names(&entries), vec!["Api#list()"]);
  }

  #[test]
  fn generic_supertypes_are_substituted() {
    let graph = ModelGraph::new(vec![
      TypeDecl::interface("Repo", "com.x")
        .type_param("T", vec![])
        .method(MethodDecl::new("get", TypeRef::TypeVar("T".into())))
        .method(
          MethodDecl::new("put", TypeRef::Void)
            .param(ParamDecl::new("item", TypeRef::TypeVar("T".into()))),
        ),
      TypeDecl::interface("PhotoRepo", "com.x")
        .implements("com.x.Repo<com.x.Photo>".parse().unwrap())
        .method(
          MethodDecl::new("put", TypeRef::Void)
            .param(ParamDecl::new("item", TypeRef::named("com.x.Photo"))),
        ),
    ]);
    let entries = collect_methods(&graph, "com.x.PhotoRepo");
    assert_eq!(entries[0].method.returns, TypeRef::named("com.x.Photo"));
    assert_eq!(names(&entries), vec!["Repo#get()", "PhotoRepo#put(com.x.Photo)"]);
  }
}
