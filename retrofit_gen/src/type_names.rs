/* Type name resolver: shortest unambiguous spellings and the import list of a generated unit */

use crate::error::{ProcessError, ProcessResult};
use crate::host::TypeHost;
use retrofit_types::{TypeDecl, TypeRef};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

const JAVA_LANG: &str = "java.lang";

#[derive(Debug, Clone, Default)]
pub struct TypeNameResolver {
  /* qualified name -> spelling in the generated unit */
  spellings: HashMap<String, String>,
  imports: BTreeSet<String>,
}

impl TypeNameResolver {
  pub fn new<'t>(
    host: &dyn TypeHost,
    package: &str,
    types: impl IntoIterator<Item = &'t TypeRef>,
  ) -> ProcessResult<Self> {
    Self::for_unit(host, package, &[], types)
  }

  /// Resolves every declared type mentioned by `types`, recursively through
  /// type arguments and arrays. `unit_types` are the qualified names already
  /// in scope in the generated unit (the annotated type and the generated
  /// type); another type sharing one of their simple names is spelled in full.
  /// A mentioned type that is not in the snapshot is reported as missing so
  /// the caller can defer.
  pub fn for_unit<'t>(
    host: &dyn TypeHost,
    package: &str,
    unit_types: &[&str],
    types: impl IntoIterator<Item = &'t TypeRef>,
  ) -> ProcessResult<Self> {
    let mut referenced = BTreeSet::new();
    for ty in types {
      ty.for_each_declared(&mut |declared| {
        referenced.insert(declared.name.clone());
      });
    }

    /* simple name -> qualified name of the unit's own types */
    let in_scope: HashMap<&str, &str> = unit_types
      .iter()
      .map(|qualified| (qualified.rsplit('.').next().unwrap_or(*qualified), *qualified))
      .collect();

    /* simple name -> (qualified name, package, enclosing chain) */
    let mut by_simple: BTreeMap<String, Vec<(String, String, Vec<String>)>> = BTreeMap::new();
    for name in &referenced {
      let Some(element) = host.type_element(name) else {
        debug!("referenced type {} is not defined yet", name);
        return Err(ProcessError::MissingType { name: name.clone() });
      };
      by_simple
        .entry(element.simple_name().to_string())
        .or_default()
        .push((name.clone(), element.package.clone(), element.enclosing.clone()));
    }

    let mut resolver = Self::default();
    for (simple, candidates) in by_simple {
      let shadowed = in_scope
        .get(simple.as_str())
        .is_some_and(|own| candidates.iter().any(|(qualified, _, _)| qualified != own));
      if candidates.len() > 1 || shadowed {
        /* ambiguous: spell every one of them out */
        for (qualified, _, _) in candidates {
          resolver.spellings.insert(qualified.clone(), qualified);
        }
        continue;
      }
      for (qualified, type_package, enclosing) in candidates {
        if type_package == package || (type_package == JAVA_LANG && enclosing.is_empty()) {
          let mut spelled = enclosing;
          spelled.push(simple.clone());
          resolver.spellings.insert(qualified, spelled.join("."));
        } else {
          resolver.imports.insert(qualified.clone());
          resolver.spellings.insert(qualified, simple.clone());
        }
      }
    }
    Ok(resolver)
  }

  /* Spelling of a qualified name; names never resolved are spelled in full */
  pub fn simplify_name(&self, qualified: &str) -> String {
    self
      .spellings
      .get(qualified)
      .cloned()
      .unwrap_or_else(|| qualified.to_string())
  }

  pub fn simplify(&self, ty: &TypeRef) -> String {
    match ty {
      TypeRef::Declared(declared) => {
        let mut out = self.simplify_name(&declared.name);
        if !declared.args.is_empty() {
          let args: Vec<String> = declared.args.iter().map(|a| self.simplify(a)).collect();
          out.push('<');
          out.push_str(&args.join(", "));
          out.push('>');
        }
        out
      }
      TypeRef::Array(component) => format!("{}[]", self.simplify(component)),
      other => other.to_string(),
    }
  }

  /* Spelling without type arguments */
  pub fn simplify_raw(&self, ty: &TypeRef) -> String {
    self.simplify(&ty.erasure())
  }

  /* Simplified type arguments joined with `, `, if any */
  pub fn type_args(&self, ty: &TypeRef) -> Option<String> {
    let args = ty.type_args();
    if args.is_empty() {
      return None;
    }
    Some(args.iter().map(|a| self.simplify(a)).collect::<Vec<_>>().join(", "))
  }

  /* Sorted import list */
  pub fn imports(&self) -> Vec<String> {
    self.imports.iter().cloned().collect()
  }

  /* `<T extends Bound, U>` */
  pub fn formal_type_params(&self, decl: &TypeDecl) -> String {
    if decl.type_params.is_empty() {
      return String::new();
    }
    let params: Vec<String> = decl
      .type_params
      .iter()
      .map(|param| {
        if param.bounds.is_empty() {
          param.name.clone()
        } else {
          let bounds: Vec<String> = param.bounds.iter().map(|b| self.simplify(b)).collect();
          format!("{} extends {}", param.name, bounds.join(" & "))
        }
      })
      .collect();
    format!("<{}>", params.join(", "))
  }
}

/* `<T, U>` */
pub fn actual_type_params(decl: &TypeDecl) -> String {
  if decl.type_params.is_empty() {
    return String::new();
  }
  let names: Vec<&str> = decl.type_params.iter().map(|p| p.name.as_str()).collect();
  format!("<{}>", names.join(", "))
}

/* `<?, ?>` */
pub fn wildcard_type_params(decl: &TypeDecl) -> String {
  if decl.type_params.is_empty() {
    return String::new();
  }
  let wildcards = vec!["?"; decl.type_params.len()];
  format!("<{}>", wildcards.join(", "))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::ModelGraph;

  fn graph() -> ModelGraph {
    let mut decls = retrofit_loader::prelude_file().unwrap().packaged_types();
    decls.push(TypeDecl::class("Photo", "com.x.api"));
    decls.push(TypeDecl::class("User", "com.x.model"));
    decls.push(TypeDecl::class("User", "com.y.model"));
    decls.push(TypeDecl::interface("Api", "com.x.api"));
    decls.push(TypeDecl::interface("Api", "com.y.remote"));
    decls.push(TypeDecl::class("Retrofit_Api", "com.y.remote"));
    decls.push(TypeDecl::class("Album", "com.x.model").nest(TypeDecl::class("Cover", "")));
    ModelGraph::new(decls)
  }

  fn ty(text: &str) -> TypeRef {
    text.parse().unwrap()
  }

  #[test]
  fn colliding_simple_names_are_fully_qualified() {
    let graph = graph();
    let types = vec![ty("com.x.model.User"), ty("java.util.List<com.y.model.User>")];
    let names = TypeNameResolver::new(&graph, "com.x.api", &types).unwrap();
    assert_eq!(names.simplify(&types[0]), "com.x.model.User");
    assert_eq!(names.simplify(&types[1]), "List<com.y.model.User>");
    assert_eq!(names.imports(), vec!["java.util.List".to_string()]);
  }

  #[test]
  fn java_lang_and_same_package_need_no_import() {
    let graph = graph();
    let types = vec![
      ty("java.lang.String"),
      ty("com.x.api.Photo[]"),
      ty("rx.Observable<com.x.model.Album.Cover>"),
    ];
    let names = TypeNameResolver::new(&graph, "com.x.api", &types).unwrap();
    assert_eq!(names.simplify(&types[0]), "String");
    assert_eq!(names.simplify(&types[1]), "Photo[]");
    assert_eq!(names.simplify(&types[2]), "Observable<Cover>");
    assert_eq!(names.simplify_raw(&types[2]), "Observable");
    assert_eq!(names.type_args(&types[2]).as_deref(), Some("Cover"));
    assert_eq!(
      names.imports(),
      vec!["com.x.model.Album.Cover".to_string(), "rx.Observable".to_string()]
    );
  }

  #[test]
  fn names_in_scope_of_the_unit_are_never_imported_over() {
    let graph = graph();
    let types = vec![
      ty("com.y.remote.Api"),
      ty("com.y.remote.Retrofit_Api"),
      ty("com.x.api.Api"),
    ];
    let names = TypeNameResolver::for_unit(
      &graph,
      "com.x.api",
      &["com.x.api.Api", "com.x.api.Retrofit_Api"],
      &types,
    )
    .unwrap();
    assert_eq!(names.simplify(&types[0]), "com.y.remote.Api");
    assert_eq!(names.simplify(&types[1]), "com.y.remote.Retrofit_Api");
    assert_eq!(names.simplify(&types[2]), "com.x.api.Api");
    assert!(names.imports().is_empty());

    let own = vec![ty("com.x.api.Api")];
    let names = TypeNameResolver::for_unit(&graph, "com.x.api", &["com.x.api.Api"], &own).unwrap();
    assert_eq!(names.simplify(&own[0]), "Api");
  }

  #[test]
  fn undefined_type_is_missing() {
    let graph = graph();
    let types = vec![ty("java.util.List<com.x.api.Retrofit_Other>")];
    let err = TypeNameResolver::new(&graph, "com.x.api", &types).unwrap_err();
    assert_eq!(
      err,
      ProcessError::MissingType {
        name: "com.x.api.Retrofit_Other".to_string()
      }
    );
  }

  #[test]
  fn type_parameter_strings() {
    let graph = graph();
    let decl = TypeDecl::class("Paged", "com.x.api")
      .type_param("T", vec![ty("com.x.api.Photo")])
      .type_param("U", vec![]);
    let bounds = vec![ty("com.x.api.Photo")];
    let names = TypeNameResolver::new(&graph, "com.x.api", &bounds).unwrap();
    assert_eq!(names.formal_type_params(&decl), "<T extends Photo, U>");
    assert_eq!(actual_type_params(&decl), "<T, U>");
    assert_eq!(wildcard_type_params(&decl), "<?, ?>");
    assert_eq!(actual_type_params(&TypeDecl::class("Plain", "com.x")), "");
  }
}
