/* Builder spec analyzer: nested fluent builder types and the properties they feed */

use crate::annotations::{AnnotationTable, Capability, VERBS};
use crate::diagnostics::Reporter;
use crate::error::ProcessResult;
use crate::host::{TypeElement, TypeHost};
use crate::property::PropertyDescriptor;
use crate::type_names::TypeNameResolver;
use crate::walker::collect_methods;
use retrofit_types::{ElementKind, MethodDecl, TypeRef};
use serde_derive::Serialize;
use tracing::debug;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct BuilderSetter {
  pub name: String,
  #[serde(rename = "type")]
  pub type_text: String,
  /* Position in the set-tracking bit vector */
  pub bit: usize,
  /* Ordinary property this setter feeds, if any */
  pub property: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct BuilderDescriptor {
  pub name: String,
  pub build_method: String,
  pub setters: Vec<BuilderSetter>,
  pub to_builder_methods: Vec<String>,
  /* Properties that must be set before build */
  pub required: Vec<String>,
}

/// The nested builder type found on an annotated type, before names are resolved.
#[derive(Debug, Clone)]
pub struct BuilderSpec {
  pub qualified_name: String,
  pub build_method: String,
  pub setters: Vec<MethodDecl>,
  owner: String,
}

impl BuilderSpec {
  /// Finds the nested type carrying the builder marker, if any.
  pub fn find(
    host: &dyn TypeHost,
    table: &AnnotationTable,
    element: &TypeElement,
    reporter: &mut Reporter,
  ) -> ProcessResult<Option<Self>> {
    let marker = table.primary_name(Capability::Builder);
    let builders: Vec<&TypeElement> = element
      .nested
      .iter()
      .filter_map(|name| host.type_element(name))
      .filter(|nested| nested.decl.has_annotation(marker))
      .collect();

    let builder = match builders.as_slice() {
      [] => return Ok(None),
      [builder] => *builder,
      [_, second, ..] => {
        return Err(reporter.abort_with_error(
          format!("{} may have at most one @Builder type", element.qualified_name),
          &second.qualified_name,
        ));
      }
    };

    if !matches!(builder.kind(), ElementKind::Class | ElementKind::Interface) {
      return Err(reporter.abort_with_error(
        "@Builder can only apply to a class or an interface",
        &builder.qualified_name,
      ));
    }

    let mut setters = Vec::new();
    let mut build_methods = Vec::new();
    for entry in collect_methods(host, &builder.qualified_name) {
      if !entry.is_abstract() {
        continue;
      }
      let method = entry.method;
      let returns = method.returns.declared_name();
      if method.params.len() == 1 && returns == Some(builder.qualified_name.as_str()) {
        setters.push(method);
      } else if method.params.is_empty() && returns == Some(element.qualified_name.as_str()) {
        build_methods.push(method.name);
      } else {
        debug!(
          "ignoring builder method {}#{} that is neither a setter nor a build method",
          builder.qualified_name, method.name
        );
      }
    }

    let build_method = match build_methods.as_slice() {
      [name] => name.clone(),
      [] => {
        return Err(reporter.abort_with_error(
          format!(
            "Builder must have a single no-argument method returning {}",
            element.qualified_name
          ),
          &builder.qualified_name,
        ));
      }
      [_, ..] => {
        return Err(reporter.abort_with_error(
          format!(
            "Builder has more than one build method: {}",
            build_methods.join(", ")
          ),
          &builder.qualified_name,
        ));
      }
    };

    Ok(Some(Self {
      qualified_name: builder.qualified_name.clone(),
      build_method,
      setters,
      owner: element.qualified_name.clone(),
    }))
  }

  pub fn builder_type(&self) -> TypeRef {
    TypeRef::named(self.qualified_name.clone())
  }

  /* Types the builder contributes to the generated unit */
  pub fn referenced_types(&self) -> Vec<TypeRef> {
    let mut types = vec![self.builder_type()];
    types.extend(self.setters.iter().flat_map(|s| s.params.iter().map(|p| p.ty.clone())));
    types
  }

  /* Zero-argument method of the annotated type handing back a pre-filled builder */
  pub fn is_to_builder(&self, method: &MethodDecl) -> bool {
    method.params.is_empty() && method.returns.declared_name() == Some(self.qualified_name.as_str())
  }

  /* One-argument, verb-less method of the annotated type that only repeats a builder setter */
  pub fn is_setter_duplicate(&self, table: &AnnotationTable, method: &MethodDecl) -> bool {
    method.params.len() == 1
      && table.find_any(&VERBS, &method.annotations).is_none()
      && self.setters.iter().any(|setter| setter.name == method.name)
  }

  pub fn setter_for(&self, property: &str) -> Option<&MethodDecl> {
    let prefixed = format!("set{}", capitalize(property));
    self
      .setters
      .iter()
      .find(|setter| setter.name == property || setter.name == prefixed)
  }

  /// A restore method is satisfiable when every getter-shaped property has a setter.
  pub fn can_restore(&self, properties: &[PropertyDescriptor]) -> bool {
    properties
      .iter()
      .filter(|p| p.params.is_empty() && !p.is_void)
      .all(|p| self.setter_for(&p.name).is_some())
  }

  pub fn describe(
    &self,
    names: &TypeNameResolver,
    properties: &[PropertyDescriptor],
    to_builder_methods: Vec<String>,
  ) -> BuilderDescriptor {
    let setters: Vec<BuilderSetter> = self
      .setters
      .iter()
      .enumerate()
      .map(|(bit, setter)| BuilderSetter {
        name: setter.name.clone(),
        type_text: setter
          .params
          .first()
          .map(|p| names.simplify(&p.ty))
          .unwrap_or_default(),
        bit,
        property: properties
          .iter()
          .find(|p| self.setter_for(&p.name).is_some_and(|s| s.name == setter.name))
          .map(|p| p.name.clone()),
      })
      .collect();

    let required = properties
      .iter()
      .filter(|p| !p.nullable && setters.iter().any(|s| s.property.as_ref() == Some(&p.name)))
      .map(|p| p.name.clone())
      .collect();

    debug!(builder = %self.qualified_name, owner = %self.owner, setters = setters.len(), "described builder");
    BuilderDescriptor {
      name: names.simplify_raw(&self.builder_type()),
      build_method: self.build_method.clone(),
      setters,
      to_builder_methods,
      required,
    }
  }
}

pub(crate) fn capitalize(name: &str) -> String {
  let mut chars = name.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ProcessorConfig;
  use crate::error::ProcessError;
  use crate::host::ModelGraph;
  use retrofit_types::{Annotation, ParamDecl, PrimitiveKind, TypeDecl};

  fn builder_marker() -> Annotation {
    Annotation::new("retrofit.http.Retrofit.Builder")
  }

  fn api_with(nested: Vec<TypeDecl>) -> ModelGraph {
    let mut api = TypeDecl::class("Api", "com.x").annotated(Annotation::new("retrofit.http.Retrofit"));
    for decl in nested {
      api = api.nest(decl);
    }
    let mut decls = retrofit_loader::prelude_file().unwrap().packaged_types();
    decls.push(api);
    ModelGraph::new(decls)
  }

  fn fluent_builder() -> TypeDecl {
    TypeDecl::interface("Builder", "")
      .annotated(builder_marker())
      .method(
        MethodDecl::new("endpoint", TypeRef::named("com.x.Api.Builder"))
          .param(ParamDecl::new("endpoint", TypeRef::named("java.lang.String"))),
      )
      .method(
        MethodDecl::new("setTimeout", TypeRef::named("com.x.Api.Builder"))
          .param(ParamDecl::new("timeout", TypeRef::Primitive(PrimitiveKind::Int))),
      )
      .method(MethodDecl::new("build", TypeRef::named("com.x.Api")))
  }

  fn find(graph: &ModelGraph, reporter: &mut Reporter) -> ProcessResult<Option<BuilderSpec>> {
    let table = AnnotationTable::new(&ProcessorConfig::default());
    let element = graph.type_element("com.x.Api").unwrap();
    BuilderSpec::find(graph, &table, element, reporter)
  }

  #[test]
  fn finds_setters_and_build_method() {
    let graph = api_with(vec![fluent_builder()]);
    let mut reporter = Reporter::new();
    let spec = find(&graph, &mut reporter).unwrap().unwrap();
    assert_eq!(spec.qualified_name, "com.x.Api.Builder");
    assert_eq!(spec.build_method, "build");
    let setters: Vec<&str> = spec.setters.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(setters, vec!["endpoint", "setTimeout"]);
    assert_eq!(spec.setter_for("timeout").unwrap().name, "setTimeout");
    assert_eq!(spec.setter_for("endpoint").unwrap().name, "endpoint");
    assert!(spec.setter_for("missing").is_none());
  }

  #[test]
  fn no_builder_is_none() {
    let graph = api_with(vec![TypeDecl::class("Helper", "")]);
    let mut reporter = Reporter::new();
    assert!(find(&graph, &mut reporter).unwrap().is_none());
  }

  #[test]
  fn builder_on_enum_aborts() {
    let graph = api_with(vec![TypeDecl::new("Builder", "", ElementKind::Enum).annotated(builder_marker())]);
    let mut reporter = Reporter::new();
    let err = find(&graph, &mut reporter).unwrap_err();
    assert_eq!(err, ProcessError::Abort);
    assert_eq!(reporter.diagnostics()[0].element, "com.x.Api.Builder");
  }

  #[test]
  fn builder_without_build_method_aborts() {
    let builder = TypeDecl::interface("Builder", "").annotated(builder_marker()).method(
      MethodDecl::new("endpoint", TypeRef::named("com.x.Api.Builder"))
        .param(ParamDecl::new("endpoint", TypeRef::named("java.lang.String"))),
    );
    let graph = api_with(vec![builder]);
    let mut reporter = Reporter::new();
    assert_eq!(find(&graph, &mut reporter).unwrap_err(), ProcessError::Abort);
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn two_builders_abort() {
    let second = TypeDecl::interface("OtherBuilder", "").annotated(builder_marker());
    let graph = api_with(vec![fluent_builder(), second]);
    let mut reporter = Reporter::new();
    assert_eq!(find(&graph, &mut reporter).unwrap_err(), ProcessError::Abort);
  }

  #[test]
  fn restore_and_duplicate_setter_shapes() {
    let graph = api_with(vec![fluent_builder()]);
    let mut reporter = Reporter::new();
    let spec = find(&graph, &mut reporter).unwrap().unwrap();
    let table = AnnotationTable::new(&ProcessorConfig::default());

    let to_builder = MethodDecl::abstract_method("toBuilder", TypeRef::named("com.x.Api.Builder"));
    assert!(spec.is_to_builder(&to_builder));

    let duplicate = MethodDecl::abstract_method("endpoint", TypeRef::Void)
      .param(ParamDecl::new("endpoint", TypeRef::named("java.lang.String")));
    assert!(spec.is_setter_duplicate(&table, &duplicate));

    let request = duplicate
      .clone()
      .annotated(Annotation::new("retrofit.http.Retrofit.POST").with_str("value", "/endpoint"));
    assert!(!spec.is_setter_duplicate(&table, &request));
  }

  #[test]
  fn capitalizes_first_letter() {
    assert_eq!(capitalize("timeout"), "Timeout");
    assert_eq!(capitalize(""), "");
  }
}
