/* Property descriptor builder: one request descriptor per abstract method */

use crate::annotations::{AnnotationTable, Capability, VERBS};
use crate::classify::{Classifier, ExecutionMode, PartKind, ResponseKind, definitive_part_kind};
use crate::config::ProcessorConfig;
use crate::diagnostics::{Reporter, method_element};
use crate::error::{ProcessError, ProcessResult};
use crate::host::TypeHost;
use crate::path::{PathTemplate, quote_java, static_queries};
use crate::type_names::TypeNameResolver;
use indexmap::IndexMap;
use retrofit_types::{Annotation, AnnotationValue, MethodDecl, Modifier, ParamDecl, TypeRef};
use serde_derive::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
  Get,
  Post,
  Put,
  Delete,
  Head,
}

impl HttpVerb {
  fn from_capability(capability: Capability) -> Option<Self> {
    match capability {
      Capability::Get => Some(HttpVerb::Get),
      Capability::Post => Some(HttpVerb::Post),
      Capability::Put => Some(HttpVerb::Put),
      Capability::Delete => Some(HttpVerb::Delete),
      Capability::Head => Some(HttpVerb::Head),
      _ => None,
    }
  }

  /* Resolved verb never carries a request body */
  pub fn is_bodyless(self) -> bool {
    matches!(self, HttpVerb::Get | HttpVerb::Delete | HttpVerb::Head)
  }
}

/* Verb predicates as the templates see them; a legacy HEAD marker raises every one */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerbFlags {
  pub is_get: bool,
  pub is_post: bool,
  pub is_put: bool,
  pub is_delete: bool,
  pub is_head: bool,
}

impl VerbFlags {
  pub fn of(table: &AnnotationTable, annotations: &[Annotation]) -> Self {
    let primary = |capability: Capability| table.find_primary(capability, annotations).is_some();
    let legacy_head = table
      .sources(Capability::Head)
      .get(1)
      .is_some_and(|name| annotations.iter().any(|a| &a.name == name));
    Self {
      is_get: primary(Capability::Get) || legacy_head,
      is_post: primary(Capability::Post) || legacy_head,
      is_put: primary(Capability::Put) || legacy_head,
      is_delete: primary(Capability::Delete) || legacy_head,
      is_head: primary(Capability::Head) || legacy_head,
    }
  }
}

/* Value source for a query, header or field entry */
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Binding {
  Literal(String),
  Param(String),
}

impl Binding {
  /* Java expression producing the value */
  pub fn expression(&self) -> String {
    match self {
      Binding::Literal(text) => quote_java(text),
      Binding::Param(name) => name.clone(),
    }
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PartBinding {
  pub param: String,
  pub mime_type: Option<String>,
  /* Set only when exactly one wrapper probe matched */
  pub kind: Option<PartKind>,
  pub probes: Vec<PartKind>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ParamSpec {
  pub name: String,
  #[serde(rename = "type")]
  pub type_text: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
  Public,
  Protected,
  Package,
}

impl Visibility {
  fn of(method: &MethodDecl) -> Self {
    if method.has_modifier(Modifier::Public) {
      Visibility::Public
    } else if method.has_modifier(Modifier::Protected) {
      Visibility::Protected
    } else {
      Visibility::Package
    }
  }

  /* Modifier prefix as written in source */
  pub fn keyword(self) -> &'static str {
    match self {
      Visibility::Public => "public ",
      Visibility::Protected => "protected ",
      Visibility::Package => "",
    }
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CallbackBinding {
  pub param: String,
  #[serde(rename = "type")]
  pub type_text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PropertyDescriptor {
  /// Name shown to users; `identifier` is the same unless it had to dodge a reserved word.
  pub name: String,
  pub identifier: String,
  pub getter: String,
  #[serde(rename = "type")]
  pub type_text: String,
  pub cast_type: String,
  pub element_type: String,
  pub element_type_args: Option<String>,
  pub annotations: Vec<String>,
  pub params: Vec<ParamSpec>,
  /* `final Photo photo, final Callback<Photo> cb` */
  pub args: String,

  pub verb: Option<HttpVerb>,
  pub is_get: bool,
  pub is_post: bool,
  pub is_put: bool,
  pub is_delete: bool,
  pub is_head: bool,
  pub is_bodyless: bool,
  pub path: Option<PathTemplate>,
  pub path_expression: Option<String>,

  pub queries: IndexMap<String, Binding>,
  pub query_maps: Vec<String>,
  pub query_bundles: Vec<String>,
  pub headers: IndexMap<String, Binding>,
  pub body: Option<String>,
  pub fields: IndexMap<String, String>,
  pub parts: IndexMap<String, PartBinding>,

  pub mode: ExecutionMode,
  pub callback: Option<CallbackBinding>,
  pub response: ResponseKind,
  pub is_void: bool,
  pub is_primitive: bool,

  pub converter: Option<String>,
  pub json_converter: bool,
  pub error_handler: Option<String>,
  pub request_interceptor: Option<String>,
  pub singleton_interceptor: bool,
  pub log_level: Option<String>,
  pub permissions: Vec<String>,
  pub authenticated: bool,
  pub nullable: bool,
  pub visibility: Visibility,
}

impl PropertyDescriptor {
  pub fn has_request(&self) -> bool {
    self.verb.is_some()
  }

  pub fn is_reactive(&self) -> bool {
    self.mode == ExecutionMode::Reactive
  }

  pub fn is_callback(&self) -> bool {
    self.mode == ExecutionMode::Callback
  }

  pub fn is_blocking(&self) -> bool {
    self.mode == ExecutionMode::Blocking
  }
}

/* Types a method mentions that the generated unit will spell out */
pub fn referenced_types(
  host: &dyn TypeHost,
  table: &AnnotationTable,
  method: &MethodDecl,
) -> Vec<TypeRef> {
  let mut types = vec![method.returns.clone()];
  types.extend(method.params.iter().map(|p| p.ty.clone()));
  for capability in [
    Capability::Converter,
    Capability::ErrorHandler,
    Capability::RequestInterceptor,
  ] {
    if let Some(annotation) = table.find_primary(capability, &method.annotations) {
      types.extend(host.resolve_class_value(annotation, "value"));
    }
  }
  types
}

pub struct PropertyBuilder<'a> {
  host: &'a dyn TypeHost,
  config: &'a ProcessorConfig,
  table: &'a AnnotationTable,
  names: &'a TypeNameResolver,
  classifier: Classifier<'a>,
  /* Qualified name of the type being processed */
  type_name: &'a str,
}

impl<'a> PropertyBuilder<'a> {
  pub fn new(
    host: &'a dyn TypeHost,
    config: &'a ProcessorConfig,
    table: &'a AnnotationTable,
    names: &'a TypeNameResolver,
    type_name: &'a str,
  ) -> Self {
    Self {
      host,
      config,
      table,
      names,
      classifier: Classifier::new(host, &config.markers),
      type_name,
    }
  }

  pub fn build(
    &self,
    method: &MethodDecl,
    name: &str,
    identifier: &str,
    reporter: &mut Reporter,
  ) -> ProcessResult<PropertyDescriptor> {
    self.build_typed(method, name, identifier, &method.returns, reporter)
  }

  /* Builder setters describe their parameter type rather than their return type */
  pub fn build_typed(
    &self,
    method: &MethodDecl,
    name: &str,
    identifier: &str,
    property_type: &TypeRef,
    reporter: &mut Reporter,
  ) -> ProcessResult<PropertyDescriptor> {
    let element_path = method_element(self.type_name, &method.name);
    let type_text = self.names.simplify(property_type);
    let cast_type = match property_type {
      TypeRef::Primitive(kind) => kind.boxed().to_string(),
      _ => type_text.clone(),
    };

    let classification = self.classifier.classify(self.type_name, method);
    let element_type = self.names.simplify(&classification.element);
    let element_type_args = self.names.type_args(&classification.element);
    let callback = classification.callback.as_ref().map(|site| CallbackBinding {
      param: site.param.clone(),
      type_text: self.names.simplify(&site.element),
    });

    let verb_annotation = self.table.find_any(&VERBS, &method.annotations);
    let verb = verb_annotation.and_then(|found| HttpVerb::from_capability(found.capability));
    let flags = VerbFlags::of(self.table, &method.annotations);
    let raw_path = verb_annotation.map(|found| found.annotation.string_or_empty("value").to_string());

    let path = raw_path
      .as_deref()
      .map(|raw| PathTemplate::bind(raw, |placeholder| self.path_param(method, placeholder)));
    let path_expression = path.as_ref().map(PathTemplate::expression);

    let permissions = match verb_annotation {
      Some(found) if found.primary => found.annotation.strings("permissions"),
      _ => Vec::new(),
    };

    let params: Vec<ParamSpec> = method
      .params
      .iter()
      .map(|p| ParamSpec {
        name: p.name.clone(),
        type_text: self.names.simplify(&p.ty),
      })
      .collect();
    let args = params
      .iter()
      .map(|p| format!("final {} {}", p.type_text, p.name))
      .collect::<Vec<_>>()
      .join(", ");

    let converter = self.class_value(Capability::Converter, method);
    let json_converter = converter
      .as_ref()
      .is_some_and(|ty| self.classifier.is_json_converter(ty));
    let error_handler = self.class_value(Capability::ErrorHandler, method);
    let request_interceptor = self.class_value(Capability::RequestInterceptor, method);
    let singleton_interceptor = match &request_interceptor {
      Some(interceptor) => self.is_singleton(interceptor)?,
      None => false,
    };
    let log_level = self
      .table
      .find_primary(Capability::LogLevel, &method.annotations)
      .map(|a| a.string_or_empty("value").to_string());

    Ok(PropertyDescriptor {
      name: name.to_string(),
      identifier: identifier.to_string(),
      getter: method.name.clone(),
      type_text,
      cast_type,
      element_type,
      element_type_args,
      annotations: self.copied_annotations(method),
      params,
      args,

      verb,
      is_get: flags.is_get,
      is_post: flags.is_post,
      is_put: flags.is_put,
      is_delete: flags.is_delete,
      is_head: flags.is_head,
      is_bodyless: verb.is_some_and(HttpVerb::is_bodyless),
      path,
      path_expression,

      queries: self.queries(method, raw_path.as_deref()),
      query_maps: self.params_with(Capability::QueryMap, method),
      query_bundles: self.params_with(Capability::QueryBundle, method),
      headers: self.headers(method, &element_path, reporter),
      body: self.body(method, verb),
      fields: self.fields(method),
      parts: self.parts(method),

      mode: classification.mode,
      callback,
      response: classification.response,
      is_void: property_type.is_void(),
      is_primitive: property_type.is_primitive(),

      converter: converter.as_ref().map(|ty| self.names.simplify(ty)),
      json_converter,
      error_handler: error_handler.as_ref().map(|ty| self.names.simplify(ty)),
      request_interceptor: request_interceptor.as_ref().map(|ty| self.names.simplify(ty)),
      singleton_interceptor,
      log_level,
      permissions,
      authenticated: self
        .table
        .find_primary(Capability::Authenticated, &method.annotations)
        .is_some(),
      nullable: method.annotations.iter().any(|a| a.simple_name() == "Nullable"),
      visibility: Visibility::of(method),
    })
  }

  /* Explicit path binding (primary, then legacy) first, the parameter's own name second */
  fn path_param(&self, method: &MethodDecl, placeholder: &str) -> Option<String> {
    let explicit = method.params.iter().find(|param| {
      self
        .table
        .find(Capability::Path, &param.annotations)
        .and_then(|found| found.annotation.string("value"))
        .is_some_and(|value| value == placeholder)
    });
    explicit
      .or_else(|| method.params.iter().find(|param| param.name == placeholder))
      .map(|param| param.name.clone())
  }

  /* Binding key: the marker's value, or the parameter name when that is empty */
  fn binding_key(&self, capability: Capability, param: &ParamDecl) -> Option<String> {
    let found = self.table.find(capability, &param.annotations)?;
    let value = found.annotation.string_or_empty("value");
    Some(if value.is_empty() {
      param.name.clone()
    } else {
      value.to_string()
    })
  }

  fn queries(&self, method: &MethodDecl, raw_path: Option<&str>) -> IndexMap<String, Binding> {
    let mut queries: IndexMap<String, Binding> = raw_path
      .map(static_queries)
      .unwrap_or_default()
      .into_iter()
      .map(|(key, value)| (key, Binding::Literal(value)))
      .collect();
    for param in &method.params {
      if let Some(key) = self.binding_key(Capability::Query, param) {
        queries.insert(key, Binding::Param(param.name.clone()));
      }
    }
    queries
  }

  fn params_with(&self, capability: Capability, method: &MethodDecl) -> Vec<String> {
    method
      .params
      .iter()
      .filter(|param| self.table.has(capability, &param.annotations))
      .map(|param| param.name.clone())
      .collect()
  }

  fn headers(
    &self,
    method: &MethodDecl,
    element_path: &str,
    reporter: &mut Reporter,
  ) -> IndexMap<String, Binding> {
    let mut headers = IndexMap::new();
    if let Some(found) = self.table.find(Capability::Headers, &method.annotations) {
      for line in found.annotation.strings("value") {
        match parse_header_line(&line) {
          Some((key, value)) => {
            headers.insert(key, Binding::Literal(value));
          }
          None => reporter.report_warning(
            format!("ignoring malformed header '{}', expected 'Name: value'", line),
            element_path,
          ),
        }
      }
    }
    for param in &method.params {
      if let Some(key) = self.binding_key(Capability::Header, param) {
        headers.insert(key, Binding::Param(param.name.clone()));
      }
    }
    headers
  }

  /* POST only; the first parameter carrying the marker wins */
  fn body(&self, method: &MethodDecl, verb: Option<HttpVerb>) -> Option<String> {
    if verb != Some(HttpVerb::Post) {
      return None;
    }
    method
      .params
      .iter()
      .find(|param| self.table.has(Capability::Body, &param.annotations))
      .map(|param| param.name.clone())
  }

  fn fields(&self, method: &MethodDecl) -> IndexMap<String, String> {
    method
      .params
      .iter()
      .filter_map(|param| {
        self
          .binding_key(Capability::Field, param)
          .map(|key| (key, param.name.clone()))
      })
      .collect()
  }

  fn parts(&self, method: &MethodDecl) -> IndexMap<String, PartBinding> {
    let mut parts = IndexMap::new();
    for param in &method.params {
      let Some(found) = self.table.find(Capability::Part, &param.annotations) else {
        continue;
      };
      let value = found.annotation.string_or_empty("value");
      let key = if value.is_empty() {
        param.name.clone()
      } else {
        value.to_string()
      };
      /* only the primary marker carries a MIME type */
      let mime_type = if found.primary {
        found
          .annotation
          .string("mimeType")
          .filter(|m| !m.is_empty())
          .map(str::to_string)
      } else {
        None
      };
      let probes = self.classifier.part_probes(&param.ty);
      let kind = definitive_part_kind(&probes);
      parts.insert(
        key,
        PartBinding {
          param: param.name.clone(),
          mime_type,
          kind,
          probes,
        },
      );
    }
    parts
  }

  fn class_value(&self, capability: Capability, method: &MethodDecl) -> Option<TypeRef> {
    let annotation = self.table.find_primary(capability, &method.annotations)?;
    self.host.resolve_class_value(annotation, "value")
  }

  /* The interceptor's declaration must exist to read its markers */
  fn is_singleton(&self, interceptor: &TypeRef) -> ProcessResult<bool> {
    let Some(name) = interceptor.declared_name() else {
      return Ok(false);
    };
    match self.host.type_element(name) {
      Some(element) => Ok(element.decl.has_annotation(&self.config.markers.singleton)),
      None => Err(ProcessError::MissingType {
        name: name.to_string(),
      }),
    }
  }

  fn copied_annotations(&self, method: &MethodDecl) -> Vec<String> {
    method
      .annotations
      .iter()
      .filter(|a| a.name != self.config.markers.override_marker)
      .map(|a| source_form(a, self.names))
      .collect()
  }
}

/* `Name: value`, split on the first colon and trimmed */
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
  let (name, value) = line.split_once(':')?;
  let name = name.trim();
  if name.is_empty() {
    return None;
  }
  Some((name.to_string(), value.trim().to_string()))
}

/// Source form of an annotation: `@a.b.GET("/users")`, `@a.b.Part(value = "f", mimeType = "image/png")`.
pub fn source_form(annotation: &Annotation, names: &TypeNameResolver) -> String {
  let mut out = format!("@{}", annotation.name);
  match annotation.values.len() {
    0 => {}
    1 if annotation.values.contains_key("value") => {
      out.push('(');
      out.push_str(&value_source(&annotation.values["value"], names));
      out.push(')');
    }
    _ => {
      let values: Vec<String> = annotation
        .values
        .iter()
        .map(|(key, value)| format!("{} = {}", key, value_source(value, names)))
        .collect();
      out.push('(');
      out.push_str(&values.join(", "));
      out.push(')');
    }
  }
  out
}

fn value_source(value: &AnnotationValue, names: &TypeNameResolver) -> String {
  match value {
    AnnotationValue::Bool(b) => b.to_string(),
    AnnotationValue::Int(i) => i.to_string(),
    AnnotationValue::Str(s) => quote_java(s),
    AnnotationValue::Class(literal) => format!("{}.class", names.simplify_raw(&literal.class)),
    AnnotationValue::List(items) => {
      let items: Vec<String> = items.iter().map(|item| value_source(item, names)).collect();
      format!("{{{}}}", items.join(", "))
    }
  }
}

#[cfg(test)]
#[path = "property_tests.rs"]
mod property_tests;
