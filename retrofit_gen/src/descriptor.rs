/* Type descriptor assembly: everything the renderer needs for one annotated type */

use crate::annotations::{AnnotationTable, Capability};
use crate::builder_spec::{BuilderDescriptor, BuilderSpec};
use crate::classify::Classifier;
use crate::config::ProcessorConfig;
use crate::diagnostics::{Reporter, field_element, method_element};
use crate::error::{ProcessError, ProcessResult};
use crate::gwt::GwtCompatibility;
use crate::host::{TypeElement, TypeHost};
use crate::property::{PropertyBuilder, PropertyDescriptor, parse_header_line, referenced_types};
use crate::type_names::{TypeNameResolver, actual_type_params, wildcard_type_params};
use crate::walker::{MethodEntry, collect_methods};
use indexmap::IndexMap;
use retrofit_types::{AnnotationValue, ElementKind, MethodDecl, Modifier, PrimitiveKind, TypeRef};
use serde_derive::Serialize;
use tracing::debug;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TypeDescriptor {
  pub package: String,
  /* `Outer.Api` */
  pub original_name: String,
  pub simple_name: String,
  pub generated_name: String,
  pub qualified_generated_name: String,
  pub formal_types: String,
  pub actual_types: String,
  pub wildcard_types: String,

  pub base_url: String,
  pub headers: IndexMap<String, String>,
  pub retry_headers: IndexMap<String, String>,
  pub http_client: Option<String>,
  pub converter: Option<String>,
  pub json_converter: bool,
  pub error_handler: Option<String>,
  pub log_level: Option<String>,
  pub request_interceptor: Option<String>,
  pub authenticator: Option<String>,
  pub authenticated: bool,

  pub properties: Vec<PropertyDescriptor>,
  pub has_builder: bool,
  pub builder: Option<BuilderDescriptor>,
  pub builder_properties: Vec<PropertyDescriptor>,
  pub to_builder_methods: Vec<String>,

  pub imports: Vec<String>,
  pub arrays: String,
  pub bit_set: String,
  pub serial_version_uid: String,
  pub generate_equals: bool,
  pub generate_hash_code: bool,
  pub generate_to_string: bool,
  pub parcelable: bool,
  pub gwt_compatible_annotation: Option<String>,
  #[serde(skip)]
  pub gwt_serializable: bool,
}

/* Identity and parcel methods the generated unit may provide itself */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMethod {
  None,
  ToString,
  Equals,
  HashCode,
  DescribeContents,
  WriteToParcel,
}

impl ObjectMethod {
  pub fn of(method: &MethodDecl) -> Self {
    let param_type = |i: usize| method.params.get(i).map(|p| p.ty.to_string());
    match (method.name.as_str(), method.params.len()) {
      ("toString", 0) => ObjectMethod::ToString,
      ("hashCode", 0) => ObjectMethod::HashCode,
      ("describeContents", 0) => ObjectMethod::DescribeContents,
      ("equals", 1) if param_type(0).as_deref() == Some("java.lang.Object") => ObjectMethod::Equals,
      ("writeToParcel", 2)
        if param_type(0).as_deref() == Some("android.os.Parcel")
          && param_type(1).as_deref() == Some("int") =>
      {
        ObjectMethod::WriteToParcel
      }
      _ => ObjectMethod::None,
    }
  }
}

/* Java keywords and the three reserved literals */
const RESERVED_WORDS: &[&str] = &[
  "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
  "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
  "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long", "native",
  "new", "package", "private", "protected", "public", "return", "short", "static", "strictfp",
  "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try", "void",
  "volatile", "while", "true", "false", "null",
];

pub fn is_reserved(name: &str) -> bool {
  RESERVED_WORDS.contains(&name)
}

fn is_getter(method: &MethodDecl) -> bool {
  let get = method.name.starts_with("get") && method.name.len() > 3;
  let is = method.name.starts_with("is")
    && method.name.len() > 2
    && method.returns == TypeRef::Primitive(PrimitiveKind::Boolean);
  get || is
}

/* JavaBeans decapitalization: `URL` stays `URL`, `Name` becomes `name` */
pub fn decapitalize(name: &str) -> String {
  let mut chars = name.chars();
  let (Some(first), second) = (chars.next(), chars.next()) else {
    return name.to_string();
  };
  if first.is_uppercase() && second.is_some_and(char::is_uppercase) {
    return name.to_string();
  }
  first.to_lowercase().chain(name.chars().skip(1)).collect()
}

/// Property names for `methods`: prefix-stripped when every method is a getter.
pub fn property_names(methods: &[&MethodDecl]) -> Vec<String> {
  let all_getters = methods.iter().all(|m| is_getter(m));
  methods
    .iter()
    .map(|method| {
      if !all_getters {
        return method.name.clone();
      }
      let stripped = method
        .name
        .strip_prefix("get")
        .or_else(|| method.name.strip_prefix("is"))
        .unwrap_or(&method.name);
      decapitalize(stripped)
    })
    .collect()
}

/* Reserved identifiers get the smallest numeric suffix not already taken */
pub fn fix_reserved_identifiers(identifiers: &mut [String]) {
  for i in 0..identifiers.len() {
    if !is_reserved(&identifiers[i]) {
      continue;
    }
    let replacement = disambiguate(&identifiers[i], identifiers);
    identifiers[i] = replacement;
  }
}

fn disambiguate(name: &str, existing: &[String]) -> String {
  (0..)
    .map(|i| format!("{}{}", name, i))
    .find(|candidate| !existing.contains(candidate))
    .unwrap_or_else(|| name.to_string())
}

/* `Retrofit_Outer_Api` */
pub fn generated_name(config: &ProcessorConfig, element: &TypeElement) -> String {
  let mut chain = element.enclosing.clone();
  chain.push(element.simple_name().to_string());
  format!("{}{}", config.generated_prefix, chain.join("_"))
}

pub fn qualified_generated_name(config: &ProcessorConfig, element: &TypeElement) -> String {
  let name = generated_name(config, element);
  if element.package.is_empty() {
    name
  } else {
    format!("{}.{}", element.package, name)
  }
}

pub struct DescriptorBuilder<'a> {
  host: &'a dyn TypeHost,
  config: &'a ProcessorConfig,
  table: AnnotationTable,
}

impl<'a> DescriptorBuilder<'a> {
  pub fn new(host: &'a dyn TypeHost, config: &'a ProcessorConfig) -> Self {
    Self {
      host,
      config,
      table: AnnotationTable::new(config),
    }
  }

  pub fn table(&self) -> &AnnotationTable {
    &self.table
  }

  /// Builds the descriptor for `type_name` against the current snapshot.
  pub fn build(&self, type_name: &str, reporter: &mut Reporter) -> ProcessResult<TypeDescriptor> {
    let element = self
      .host
      .type_element(type_name)
      .ok_or_else(|| ProcessError::MissingType {
        name: type_name.to_string(),
      })?;
    self.validate(element, reporter)?;

    let entries = collect_methods(self.host, type_name);
    let (generate_equals, generate_hash_code, generate_to_string) = self.object_methods(&entries);
    let to_implement = self.methods_to_implement(type_name, &entries, reporter)?;

    let builder = BuilderSpec::find(self.host, &self.table, element, reporter)?;
    let mut restore_methods = Vec::new();
    let mut property_methods = Vec::new();
    for method in &to_implement {
      match &builder {
        Some(spec) if spec.is_to_builder(method) => restore_methods.push(*method),
        Some(spec) if spec.is_setter_duplicate(&self.table, method) => {
          debug!("{} only repeats a builder setter", method_element(type_name, &method.name))
        }
        _ => property_methods.push(*method),
      }
    }

    let names = self.resolve_names(element, &to_implement, builder.as_ref())?;
    let property_builder = PropertyBuilder::new(self.host, self.config, &self.table, &names, type_name);

    let mut identifiers = property_names(&property_methods);
    let display_names = identifiers.clone();
    fix_reserved_identifiers(&mut identifiers);
    let mut properties = Vec::with_capacity(property_methods.len());
    for ((method, name), identifier) in property_methods.iter().zip(&display_names).zip(&identifiers) {
      properties.push(property_builder.build(method, name, identifier, reporter)?);
    }

    let mut to_builder_methods = Vec::new();
    let mut builder_descriptor = None;
    let mut builder_properties = Vec::new();
    if let Some(spec) = &builder {
      let restorable = spec.can_restore(&properties);
      for method in restore_methods {
        if restorable {
          to_builder_methods.push(method.name.clone());
          continue;
        }
        reporter.report_warning(
          "cannot generate this method because not every property has a builder setter",
          method_element(type_name, &method.name),
        );
        let mut taken: Vec<String> = properties.iter().map(|p| p.identifier.clone()).collect();
        taken.push(method.name.clone());
        let identifier = if is_reserved(&method.name) {
          disambiguate(&method.name, &taken)
        } else {
          method.name.clone()
        };
        properties.push(property_builder.build(method, &method.name, &identifier, reporter)?);
      }

      let setter_builder =
        PropertyBuilder::new(self.host, self.config, &self.table, &names, &spec.qualified_name);
      for setter in &spec.setters {
        let Some(param) = setter.params.first() else {
          continue;
        };
        builder_properties.push(setter_builder.build_typed(
          setter,
          &setter.name,
          &setter.name,
          &param.ty,
          reporter,
        )?);
      }
      builder_descriptor = Some(spec.describe(&names, &properties, to_builder_methods.clone()));
    }

    let markers = &self.config.markers;
    let gwt = GwtCompatibility::of(element, markers, &names);
    let mut descriptor = TypeDescriptor {
      package: element.package.clone(),
      original_name: element.class_name(),
      simple_name: element.simple_name().to_string(),
      generated_name: generated_name(self.config, element),
      qualified_generated_name: qualified_generated_name(self.config, element),
      formal_types: names.formal_type_params(&element.decl),
      actual_types: actual_type_params(&element.decl),
      wildcard_types: wildcard_type_params(&element.decl),

      base_url: String::new(),
      headers: IndexMap::new(),
      retry_headers: IndexMap::new(),
      http_client: None,
      converter: None,
      json_converter: false,
      error_handler: None,
      log_level: None,
      request_interceptor: None,
      authenticator: None,
      authenticated: false,

      properties,
      has_builder: builder_descriptor.is_some(),
      builder: builder_descriptor,
      builder_properties,
      to_builder_methods,

      imports: names.imports(),
      arrays: names.simplify_name(&markers.array_utility),
      bit_set: names.simplify_name(&markers.bit_vector),
      serial_version_uid: self.serial_version_uid(element, reporter)?,
      generate_equals,
      generate_hash_code,
      generate_to_string,
      parcelable: self
        .host
        .is_subtype(&element.raw_type(), &TypeRef::named(markers.parcelable.clone())),
      gwt_compatible_annotation: gwt.annotation,
      gwt_serializable: gwt.serializable,
    };
    self.type_level(element, &names, &mut descriptor, reporter);

    debug!(
      type_name,
      properties = descriptor.properties.len(),
      builder = descriptor.has_builder,
      "built type descriptor"
    );
    Ok(descriptor)
  }

  fn validate(&self, element: &TypeElement, reporter: &mut Reporter) -> ProcessResult<()> {
    let name = &element.qualified_name;
    if !element.decl.has_annotation(&self.config.root_marker) {
      return Err(reporter.abort_with_error(
        format!(
          "processor for @{} was invoked with a type that does not have that annotation; this is probably a host bug",
          self.config.root_marker
        ),
        name,
      ));
    }
    if !matches!(element.kind(), ElementKind::Class | ElementKind::Interface) {
      return Err(reporter.abort_with_error(
        format!("@{} only applies to classes and interfaces", self.config.root_marker),
        name,
      ));
    }
    let annotation = TypeRef::named(self.config.markers.annotation.clone());
    if self.host.is_subtype(&element.raw_type(), &annotation) {
      return Err(reporter.abort_with_error(
        format!("@{} may not be used to implement an annotation interface", self.config.root_marker),
        name,
      ));
    }
    Ok(())
  }

  /* Defaults stay false when an ancestor is missing from the snapshot */
  fn object_methods(&self, entries: &[MethodEntry]) -> (bool, bool, bool) {
    let (mut equals, mut hash_code, mut to_string) = (false, false, false);
    for entry in entries {
      let can_generate = entry.is_abstract() || entry.owner == self.config.markers.object;
      match ObjectMethod::of(&entry.method) {
        ObjectMethod::Equals => equals = can_generate,
        ObjectMethod::HashCode => hash_code = can_generate,
        ObjectMethod::ToString => to_string = can_generate,
        _ => {}
      }
    }
    (equals, hash_code, to_string)
  }

  /* Abstract, non-identity methods; reference-array properties are all reported before aborting */
  fn methods_to_implement<'e>(
    &self,
    type_name: &str,
    entries: &'e [MethodEntry],
    reporter: &mut Reporter,
  ) -> ProcessResult<Vec<&'e MethodDecl>> {
    let mut methods = Vec::new();
    let mut errors = false;
    for entry in entries {
      let method = &entry.method;
      if !method.is_abstract() || ObjectMethod::of(method) != ObjectMethod::None {
        continue;
      }
      if method.params.is_empty() && method.returns.is_reference_array() {
        reporter.report_error(
          format!(
            "@{} class cannot define an array-valued property unless it is a primitive array",
            self.config.root_marker
          ),
          method_element(type_name, &method.name),
        );
        errors = true;
      }
      methods.push(method);
    }
    if errors {
      return Err(ProcessError::Abort);
    }
    Ok(methods)
  }

  /* Every type the generated unit will spell out */
  fn resolve_names(
    &self,
    element: &TypeElement,
    methods: &[&MethodDecl],
    builder: Option<&BuilderSpec>,
  ) -> ProcessResult<TypeNameResolver> {
    let markers = &self.config.markers;
    let mut types: Vec<TypeRef> = methods
      .iter()
      .flat_map(|m| referenced_types(self.host, &self.table, m))
      .collect();
    if methods.iter().any(|m| m.returns.is_array()) {
      types.push(TypeRef::named(markers.array_utility.clone()));
    }
    if let Some(spec) = builder {
      types.extend(spec.referenced_types());
      types.push(TypeRef::named(markers.bit_vector.clone()));
    }
    types.extend(element.decl.type_params.iter().flat_map(|p| p.bounds.iter().cloned()));
    for capability in [
      Capability::OkHttpClient,
      Capability::Converter,
      Capability::ErrorHandler,
      Capability::RequestInterceptor,
      Capability::Authenticator,
    ] {
      if let Some(annotation) = self.table.find_primary(capability, &element.decl.annotations) {
        types.extend(self.host.resolve_class_value(annotation, "value"));
      }
    }
    /* names already in scope in the generated unit */
    let generated = qualified_generated_name(self.config, element);
    let outermost = element.enclosing.first().map(|outer| {
      if element.package.is_empty() { outer.clone() } else { format!("{}.{}", element.package, outer) }
    });
    let mut unit_types = vec![element.qualified_name.as_str(), generated.as_str()];
    unit_types.extend(outermost.as_deref());
    TypeNameResolver::for_unit(self.host, &element.package, &unit_types, &types)
  }

  /* `1234L` for a well-formed serialVersionUID on a serializable type, empty otherwise */
  fn serial_version_uid(&self, element: &TypeElement, reporter: &mut Reporter) -> ProcessResult<String> {
    let serializable = TypeRef::named(self.config.markers.serializable.clone());
    if !self.host.is_subtype(&element.raw_type(), &serializable) {
      return Ok(String::new());
    }
    let Some(field) = element.decl.fields.iter().find(|f| f.name == "serialVersionUID") else {
      return Ok(String::new());
    };
    let well_formed = field.has_modifier(Modifier::Static)
      && field.has_modifier(Modifier::Final)
      && field.ty == TypeRef::Primitive(PrimitiveKind::Long);
    match (&field.constant, well_formed) {
      (Some(AnnotationValue::Int(value)), true) => Ok(format!("{}L", value)),
      _ => Err(reporter.abort_with_error(
        "serialVersionUID must be a static final long compile-time constant",
        field_element(&element.qualified_name, &field.name),
      )),
    }
  }

  /* Values read from the root marker and its companion markers */
  fn type_level(
    &self,
    element: &TypeElement,
    names: &TypeNameResolver,
    descriptor: &mut TypeDescriptor,
    reporter: &mut Reporter,
  ) {
    let annotations = &element.decl.annotations;
    let type_name = &element.qualified_name;
    let class_value = |capability: Capability| {
      self
        .table
        .find_primary(capability, annotations)
        .and_then(|a| self.host.resolve_class_value(a, "value"))
    };

    if let Some(root) = element.decl.annotation(&self.config.root_marker) {
      descriptor.base_url = root.string_or_empty("value").to_string();
    }
    descriptor.headers = self.header_map(Capability::Headers, element, reporter);
    descriptor.retry_headers = self.header_map(Capability::RetryHeaders, element, reporter);
    descriptor.http_client = class_value(Capability::OkHttpClient).map(|ty| names.simplify(&ty));
    if let Some(converter) = class_value(Capability::Converter) {
      let classifier = Classifier::new(self.host, &self.config.markers);
      descriptor.json_converter = classifier.is_json_converter(&converter);
      descriptor.converter = Some(names.simplify(&converter));
    }
    descriptor.error_handler = class_value(Capability::ErrorHandler).map(|ty| names.simplify(&ty));
    descriptor.log_level = self
      .table
      .find_primary(Capability::LogLevel, annotations)
      .map(|a| a.string_or_empty("value").to_string());
    descriptor.request_interceptor =
      class_value(Capability::RequestInterceptor).map(|ty| names.simplify(&ty));
    descriptor.authenticator = class_value(Capability::Authenticator).map(|ty| names.simplify(&ty));
    descriptor.authenticated = self
      .table
      .find_primary(Capability::Authenticated, annotations)
      .is_some();
    debug!(type_name = %type_name, base_url = %descriptor.base_url, "read type-level markers");
  }

  fn header_map(
    &self,
    capability: Capability,
    element: &TypeElement,
    reporter: &mut Reporter,
  ) -> IndexMap<String, String> {
    let mut headers = IndexMap::new();
    let Some(annotation) = self.table.find_primary(capability, &element.decl.annotations) else {
      return headers;
    };
    for line in annotation.strings("value") {
      match parse_header_line(&line) {
        Some((name, value)) => {
          headers.insert(name, value);
        }
        None => reporter.report_warning(
          format!("ignoring malformed header '{}', expected 'Name: value'", line),
          &element.qualified_name,
        ),
      }
    }
    headers
  }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod descriptor_tests;
