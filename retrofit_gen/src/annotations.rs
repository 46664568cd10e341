/* Ordered resolution of annotation capabilities across the primary and legacy namespaces */

use crate::config::ProcessorConfig;
use retrofit_types::Annotation;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
  Get,
  Put,
  Post,
  Delete,
  Head,
  Path,
  Query,
  QueryMap,
  QueryBundle,
  Header,
  Headers,
  Field,
  Part,
  Body,
  Authenticated,
  Converter,
  ErrorHandler,
  RequestInterceptor,
  LogLevel,
  RetryHeaders,
  OkHttpClient,
  Authenticator,
  Builder,
}

/* Verb markers in their fixed resolution order */
pub const VERBS: [Capability; 5] = [
  Capability::Get,
  Capability::Put,
  Capability::Post,
  Capability::Delete,
  Capability::Head,
];

const ALL: [Capability; 23] = [
  Capability::Get,
  Capability::Put,
  Capability::Post,
  Capability::Delete,
  Capability::Head,
  Capability::Path,
  Capability::Query,
  Capability::QueryMap,
  Capability::QueryBundle,
  Capability::Header,
  Capability::Headers,
  Capability::Field,
  Capability::Part,
  Capability::Body,
  Capability::Authenticated,
  Capability::Converter,
  Capability::ErrorHandler,
  Capability::RequestInterceptor,
  Capability::LogLevel,
  Capability::RetryHeaders,
  Capability::OkHttpClient,
  Capability::Authenticator,
  Capability::Builder,
];

impl Capability {
  pub fn simple_name(self) -> &'static str {
    match self {
      Capability::Get => "GET",
      Capability::Put => "PUT",
      Capability::Post => "POST",
      Capability::Delete => "DELETE",
      Capability::Head => "HEAD",
      Capability::Path => "Path",
      Capability::Query => "Query",
      Capability::QueryMap => "QueryMap",
      Capability::QueryBundle => "QueryBundle",
      Capability::Header => "Header",
      Capability::Headers => "Headers",
      Capability::Field => "Field",
      Capability::Part => "Part",
      Capability::Body => "Body",
      Capability::Authenticated => "Authenticated",
      Capability::Converter => "Converter",
      Capability::ErrorHandler => "ErrorHandler",
      Capability::RequestInterceptor => "RequestInterceptor",
      Capability::LogLevel => "LogLevel",
      Capability::RetryHeaders => "RetryHeaders",
      Capability::OkHttpClient => "OkHttpClient",
      Capability::Authenticator => "Authenticator",
      Capability::Builder => "Builder",
    }
  }

  /* Whether the legacy namespace also defines this marker */
  pub fn has_legacy(self) -> bool {
    matches!(
      self,
      Capability::Get
        | Capability::Put
        | Capability::Post
        | Capability::Delete
        | Capability::Head
        | Capability::Path
        | Capability::Query
        | Capability::QueryMap
        | Capability::Header
        | Capability::Headers
        | Capability::Field
        | Capability::Part
        | Capability::Body
    )
  }
}

/* An annotation found for a capability, and whether it came from the primary namespace */
#[derive(Debug, Clone, Copy)]
pub struct Found<'a> {
  pub capability: Capability,
  pub annotation: &'a Annotation,
  pub primary: bool,
}

/* capability -> [primary source, legacy source] */
#[derive(Debug, Clone)]
pub struct AnnotationTable {
  sources: HashMap<Capability, Vec<String>>,
}

impl AnnotationTable {
  pub fn new(config: &ProcessorConfig) -> Self {
    let sources = ALL
      .iter()
      .map(|&capability| {
        let mut names = vec![format!("{}.{}", config.primary_namespace, capability.simple_name())];
        if capability.has_legacy() {
          names.push(format!("{}.{}", config.legacy_namespace, capability.simple_name()));
        }
        (capability, names)
      })
      .collect();
    Self { sources }
  }

  pub fn sources(&self, capability: Capability) -> &[String] {
    self.sources.get(&capability).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn primary_name(&self, capability: Capability) -> &str {
    self.sources(capability).first().map(String::as_str).unwrap_or("")
  }

  /* First present source wins */
  pub fn find<'a>(&self, capability: Capability, annotations: &'a [Annotation]) -> Option<Found<'a>> {
    self.find_any(&[capability], annotations)
  }

  /* Checks every capability in the primary namespace before any in the legacy one */
  pub fn find_any<'a>(
    &self,
    capabilities: &[Capability],
    annotations: &'a [Annotation],
  ) -> Option<Found<'a>> {
    for rank in 0..2 {
      for &capability in capabilities {
        let Some(source) = self.sources(capability).get(rank) else {
          continue;
        };
        if let Some(annotation) = annotations.iter().find(|a| &a.name == source) {
          return Some(Found {
            capability,
            annotation,
            primary: rank == 0,
          });
        }
      }
    }
    None
  }

  pub fn find_primary<'a>(
    &self,
    capability: Capability,
    annotations: &'a [Annotation],
  ) -> Option<&'a Annotation> {
    let name = self.primary_name(capability);
    annotations.iter().find(|a| a.name == name)
  }

  pub fn has(&self, capability: Capability, annotations: &[Annotation]) -> bool {
    self.find(capability, annotations).is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn primary_namespace_wins_over_legacy() {
    let table = AnnotationTable::new(&ProcessorConfig::default());
    let annotations = vec![
      Annotation::new("retrofit.http.GET").with_str("value", "/legacy"),
      Annotation::new("retrofit.http.Retrofit.POST").with_str("value", "/primary"),
    ];
    let found = table.find_any(&VERBS, &annotations).unwrap();
    assert_eq!(found.capability, Capability::Post);
    assert!(found.primary);
    assert_eq!(found.annotation.string("value"), Some("/primary"));
  }

  #[test]
  fn legacy_namespace_is_consulted_when_primary_is_absent() {
    let table = AnnotationTable::new(&ProcessorConfig::default());
    let annotations = vec![Annotation::new("retrofit.http.Path").with_str("value", "id")];
    let found = table.find(Capability::Path, &annotations).unwrap();
    assert!(!found.primary);
  }

  #[test]
  fn primary_only_capabilities_have_one_source() {
    let table = AnnotationTable::new(&ProcessorConfig::default());
    assert_eq!(
      table.sources(Capability::QueryBundle),
      &["retrofit.http.Retrofit.QueryBundle".to_string()]
    );
    let annotations = vec![Annotation::new("retrofit.http.QueryBundle")];
    assert!(!table.has(Capability::QueryBundle, &annotations));
  }
}
