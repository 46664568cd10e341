/* Type-directed classification: execution mode, response kind, multipart part kind */

use crate::config::MarkerTypes;
use crate::host::TypeHost;
use retrofit_types::{MethodDecl, TypeRef};
use serde_derive::Serialize;
use tracing::warn;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
  Blocking,
  Callback,
  Reactive,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseKind {
  Typed,
  RawResponse,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PartKind {
  RawFile,
  TypedFile,
  TypedString,
  TypedByteArray,
}

/* Parameter that receives the callback */
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackSite {
  pub param: String,
  pub element: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
  pub mode: ExecutionMode,
  /* Stream or callback element type, or the return type when blocking */
  pub element: TypeRef,
  pub callback: Option<CallbackSite>,
  pub response: ResponseKind,
}

pub struct Classifier<'a> {
  host: &'a dyn TypeHost,
  markers: &'a MarkerTypes,
}

impl<'a> Classifier<'a> {
  pub fn new(host: &'a dyn TypeHost, markers: &'a MarkerTypes) -> Self {
    Self { host, markers }
  }

  /* `ty` is `X<A>` and a subtype of `marker<A>`; yields `A` */
  fn single_arg_specialization(&self, ty: &TypeRef, marker: &str) -> Option<TypeRef> {
    let arg = ty.single_type_arg()?;
    let instantiated = TypeRef::declared(marker, vec![arg.clone()]);
    self.host.is_subtype(ty, &instantiated).then(|| arg.clone())
  }

  pub fn stream_element(&self, ty: &TypeRef) -> Option<TypeRef> {
    self.single_arg_specialization(ty, &self.markers.stream)
  }

  /* First parameter, left to right, that is a callback */
  pub fn callback_site(&self, method: &MethodDecl) -> Option<CallbackSite> {
    method.params.iter().find_map(|param| {
      self
        .single_arg_specialization(&param.ty, &self.markers.callback)
        .map(|element| CallbackSite {
          param: param.name.clone(),
          element,
        })
    })
  }

  pub fn classify(&self, owner: &str, method: &MethodDecl) -> Classification {
    let stream = self.stream_element(&method.returns);
    let callback = self.callback_site(method);

    let (mode, element, callback) = match (stream, callback) {
      (Some(element), callback) => {
        if let Some(site) = callback {
          warn!(
            "{}#{} returns a stream and takes callback '{}'; treating it as reactive",
            owner, method.name, site.param
          );
        }
        (ExecutionMode::Reactive, element, None)
      }
      (None, Some(site)) => (ExecutionMode::Callback, site.element.clone(), Some(site)),
      (None, None) => (ExecutionMode::Blocking, method.returns.clone(), None),
    };

    let response = self.response_kind(&element);
    Classification {
      mode,
      element,
      callback,
      response,
    }
  }

  pub fn response_kind(&self, element: &TypeRef) -> ResponseKind {
    if self
      .host
      .is_subtype(element, &TypeRef::named(self.markers.raw_response.clone()))
    {
      ResponseKind::RawResponse
    } else {
      ResponseKind::Typed
    }
  }

  /* Every wrapper kind `ty` is a subtype of */
  pub fn part_probes(&self, ty: &TypeRef) -> Vec<PartKind> {
    [
      (PartKind::RawFile, &self.markers.file),
      (PartKind::TypedFile, &self.markers.typed_file),
      (PartKind::TypedString, &self.markers.typed_string),
      (PartKind::TypedByteArray, &self.markers.typed_byte_array),
    ]
    .into_iter()
    .filter(|(_, marker)| self.host.is_subtype(ty, &TypeRef::named(marker.as_str())))
    .map(|(kind, _)| kind)
    .collect()
  }

  /* The JSON converter marker must be assignable to the declared converter */
  pub fn is_json_converter(&self, converter: &TypeRef) -> bool {
    self
      .host
      .is_subtype(&TypeRef::named(self.markers.json_converter.clone()), converter)
  }
}

/* Definitive kind only when exactly one probe matched */
pub fn definitive_part_kind(probes: &[PartKind]) -> Option<PartKind> {
  match probes {
    [kind] => Some(*kind),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::ModelGraph;
  use retrofit_types::{ParamDecl, TypeDecl};

  fn graph() -> ModelGraph {
    let mut decls = retrofit_loader::prelude_file().unwrap().packaged_types();
    decls.push(TypeDecl::class("Photo", "com.x"));
    decls.push(
      TypeDecl::class("PrettyGsonConverter", "com.x")
        .extends(TypeRef::named("retrofit.converter.GsonConverter")),
    );
    decls.push(
      TypeDecl::class("PhotoStream", "com.x")
        .type_param("E", vec![])
        .extends("rx.Observable<E>".parse().unwrap()),
    );
    ModelGraph::new(decls)
  }

  fn ty(text: &str) -> TypeRef {
    text.parse().unwrap()
  }

  #[test]
  fn stream_return_is_reactive() {
    let graph = graph();
    let markers = MarkerTypes::default();
    let classifier = Classifier::new(&graph, &markers);
    let method = MethodDecl::abstract_method("photos", ty("rx.Observable<com.x.Photo>"));
    let result = classifier.classify("com.x.Api", &method);
    assert_eq!(result.mode, ExecutionMode::Reactive);
    assert_eq!(result.element, ty("com.x.Photo"));
    assert_eq!(result.response, ResponseKind::Typed);

    let subclass = MethodDecl::abstract_method("more", ty("com.x.PhotoStream<com.x.Photo>"));
    assert_eq!(classifier.classify("com.x.Api", &subclass).mode, ExecutionMode::Reactive);
  }

  #[test]
  fn trailing_callback_parameter_is_callback() {
    let graph = graph();
    let markers = MarkerTypes::default();
    let classifier = Classifier::new(&graph, &markers);
    let method = MethodDecl::abstract_method("photo", ty("com.x.Photo"))
      .param(ParamDecl::new("id", ty("java.lang.String")))
      .param(ParamDecl::new("cb", ty("retrofit.Callback<com.x.Photo>")));
    let result = classifier.classify("com.x.Api", &method);
    assert_eq!(result.mode, ExecutionMode::Callback);
    assert_eq!(result.element, ty("com.x.Photo"));
    assert_eq!(result.callback.unwrap().param, "cb");
  }

  #[test]
  fn plain_return_is_blocking() {
    let graph = graph();
    let markers = MarkerTypes::default();
    let classifier = Classifier::new(&graph, &markers);
    let method = MethodDecl::abstract_method("photo", ty("com.x.Photo"));
    let result = classifier.classify("com.x.Api", &method);
    assert_eq!(result.mode, ExecutionMode::Blocking);
    assert_eq!(result.element, ty("com.x.Photo"));
    assert!(result.callback.is_none());
  }

  #[test]
  fn stream_wins_over_callback() {
    let graph = graph();
    let markers = MarkerTypes::default();
    let classifier = Classifier::new(&graph, &markers);
    let method = MethodDecl::abstract_method("both", ty("rx.Observable<retrofit.client.Response>"))
      .param(ParamDecl::new("cb", ty("retrofit.Callback<com.x.Photo>")));
    let result = classifier.classify("com.x.Api", &method);
    assert_eq!(result.mode, ExecutionMode::Reactive);
    assert!(result.callback.is_none());
    assert_eq!(result.response, ResponseKind::RawResponse);
  }

  #[test]
  fn part_kinds_need_exactly_one_match() {
    let graph = graph();
    let markers = MarkerTypes::default();
    let classifier = Classifier::new(&graph, &markers);
    let kind = |text: &str| definitive_part_kind(&classifier.part_probes(&ty(text)));
    assert_eq!(kind("java.io.File"), Some(PartKind::RawFile));
    assert_eq!(kind("retrofit.mime.TypedFile"), Some(PartKind::TypedFile));
    assert_eq!(kind("retrofit.mime.TypedByteArray"), Some(PartKind::TypedByteArray));
    assert_eq!(kind("retrofit.mime.TypedString"), None);
    /* TypedString extends TypedByteArray */
    assert_eq!(
      classifier.part_probes(&ty("retrofit.mime.TypedString")),
      vec![PartKind::TypedString, PartKind::TypedByteArray]
    );
    assert!(classifier.part_probes(&ty("java.lang.String")).is_empty());
  }

  #[test]
  fn json_converter_accepts_marker_and_its_supertypes() {
    let graph = graph();
    let markers = MarkerTypes::default();
    let classifier = Classifier::new(&graph, &markers);
    assert!(classifier.is_json_converter(&ty("retrofit.converter.GsonConverter")));
    assert!(classifier.is_json_converter(&ty("retrofit.converter.Converter")));
    assert!(!classifier.is_json_converter(&ty("com.x.PrettyGsonConverter")));
    assert!(!classifier.is_json_converter(&ty("com.x.Photo")));
  }
}
