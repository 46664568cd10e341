/* GWT compatibility marker and the optional custom field serializer side output */

use crate::config::MarkerTypes;
use crate::descriptor::TypeDescriptor;
use crate::host::TypeElement;
use crate::property::source_form;
use crate::type_names::TypeNameResolver;
use serde_derive::Serialize;

pub const SERIALIZER_SUFFIX: &str = "_CustomFieldSerializer";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GwtCompatibility {
  /* Source form of the marker, copied onto the generated unit */
  pub annotation: Option<String>,
  pub serializable: bool,
}

impl GwtCompatibility {
  pub fn of(element: &TypeElement, markers: &MarkerTypes, names: &TypeNameResolver) -> Self {
    match element.decl.annotation(&markers.gwt_compatible) {
      Some(annotation) => Self {
        annotation: Some(source_form(annotation, names)),
        serializable: annotation.bool("serializable").unwrap_or(false),
      },
      None => Self::default(),
    }
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SerializedField {
  pub identifier: String,
  #[serde(rename = "type")]
  pub type_text: String,
  pub cast_type: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GwtSerializer {
  pub package: String,
  pub name: String,
  pub qualified_name: String,
  /* Generated implementation the serializer reads and writes */
  pub instance_type: String,
  pub formal_types: String,
  pub actual_types: String,
  pub imports: Vec<String>,
  pub fields: Vec<SerializedField>,
}

impl GwtSerializer {
  /// Serializer descriptor for a type marked GWT-compatible with `serializable = true`.
  pub fn for_type(descriptor: &TypeDescriptor) -> Option<Self> {
    if !descriptor.gwt_serializable {
      return None;
    }
    let name = format!("{}{}", descriptor.generated_name, SERIALIZER_SUFFIX);
    let qualified_name = format!("{}{}", descriptor.qualified_generated_name, SERIALIZER_SUFFIX);
    Some(Self {
      package: descriptor.package.clone(),
      name,
      qualified_name,
      instance_type: descriptor.generated_name.clone(),
      formal_types: descriptor.formal_types.clone(),
      actual_types: descriptor.actual_types.clone(),
      imports: descriptor.imports.clone(),
      fields: descriptor
        .properties
        .iter()
        .filter(|p| p.params.is_empty() && !p.is_void)
        .map(|p| SerializedField {
          identifier: p.identifier.clone(),
          type_text: p.type_text.clone(),
          cast_type: p.cast_type.clone(),
        })
        .collect(),
    })
  }
}
