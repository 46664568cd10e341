/* Processor configuration: marker annotations, namespaces and well-known types */

use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Io { path: PathBuf, source: std::io::Error },
  #[error("failed to parse config {path}: {source}")]
  Parse { path: PathBuf, source: serde_yml::Error },
}

/* Qualified names of the library types the processor probes against */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct MarkerTypes {
  pub stream: String,
  pub callback: String,
  pub raw_response: String,
  pub json_converter: String,
  pub file: String,
  pub typed_file: String,
  pub typed_string: String,
  pub typed_byte_array: String,
  pub singleton: String,
  pub serializable: String,
  pub annotation: String,
  pub parcelable: String,
  pub gwt_compatible: String,
  pub array_utility: String,
  pub bit_vector: String,
  pub object: String,
  pub override_marker: String,
}

impl Default for MarkerTypes {
  fn default() -> Self {
    Self {
      stream: "rx.Observable".to_string(),
      callback: "retrofit.Callback".to_string(),
      raw_response: "retrofit.client.Response".to_string(),
      json_converter: "retrofit.converter.GsonConverter".to_string(),
      file: "java.io.File".to_string(),
      typed_file: "retrofit.mime.TypedFile".to_string(),
      typed_string: "retrofit.mime.TypedString".to_string(),
      typed_byte_array: "retrofit.mime.TypedByteArray".to_string(),
      singleton: "javax.inject.Singleton".to_string(),
      serializable: "java.io.Serializable".to_string(),
      annotation: "java.lang.annotation.Annotation".to_string(),
      parcelable: "android.os.Parcelable".to_string(),
      gwt_compatible: "com.google.common.annotations.GwtCompatible".to_string(),
      array_utility: "java.util.Arrays".to_string(),
      bit_vector: "java.util.BitSet".to_string(),
      object: "java.lang.Object".to_string(),
      override_marker: "java.lang.Override".to_string(),
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProcessorConfig {
  /* Annotation that marks a type for processing */
  pub root_marker: String,

  /* Prefix of the primary annotation namespace (`<ns>.GET`) */
  pub primary_namespace: String,

  /* Prefix of the legacy annotation namespace, checked after the primary one */
  pub legacy_namespace: String,

  /* Prefix of generated implementation names */
  pub generated_prefix: String,

  /* Upper bound on passes before the driver forces the terminal pass */
  pub max_passes: usize,

  pub markers: MarkerTypes,
}

impl Default for ProcessorConfig {
  fn default() -> Self {
    Self {
      root_marker: "retrofit.http.Retrofit".to_string(),
      primary_namespace: "retrofit.http.Retrofit".to_string(),
      legacy_namespace: "retrofit.http".to_string(),
      generated_prefix: "Retrofit_".to_string(),
      max_passes: 16,
      markers: MarkerTypes::default(),
    }
  }
}

impl ProcessorConfig {
  /* Load a YAML config file; omitted keys keep their defaults */
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    serde_yml::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /* Load `path` when given, defaults otherwise */
  pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
    match path {
      Some(path) => Self::load(path),
      None => Ok(Self::default()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn partial_config_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "generated-prefix: Gen_\nmarkers:\n  stream: io.reactivex.Flowable\n"
    )
    .unwrap();

    let config = ProcessorConfig::load(file.path()).unwrap();
    assert_eq!(config.generated_prefix, "Gen_");
    assert_eq!(config.markers.stream, "io.reactivex.Flowable");
    assert_eq!(config.markers.callback, "retrofit.Callback");
    assert_eq!(config.root_marker, "retrofit.http.Retrofit");
  }

  #[test]
  fn missing_config_is_an_io_error() {
    let err = ProcessorConfig::load(Path::new("/nonexistent/retrofit.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
  }
}
