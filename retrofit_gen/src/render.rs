/* Template renderer and filer collaborators */

use crate::descriptor::TypeDescriptor;
use crate::error::{EmitError, RenderError};
use crate::gwt::GwtSerializer;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One emitted file: a generated type and the annotated type it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationUnit {
  pub qualified_name: String,
  pub origin: String,
  pub text: String,
  pub serializer: Option<GwtSerializer>,
}

/* Turns finished descriptors into emitted text */
pub trait Renderer {
  fn render(&self, descriptor: &TypeDescriptor) -> Result<String, RenderError>;

  fn render_serializer(&self, serializer: &GwtSerializer) -> Result<String, RenderError>;
}

/* Pretty-printed JSON of the descriptor */
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
  fn render(&self, descriptor: &TypeDescriptor) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(descriptor)?)
  }

  fn render_serializer(&self, serializer: &GwtSerializer) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(serializer)?)
  }
}

/* Writes rendered text; emission is terminal and never retried */
pub trait Filer {
  fn emit(&mut self, qualified_name: &str, text: &str, origin: &str) -> Result<(), EmitError>;

  /// Withdraws a unit emitted earlier in the same type's processing.
  /// Filers that cannot take output back keep it.
  fn discard(&mut self, _qualified_name: &str) -> Result<(), EmitError> {
    Ok(())
  }
}

/* `<root>/<package path>/<Name>.json` */
#[derive(Debug, Clone)]
pub struct DirectoryFiler {
  root: PathBuf,
  written: Vec<PathBuf>,
}

impl DirectoryFiler {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      written: Vec::new(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn written(&self) -> &[PathBuf] {
    &self.written
  }

  pub fn path_for(&self, qualified_name: &str) -> PathBuf {
    let mut segments: Vec<&str> = qualified_name.split('.').collect();
    let name = segments.pop().unwrap_or(qualified_name);
    let mut path = self.root.clone();
    for segment in segments {
      path.push(segment);
    }
    path.push(format!("{}.json", name));
    path
  }
}

impl Filer for DirectoryFiler {
  fn emit(&mut self, qualified_name: &str, text: &str, origin: &str) -> Result<(), EmitError> {
    let path = self.path_for(qualified_name);
    let io_error = |source: std::io::Error| EmitError::Io {
      name: qualified_name.to_string(),
      path: path.clone(),
      source,
    };
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(&path, text).map_err(io_error)?;
    debug!(unit = qualified_name, origin, path = %path.display(), "wrote generated unit");
    self.written.push(path);
    Ok(())
  }

  fn discard(&mut self, qualified_name: &str) -> Result<(), EmitError> {
    let path = self.path_for(qualified_name);
    if !self.written.contains(&path) {
      return Ok(());
    }
    std::fs::remove_file(&path).map_err(|source| EmitError::Io {
      name: qualified_name.to_string(),
      path: path.clone(),
      source,
    })?;
    debug!(unit = qualified_name, path = %path.display(), "removed generated unit");
    self.written.retain(|written| written != &path);
    Ok(())
  }
}

/* Keeps emitted units in memory, keyed by qualified name */
#[derive(Debug, Clone, Default)]
pub struct MemoryFiler {
  units: IndexMap<String, (String, String)>,
}

impl MemoryFiler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, qualified_name: &str) -> Option<&str> {
    self.units.get(qualified_name).map(|(text, _)| text.as_str())
  }

  pub fn origin_of(&self, qualified_name: &str) -> Option<&str> {
    self.units.get(qualified_name).map(|(_, origin)| origin.as_str())
  }

  pub fn names(&self) -> Vec<&str> {
    self.units.keys().map(String::as_str).collect()
  }

  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }
}

impl Filer for MemoryFiler {
  fn emit(&mut self, qualified_name: &str, text: &str, origin: &str) -> Result<(), EmitError> {
    if self.units.contains_key(qualified_name) {
      return Err(EmitError::Duplicate(qualified_name.to_string()));
    }
    self
      .units
      .insert(qualified_name.to_string(), (text.to_string(), origin.to_string()));
    Ok(())
  }

  fn discard(&mut self, qualified_name: &str) -> Result<(), EmitError> {
    self.units.shift_remove(qualified_name);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn directory_filer_mirrors_package_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut filer = DirectoryFiler::new(dir.path());
    filer.emit("com.x.Retrofit_Api", "{}", "com.x.Api").unwrap();
    let expected = dir.path().join("com").join("x").join("Retrofit_Api.json");
    assert_eq!(std::fs::read_to_string(&expected).unwrap(), "{}");
    assert_eq!(filer.written(), &[expected.clone()]);

    filer.discard("com.x.Retrofit_Api").unwrap();
    assert!(!expected.exists());
    assert!(filer.written().is_empty());
    filer.discard("com.x.Never").unwrap();
  }

  #[test]
  fn memory_filer_rejects_second_emission() {
    let mut filer = MemoryFiler::new();
    filer.emit("com.x.Retrofit_Api", "a", "com.x.Api").unwrap();
    let err = filer.emit("com.x.Retrofit_Api", "b", "com.x.Api").unwrap_err();
    assert!(matches!(err, EmitError::Duplicate(name) if name == "com.x.Retrofit_Api"));
    assert_eq!(filer.get("com.x.Retrofit_Api"), Some("a"));
    assert_eq!(filer.origin_of("com.x.Retrofit_Api"), Some("com.x.Api"));
  }
}
