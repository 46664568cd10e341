use retrofit_types::TypeDecl;
use serde_derive::{Deserialize, Serialize};

/* Where an imported model file comes from */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImportSource {
    /* Local file path import */
    Path {
        /* Relative or absolute path to the model file */
        path: String,
    },
}

impl ImportSource {
    /* Get the path for path imports */
    pub fn path(&self) -> &str {
        match self {
            ImportSource::Path { path } => path,
        }
    }
}

/* Metadata for a model file */
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ModelMetadata {
    /* Java package applied to every type that does not name its own */
    pub package: String,

    /* File description */
    #[serde(default)]
    pub description: String,

    /* List of imported model files */
    #[serde(default)]
    pub imports: Vec<ImportSource>,
}

/* Complete model file: metadata and type declarations */
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ModelFile {
    /* Model file metadata */
    pub model: ModelMetadata,

    /* Type declarations */
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

impl ModelFile {
    /* Parse a model file from YAML text */
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    /* Get the package name */
    pub fn package(&self) -> &str {
        &self.model.package
    }

    /* Get the imports */
    pub fn imports(&self) -> &[ImportSource] {
        &self.model.imports
    }

    /* Type declarations with the file package applied where a type names none */
    pub fn packaged_types(&self) -> Vec<TypeDecl> {
        self.types
            .iter()
            .cloned()
            .map(|mut decl| {
                if decl.package.is_none() {
                    decl.package = Some(self.model.package.clone());
                }
                decl
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrofit_types::ElementKind;

    #[test]
    fn parses_metadata_and_applies_package() {
        let yaml = r#"
model:
  package: com.example.api
  description: Photo service
  imports:
    - type: path
      path: common.model.yaml
types:
  - name: PhotoService
    kind: interface
  - name: Other
    package: com.example.other
"#;
        let file = ModelFile::from_yaml(yaml).unwrap();
        assert_eq!(file.package(), "com.example.api");
        assert_eq!(file.imports()[0].path(), "common.model.yaml");

        let types = file.packaged_types();
        assert_eq!(types[0].package.as_deref(), Some("com.example.api"));
        assert_eq!(types[0].kind, ElementKind::Interface);
        assert_eq!(types[1].package.as_deref(), Some("com.example.other"));
    }
}
