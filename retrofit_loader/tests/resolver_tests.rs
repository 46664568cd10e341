use retrofit_loader::{load_models, ImportResolver};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_imports_relative_to_file_once() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "common.model.yaml",
        r#"
model:
  package: com.example.model
types:
  - name: Photo
"#,
    );
    let root = write(
        &dir,
        "api.model.yaml",
        r#"
model:
  package: com.example.api
  imports:
    - type: path
      path: common.model.yaml
    - type: path
      path: ./common.model.yaml
types:
  - name: PhotoService
    kind: interface
"#,
    );

    let mut resolver = ImportResolver::new(Vec::new());
    resolver.load_file_with_imports(&root).unwrap();

    assert_eq!(resolver.loaded_file_count(), 2);
    let names: Vec<&str> = resolver
        .get_all_types()
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(names, vec!["Photo", "PhotoService"]);
    assert_eq!(
        resolver.get_packages(),
        vec!["com.example.api".to_string(), "com.example.model".to_string()]
    );
}

#[test]
fn falls_back_to_include_directories() {
    let dir = TempDir::new().unwrap();
    let lib = TempDir::new().unwrap();
    write(
        &lib,
        "shared/user.model.yaml",
        r#"
model:
  package: com.example.shared
types:
  - name: User
"#,
    );
    let root = write(
        &dir,
        "api.model.yaml",
        r#"
model:
  package: com.example.api
  imports:
    - type: path
      path: shared/user.model.yaml
types: []
"#,
    );

    let types = load_models(&[root], &[lib.path().to_path_buf()]).unwrap();
    assert!(types
        .iter()
        .any(|t| t.name == "User" && t.package.as_deref() == Some("com.example.shared")));
    /* prelude is always present */
    assert!(types
        .iter()
        .any(|t| t.name == "Object" && t.package.as_deref() == Some("java.lang")));
}

#[test]
fn file_count_includes_the_prelude() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "api.model.yaml",
        r#"
model:
  package: com.example.api
types:
  - name: PhotoService
    kind: interface
"#,
    );

    let mut resolver = ImportResolver::with_prelude(Vec::new()).unwrap();
    assert_eq!(resolver.loaded_file_count(), 1);
    resolver.load_file_with_imports(&root).unwrap();
    resolver.load_file_with_imports(&root).unwrap();
    assert_eq!(resolver.loaded_file_count(), 2);
    assert!(resolver.get_packages().contains(&"java.lang".to_string()));
}

#[test]
fn circular_imports_terminate() {
    let dir = TempDir::new().unwrap();
    let a = write(
        &dir,
        "a.model.yaml",
        r#"
model:
  package: com.example.a
  imports:
    - type: path
      path: b.model.yaml
types:
  - name: A
"#,
    );
    write(
        &dir,
        "b.model.yaml",
        r#"
model:
  package: com.example.b
  imports:
    - type: path
      path: a.model.yaml
types:
  - name: B
"#,
    );

    let mut resolver = ImportResolver::new(Vec::new());
    resolver.load_file_with_imports(&a).unwrap();
    assert_eq!(resolver.get_all_types().len(), 2);
}

#[test]
fn missing_import_reports_context() {
    let dir = TempDir::new().unwrap();
    let root = write(
        &dir,
        "api.model.yaml",
        r#"
model:
  package: com.example.api
  imports:
    - type: path
      path: nowhere.model.yaml
"#,
    );

    let err = load_models(&[root], &[]).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("nowhere.model.yaml"), "{}", message);
}
