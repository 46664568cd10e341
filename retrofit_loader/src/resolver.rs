use anyhow::Context;
use retrofit_types::TypeDecl;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::file::{ImportSource, ModelFile};
use crate::prelude;

/* Import resolver for loading and merging imported model files */
pub struct ImportResolver {
    /* Track loaded files to detect circular imports */
    loaded_files: HashSet<PathBuf>,

    /* Include directories for searching imports */
    include_dirs: Vec<PathBuf>,

    /* All collected type declarations, package applied */
    all_types: Vec<TypeDecl>,

    /* Model files registered so far, from disk or built in */
    file_count: usize,

    /* Map from package name to list of simple type names in that package */
    package_types: HashMap<String, Vec<String>>,
}

impl ImportResolver {
    /* Create a new import resolver with the given include directories */
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            loaded_files: HashSet::new(),
            include_dirs,
            all_types: Vec::new(),
            file_count: 0,
            package_types: HashMap::new(),
        }
    }

    /* Create a resolver that already holds the built-in library declarations */
    pub fn with_prelude(include_dirs: Vec<PathBuf>) -> anyhow::Result<Self> {
        let mut resolver = Self::new(include_dirs);
        resolver.add_file(prelude::prelude_file()?);
        Ok(resolver)
    }

    /* Resolve an import path relative to a base file or include directories */
    fn resolve_import_path(&self, import_path: &str, base_file: &Path) -> anyhow::Result<PathBuf> {
        /* First try relative to the base file's directory */
        if let Some(parent) = base_file.parent() {
            let relative_path = parent.join(import_path);
            if relative_path.exists() {
                return Ok(relative_path.canonicalize()?);
            }
        }

        /* Then try each include directory */
        for include_dir in &self.include_dirs {
            let include_path = include_dir.join(import_path);
            if include_path.exists() {
                return Ok(include_path.canonicalize()?);
            }
        }

        anyhow::bail!(
            "Import '{}' not found relative to '{}' or in include directories",
            import_path,
            base_file.display()
        )
    }

    /* Load a model file and recursively load its imports */
    pub fn load_file_with_imports(&mut self, file_path: &Path) -> anyhow::Result<()> {
        /* Canonicalize the path to detect duplicates */
        let canonical_path = file_path
            .canonicalize()
            .with_context(|| format!("Model file not found: {}", file_path.display()))?;

        /* Skip if already loaded */
        if self.loaded_files.contains(&canonical_path) {
            debug!("skipping already loaded file {}", file_path.display());
            return Ok(());
        }

        /* Mark as loaded before processing imports to detect circular dependencies */
        self.loaded_files.insert(canonical_path.clone());

        debug!("loading model file {}", file_path.display());

        let contents = std::fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        let model_file = ModelFile::from_yaml(&contents)
            .with_context(|| format!("Failed to parse model file {}", file_path.display()))?;

        debug!(
            package = model_file.package(),
            types = model_file.types.len(),
            imports = model_file.imports().len(),
            "parsed model file"
        );

        let imports: Vec<ImportSource> = model_file.imports().to_vec();
        for import in &imports {
            debug!("resolving path import {}", import.path());
            let import_path = self
                .resolve_import_path(import.path(), &canonical_path)
                .with_context(|| format!("While loading {}", file_path.display()))?;
            self.load_file_with_imports(&import_path)?;
        }

        self.add_file(model_file);
        Ok(())
    }

    /* Register a parsed file and its types with their package */
    fn add_file(&mut self, model_file: ModelFile) {
        for decl in model_file.packaged_types() {
            let package = decl.package.clone().unwrap_or_default();
            self.package_types
                .entry(package)
                .or_default()
                .push(decl.name.clone());
            self.all_types.push(decl);
        }
        self.file_count += 1;
    }

    /* Get all collected type declarations */
    pub fn get_all_types(&self) -> &[TypeDecl] {
        &self.all_types
    }

    /* Consume the resolver, yielding the collected declarations */
    pub fn into_types(self) -> Vec<TypeDecl> {
        self.all_types
    }

    /* Get the number of registered model files, the prelude included */
    pub fn loaded_file_count(&self) -> usize {
        self.file_count
    }

    /* Get all packages, sorted */
    pub fn get_packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = self.package_types.keys().cloned().collect();
        packages.sort();
        packages
    }
}

/* Load every model file plus imports on top of the prelude */
pub fn load_models(files: &[PathBuf], include_dirs: &[PathBuf]) -> anyhow::Result<Vec<TypeDecl>> {
    let mut resolver = ImportResolver::with_prelude(include_dirs.to_vec())?;
    for file in files {
        resolver.load_file_with_imports(file)?;
    }
    Ok(resolver.into_types())
}
