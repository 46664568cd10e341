/* Common utilities shared between analyze and codegen commands */

use anyhow::Context;
use retrofit_gen::ProcessorConfig;
use retrofit_gen::diagnostics::{Diagnostic, Severity};
use retrofit_loader::ImportResolver;
use retrofit_loader::retrofit_types::TypeDecl;
use std::path::{Path, PathBuf};

/* Load the processor config, falling back to defaults */
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ProcessorConfig> {
  let config = ProcessorConfig::load_or_default(path)?;
  Ok(config)
}

/* Load model files with their imports, prelude first */
pub fn load_types(
  files: &[PathBuf],
  include_dirs: &[PathBuf],
  verbose: bool,
) -> anyhow::Result<Vec<TypeDecl>> {
  let mut resolver = ImportResolver::with_prelude(include_dirs.to_vec())
    .context("Failed to load the built-in prelude")?;

  if verbose {
    println!("[~] Loading model files and resolving imports...");
    if !include_dirs.is_empty() {
      println!("    Include directories:");
      for dir in include_dirs {
        println!("      - {}", dir.display());
      }
    }
  }

  for file in files {
    resolver.load_file_with_imports(file)?;
  }

  if verbose {
    println!(
      "[~] Loaded {} file(s) total (including imports and prelude)",
      resolver.loaded_file_count()
    );
    println!("[~] Packages loaded:");
    for package in resolver.get_packages() {
      println!("    - {}", package);
    }
    println!();
  }

  Ok(resolver.into_types())
}

/* Print diagnostics with the status markers; returns the error count */
pub fn print_diagnostics(diagnostics: &[Diagnostic]) -> usize {
  let mut errors = 0;
  for diagnostic in diagnostics {
    match diagnostic.severity {
      Severity::Error => {
        errors += 1;
        println!("  [✗] {}: {}", diagnostic.element, diagnostic.message);
      }
      Severity::Warning => {
        println!("  [!] {}: {}", diagnostic.element, diagnostic.message);
      }
    }
  }
  errors
}
