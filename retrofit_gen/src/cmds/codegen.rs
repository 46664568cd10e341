/* Codegen command - generate implementation units for annotated types */

use super::common::{load_config, load_types, print_diagnostics};
use retrofit_gen::{DirectoryFiler, JsonRenderer, PassDriver};
use std::path::PathBuf;

/* Execute the codegen command */
pub fn run(
  files: Vec<PathBuf>,
  include_dirs: Vec<PathBuf>,
  output_dir: PathBuf,
  config_path: Option<PathBuf>,
  verbose: bool,
) -> anyhow::Result<()> {
  if verbose {
    println!("Retrofit Generator - Implementation Synthesis");
    println!("=============================================\n");
    println!("[~] Configuration:");
    println!("  Output directory: {}", output_dir.display());
    if let Some(path) = &config_path {
      println!("  Config file: {}", path.display());
    }
    println!("  Input files: {}", files.len());
    for file in &files {
      println!("    - {}", file.display());
    }
    println!();
  }

  let config = load_config(config_path.as_deref())?;
  let types = load_types(&files, &include_dirs, verbose)?;

  std::fs::create_dir_all(&output_dir)?;
  let mut filer = DirectoryFiler::new(&output_dir);
  let mut driver = PassDriver::new(types, config, JsonRenderer);
  let report = driver.run(&mut filer);

  if verbose {
    println!("[~] Finished after {} pass(es)", report.passes);
  }
  for unit in &report.units {
    println!("[✓] {} (from {})", unit.qualified_name, unit.origin);
    if let Some(serializer) = &unit.serializer {
      println!("    + {}", serializer.qualified_name);
    }
  }
  for name in &report.failed {
    println!("[✗] {}", name);
  }

  let errors = print_diagnostics(&report.diagnostics);
  if errors > 0 {
    anyhow::bail!(
      "Code generation reported {} error(s); {} type(s) generated, {} failed",
      errors,
      report.done.len(),
      report.failed.len()
    );
  }

  if verbose {
    println!("\n[✓] Wrote {} file(s) under {}", filer.written().len(), output_dir.display());
  }
  Ok(())
}
