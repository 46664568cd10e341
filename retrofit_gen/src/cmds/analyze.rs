/* Analyze command - show method tables and property descriptors without writing files */

use super::common::{load_config, load_types, print_diagnostics};
use anyhow::Context;
use retrofit_gen::descriptor::TypeDescriptor;
use retrofit_gen::diagnostics::Diagnostic;
use retrofit_gen::walker::collect_methods;
use retrofit_gen::{DescriptorBuilder, ModelGraph, ProcessError, ProcessorConfig, Reporter, TypeHost};
use std::io::Write;
use std::path::PathBuf;

/* Execute the analyze command */
pub fn run(
  files: Vec<PathBuf>,
  include_dirs: Vec<PathBuf>,
  config_path: Option<PathBuf>,
  type_name: Option<String>,
  json: bool,
) -> anyhow::Result<()> {
  let config = load_config(config_path.as_deref())?;
  let types = load_types(&files, &include_dirs, !json)?;
  let graph = ModelGraph::new(types);

  let targets = match type_name {
    Some(name) => {
      if graph.type_element(&name).is_none() {
        anyhow::bail!("Type '{}' not found in the loaded models", name);
      }
      vec![name]
    }
    None => graph.annotated_types(&config.root_marker),
  };

  let stdout = std::io::stdout();
  let stderr = std::io::stderr();
  let diagnostics = write_analysis(&graph, &config, &targets, json, &mut stdout.lock(), &mut stderr.lock())?;
  if !json {
    print_diagnostics(&diagnostics);
  }
  Ok(())
}

/* Listing or JSON goes to `out`; with `json` set, per-type failures and diagnostics go to `err` */
fn write_analysis(
  graph: &ModelGraph,
  config: &ProcessorConfig,
  targets: &[String],
  json: bool,
  out: &mut dyn Write,
  err: &mut dyn Write,
) -> anyhow::Result<Vec<Diagnostic>> {
  let builder = DescriptorBuilder::new(graph, config);
  let mut reporter = Reporter::new();
  let mut descriptors: Vec<TypeDescriptor> = Vec::new();

  for name in targets {
    if !json {
      writeln!(out, "[~] {}", name)?;
      writeln!(out, "    Methods:")?;
      for entry in collect_methods(graph, name) {
        let marker = if entry.is_abstract() { "abstract" } else { "concrete" };
        writeln!(out, "      - {} [{}] from {}", entry.signature, marker, entry.owner)?;
      }
    }

    let failure = match builder.build(name, &mut reporter) {
      Ok(descriptor) => {
        if !json {
          write_descriptor(out, &descriptor)?;
        }
        descriptors.push(descriptor);
        continue;
      }
      Err(ProcessError::MissingType { name: missing }) => {
        format!("[✗] {} references undefined type {}", name, missing)
      }
      Err(error) => format!("[✗] {}: {}", name, error),
    };
    if json {
      writeln!(err, "{}", failure)?;
    } else {
      writeln!(out, "{}", failure)?;
    }
  }

  if json {
    let text = serde_json::to_string_pretty(&descriptors).context("Failed to serialize descriptors")?;
    writeln!(out, "{}", text)?;
    for diagnostic in reporter.diagnostics() {
      writeln!(err, "[{:?}] {}: {}", diagnostic.severity, diagnostic.element, diagnostic.message)?;
    }
  }
  Ok(reporter.into_diagnostics())
}

fn write_descriptor(out: &mut dyn Write, descriptor: &TypeDescriptor) -> std::io::Result<()> {
  writeln!(
    out,
    "    Generated: {} (base url '{}')",
    descriptor.qualified_generated_name, descriptor.base_url
  )?;
  writeln!(out, "    Properties:")?;
  for property in &descriptor.properties {
    let verb = property
      .verb
      .map(|v| format!("{:?}", v).to_uppercase())
      .unwrap_or_else(|| "-".to_string());
    let path = property.path.as_ref().map(|p| p.raw.as_str()).unwrap_or("");
    writeln!(
      out,
      "      - {} {} {} -> {} [{:?}]",
      property.identifier, verb, path, property.type_text, property.mode
    )?;
  }
  if let Some(builder) = &descriptor.builder {
    writeln!(out, "    Builder: {} (build method {})", builder.name, builder.build_method)?;
    for setter in &builder.setters {
      writeln!(out, "      - bit {}: {}({})", setter.bit, setter.name, setter.type_text)?;
    }
  }
  if !descriptor.imports.is_empty() {
    writeln!(out, "    Imports:")?;
    for import in &descriptor.imports {
      writeln!(out, "      - {}", import)?;
    }
  }
  writeln!(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use retrofit_loader::retrofit_types::{Annotation, MethodDecl, TypeDecl};

  fn graph() -> ModelGraph {
    let mut decls = retrofit_loader::prelude_file().unwrap().packaged_types();
    decls.push(TypeDecl::class("Photo", "com.x"));
    for (name, returns) in [("Good", "com.x.Photo"), ("Dangling", "com.x.Missing")] {
      decls.push(
        TypeDecl::interface(name, "com.x")
          .annotated(Annotation::new("retrofit.http.Retrofit"))
          .method(MethodDecl::abstract_method("value", returns.parse().unwrap())),
      );
    }
    ModelGraph::new(decls)
  }

  fn analyze(json: bool) -> (String, String) {
    let targets = vec!["com.x.Good".to_string(), "com.x.Dangling".to_string()];
    let (mut out, mut err) = (Vec::new(), Vec::new());
    write_analysis(&graph(), &ProcessorConfig::default(), &targets, json, &mut out, &mut err).unwrap();
    (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
  }

  #[test]
  fn json_output_stays_parseable_when_a_type_fails() {
    let (out, err) = analyze(true);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["generated-name"], "Retrofit_Good");
    assert!(err.contains("[✗] com.x.Dangling references undefined type com.x.Missing"));
  }

  #[test]
  fn text_output_lists_failures_inline() {
    let (out, err) = analyze(false);
    assert!(out.contains("[~] com.x.Good"));
    assert!(out.contains("[✗] com.x.Dangling references undefined type com.x.Missing"));
    assert!(err.is_empty());
  }
}
