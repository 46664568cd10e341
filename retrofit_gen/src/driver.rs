/* Pass driver: rebuilds the snapshot each pass and feeds generated types back in */

use crate::config::ProcessorConfig;
use crate::diagnostics::{Diagnostic, Severity};
use crate::host::{ModelGraph, TypeHost};
use crate::render::{Filer, ImplementationUnit, Renderer};
use crate::rounds::{RoundCoordinator, RoundInput, RoundOutcome};
use retrofit_types::{ElementKind, TypeDecl, TypeRef};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct DriverReport {
  pub passes: usize,
  pub done: Vec<String>,
  pub failed: Vec<String>,
  pub diagnostics: Vec<Diagnostic>,
  pub units: Vec<ImplementationUnit>,
}

impl DriverReport {
  fn absorb(&mut self, outcome: RoundOutcome) {
    self.passes += 1;
    self.done.extend(outcome.done);
    self.failed.extend(outcome.failed);
    self.diagnostics.extend(outcome.diagnostics);
    self.units.extend(outcome.emitted);
  }

  pub fn error_count(&self) -> usize {
    self
      .diagnostics
      .iter()
      .filter(|d| d.severity == Severity::Error)
      .count()
  }

  pub fn has_errors(&self) -> bool {
    self.error_count() > 0
  }
}

pub struct PassDriver<R: Renderer> {
  base: Vec<TypeDecl>,
  coordinator: RoundCoordinator<R>,
}

impl<R: Renderer> PassDriver<R> {
  pub fn new(base: Vec<TypeDecl>, config: ProcessorConfig, renderer: R) -> Self {
    Self {
      base,
      coordinator: RoundCoordinator::new(config, renderer),
    }
  }

  /// Runs passes until one emits nothing, then the terminal pass.
  pub fn run(&mut self, filer: &mut dyn Filer) -> DriverReport {
    let mut report = DriverReport::default();
    let mut generated: Vec<TypeDecl> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let max_passes = self.coordinator.config().max_passes.max(1);
    let root_marker = self.coordinator.config().root_marker.clone();

    loop {
      let graph = ModelGraph::new(self.base.iter().cloned().chain(generated.iter().cloned()));
      let annotated: Vec<String> = graph
        .annotated_types(&root_marker)
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect();
      let input = RoundInput {
        annotated,
        processing_over: false,
      };
      let outcome = self.coordinator.process(&graph, &input, filer);
      for unit in &outcome.emitted {
        generated.push(implementation_decl(&graph, unit));
      }
      let emitted_any = !outcome.emitted.is_empty();
      report.absorb(outcome);
      debug!(pass = report.passes, emitted_any, deferred = self.coordinator.deferred().len(), "pass finished");

      if !emitted_any {
        break;
      }
      if report.passes >= max_passes {
        warn!("stopping after {} passes without converging", report.passes);
        break;
      }
    }

    let graph = ModelGraph::new(self.base.iter().cloned().chain(generated.iter().cloned()));
    let terminal = RoundInput {
      annotated: Vec::new(),
      processing_over: true,
    };
    let outcome = self.coordinator.process(&graph, &terminal, filer);
    report.absorb(outcome);
    report
  }
}

/* The generated type as the next snapshot sees it: a same-package subtype of its origin */
fn implementation_decl(host: &dyn TypeHost, unit: &ImplementationUnit) -> TypeDecl {
  let (package, name) = unit
    .qualified_name
    .rsplit_once('.')
    .unwrap_or(("", unit.qualified_name.as_str()));
  let decl = TypeDecl::class(name, package);
  let origin = TypeRef::named(unit.origin.clone());
  match host.type_element(&unit.origin).map(|e| e.kind()) {
    Some(ElementKind::Interface) => decl.implements(origin),
    _ => decl.extends(origin),
  }
}
