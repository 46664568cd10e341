/* Round coordinator: one re-entrant pass over a batch of annotated types */

use crate::config::ProcessorConfig;
use crate::descriptor::DescriptorBuilder;
use crate::diagnostics::{Diagnostic, Reporter};
use crate::error::{ProcessError, ProcessResult};
use crate::gwt::GwtSerializer;
use crate::host::TypeHost;
use crate::render::{Filer, ImplementationUnit, Renderer};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use tracing::{debug, info, warn};

thread_local! {
  /* Set while a type is processed on this thread */
  static CAPTURING: Cell<bool> = const { Cell::new(false) };
  /* Location and backtrace of the last captured panic */
  static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/* Panics outside type processing still reach the previous hook */
fn install_panic_hook() {
  PANIC_HOOK.call_once(|| {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
      if !CAPTURING.with(Cell::get) {
        previous(info);
        return;
      }
      let location = info
        .location()
        .map(|location| location.to_string())
        .unwrap_or_else(|| "an unknown location".to_string());
      let site = format!("at {}\n{}", location, Backtrace::force_capture());
      PANIC_SITE.with(|slot| *slot.borrow_mut() = Some(site));
    }));
  });
}

/// Types whose processing hit a missing reference, retried by name on the next pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredSet {
  names: Vec<String>,
}

impl DeferredSet {
  pub fn insert(&mut self, name: impl Into<String>) {
    let name = name.into();
    if !self.names.contains(&name) {
      self.names.push(name);
    }
  }

  pub fn contains(&self, name: &str) -> bool {
    self.names.iter().any(|n| n == name)
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn into_names(self) -> Vec<String> {
    self.names
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeState {
  Pending,
  Deferred,
  Done,
  Failed,
}

#[derive(Debug, Clone, Default)]
pub struct RoundInput {
  /* Types carrying the root marker that are new in this pass */
  pub annotated: Vec<String>,
  /* Set on the terminal pass */
  pub processing_over: bool,
}

#[derive(Debug, Default)]
pub struct RoundOutcome {
  pub done: Vec<String>,
  pub deferred: Vec<String>,
  pub failed: Vec<String>,
  pub diagnostics: Vec<Diagnostic>,
  pub emitted: Vec<ImplementationUnit>,
}

impl RoundOutcome {
  pub fn state_of(&self, name: &str) -> TypeState {
    let has = |names: &[String]| names.iter().any(|n| n == name);
    if has(&self.done) {
      TypeState::Done
    } else if has(&self.failed) {
      TypeState::Failed
    } else if has(&self.deferred) {
      TypeState::Deferred
    } else {
      TypeState::Pending
    }
  }

  pub fn error_count(&self) -> usize {
    self
      .diagnostics
      .iter()
      .filter(|d| d.severity == crate::diagnostics::Severity::Error)
      .count()
  }
}

pub struct RoundCoordinator<R: Renderer> {
  config: ProcessorConfig,
  renderer: R,
  deferred: DeferredSet,
}

impl<R: Renderer> RoundCoordinator<R> {
  pub fn new(config: ProcessorConfig, renderer: R) -> Self {
    Self {
      config,
      renderer,
      deferred: DeferredSet::default(),
    }
  }

  pub fn config(&self) -> &ProcessorConfig {
    &self.config
  }

  pub fn deferred(&self) -> &DeferredSet {
    &self.deferred
  }

  /// Runs one pass. Carried-over types are taken from the deferred set and
  /// looked up again by name in `host`; failures stay scoped to their type.
  pub fn process(&mut self, host: &dyn TypeHost, input: &RoundInput, filer: &mut dyn Filer) -> RoundOutcome {
    let carried = std::mem::take(&mut self.deferred).into_names();
    let mut outcome = RoundOutcome::default();
    let mut reporter = Reporter::new();

    let mut batch: Vec<String> = Vec::new();
    if input.processing_over {
      for name in carried {
        reporter.report_error(
          format!(
            "Did not generate @{} class for {} because it references undefined types",
            self.config.root_marker, name
          ),
          &name,
        );
        outcome.failed.push(name);
      }
    } else {
      batch.extend(carried);
    }
    for name in &input.annotated {
      if !batch.contains(name) && !outcome.failed.contains(name) {
        batch.push(name.clone());
      }
    }
    debug!(types = batch.len(), terminal = input.processing_over, "starting pass");

    for name in batch {
      match self.process_one(host, &name, filer, &mut reporter) {
        Ok(unit) => {
          info!("generated {} for {}", unit.qualified_name, name);
          outcome.done.push(name);
          outcome.emitted.push(unit);
        }
        Err(ProcessError::MissingType { name: missing }) if !input.processing_over => {
          debug!("deferring {} until {} is defined", name, missing);
          self.deferred.insert(name.clone());
          outcome.deferred.push(name);
        }
        Err(ProcessError::MissingType { .. }) => {
          reporter.report_error(
            format!(
              "Did not generate @{} class for {} because it references undefined types",
              self.config.root_marker, name
            ),
            &name,
          );
          outcome.failed.push(name);
        }
        Err(ProcessError::Abort) => outcome.failed.push(name),
        Err(ProcessError::Unexpected(message)) => {
          reporter.report_error(
            format!("@{} processor threw an exception: {}", self.config.root_marker, message),
            &name,
          );
          outcome.failed.push(name);
        }
      }
    }

    outcome.diagnostics = reporter.into_diagnostics();
    outcome
  }

  /* Panics inside one type become an unexpected failure for that type only */
  fn process_one(
    &self,
    host: &dyn TypeHost,
    name: &str,
    filer: &mut dyn Filer,
    reporter: &mut Reporter,
  ) -> ProcessResult<ImplementationUnit> {
    install_panic_hook();
    CAPTURING.with(|capturing| capturing.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(|| self.build_and_emit(host, name, filer, reporter)));
    CAPTURING.with(|capturing| capturing.set(false));
    match result {
      Ok(result) => result,
      Err(payload) => {
        let site = PANIC_SITE.with(|slot| slot.borrow_mut().take());
        Err(ProcessError::Unexpected(panic_report(payload.as_ref(), site)))
      }
    }
  }

  fn build_and_emit(
    &self,
    host: &dyn TypeHost,
    name: &str,
    filer: &mut dyn Filer,
    reporter: &mut Reporter,
  ) -> ProcessResult<ImplementationUnit> {
    let descriptor = DescriptorBuilder::new(host, &self.config).build(name, reporter)?;
    let text = self.renderer.render(&descriptor)?;
    let serializer = GwtSerializer::for_type(&descriptor);
    let serializer_text = match &serializer {
      Some(serializer) => Some(self.renderer.render_serializer(serializer)?),
      None => None,
    };

    /* Both units are rendered before either is emitted; a failed second emit withdraws the first */
    filer.emit(&descriptor.qualified_generated_name, &text, name)?;
    if let (Some(serializer), Some(serializer_text)) = (&serializer, &serializer_text) {
      if let Err(error) = filer.emit(&serializer.qualified_name, serializer_text, name) {
        if let Err(discard_error) = filer.discard(&descriptor.qualified_generated_name) {
          warn!(
            "{} may be left without its serializer: {}",
            descriptor.qualified_generated_name, discard_error
          );
        }
        return Err(error.into());
      }
    }

    Ok(ImplementationUnit {
      qualified_name: descriptor.qualified_generated_name,
      origin: name.to_string(),
      text,
      serializer,
    })
  }
}

/* Payload text followed by the panic site, when the hook saw one */
fn panic_report(payload: &(dyn Any + Send), site: Option<String>) -> String {
  let message = panic_message(payload);
  match site {
    Some(site) => format!("{} {}", message, site),
    None => message,
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "panic with a non-string payload".to_string()
  }
}
