/* Diagnostics attached to program elements */

use crate::error::ProcessError;
use serde_derive::Serialize;
use std::fmt;
use tracing::{error, warn};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
  Error,
  Warning,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Diagnostic {
  pub severity: Severity,
  pub message: String,
  /* `pkg.Type`, `pkg.Type#method`, `pkg.Type#method(param)` or `pkg.Type.field` */
  pub element: String,
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self.severity {
      Severity::Error => "error",
      Severity::Warning => "warning",
    };
    write!(f, "{}: {} ({})", label, self.message, self.element)
  }
}

/* Element path helpers */
pub fn method_element(type_name: &str, method: &str) -> String {
  format!("{}#{}", type_name, method)
}

pub fn field_element(type_name: &str, field: &str) -> String {
  format!("{}.{}", type_name, field)
}

/* Collects diagnostics for one pass */
#[derive(Debug, Default)]
pub struct Reporter {
  diagnostics: Vec<Diagnostic>,
}

impl Reporter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn report_error(&mut self, message: impl Into<String>, element: impl Into<String>) {
    let diagnostic = Diagnostic {
      severity: Severity::Error,
      message: message.into(),
      element: element.into(),
    };
    error!(element = %diagnostic.element, "{}", diagnostic.message);
    self.diagnostics.push(diagnostic);
  }

  pub fn report_warning(&mut self, message: impl Into<String>, element: impl Into<String>) {
    let diagnostic = Diagnostic {
      severity: Severity::Warning,
      message: message.into(),
      element: element.into(),
    };
    warn!(element = %diagnostic.element, "{}", diagnostic.message);
    self.diagnostics.push(diagnostic);
  }

  /* Report an error and hand back the abort signal for the caller to return */
  pub fn abort_with_error(
    &mut self,
    message: impl Into<String>,
    element: impl Into<String>,
  ) -> ProcessError {
    self.report_error(message, element);
    ProcessError::Abort
  }

  pub fn diagnostics(&self) -> &[Diagnostic] {
    &self.diagnostics
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

  pub fn into_diagnostics(self) -> Vec<Diagnostic> {
    self.diagnostics
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn abort_records_the_error() {
    let mut reporter = Reporter::new();
    reporter.report_warning("odd header", method_element("com.x.Api", "list"));
    let err = reporter.abort_with_error("bad kind", "com.x.Api");

    assert_eq!(err, ProcessError::Abort);
    assert_eq!(reporter.error_count(), 1);
    assert_eq!(reporter.diagnostics().len(), 2);
    assert_eq!(
      reporter.diagnostics()[0].to_string(),
      "warning: odd header (com.x.Api#list)"
    );
    assert_eq!(field_element("com.x.Api", "serialVersionUID"), "com.x.Api.serialVersionUID");
  }
}
