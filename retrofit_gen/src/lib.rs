//! Retrofit Implementation Synthesis
//!
//! Walks annotated interface-like types, derives one request descriptor per
//! abstract method and assembles them into a generated implementation unit.
//! Processing runs in passes: a type that references something not yet
//! generated is deferred and retried by name on the next pass.

pub mod annotations;
pub mod builder_spec;
pub mod classify;
pub mod config;
pub mod descriptor;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod gwt;
pub mod host;
pub mod path;
pub mod property;
pub mod render;
pub mod rounds;
pub mod type_names;
pub mod walker;

// Re-export the entry points used by the binary and integration tests
pub use config::ProcessorConfig;
pub use descriptor::{DescriptorBuilder, TypeDescriptor};
pub use diagnostics::{Diagnostic, Reporter, Severity};
pub use driver::{DriverReport, PassDriver};
pub use error::{ProcessError, ProcessResult};
pub use host::{ModelGraph, TypeHost};
pub use render::{DirectoryFiler, Filer, JsonRenderer, MemoryFiler, Renderer};
pub use rounds::{DeferredSet, RoundCoordinator, RoundInput, RoundOutcome, TypeState};
