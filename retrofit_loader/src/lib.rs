//! Model File Loading and Import Resolution
//!
//! This crate loads `*.model.yaml` type models from disk, resolves path
//! imports between them and supplies the built-in prelude of library types
//! that annotated interfaces refer to.

pub mod file;
pub mod prelude;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use file::{ImportSource, ModelFile, ModelMetadata};
pub use prelude::prelude_file;
pub use resolver::{load_models, ImportResolver};

// Re-export retrofit_types for convenience
pub use retrofit_types;
