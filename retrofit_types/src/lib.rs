//! Host Type Model Definitions
//!
//! This crate contains the data model of the annotated type graph that the
//! Retrofit processor consumes: type declarations, methods, parameters,
//! fields, annotations and type references. It provides pure data
//! structures without any file I/O or code generation logic.

pub mod type_ref;
pub mod types;

// Re-export commonly used types at the crate root
pub use type_ref::*;
pub use types::*;
