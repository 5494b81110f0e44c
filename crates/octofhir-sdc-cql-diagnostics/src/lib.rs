//! Diagnostics for SDC questionnaire CQL resolution
//!
//! This crate provides the reporting vocabulary shared by the pipeline crates:
//! error codes ranged by pipeline stage, severities, source ranges reported by the
//! CQL-to-ELM translator, and the `Diagnostic` record that ties them together.

mod diagnostic;
mod error_code;
mod location;

pub use diagnostic::*;
pub use error_code::*;
pub use location::*;
