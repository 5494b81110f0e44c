//! CQL for FHIR SDC Questionnaires
//!
//! This crate discovers the CQL expressions a Questionnaire declares and
//! resolves and executes them:
//! - Locating items with calculated/initial/enable-when/... expressions
//! - Resolving `Library.Member` references against declared libraries
//! - Translating CQL to ELM through a translation service
//! - Executing ELM and aggregating results by member or expression text
//!
//! # Example
//!
//! ```ignore
//! use octofhir_sdc_cql::{QuestionnaireRunner, RunnerConfig};
//!
//! let runner = QuestionnaireRunner::from_config(&RunnerConfig::from_env()?)?;
//! let report = runner.run(&questionnaire).await?;
//! println!("{}", serde_json::to_string_pretty(&report.output)?);
//! ```

pub mod cache;
pub mod config;
pub mod elm;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod locator;
pub mod questionnaire;
pub mod reference;
pub mod resolver;
pub mod runner;
pub mod translator;

pub use octofhir_sdc_cql_diagnostics as diagnostics;
pub use octofhir_sdc_cql_eval as eval;

// Convenience re-exports
pub use cache::{CachedLibrary, LibraryCache};
pub use config::RunnerConfig;
pub use elm::ElmDocument;
pub use engine::{EmbeddedEngine, ExecutionEngine, ExecutionResults, PatientSource};
pub use error::{ExecutionError, FetchError, ResolutionError, RunError, TranslateError};
pub use fetch::{DocumentFetcher, HttpFetcher};
pub use locator::{LocatedItems, Traversal, locate};
pub use questionnaire::{ItemExpression, LibraryDeclaration, Questionnaire};
pub use reference::{LibraryReference, parse_reference};
pub use resolver::LibraryResolver;
pub use runner::{ExpressionKind, ItemFailure, QuestionnaireRunner, RunOutcome, RunOutput, RunReport};
pub use translator::{HttpTranslator, MAIN_DEFINITION, Translator, wrap_expression_in_function};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
