//! CLI functionality for the sdc-cql tool
//!
//! - Questionnaire runs
//! - CQL translation
//! - Single expression evaluation
//! - ELM execution
//! - Output formatting

pub mod execute;
pub mod expression;
pub mod output;
pub mod run;
pub mod translate;

use crate::config::RunnerConfig;
use crate::locator::Traversal;
use std::path::PathBuf;

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub translator_url: String,
    pub timeout_ms: u64,
    pub verbose: bool,
    pub format: output::OutputFormat,
    pub output_file: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn runner_config(&self, traversal: Traversal) -> RunnerConfig {
        RunnerConfig {
            translator_url: self.translator_url.clone(),
            request_timeout_ms: self.timeout_ms,
            traversal,
        }
    }
}
