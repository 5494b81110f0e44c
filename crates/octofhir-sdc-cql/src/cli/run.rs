//! Run command implementation

use super::{GlobalOptions, output};
use crate::locator::Traversal;
use crate::runner::{QuestionnaireRunner, RunOutcome};
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Configuration for run command
pub struct RunConfig {
    pub file: PathBuf,
    pub nested: bool,
}

/// Resolve and execute every CQL expression of a questionnaire
pub async fn run(config: RunConfig, options: &GlobalOptions) -> Result<()> {
    let questionnaire = output::read_json(&config.file)?;

    let traversal = if config.nested {
        Traversal::Nested
    } else {
        Traversal::TopLevel
    };
    let runner = QuestionnaireRunner::from_config(&options.runner_config(traversal))?;
    let report = runner.run(&questionnaire).await?;

    match report.outcome {
        RunOutcome::NothingToResolve => {
            eprintln!(
                "{}",
                output::format_warning(&format!(
                    "{} has no calculatable CQL expressions",
                    config.file.display()
                ))
            );
        }
        RunOutcome::Completed { executed, failed } => {
            for failure in &report.failures {
                eprintln!(
                    "{} {} ({}): {}",
                    "Failed:".red().bold(),
                    failure.expression,
                    failure.link_id.as_deref().unwrap_or("no linkId"),
                    failure.error
                );
                if options.verbose {
                    output::print_diagnostics(&failure.diagnostics());
                }
            }
            if options.verbose || failed > 0 {
                eprintln!("{executed} executed, {failed} failed");
            }
        }
    }

    output::print_output(&report.output, options.format, options.output_file.as_deref())
}
