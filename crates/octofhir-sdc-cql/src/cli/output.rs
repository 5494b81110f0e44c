//! Output formatting utilities

use anyhow::{Context, Result};
use colored::Colorize;
use octofhir_sdc_cql_diagnostics::Diagnostic;
use serde::Serialize;
use std::fs;
use std::io::IsTerminal;
use std::path::Path;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Pretty,
}

/// Color mode options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Set up color output based on user preference
pub fn setup_colors(mode: ColorMode) {
    let enabled = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stderr().is_terminal(),
    };
    colored::control::set_override(enabled);
}

pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), error)
}

pub fn format_warning(warning: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), warning)
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Print diagnostics to stderr
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic.render());
    }
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            eprintln!(
                "{}",
                format_success(&format!("Output written to {}", path.display()))
            );
        }
        None => println!("{content}"),
    }
    Ok(())
}

pub fn format_json<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("Failed to serialize JSON")
}

/// Serialize `value` in `format` and write it out
pub fn print_output<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
    output_file: Option<&Path>,
) -> Result<()> {
    write_output(&format_json(value, format)?, output_file)
}

/// Read and parse a JSON file
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file: {}", path.display()))
}
