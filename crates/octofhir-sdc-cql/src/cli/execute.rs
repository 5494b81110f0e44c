//! Execute command implementation

use super::{GlobalOptions, output};
use crate::elm::ElmDocument;
use crate::engine::{EmbeddedEngine, ExecutionEngine, PatientSource};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

/// Configuration for execute command
pub struct ExecuteConfig {
    pub file: PathBuf,
    /// JSON file holding an array of Patient resources
    pub patients: Option<PathBuf>,
}

/// Execute an ELM document with the embedded engine
pub async fn execute(config: ExecuteConfig, options: &GlobalOptions) -> Result<()> {
    let elm = ElmDocument::new(output::read_json(&config.file)?);
    if options.verbose {
        eprintln!(
            "Executing library {}",
            elm.library_id().unwrap_or("(unnamed)")
        );
    }

    let patients = match &config.patients {
        Some(path) => match output::read_json(path)? {
            Value::Array(patients) => PatientSource::new(patients),
            single @ Value::Object(_) => PatientSource::new(vec![single]),
            _ => anyhow::bail!("{} must contain a JSON array of patients", path.display()),
        },
        None => PatientSource::empty(),
    };

    let engine = EmbeddedEngine::new();
    let library = engine
        .compile(&elm)
        .with_context(|| format!("Failed to compile {}", config.file.display()))?;
    let results = engine.run(&library, &patients).await?;

    output::print_output(&results, options.format, options.output_file.as_deref())
}
