//! Translate command implementation

use super::{GlobalOptions, output};
use crate::error::TranslateError;
use crate::translator::{HttpTranslator, Translator};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for translate command
pub struct TranslateConfig {
    pub file: PathBuf,
}

/// Translate a CQL file to ELM through the translation service
pub async fn translate(config: TranslateConfig, options: &GlobalOptions) -> Result<()> {
    let cql = fs::read_to_string(&config.file)
        .with_context(|| format!("Failed to read CQL file: {}", config.file.display()))?;

    let translator = HttpTranslator::new(
        &options.translator_url,
        Duration::from_millis(options.timeout_ms),
    )?;

    match translator.translate(&cql).await {
        Ok(elm) => {
            if options.verbose {
                output::print_diagnostics(&elm.diagnostics());
            }
            output::print_output(&elm, options.format, options.output_file.as_deref())
        }
        Err(error @ TranslateError::Rejected { .. }) => {
            output::print_diagnostics(error.diagnostics());
            Err(error).with_context(|| format!("Failed to translate {}", config.file.display()))
        }
        Err(error) => Err(error.into()),
    }
}
