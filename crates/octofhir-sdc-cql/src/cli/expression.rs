//! Expression command implementation

use super::{GlobalOptions, output};
use crate::engine::{EmbeddedEngine, ExecutionEngine, PatientSource};
use crate::error::ExecutionError;
use crate::translator::{HttpTranslator, MAIN_DEFINITION, Translator, wrap_expression_in_function};
use anyhow::Result;
use serde_json::json;
use std::time::Duration;

/// Configuration for expression command
pub struct ExpressionConfig {
    pub expression: String,
    /// Include the translated ELM next to the value
    pub show_elm: bool,
}

/// Translate and evaluate one inline expression
pub async fn evaluate(config: ExpressionConfig, options: &GlobalOptions) -> Result<()> {
    let translator = HttpTranslator::new(
        &options.translator_url,
        Duration::from_millis(options.timeout_ms),
    )?;

    let elm = match translator
        .translate(&wrap_expression_in_function(&config.expression))
        .await
    {
        Ok(elm) => elm,
        Err(error) => {
            output::print_diagnostics(error.diagnostics());
            return Err(error.into());
        }
    };

    let engine = EmbeddedEngine::new();
    let library = engine.compile(&elm)?;
    let results = engine.run(&library, &PatientSource::empty()).await?;
    let value = results
        .unfiltered(MAIN_DEFINITION)
        .cloned()
        .ok_or_else(|| ExecutionError::MissingDefinition {
            name: MAIN_DEFINITION.to_string(),
        })?;

    let result = if config.show_elm {
        json!({ "expression": config.expression, "value": value, "elm": elm })
    } else {
        value
    };
    output::print_output(&result, options.format, options.output_file.as_deref())
}
