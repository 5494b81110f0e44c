//! Questionnaire runner
//!
//! Locates calculatable expressions, resolves and executes their libraries,
//! and aggregates results into [`RunOutput`]. Reference items are processed
//! before inline items. A failing expression is reported in
//! [`RunReport::failures`] and never aborts the remaining items.

use crate::cache::LibraryCache;
use crate::config::RunnerConfig;
use crate::elm::ElmDocument;
use crate::engine::{EmbeddedEngine, ExecutionEngine, PatientSource};
use crate::error::{ExecutionError, ResolutionError, RunError};
use crate::fetch::{DocumentFetcher, HttpFetcher};
use crate::locator::{LocatedItems, Traversal, locate};
use crate::questionnaire::{ItemExpression, LibraryDeclaration, Questionnaire};
use crate::reference::LibraryReference;
use crate::resolver::LibraryResolver;
use crate::translator::{HttpTranslator, MAIN_DEFINITION, Translator, wrap_expression_in_function};
use indexmap::IndexMap;
use octofhir_sdc_cql_diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Aggregated ELM and execution results of one run
///
/// `cql_execution_result` stays `None` (JSON `null`) until the first value is
/// recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    /// ELM keyed by library name (reference items) or expression text (inline items)
    pub elm_data: IndexMap<String, ElmDocument>,
    /// Values keyed by member name (reference items) or expression text (inline items)
    pub cql_execution_result: Option<IndexMap<String, Value>>,
}

impl RunOutput {
    /// Record ELM under `key`; empty documents are skipped
    pub fn record_elm(&mut self, key: impl Into<String>, elm: ElmDocument) {
        if !elm.is_empty() {
            self.elm_data.insert(key.into(), elm);
        }
    }

    pub fn record_result(&mut self, key: impl Into<String>, value: Value) {
        self.cql_execution_result
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value);
    }

    pub fn result(&self, key: &str) -> Option<&Value> {
        self.cql_execution_result.as_ref()?.get(key)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No item carried a calculatable expression
    NothingToResolve,
    /// Every located expression was attempted
    Completed { executed: usize, failed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Reference,
    Inline,
}

/// One expression that failed during a run
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub link_id: Option<String>,
    pub kind: ExpressionKind,
    /// Reference (`Library.Member`) or inline expression text
    pub expression: String,
    pub error: ResolutionError,
}

impl ItemFailure {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.error.to_diagnostics()
    }
}

/// Result of [`QuestionnaireRunner::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output: RunOutput,
    pub outcome: RunOutcome,
    pub failures: Vec<ItemFailure>,
}

impl RunReport {
    fn nothing_to_resolve() -> Self {
        Self {
            output: RunOutput::default(),
            outcome: RunOutcome::NothingToResolve,
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the CQL of SDC questionnaires
pub struct QuestionnaireRunner<E: ExecutionEngine = EmbeddedEngine> {
    fetcher: Arc<dyn DocumentFetcher>,
    translator: Arc<dyn Translator>,
    engine: E,
    traversal: Traversal,
}

impl QuestionnaireRunner<EmbeddedEngine> {
    /// HTTP translator and fetcher plus the embedded engine, configured from `config`
    pub fn from_config(config: &RunnerConfig) -> Result<Self, RunError> {
        let timeout = config.request_timeout();
        let translator = HttpTranslator::new(&config.translator_url, timeout).map_err(|e| {
            RunError::Config {
                message: e.to_string(),
            }
        })?;
        let fetcher = HttpFetcher::new(timeout).map_err(|e| RunError::Config {
            message: e.to_string(),
        })?;

        tracing::debug!(translator = %translator.endpoint(), timeout_ms = config.request_timeout_ms, "runner configured");

        Ok(Self::new(Arc::new(fetcher), Arc::new(translator), EmbeddedEngine::new())
            .with_traversal(config.traversal))
    }
}

impl<E: ExecutionEngine> QuestionnaireRunner<E> {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, translator: Arc<dyn Translator>, engine: E) -> Self {
        Self {
            fetcher,
            translator,
            engine,
            traversal: Traversal::default(),
        }
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run every calculatable expression in `questionnaire`
    ///
    /// Only a malformed questionnaire is an error; per-expression failures
    /// are collected in the report.
    pub async fn run(&self, questionnaire: &Value) -> Result<RunReport, RunError> {
        let questionnaire = Questionnaire::from_value(questionnaire)?;
        let located = locate(&questionnaire.item, self.traversal);
        let declarations = questionnaire.library_declarations();
        Ok(self.aggregate(&located, &declarations).await)
    }

    /// Process located items against `declarations` with a fresh library cache
    pub async fn aggregate(
        &self,
        located: &LocatedItems<'_>,
        declarations: &[LibraryDeclaration],
    ) -> RunReport {
        if located.is_empty() {
            tracing::warn!("questionnaire has no calculatable CQL expressions");
            return RunReport::nothing_to_resolve();
        }

        tracing::info!(
            reference_items = located.reference_items.len(),
            inline_items = located.inline_items.len(),
            declarations = declarations.len(),
            "running questionnaire CQL"
        );

        let resolver = LibraryResolver::new(self.fetcher.as_ref(), self.translator.as_ref(), &self.engine);
        let mut cache = LibraryCache::new();
        let mut output = RunOutput::default();
        let mut failures = Vec::new();
        let mut executed = 0;

        for item in &located.reference_items {
            for expression in item.expressions() {
                let ItemExpression::Reference { reference } = expression else {
                    continue;
                };
                let result = self
                    .run_reference(&resolver, &reference, declarations, &mut cache, &mut output)
                    .await;
                match result {
                    Ok(()) => executed += 1,
                    Err(error) => failures.push(failure(item.link_id.clone(), ExpressionKind::Reference, reference, error)),
                }
            }
        }

        for item in &located.inline_items {
            for expression in item.expressions() {
                let ItemExpression::Inline { expression } = expression else {
                    continue;
                };
                match self.run_inline(&expression, &mut output).await {
                    Ok(()) => executed += 1,
                    Err(error) => failures.push(failure(item.link_id.clone(), ExpressionKind::Inline, expression, error)),
                }
            }
        }

        tracing::info!(
            executed,
            failed = failures.len(),
            libraries = cache.len(),
            "questionnaire CQL finished"
        );

        RunReport {
            output,
            outcome: RunOutcome::Completed {
                executed,
                failed: failures.len(),
            },
            failures,
        }
    }

    async fn run_reference(
        &self,
        resolver: &LibraryResolver<'_, E>,
        reference: &str,
        declarations: &[LibraryDeclaration],
        cache: &mut LibraryCache<E::Library>,
        output: &mut RunOutput,
    ) -> Result<(), ResolutionError> {
        let reference = LibraryReference::parse(reference)?;
        let entry = resolver.resolve(&reference.library, declarations, cache).await?;

        // A library that fails to run leaves no ELM behind
        let results = self.engine.run(&entry.library, &PatientSource::empty()).await?;
        output.record_elm(reference.library.as_str(), entry.elm.clone());

        let value = results
            .unfiltered(&reference.member)
            .ok_or_else(|| ExecutionError::MissingDefinition {
                name: reference.to_string(),
            })?;
        output.record_result(reference.member.as_str(), value.clone());
        Ok(())
    }

    async fn run_inline(&self, expression: &str, output: &mut RunOutput) -> Result<(), ResolutionError> {
        let elm = self
            .translator
            .translate(&wrap_expression_in_function(expression))
            .await?;
        output.record_elm(expression, elm.clone());

        let library = self.engine.compile(&elm)?;
        let results = self.engine.run(&library, &PatientSource::empty()).await?;
        let value = results
            .unfiltered(MAIN_DEFINITION)
            .ok_or_else(|| ExecutionError::MissingDefinition {
                name: MAIN_DEFINITION.to_string(),
            })?;
        output.record_result(expression, value.clone());
        Ok(())
    }
}

fn failure(link_id: Option<String>, kind: ExpressionKind, expression: String, error: ResolutionError) -> ItemFailure {
    tracing::warn!(
        link_id = link_id.as_deref().unwrap_or("<none>"),
        expression = %expression,
        code = %error.code(),
        error = %error,
        "expression failed"
    );
    ItemFailure {
        link_id,
        kind,
        expression,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockDocumentFetcher;
    use crate::translator::MockTranslator;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_output_serializes_null_results() {
        let output = RunOutput::default();
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({ "elmData": {}, "cqlExecutionResult": null })
        );
    }

    #[test]
    fn test_empty_elm_is_not_recorded() {
        let mut output = RunOutput::default();
        output.record_elm("MyLib", ElmDocument::new(json!({})));
        output.record_result("Score", json!(42));

        assert!(output.elm_data.is_empty());
        assert_eq!(output.result("Score"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_questionnaire_without_expressions() {
        let mut translator = MockTranslator::new();
        translator.expect_translate().never();
        let runner = QuestionnaireRunner::new(
            Arc::new(MockDocumentFetcher::new()),
            Arc::new(translator),
            EmbeddedEngine::new(),
        );

        let report = runner
            .run(&json!({ "resourceType": "Questionnaire", "item": [{ "linkId": "q1" }] }))
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::NothingToResolve);
        assert_eq!(report.output, RunOutput::default());
    }

    #[tokio::test]
    async fn test_invalid_reference_is_item_failure() {
        let runner = QuestionnaireRunner::new(
            Arc::new(MockDocumentFetcher::new()),
            Arc::new(MockTranslator::new()),
            EmbeddedEngine::new(),
        );
        let questionnaire = json!({
            "resourceType": "Questionnaire",
            "item": [{
                "linkId": "score",
                "extension": [{
                    "url": "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-calculatedExpression",
                    "valueExpression": { "language": "text/cql", "reference": "NoDot" }
                }]
            }]
        });

        let report = runner.run(&questionnaire).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed { executed: 0, failed: 1 });
        assert_eq!(report.failures[0].link_id.as_deref(), Some("score"));
        assert_eq!(report.failures[0].kind, ExpressionKind::Reference);
        assert!(matches!(report.failures[0].error, ResolutionError::InvalidReference { .. }));
        assert_eq!(report.output.cql_execution_result, None);
    }

    #[tokio::test]
    async fn test_malformed_questionnaire() {
        let runner = QuestionnaireRunner::new(
            Arc::new(MockDocumentFetcher::new()),
            Arc::new(MockTranslator::new()),
            EmbeddedEngine::new(),
        );
        let err = runner.run(&json!({ "item": "not a list" })).await.unwrap_err();
        assert!(matches!(err, RunError::InvalidQuestionnaire { .. }));
    }
}
