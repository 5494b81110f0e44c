//! Execution adapter
//!
//! [`ExecutionEngine`] compiles ELM into an executable handle and runs it
//! against a patient source. [`EmbeddedEngine`] is the default backend and
//! evaluates ELM in process with `octofhir-sdc-cql-eval`.

use crate::elm::ElmDocument;
use crate::error::ExecutionError;
use async_trait::async_trait;
use indexmap::IndexMap;
use octofhir_sdc_cql_eval::{CqlValue, ElmEngine, ElmLibrary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Patient resources a library runs against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientSource {
    patients: Vec<Value>,
}

impl PatientSource {
    /// No patient context: expression-only evaluation
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(patients: Vec<Value>) -> Self {
        Self { patients }
    }

    pub fn patients(&self) -> &[Value] {
        &self.patients
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

/// Definition values produced by one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResults {
    /// Unfiltered-context definitions by name
    pub unfiltered_results: IndexMap<String, Value>,
    /// Patient-context definitions, by patient id then definition name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub patient_results: IndexMap<String, IndexMap<String, Value>>,
}

impl ExecutionResults {
    pub fn unfiltered(&self, name: &str) -> Option<&Value> {
        self.unfiltered_results.get(name)
    }
}

/// Compiles and runs ELM libraries
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Executable handle produced by [`ExecutionEngine::compile`]
    type Library: Send + Sync;

    fn compile(&self, elm: &ElmDocument) -> Result<Self::Library, ExecutionError>;

    async fn run(
        &self,
        library: &Self::Library,
        patients: &PatientSource,
    ) -> Result<ExecutionResults, ExecutionError>;
}

/// [`ExecutionEngine`] evaluating ELM in process
#[derive(Debug, Clone, Default)]
pub struct EmbeddedEngine {
    engine: ElmEngine,
}

impl EmbeddedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(engine: ElmEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ExecutionEngine for EmbeddedEngine {
    type Library = Arc<ElmLibrary>;

    fn compile(&self, elm: &ElmDocument) -> Result<Self::Library, ExecutionError> {
        ElmLibrary::from_json(elm.as_json())
            .map(Arc::new)
            .map_err(|e| ExecutionError::Compile {
                message: e.to_string(),
            })
    }

    async fn run(
        &self,
        library: &Self::Library,
        patients: &PatientSource,
    ) -> Result<ExecutionResults, ExecutionError> {
        let results = self
            .engine
            .evaluate_library(library, patients.patients())
            .map_err(|e| ExecutionError::Run {
                message: e.to_string(),
            })?;

        Ok(ExecutionResults {
            unfiltered_results: to_json_map(&results.unfiltered),
            patient_results: results
                .patients
                .iter()
                .map(|(id, values)| (id.clone(), to_json_map(values)))
                .collect(),
        })
    }
}

fn to_json_map(values: &IndexMap<String, CqlValue>) -> IndexMap<String, Value> {
    values
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::MAIN_DEFINITION;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn wrapped_multiply_elm() -> ElmDocument {
        ElmDocument::new(json!({
            "library": {
                "identifier": {},
                "statements": {
                    "def": [{
                        "name": MAIN_DEFINITION,
                        "context": "Unfiltered",
                        "accessLevel": "Public",
                        "expression": {
                            "type": "Multiply",
                            "operand": [
                                { "type": "Literal", "valueType": "{urn:hl7-org:elm-types:r1}Integer", "value": "2" },
                                { "type": "Literal", "valueType": "{urn:hl7-org:elm-types:r1}Integer", "value": "3" }
                            ]
                        }
                    }]
                }
            }
        }))
    }

    #[tokio::test]
    async fn test_wrapped_expression_evaluates() {
        let engine = EmbeddedEngine::new();
        let library = engine.compile(&wrapped_multiply_elm()).unwrap();
        let results = engine.run(&library, &PatientSource::empty()).await.unwrap();

        assert_eq!(results.unfiltered(MAIN_DEFINITION), Some(&json!(6)));
        assert!(results.patient_results.is_empty());
    }

    #[test]
    fn test_compile_rejects_non_elm() {
        let err = EmbeddedEngine::new()
            .compile(&ElmDocument::new(json!({ "resourceType": "Library" })))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Compile { .. }));
    }

    #[tokio::test]
    async fn test_engine_failure_is_run_error() {
        let engine = EmbeddedEngine::new();
        let elm = ElmDocument::new(json!({
            "library": {
                "statements": { "def": [{ "name": "Obs", "expression": { "type": "Retrieve" } }] }
            }
        }));
        let library = engine.compile(&elm).unwrap();
        let err = engine.run(&library, &PatientSource::empty()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Run { .. }));
    }
}
