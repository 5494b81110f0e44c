//! Recording fakes of the pipeline collaborators

use async_trait::async_trait;
use octofhir_sdc_cql::diagnostics::{Diagnostic, SDC0200};
use octofhir_sdc_cql::eval::ElmLibrary;
use octofhir_sdc_cql::{
    DocumentFetcher, ElmDocument, EmbeddedEngine, ExecutionEngine, ExecutionError,
    ExecutionResults, FetchError, PatientSource, TranslateError, Translator,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Translator answering from a table of CQL text -> ELM
///
/// Unknown CQL is rejected with a syntax diagnostic.
#[derive(Default)]
pub struct FakeTranslator {
    responses: RwLock<HashMap<String, Result<ElmDocument, TranslateError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elm(self, cql: &str, elm: Value) -> Self {
        self.responses
            .write()
            .insert(cql.to_string(), Ok(ElmDocument::new(elm)));
        self
    }

    pub fn with_error(self, cql: &str, error: TranslateError) -> Self {
        self.responses.write().insert(cql.to_string(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, cql: &str) -> Result<ElmDocument, TranslateError> {
        self.calls.lock().push(cql.to_string());
        self.responses.read().get(cql).cloned().unwrap_or_else(|| {
            Err(TranslateError::Rejected {
                diagnostics: vec![Diagnostic::error(SDC0200, "Syntax error")],
            })
        })
    }
}

/// Fetcher serving documents from memory
#[derive(Default)]
pub struct FakeFetcher {
    json: RwLock<HashMap<String, Value>>,
    text: RwLock<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, url: &str, document: Value) -> Self {
        self.json.write().insert(url.to_string(), document);
        self
    }

    pub fn with_text(self, url: &str, document: &str) -> Self {
        self.text.write().insert(url.to_string(), document.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }
}

fn not_found(url: &str) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: 404,
    }
}

#[async_trait]
impl DocumentFetcher for FakeFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        self.calls.lock().push(url.to_string());
        self.json.read().get(url).cloned().ok_or_else(|| not_found(url))
    }

    async fn fetch_text(&self, url: &str, _accept: &str) -> Result<String, FetchError> {
        self.calls.lock().push(url.to_string());
        self.text.read().get(url).cloned().ok_or_else(|| not_found(url))
    }
}

/// [`EmbeddedEngine`] counting compile and run calls
#[derive(Default)]
pub struct CountingEngine {
    inner: EmbeddedEngine,
    compiled: Mutex<Vec<Option<String>>>,
    runs: Mutex<usize>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library ids in compile order
    pub fn compiled(&self) -> Vec<Option<String>> {
        self.compiled.lock().clone()
    }

    pub fn runs(&self) -> usize {
        *self.runs.lock()
    }
}

#[async_trait]
impl ExecutionEngine for CountingEngine {
    type Library = Arc<ElmLibrary>;

    fn compile(&self, elm: &ElmDocument) -> Result<Self::Library, ExecutionError> {
        self.compiled.lock().push(elm.library_id().map(str::to_string));
        self.inner.compile(elm)
    }

    async fn run(
        &self,
        library: &Self::Library,
        patients: &PatientSource,
    ) -> Result<ExecutionResults, ExecutionError> {
        *self.runs.lock() += 1;
        self.inner.run(library, patients).await
    }
}

/// Shared handles to the fakes a runner was built from
pub struct Fakes {
    pub fetcher: Arc<FakeFetcher>,
    pub translator: Arc<FakeTranslator>,
}

impl Fakes {
    pub fn new(fetcher: FakeFetcher, translator: FakeTranslator) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            translator: Arc::new(translator),
        }
    }

    pub fn runner(&self) -> octofhir_sdc_cql::QuestionnaireRunner<CountingEngine> {
        octofhir_sdc_cql::QuestionnaireRunner::new(
            self.fetcher.clone(),
            self.translator.clone(),
            CountingEngine::new(),
        )
    }
}
