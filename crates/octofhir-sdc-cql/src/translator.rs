//! CQL-to-ELM translation service adapter

use crate::elm::ElmDocument;
use crate::error::{FetchError, TranslateError};
use crate::fetch::transport_error;
use crate::questionnaire::ELM_JSON_CONTENT_TYPE;
use async_trait::async_trait;
use octofhir_sdc_cql_diagnostics::{Diagnostic, SDC0200};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Definition name that holds the value of a wrapped inline expression
pub const MAIN_DEFINITION: &str = "__lforms__main__";

/// Content type the translator expects for CQL request bodies
const CQL_REQUEST_CONTENT_TYPE: &str = "application/cql";

/// Wrap a bare expression in a single-definition library
///
/// The translator only accepts complete libraries; the value of the expression
/// is read back from [`MAIN_DEFINITION`].
pub fn wrap_expression_in_function(expression: &str) -> String {
    format!("define {MAIN_DEFINITION}:\n  {expression}")
}

/// Translates CQL source into ELM
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, cql: &str) -> Result<ElmDocument, TranslateError>;
}

/// [`Translator`] backed by the HL7 `cql-translation-service` REST endpoint
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranslator {
    /// Create a translator for the service at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                url: base_url.to_string(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/cql/translator", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, cql: &str) -> Result<ElmDocument, TranslateError> {
        tracing::debug!(endpoint = %self.endpoint, bytes = cql.len(), "translating CQL");

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, CQL_REQUEST_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, ELM_JSON_CONTENT_TYPE)
            .body(cql.to_string())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "translator request failed");
                transport_error(&self.endpoint, &e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FetchError::InvalidBody {
            url: self.endpoint.clone(),
            message: e.to_string(),
        })?;

        interpret_response(status, &body)
    }
}

/// Map a translator HTTP response onto an ELM document or a [`TranslateError`]
fn interpret_response(status: StatusCode, body: &str) -> Result<ElmDocument, TranslateError> {
    if status == StatusCode::BAD_REQUEST {
        let diagnostics = serde_json::from_str::<Value>(body)
            .map(|json| Diagnostic::collect_from_elm(&json))
            .unwrap_or_default();
        let diagnostics = if diagnostics.is_empty() {
            vec![Diagnostic::error(SDC0200, body_excerpt(body))]
        } else {
            diagnostics
        };
        tracing::debug!(count = diagnostics.len(), "translator rejected CQL");
        return Err(TranslateError::Rejected { diagnostics });
    }

    if !status.is_success() {
        return Err(TranslateError::Service {
            status: status.as_u16(),
            body: body_excerpt(body),
        });
    }

    let json: Value = serde_json::from_str(body).map_err(|e| TranslateError::InvalidElm {
        message: e.to_string(),
    })?;
    let elm = ElmDocument::new(json);
    if !elm.has_library() {
        return Err(TranslateError::InvalidElm {
            message: "response has no 'library' element".to_string(),
        });
    }

    let diagnostics = elm.diagnostics();
    if diagnostics.iter().any(Diagnostic::is_error) {
        return Err(TranslateError::Rejected { diagnostics });
    }

    Ok(elm)
}

fn body_excerpt(body: &str) -> String {
    const LIMIT: usize = 512;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
