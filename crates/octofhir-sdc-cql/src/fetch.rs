//! Document retrieval for library resources and attachments

use crate::error::FetchError;
use crate::questionnaire::Attachment;
use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Retrieves remote documents by URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// GET a JSON document
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;

    /// GET a text document, sending `accept` as the Accept header
    async fn fetch_text(&self, url: &str, accept: &str) -> Result<String, FetchError>;
}

/// [`DocumentFetcher`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url, error = %e, "document request failed");
                transport_error(url, &e)
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "document request returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(url, "fetching JSON document");
        let response = self.get(url, "application/json, application/fhir+json").await?;
        response.json().await.map_err(|e| FetchError::InvalidBody {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_text(&self, url: &str, accept: &str) -> Result<String, FetchError> {
        tracing::debug!(url, accept, "fetching text document");
        let response = self.get(url, accept).await?;
        response.text().await.map_err(|e| FetchError::InvalidBody {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

pub(crate) fn transport_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

// ============================================================================
// Attachments
// ============================================================================

/// Decode base64 attachment `data`
pub fn decode_inline_data(data: &str) -> Result<Vec<u8>, FetchError> {
    let compact: String = data.split_whitespace().collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| FetchError::InvalidInlineData {
            message: e.to_string(),
        })
}

/// Read an attachment as text, preferring inline data over its url
pub async fn load_attachment_text(
    fetcher: &dyn DocumentFetcher,
    attachment: &Attachment,
    accept: &str,
) -> Result<String, FetchError> {
    if let Some(data) = attachment.data.as_deref().filter(|d| !d.trim().is_empty()) {
        let bytes = decode_inline_data(data)?;
        return String::from_utf8(bytes).map_err(|e| FetchError::InvalidInlineData {
            message: e.to_string(),
        });
    }
    fetcher.fetch_text(attachment_url(attachment)?, accept).await
}

/// Read an attachment as JSON, preferring inline data over its url
pub async fn load_attachment_json(
    fetcher: &dyn DocumentFetcher,
    attachment: &Attachment,
) -> Result<Value, FetchError> {
    if let Some(data) = attachment.data.as_deref().filter(|d| !d.trim().is_empty()) {
        let bytes = decode_inline_data(data)?;
        return serde_json::from_slice(&bytes).map_err(|e| FetchError::InvalidInlineData {
            message: e.to_string(),
        });
    }
    fetcher.fetch_json(attachment_url(attachment)?).await
}

fn attachment_url(attachment: &Attachment) -> Result<&str, FetchError> {
    attachment
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| FetchError::InvalidUrl {
            url: String::new(),
            message: "attachment has neither data nor url".to_string(),
        })
}

/// Resolve `reference` against `base` unless it is already absolute
pub fn join_url(base: &str, reference: &str) -> Result<String, FetchError> {
    if let Ok(absolute) = Url::parse(reference) {
        return Ok(absolute.into());
    }
    Url::parse(base)
        .and_then(|b| b.join(reference))
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl {
            url: reference.to_string(),
            message: e.to_string(),
        })
}

/// Make a Library resource attachment's url absolute against the resource's location
pub fn absolutize(attachment: &Attachment, base: &str) -> Result<Attachment, FetchError> {
    let mut resolved = attachment.clone();
    if let Some(url) = attachment.url.as_deref().filter(|u| !u.trim().is_empty()) {
        resolved.url = Some(join_url(base, url)?);
    }
    Ok(resolved)
}
