//! Error types for each stage of a questionnaire run
//!
//! Every error maps to an [`ErrorCode`] and can be reported as a [`Diagnostic`].

use octofhir_sdc_cql_diagnostics::{
    Diagnostic, ErrorCode, SDC0001, SDC0002, SDC0100, SDC0101, SDC0102, SDC0103, SDC0104, SDC0200,
    SDC0201, SDC0202, SDC0300, SDC0301, SDC0302, SDC0401, SDC0402, SDC0403, SDC0404, SDC0405,
};
use thiserror::Error;

/// Failure while retrieving a remote or inline document
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid response body from {url}: {message}")]
    InvalidBody { url: String, message: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid inline attachment data: {message}")]
    InvalidInlineData { message: String },
}

impl FetchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Transport { .. } => SDC0401,
            Self::Timeout { .. } => SDC0403,
            Self::Status { .. } => SDC0404,
            Self::InvalidBody { .. } | Self::InvalidUrl { .. } => SDC0405,
            Self::InvalidInlineData { .. } => SDC0103,
        }
    }
}

/// Failure reported by the CQL-to-ELM translator adapter
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslateError {
    /// The translator refused the CQL text
    #[error("CQL translation rejected: {}", summarize(.diagnostics))]
    Rejected { diagnostics: Vec<Diagnostic> },

    /// Any other non-success response
    #[error("Translator returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    /// The translator could not be reached or did not answer in time
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A success response whose body is not an ELM library
    #[error("Translator returned invalid ELM: {message}")]
    InvalidElm { message: String },
}

impl TranslateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { .. } => SDC0200,
            Self::Service { .. } => SDC0201,
            Self::Fetch(e) => e.code(),
            Self::InvalidElm { .. } => SDC0202,
        }
    }

    /// Translator diagnostics, empty unless the CQL was rejected
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Rejected { diagnostics } => diagnostics,
            _ => &[],
        }
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "no diagnostics reported".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}

/// Failure inside the execution adapter
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Failed to compile ELM: {message}")]
    Compile { message: String },

    #[error("Execution failed: {message}")]
    Run { message: String },

    /// The executed library produced no value under the expected name
    #[error("Execution produced no result for '{name}'")]
    MissingDefinition { name: String },
}

impl ExecutionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Compile { .. } => SDC0300,
            Self::Run { .. } => SDC0301,
            Self::MissingDefinition { .. } => SDC0302,
        }
    }
}

/// Failure resolving or running one questionnaire expression
///
/// Resolution errors never abort a run; the runner records them per item.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolutionError {
    #[error("Invalid library reference '{reference}'")]
    InvalidReference { reference: String },

    #[error("No library declaration found for '{library}'")]
    NotFound { library: String },

    #[error("Library '{library}' has {count} untyped declarations")]
    Ambiguous { library: String, count: usize },

    #[error("Library '{library}' declares no CQL or ELM content")]
    NoContent { library: String },

    #[error("Invalid Library resource at {url}: {message}")]
    InvalidLibraryResource { url: String, message: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Translation(TranslateError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl From<TranslateError> for ResolutionError {
    /// Transport failures reaching the translator land in the fetch taxonomy
    fn from(error: TranslateError) -> Self {
        match error {
            TranslateError::Fetch(fetch) => Self::Fetch(fetch),
            other => Self::Translation(other),
        }
    }
}

impl ResolutionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidReference { .. } => SDC0002,
            Self::NotFound { .. } => SDC0100,
            Self::Ambiguous { .. } => SDC0101,
            Self::NoContent { .. } => SDC0102,
            Self::InvalidLibraryResource { .. } => SDC0104,
            Self::Fetch(e) => e.code(),
            Self::Translation(e) => e.code(),
            Self::Execution(e) => e.code(),
        }
    }

    /// Diagnostics describing this failure
    ///
    /// Translator rejections carry the translator's own diagnostics; every
    /// other failure becomes a single error diagnostic.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Translation(e) if !e.diagnostics().is_empty() => e.diagnostics().to_vec(),
            other => vec![other.to_diagnostic()],
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.code(), self.to_string());
        match self.code().info().help {
            Some(help) => diagnostic.with_help(help),
            None => diagnostic,
        }
    }
}

/// Failure that aborts a whole run
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RunError {
    #[error("Invalid questionnaire: {message}")]
    InvalidQuestionnaire { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl RunError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidQuestionnaire { .. } => SDC0001,
            Self::Config { .. } => SDC0402,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_codes_follow_the_wrapped_error() {
        let fetch = ResolutionError::from(FetchError::Timeout {
            url: "http://example.org/lib.cql".into(),
        });
        assert_eq!(fetch.code(), SDC0403);

        let rejected = ResolutionError::from(TranslateError::Rejected {
            diagnostics: vec![Diagnostic::error(SDC0200, "Syntax error at 'define'")],
        });
        assert_eq!(rejected.code(), SDC0200);
        assert_eq!(
            rejected.to_string(),
            "CQL translation rejected: Syntax error at 'define'"
        );
    }

    #[test]
    fn test_translator_timeout_is_a_fetch_error() {
        let timeout = FetchError::Timeout {
            url: "http://localhost:8080/cql/translator".into(),
        };
        let err = ResolutionError::from(TranslateError::from(timeout.clone()));
        assert_eq!(err, ResolutionError::Fetch(timeout));
        assert_eq!(err.code(), SDC0403);
        assert_eq!(err.to_string(), "Request to http://localhost:8080/cql/translator timed out");
    }

    #[test]
    fn test_translator_diagnostics_are_preserved() {
        let diagnostics = vec![
            Diagnostic::error(SDC0200, "first"),
            Diagnostic::error(SDC0200, "second"),
        ];
        let err = ResolutionError::from(TranslateError::Rejected {
            diagnostics: diagnostics.clone(),
        });
        assert_eq!(err.to_diagnostics(), diagnostics);
        assert_eq!(err.to_string(), "CQL translation rejected: first (and 1 more)");
    }

    #[test]
    fn test_not_found_carries_help() {
        let diag = ResolutionError::NotFound {
            library: "MyLib".into(),
        }
        .to_diagnostic();
        assert_eq!(diag.code, SDC0100);
        assert!(diag.help.is_some());
    }
}
