//! Diagnostic records

use crate::{ErrorCode, SDC0200, SourceRange};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Annotation type the CQL-to-ELM translator uses for compiler messages
pub const CQL_TO_ELM_ERROR: &str = "CqlToElmError";

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error - translation or execution cannot proceed
    Error,
    /// Warning - potential issue but can continue
    Warning,
    /// Information - informational message
    Info,
}

impl Severity {
    /// Parse the translator's `errorSeverity` value. Unknown values count as errors.
    pub fn from_translator(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("warning") => Severity::Warning,
            Some("info") | Some("information") => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message with location and context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Position inside the CQL text, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
    /// Translator error category (`syntax`, `semantic`, `include`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    fn with_severity(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            range: None,
            kind: None,
            help: None,
        }
    }

    /// Set the source range
    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Set the translator error category
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Build a diagnostic from one `library.annotation[]` entry of a translator response.
    ///
    /// Returns `None` for annotations that are not `CqlToElmError` records.
    pub fn from_translator_annotation(annotation: &Value) -> Option<Self> {
        if annotation.get("type").and_then(Value::as_str) != Some(CQL_TO_ELM_ERROR) {
            return None;
        }

        let message = annotation
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("CQL translation failed");
        let severity =
            Severity::from_translator(annotation.get("errorSeverity").and_then(Value::as_str));

        let mut diag = Self::with_severity(severity, SDC0200, message);
        diag.range = SourceRange::from_annotation(annotation);
        diag.kind = annotation
            .get("errorType")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(diag)
    }

    /// Collect every `CqlToElmError` annotation of an ELM document (`{"library": {"annotation": [...]}}`)
    pub fn collect_from_elm(elm: &Value) -> Vec<Self> {
        elm.pointer("/library/annotation")
            .and_then(Value::as_array)
            .map(|annotations| {
                annotations
                    .iter()
                    .filter_map(Self::from_translator_annotation)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Render the diagnostic for a terminal
    #[cfg(feature = "colored")]
    pub fn render(&self) -> String {
        use colored::Colorize;

        let label = match self.severity {
            Severity::Error => self.severity.to_string().red().bold(),
            Severity::Warning => self.severity.to_string().yellow().bold(),
            Severity::Info => self.severity.to_string().blue().bold(),
        };
        let mut out = format!("{}[{}]: {}", label, self.code, self.message);
        if let Some(range) = &self.range {
            out.push_str(&format!(" {}", format!("at {}", range).cyan()));
        }
        if let Some(help) = &self.help {
            out.push_str(&format!("\n  {} {}", "help:".green(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(range) = &self.range {
            write!(f, " at {}", range)?;
        }
        Ok(())
    }
}
