//! Compiled ELM documents exchanged between the adapters

use octofhir_sdc_cql_diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON ELM document as returned by the translator (`{"library": {...}}`)
///
/// The document is kept as raw JSON; only the execution adapter interprets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElmDocument(Value);

impl ElmDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }

    /// True for `null` or an object without keys
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Whether the document has a `library` root element
    pub fn has_library(&self) -> bool {
        self.0.get("library").is_some_and(Value::is_object)
    }

    /// `library.identifier.id`, absent for anonymous (wrapped inline) libraries
    pub fn library_id(&self) -> Option<&str> {
        self.0.pointer("/library/identifier/id").and_then(Value::as_str)
    }

    /// Translator annotations (`CqlToElmError`) embedded in the document
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        Diagnostic::collect_from_elm(&self.0)
    }

    /// Whether any embedded translator annotation is an error
    pub fn has_errors(&self) -> bool {
        self.diagnostics().iter().any(Diagnostic::is_error)
    }
}

impl From<Value> for ElmDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emptiness() {
        assert!(ElmDocument::default().is_empty());
        assert!(ElmDocument::new(json!({})).is_empty());
        assert!(!ElmDocument::new(json!({ "library": {} })).is_empty());
    }

    #[test]
    fn test_error_annotations() {
        let elm = ElmDocument::new(json!({
            "library": {
                "identifier": { "id": "MyLib", "version": "1.0.0" },
                "annotation": [
                    { "type": "CqlToElmError", "errorSeverity": "warning", "message": "unused" },
                    { "type": "CqlToElmError", "errorSeverity": "error", "message": "bad" }
                ]
            }
        }));
        assert_eq!(elm.library_id(), Some("MyLib"));
        assert_eq!(elm.diagnostics().len(), 2);
        assert!(elm.has_errors());
    }
}
