//! Questionnaire model and extension classification
//!
//! Only the parts of a FHIR Questionnaire that carry CQL are modelled: the
//! recursive `item` tree, item extensions, and the top-level extensions that
//! declare libraries. Every extension is classified once, here, into a closed
//! set of variants; the rest of the pipeline never probes raw extension fields.

use crate::error::RunError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Extension URL declaring a library on the questionnaire
pub const CQF_LIBRARY_URL: &str = "http://hl7.org/fhir/StructureDefinition/cqf-library";

/// Content type of compiled ELM JSON
pub const ELM_JSON_CONTENT_TYPE: &str = "application/elm+json";

/// Content type of CQL source text
pub const CQL_CONTENT_TYPE: &str = "text/cql";

/// Extension URLs whose `valueExpression` is evaluated
pub const CALCULATABLE_EXPRESSION_URLS: [&str; 8] = [
    "http://hl7.org/fhir/StructureDefinition/variable",
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-answerExpression",
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-initialExpression",
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-candidateExpression",
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-contextExpression",
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-calculatedExpression",
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-enableWhenExpression",
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-answerOptionsToggleExpression",
];

pub fn is_calculatable_url(url: &str) -> bool {
    CALCULATABLE_EXPRESSION_URLS.contains(&url)
}

// ============================================================================
// Raw model
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    #[serde(default)]
    pub item: Vec<Item>,
    #[serde(default)]
    pub extension: Vec<Extension>,
}

impl Questionnaire {
    /// Read the expression-bearing parts of a questionnaire document
    pub fn from_value(value: &Value) -> Result<Self, RunError> {
        if !value.is_object() {
            return Err(RunError::InvalidQuestionnaire {
                message: "expected a JSON object".to_string(),
            });
        }
        Self::deserialize(value).map_err(|e| RunError::InvalidQuestionnaire {
            message: e.to_string(),
        })
    }

    /// Every library declaration among the top-level extensions, in document order
    pub fn library_declarations(&self) -> Vec<LibraryDeclaration> {
        self.extension
            .iter()
            .filter_map(classify_library_declaration)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    #[serde(default)]
    pub extension: Vec<Extension>,
    #[serde(default)]
    pub item: Vec<Item>,
}

impl Item {
    /// Expressions carried by this item's own extensions, in extension order
    pub fn expressions(&self) -> Vec<ItemExpression> {
        self.extension
            .iter()
            .flat_map(classify_item_extension)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    #[serde(default)]
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_expression: Option<ValueExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Attachment>,
}

/// FHIR `Expression` datatype
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueExpression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// FHIR `Attachment` as used by library content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64-encoded content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Attachment {
    pub fn has_content_type(&self, content_type: &str) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(content_type))
    }

    /// Whether the attachment points at or carries any content
    pub fn is_retrievable(&self) -> bool {
        non_empty(self.data.as_deref()).is_some() || non_empty(self.url.as_deref()).is_some()
    }
}

/// Pick the preferred attachment: ELM first, then CQL
pub fn select_content(content: &[Attachment]) -> Option<LibraryContent> {
    let find = |content_type: &str| {
        content
            .iter()
            .find(|a| a.has_content_type(content_type) && a.is_retrievable())
            .cloned()
    };
    find(ELM_JSON_CONTENT_TYPE)
        .map(LibraryContent::Elm)
        .or_else(|| find(CQL_CONTENT_TYPE).map(LibraryContent::Cql))
}

// ============================================================================
// Classified variants
// ============================================================================

/// An expression attached to a questionnaire item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemExpression {
    /// CQL text embedded in the extension
    Inline { expression: String },
    /// `"Library"."Member"` reference into a declared library
    Reference { reference: String },
}

/// A library declared on the questionnaire
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryDeclaration {
    /// Named declaration carrying compiled ELM
    Elm { name: String, content: Attachment },
    /// Named declaration carrying CQL source
    Cql { name: String, content: Attachment },
    /// Canonical URL of a FHIR Library resource; its name is only known once fetched
    Canonical { url: String },
    /// Named declaration with only a bare location, assumed to be CQL
    Untyped { name: String, location: String },
}

impl LibraryDeclaration {
    /// Declared library name, `None` for canonical declarations
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Elm { name, .. } | Self::Cql { name, .. } | Self::Untyped { name, .. } => {
                Some(name)
            }
            Self::Canonical { .. } => None,
        }
    }
}

/// Content selected from a library's attachments
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryContent {
    Elm(Attachment),
    Cql(Attachment),
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Classify one item extension
///
/// Only extensions whose url is calculatable count. An extension carrying
/// both `expression` and `reference` yields both, inline first.
pub fn classify_item_extension(extension: &Extension) -> Vec<ItemExpression> {
    if !is_calculatable_url(&extension.url) {
        return Vec::new();
    }
    let Some(value) = &extension.value_expression else {
        return Vec::new();
    };

    let mut found = Vec::with_capacity(2);
    if let Some(expression) = non_empty(value.expression.as_deref()) {
        found.push(ItemExpression::Inline {
            expression: expression.to_string(),
        });
    }
    if let Some(reference) = non_empty(value.reference.as_deref()) {
        found.push(ItemExpression::Reference {
            reference: reference.to_string(),
        });
    }
    found
}

/// Classify one top-level extension as a library declaration
///
/// Recognized shapes:
/// - cqf-library with `valueCanonical`
/// - `name` plus `content` attachments (ELM preferred over CQL)
/// - legacy `name` plus `valueString` holding the CQL location
pub fn classify_library_declaration(extension: &Extension) -> Option<LibraryDeclaration> {
    if extension.url == CQF_LIBRARY_URL {
        if let Some(url) = non_empty(extension.value_canonical.as_deref()) {
            return Some(LibraryDeclaration::Canonical {
                url: url.to_string(),
            });
        }
    }

    let name = non_empty(extension.name.as_deref())?.to_string();

    if let Some(content) = select_content(&extension.content) {
        return Some(match content {
            LibraryContent::Elm(content) => LibraryDeclaration::Elm { name, content },
            LibraryContent::Cql(content) => LibraryDeclaration::Cql { name, content },
        });
    }

    non_empty(extension.value_string.as_deref()).map(|location| LibraryDeclaration::Untyped {
        name,
        location: location.to_string(),
    })
}
