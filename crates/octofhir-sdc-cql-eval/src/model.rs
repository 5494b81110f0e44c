//! ELM structures for the supported expression subset
//!
//! The types deserialize the JSON ELM emitted by the HL7 CQL-to-ELM translator.
//! Fields the evaluator does not need (locators, local ids, result types,
//! annotations) are ignored on input.

use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Context name for definitions evaluated once per run
pub const UNFILTERED_CONTEXT: &str = "Unfiltered";

/// Context name for definitions evaluated once per patient
pub const PATIENT_CONTEXT: &str = "Patient";

// ============================================================================
// Library Structure
// ============================================================================

/// Top-level JSON ELM document: `{"library": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElmDocument {
    pub library: ElmLibrary,
}

/// ELM Library - the root element containing a compiled CQL library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElmLibrary {
    #[serde(default)]
    pub identifier: VersionedIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<Statements>,
}

impl ElmLibrary {
    /// Load a library from a translator response (`{"library": {...}}`)
    pub fn from_json(elm: &Value) -> EvalResult<Self> {
        if elm.get("library").is_none() {
            return Err(EvalError::invalid_elm("missing 'library' root element"));
        }
        let document: ElmDocument = serde_json::from_value(elm.clone())
            .map_err(|e| EvalError::invalid_elm(e.to_string()))?;
        Ok(document.library)
    }

    /// Iterate over expression and function definitions
    pub fn defs(&self) -> impl Iterator<Item = &StatementDef> {
        self.statements.iter().flat_map(|s| s.defs.iter())
    }

    /// Find an expression definition by name
    pub fn expression_def(&self, name: &str) -> Option<&StatementDef> {
        self.defs().find(|d| !d.is_function() && d.name == name)
    }

    /// Find a function definition by name and arity
    pub fn function_def(&self, name: &str, arity: usize) -> Option<&StatementDef> {
        self.defs()
            .find(|d| d.is_function() && d.name == name && d.operand.len() == arity)
    }
}

/// Versioned identifier for libraries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionedIdentifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Container for statement definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statements {
    #[serde(rename = "def", default)]
    pub defs: Vec<StatementDef>,
}

/// Expression or function definition
///
/// The translator tags function definitions with `"type": "FunctionDef"`;
/// expression definitions are untagged or tagged `ExpressionDef`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementDef {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub def_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Box<Expression>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operand: Vec<OperandDef>,
}

impl StatementDef {
    pub fn is_function(&self) -> bool {
        self.def_type.as_deref() == Some("FunctionDef")
    }

    /// Definitions without a context run in the unfiltered context
    pub fn context_name(&self) -> &str {
        self.context.as_deref().unwrap_or(UNFILTERED_CONTEXT)
    }
}

/// Function operand declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperandDef {
    pub name: String,
}

// ============================================================================
// Expressions
// ============================================================================

/// The supported ELM expression kinds, tagged by their `type` field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    // === Literals ===
    Null(NullLiteral),
    Literal(Literal),

    // === References ===
    ExpressionRef(ExpressionRef),
    FunctionRef(FunctionRef),
    OperandRef(OperandRef),

    // === Arithmetic ===
    Add(BinaryExpression),
    Subtract(BinaryExpression),
    Multiply(BinaryExpression),
    Divide(BinaryExpression),
    TruncatedDivide(BinaryExpression),
    Modulo(BinaryExpression),
    Power(BinaryExpression),
    Negate(UnaryExpression),
    Abs(UnaryExpression),

    // === Comparison ===
    Equal(BinaryExpression),
    NotEqual(BinaryExpression),
    Less(BinaryExpression),
    Greater(BinaryExpression),
    LessOrEqual(BinaryExpression),
    GreaterOrEqual(BinaryExpression),

    // === Logical ===
    And(BinaryExpression),
    Or(BinaryExpression),
    Xor(BinaryExpression),
    Implies(BinaryExpression),
    Not(UnaryExpression),

    // === Nullological ===
    IsNull(UnaryExpression),
    Coalesce(NaryExpression),
    If(IfExpression),

    // === String / List ===
    Concatenate(NaryExpression),
    List(ListExpression),
    Exists(UnaryExpression),
    Count(AggregateExpression),

    // === Type Operations ===
    ToDecimal(UnaryExpression),
    ToString(UnaryExpression),
    As(AsExpression),

    /// Any expression kind outside the supported subset
    #[serde(other)]
    Unsupported,
}

/// Null literal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NullLiteral {}

/// Typed literal, e.g. `{"valueType": "{urn:hl7-org:elm-types:r1}Integer", "value": "2"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Literal {
    pub value_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Literal {
    /// Type name without the `{urn:hl7-org:elm-types:r1}` namespace
    pub fn simple_type(&self) -> &str {
        self.value_type
            .rsplit('}')
            .next()
            .unwrap_or(&self.value_type)
    }
}

/// Expression reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_name: Option<String>,
    pub name: String,
}

/// Function reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_name: Option<String>,
    pub name: String,
    #[serde(default)]
    pub operand: Vec<Expression>,
}

/// Operand reference inside a function body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperandRef {
    pub name: String,
}

/// Unary expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpression {
    pub operand: Box<Expression>,
}

/// Binary expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpression {
    pub operand: Vec<Expression>,
}

/// N-ary expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaryExpression {
    #[serde(default)]
    pub operand: Vec<Expression>,
}

/// If expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfExpression {
    pub condition: Box<Expression>,
    pub then: Box<Expression>,
    #[serde(rename = "else")]
    pub else_clause: Box<Expression>,
}

/// List selector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListExpression {
    #[serde(rename = "element", default)]
    pub elements: Vec<Expression>,
}

/// Aggregate over a list source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateExpression {
    pub source: Box<Expression>,
}

/// As expression (type cast)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsExpression {
    pub operand: Box<Expression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_translator_output() {
        let elm = json!({
            "library": {
                "identifier": {},
                "schemaIdentifier": { "id": "urn:hl7-org:elm", "version": "r1" },
                "statements": {
                    "def": [{
                        "localId": "2",
                        "name": "__lforms__main__",
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
        });

        let library = ElmLibrary::from_json(&elm).unwrap();
        let def = library.expression_def("__lforms__main__").unwrap();
        assert_eq!(def.context_name(), UNFILTERED_CONTEXT);
        assert!(matches!(def.expression.as_deref(), Some(Expression::Multiply(_))));
    }

    #[test]
    fn test_unknown_expression_kind() {
        let expr: Expression = serde_json::from_value(json!({
            "type": "Retrieve",
            "dataType": "{http://hl7.org/fhir}Observation"
        }))
        .unwrap();
        assert!(matches!(expr, Expression::Unsupported));
    }

    #[test]
    fn test_missing_library_root() {
        let err = ElmLibrary::from_json(&json!({ "statements": {} })).unwrap_err();
        assert!(matches!(err, EvalError::InvalidElm { .. }));
    }

    #[test]
    fn test_literal_simple_type() {
        let lit = Literal {
            value_type: "{urn:hl7-org:elm-types:r1}Decimal".to_string(),
            value: Some("1.5".to_string()),
        };
        assert_eq!(lit.simple_type(), "Decimal");
    }
}
