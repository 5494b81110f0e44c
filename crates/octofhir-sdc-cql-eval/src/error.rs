//! Evaluation errors for the ELM engine

use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while loading or evaluating ELM
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// The document is not a JSON ELM library
    #[error("Invalid ELM document: {message}")]
    InvalidElm { message: String },

    /// Invalid operand error
    #[error("Invalid operand for {operator}: {message}")]
    InvalidOperand { operator: String, message: String },

    /// Arithmetic overflow
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: String },

    /// Undefined expression reference
    #[error("Undefined expression: {name}")]
    UndefinedExpression { name: String },

    /// Undefined function reference
    #[error("Undefined function: {name}/{arity}")]
    UndefinedFunction { name: String, arity: usize },

    /// Undefined operand inside a function body
    #[error("Undefined operand: {name}")]
    UndefinedOperand { name: String },

    /// Reference into another library
    #[error("Cross-library reference to {library}.{name} is not supported")]
    ExternalReference { library: String, name: String },

    /// Expression kind outside the supported subset
    #[error("Unsupported expression in definition '{definition}'")]
    UnsupportedExpression { definition: String },

    /// Unsupported operand types
    #[error("Unsupported operator: {operator} for types {types}")]
    UnsupportedOperator { operator: String, types: String },

    /// Literal could not be converted
    #[error("Cannot convert {value} to {to_type}")]
    ConversionError { value: String, to_type: String },

    /// Maximum recursion depth exceeded
    #[error("Maximum recursion depth exceeded")]
    RecursionLimit,
}

impl EvalError {
    pub fn invalid_elm(message: impl Into<String>) -> Self {
        Self::InvalidElm {
            message: message.into(),
        }
    }

    pub fn invalid_operand(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            message: message.into(),
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    pub fn undefined_expression(name: impl Into<String>) -> Self {
        Self::UndefinedExpression { name: name.into() }
    }

    pub fn unsupported_operator(operator: impl Into<String>, types: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
            types: types.into(),
        }
    }

    pub fn conversion_error(value: impl Into<String>, to_type: impl Into<String>) -> Self {
        Self::ConversionError {
            value: value.into(),
            to_type: to_type.into(),
        }
    }
}
