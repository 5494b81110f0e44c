//! Runtime values produced by the evaluator

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Number, Value};
use std::fmt;

/// A CQL runtime value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CqlValue {
    #[default]
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Decimal(Decimal),
    String(String),
    List(Vec<CqlValue>),
}

impl CqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// CQL type name, used in operator error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Any",
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Long(_) => "Long",
            Self::Decimal(_) => "Decimal",
            Self::String(_) => "String",
            Self::List(_) => "List",
        }
    }

    /// Widen a numeric value to Decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(i) => Some(Decimal::from(*i)),
            Self::Long(l) => Some(Decimal::from(*l)),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Convert to the JSON shape the execution results carry
    ///
    /// Decimals become JSON numbers when representable as `f64`, otherwise
    /// their string form.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Long(l) => Value::from(*l),
            Self::Decimal(d) => d
                .to_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(d.to_string())),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl fmt::Display for CqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Long(l) => write!(f, "{l}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
