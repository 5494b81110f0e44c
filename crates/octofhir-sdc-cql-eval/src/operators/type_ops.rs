//! Type Operators
//!
//! Implements: ToDecimal, ToString, As

use crate::context::EvaluationContext;
use crate::engine::ElmEngine;
use crate::error::{EvalError, EvalResult};
use crate::model::{AsExpression, UnaryExpression};
use crate::value::CqlValue;
use rust_decimal::Decimal;
use std::str::FromStr;

const SYSTEM_TYPES: &[&str] = &["Boolean", "Integer", "Long", "Decimal", "String"];

impl ElmEngine {
    /// Evaluate ToDecimal; unparseable strings convert to null
    pub fn eval_to_decimal(&self, expr: &UnaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let operand = self.eval_unary_operand(expr, ctx)?;

        match &operand {
            CqlValue::Null => Ok(CqlValue::Null),
            CqlValue::Boolean(b) => Ok(CqlValue::Decimal(if *b { Decimal::ONE } else { Decimal::ZERO })),
            CqlValue::String(s) => Ok(Decimal::from_str(s.trim())
                .map(CqlValue::Decimal)
                .unwrap_or(CqlValue::Null)),
            CqlValue::List(_) => Err(EvalError::conversion_error(operand.to_string(), "Decimal")),
            numeric => Ok(numeric
                .as_decimal()
                .map(CqlValue::Decimal)
                .unwrap_or(CqlValue::Null)),
        }
    }

    pub fn eval_to_string(&self, expr: &UnaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let operand = self.eval_unary_operand(expr, ctx)?;

        match &operand {
            CqlValue::Null => Ok(CqlValue::Null),
            CqlValue::List(_) => Err(EvalError::conversion_error(operand.to_string(), "String")),
            scalar => Ok(CqlValue::String(scalar.to_string())),
        }
    }

    /// Evaluate As (non-strict cast)
    ///
    /// A value whose system type differs from the target becomes null. Casts
    /// to model types pass the value through.
    pub fn eval_as(&self, expr: &AsExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let operand = self.evaluate(&expr.operand, ctx)?;

        let Some(target) = expr.as_type.as_deref() else {
            return Ok(operand);
        };
        let simple = target.rsplit('}').next().unwrap_or(target);

        if operand.is_null() || !SYSTEM_TYPES.contains(&simple) || operand.type_name() == simple {
            Ok(operand)
        } else {
            Ok(CqlValue::Null)
        }
    }
}
