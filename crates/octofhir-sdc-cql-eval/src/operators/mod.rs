//! Operator Implementations
//!
//! Each module adds an `impl ElmEngine` block for one operator category:
//! - Arithmetic operators (Add, Divide, Power, etc.)
//! - Comparison operators (Equal, Less, etc.)
//! - Logical operators (And, Or, Not, etc.)
//! - Nullological operators (IsNull, Coalesce, If)
//! - String operators (Concatenate)
//! - List operators (List, Exists, Count)
//! - Type operators (ToDecimal, ToString, As)

pub mod arithmetic;
pub mod comparison;
pub mod list;
pub mod logical;
pub mod nullological;
pub mod string;
pub mod type_ops;

use crate::context::EvaluationContext;
use crate::engine::ElmEngine;
use crate::error::{EvalError, EvalResult};
use crate::model::{BinaryExpression, UnaryExpression};
use crate::value::CqlValue;

impl ElmEngine {
    /// Evaluate both operands of a binary expression, left to right
    pub(crate) fn eval_binary_operands(
        &self,
        expr: &BinaryExpression,
        ctx: &mut EvaluationContext,
    ) -> EvalResult<(CqlValue, CqlValue)> {
        if expr.operand.len() != 2 {
            return Err(EvalError::invalid_elm(format!(
                "binary expression must have exactly 2 operands, found {}",
                expr.operand.len()
            )));
        }
        let left = self.evaluate(&expr.operand[0], ctx)?;
        let right = self.evaluate(&expr.operand[1], ctx)?;
        Ok((left, right))
    }

    pub(crate) fn eval_unary_operand(
        &self,
        expr: &UnaryExpression,
        ctx: &mut EvaluationContext,
    ) -> EvalResult<CqlValue> {
        self.evaluate(&expr.operand, ctx)
    }
}

/// Format operand types for `UnsupportedOperator` errors
pub(crate) fn operand_types(values: &[&CqlValue]) -> String {
    values
        .iter()
        .map(|v| v.type_name())
        .collect::<Vec<_>>()
        .join(", ")
}
