//! Nullological Operators
//!
//! Implements: IsNull, Coalesce, If

use crate::context::EvaluationContext;
use crate::engine::ElmEngine;
use crate::error::EvalResult;
use crate::model::{IfExpression, NaryExpression, UnaryExpression};
use crate::value::CqlValue;

impl ElmEngine {
    pub fn eval_is_null(&self, expr: &UnaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let operand = self.eval_unary_operand(expr, ctx)?;
        Ok(CqlValue::Boolean(operand.is_null()))
    }

    /// Evaluate Coalesce operator
    ///
    /// Returns the first non-null operand. A single list operand is searched
    /// for its first non-null element. Operands after the first non-null one
    /// are not evaluated.
    pub fn eval_coalesce(&self, expr: &NaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        if let [single] = expr.operand.as_slice() {
            return Ok(match self.evaluate(single, ctx)? {
                CqlValue::List(items) => items
                    .into_iter()
                    .find(|v| !v.is_null())
                    .unwrap_or(CqlValue::Null),
                other => other,
            });
        }

        for operand in &expr.operand {
            let value = self.evaluate(operand, ctx)?;
            if !value.is_null() {
                return Ok(value);
            }
        }
        Ok(CqlValue::Null)
    }

    /// Evaluate If expression; a null condition takes the else branch
    pub fn eval_if(&self, expr: &IfExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        match self.evaluate(&expr.condition, ctx)? {
            CqlValue::Boolean(true) => self.evaluate(&expr.then, ctx),
            _ => self.evaluate(&expr.else_clause, ctx),
        }
    }
}
