//! List Operators
//!
//! Implements: List selector, Exists, Count

use crate::context::EvaluationContext;
use crate::engine::ElmEngine;
use crate::error::{EvalError, EvalResult};
use crate::model::{AggregateExpression, ListExpression, UnaryExpression};
use crate::value::CqlValue;

impl ElmEngine {
    pub fn eval_list(&self, expr: &ListExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let elements = expr
            .elements
            .iter()
            .map(|e| self.evaluate(e, ctx))
            .collect::<EvalResult<Vec<_>>>()?;
        Ok(CqlValue::List(elements))
    }

    /// Evaluate Exists operator
    ///
    /// True when the list has at least one non-null element. A null list is
    /// false.
    pub fn eval_exists(&self, expr: &UnaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        match self.eval_unary_operand(expr, ctx)? {
            CqlValue::Null => Ok(CqlValue::Boolean(false)),
            CqlValue::List(items) => Ok(CqlValue::Boolean(items.iter().any(|v| !v.is_null()))),
            other => Err(EvalError::invalid_operand(
                "Exists",
                format!("expected List, found {}", other.type_name()),
            )),
        }
    }

    /// Evaluate Count aggregate; null elements are not counted
    pub fn eval_count(&self, expr: &AggregateExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        match self.evaluate(&expr.source, ctx)? {
            CqlValue::Null => Ok(CqlValue::Integer(0)),
            CqlValue::List(items) => {
                let count = items.iter().filter(|v| !v.is_null()).count();
                i32::try_from(count)
                    .map(CqlValue::Integer)
                    .map_err(|_| EvalError::overflow("Count"))
            }
            other => Err(EvalError::invalid_operand(
                "Count",
                format!("expected List, found {}", other.type_name()),
            )),
        }
    }
}
