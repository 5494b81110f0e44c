//! Comparison Operators
//!
//! Implements: Equal, NotEqual, Less, Greater, LessOrEqual, GreaterOrEqual

use crate::context::EvaluationContext;
use crate::engine::ElmEngine;
use crate::error::{EvalError, EvalResult};
use crate::model::BinaryExpression;
use crate::operators::operand_types;
use crate::value::CqlValue;
use std::cmp::Ordering;

impl ElmEngine {
    /// Evaluate Equal operator
    ///
    /// Returns null if either operand is null. Numeric operands of different
    /// types compare by value.
    pub fn eval_equal(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;
        Ok(option_to_bool(equal(&left, &right)))
    }

    /// Evaluate NotEqual operator
    pub fn eval_not_equal(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;
        Ok(option_to_bool(equal(&left, &right).map(|eq| !eq)))
    }

    pub fn eval_less(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        self.eval_ordering(expr, ctx, "Less", Ordering::is_lt)
    }

    pub fn eval_greater(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        self.eval_ordering(expr, ctx, "Greater", Ordering::is_gt)
    }

    pub fn eval_less_or_equal(
        &self,
        expr: &BinaryExpression,
        ctx: &mut EvaluationContext,
    ) -> EvalResult<CqlValue> {
        self.eval_ordering(expr, ctx, "LessOrEqual", Ordering::is_le)
    }

    pub fn eval_greater_or_equal(
        &self,
        expr: &BinaryExpression,
        ctx: &mut EvaluationContext,
    ) -> EvalResult<CqlValue> {
        self.eval_ordering(expr, ctx, "GreaterOrEqual", Ordering::is_ge)
    }

    fn eval_ordering(
        &self,
        expr: &BinaryExpression,
        ctx: &mut EvaluationContext,
        operator: &str,
        accept: fn(Ordering) -> bool,
    ) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;

        if left.is_null() || right.is_null() {
            return Ok(CqlValue::Null);
        }

        compare(&left, &right)
            .map(|ord| CqlValue::Boolean(accept(ord)))
            .ok_or_else(|| EvalError::unsupported_operator(operator, operand_types(&[&left, &right])))
    }
}

fn option_to_bool(value: Option<bool>) -> CqlValue {
    value.map(CqlValue::Boolean).unwrap_or(CqlValue::Null)
}

/// Three-valued equality; `None` stands for an unknown result
pub(crate) fn equal(left: &CqlValue, right: &CqlValue) -> Option<bool> {
    match (left, right) {
        (CqlValue::Null, _) | (_, CqlValue::Null) => None,
        (CqlValue::Boolean(a), CqlValue::Boolean(b)) => Some(a == b),
        (CqlValue::String(a), CqlValue::String(b)) => Some(a == b),
        (CqlValue::List(a), CqlValue::List(b)) => {
            if a.len() != b.len() {
                return Some(false);
            }
            let mut unknown = false;
            for (x, y) in a.iter().zip(b) {
                match equal(x, y) {
                    Some(false) => return Some(false),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            if unknown { None } else { Some(true) }
        }
        _ => match (left.as_decimal(), right.as_decimal()) {
            (Some(a), Some(b)) => Some(a == b),
            _ => Some(false),
        },
    }
}

/// Ordering for comparable non-null values
fn compare(left: &CqlValue, right: &CqlValue) -> Option<Ordering> {
    match (left, right) {
        (CqlValue::String(a), CqlValue::String(b)) => Some(a.cmp(b)),
        _ => match (left.as_decimal(), right.as_decimal()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        },
    }
}
