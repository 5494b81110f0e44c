//! Logical Operators
//!
//! Implements: And, Or, Xor, Implies, Not
//! All logical operators implement three-valued logic

use crate::context::EvaluationContext;
use crate::engine::ElmEngine;
use crate::error::{EvalError, EvalResult};
use crate::model::{BinaryExpression, UnaryExpression};
use crate::value::CqlValue;

/// Read a three-valued boolean operand
fn truth(operator: &str, value: &CqlValue) -> EvalResult<Option<bool>> {
    match value {
        CqlValue::Null => Ok(None),
        CqlValue::Boolean(b) => Ok(Some(*b)),
        other => Err(EvalError::invalid_operand(
            operator,
            format!("expected Boolean, found {}", other.type_name()),
        )),
    }
}

fn from_truth(value: Option<bool>) -> CqlValue {
    value.map(CqlValue::Boolean).unwrap_or(CqlValue::Null)
}

impl ElmEngine {
    /// Evaluate And operator
    ///
    /// | A     | B     | A and B |
    /// |-------|-------|---------|
    /// | false | any   | false   |
    /// | true  | true  | true    |
    /// | true  | null  | null    |
    /// | null  | null  | null    |
    pub fn eval_and(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;
        let result = match (truth("And", &left)?, truth("And", &right)?) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        };
        Ok(from_truth(result))
    }

    /// Evaluate Or operator
    ///
    /// | A     | B     | A or B |
    /// |-------|-------|--------|
    /// | true  | any   | true   |
    /// | false | false | false  |
    /// | false | null  | null   |
    /// | null  | null  | null   |
    pub fn eval_or(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;
        let result = match (truth("Or", &left)?, truth("Or", &right)?) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        };
        Ok(from_truth(result))
    }

    /// Evaluate Xor operator; null if either operand is null
    pub fn eval_xor(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;
        let result = match (truth("Xor", &left)?, truth("Xor", &right)?) {
            (Some(a), Some(b)) => Some(a != b),
            _ => None,
        };
        Ok(from_truth(result))
    }

    /// Evaluate Implies operator
    ///
    /// `false implies x` and `x implies true` are true regardless of nulls.
    pub fn eval_implies(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;
        let result = match (truth("Implies", &left)?, truth("Implies", &right)?) {
            (Some(false), _) | (_, Some(true)) => Some(true),
            (Some(true), Some(false)) => Some(false),
            _ => None,
        };
        Ok(from_truth(result))
    }

    /// Evaluate Not operator
    pub fn eval_not(&self, expr: &UnaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let operand = self.eval_unary_operand(expr, ctx)?;
        Ok(from_truth(truth("Not", &operand)?.map(|b| !b)))
    }
}
