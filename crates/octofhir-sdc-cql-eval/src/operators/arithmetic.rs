//! Arithmetic Operators
//!
//! Implements: Add, Subtract, Multiply, Divide, TruncatedDivide, Modulo, Power,
//! Negate, Abs
//!
//! Mixed operands are promoted Integer -> Long -> Decimal. Any null operand
//! yields null, as does division by zero.

use crate::context::EvaluationContext;
use crate::engine::ElmEngine;
use crate::error::{EvalError, EvalResult};
use crate::model::{BinaryExpression, UnaryExpression};
use crate::operators::operand_types;
use crate::value::CqlValue;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Two numeric operands promoted to a common type
enum NumericPair {
    Integer(i32, i32),
    Long(i64, i64),
    Decimal(Decimal, Decimal),
}

impl NumericPair {
    fn promote(operator: &str, left: &CqlValue, right: &CqlValue) -> EvalResult<Self> {
        match (left, right) {
            (CqlValue::Integer(a), CqlValue::Integer(b)) => Ok(Self::Integer(*a, *b)),
            (CqlValue::Integer(_) | CqlValue::Long(_), CqlValue::Integer(_) | CqlValue::Long(_)) => {
                Ok(Self::Long(as_long(left), as_long(right)))
            }
            _ => match (left.as_decimal(), right.as_decimal()) {
                (Some(a), Some(b)) => Ok(Self::Decimal(a, b)),
                _ => Err(EvalError::unsupported_operator(
                    operator,
                    operand_types(&[left, right]),
                )),
            },
        }
    }
}

fn as_long(value: &CqlValue) -> i64 {
    match value {
        CqlValue::Integer(i) => i64::from(*i),
        CqlValue::Long(l) => *l,
        _ => 0,
    }
}

impl ElmEngine {
    /// Evaluate Add operator
    pub fn eval_add(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;

        // Null propagation
        if left.is_null() || right.is_null() {
            return Ok(CqlValue::Null);
        }

        match NumericPair::promote("Add", &left, &right)? {
            NumericPair::Integer(a, b) => a.checked_add(b).map(CqlValue::Integer),
            NumericPair::Long(a, b) => a.checked_add(b).map(CqlValue::Long),
            NumericPair::Decimal(a, b) => a.checked_add(b).map(CqlValue::Decimal),
        }
        .ok_or_else(|| EvalError::overflow("Add"))
    }

    /// Evaluate Subtract operator
    pub fn eval_subtract(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;

        if left.is_null() || right.is_null() {
            return Ok(CqlValue::Null);
        }

        match NumericPair::promote("Subtract", &left, &right)? {
            NumericPair::Integer(a, b) => a.checked_sub(b).map(CqlValue::Integer),
            NumericPair::Long(a, b) => a.checked_sub(b).map(CqlValue::Long),
            NumericPair::Decimal(a, b) => a.checked_sub(b).map(CqlValue::Decimal),
        }
        .ok_or_else(|| EvalError::overflow("Subtract"))
    }

    /// Evaluate Multiply operator
    pub fn eval_multiply(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;

        if left.is_null() || right.is_null() {
            return Ok(CqlValue::Null);
        }

        match NumericPair::promote("Multiply", &left, &right)? {
            NumericPair::Integer(a, b) => a.checked_mul(b).map(CqlValue::Integer),
            NumericPair::Long(a, b) => a.checked_mul(b).map(CqlValue::Long),
            NumericPair::Decimal(a, b) => a.checked_mul(b).map(CqlValue::Decimal),
        }
        .ok_or_else(|| EvalError::overflow("Multiply"))
    }

    /// Evaluate Divide operator
    ///
    /// Always produces a Decimal. Division by zero returns null.
    pub fn eval_divide(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;

        if left.is_null() || right.is_null() {
            return Ok(CqlValue::Null);
        }

        let (a, b) = match (left.as_decimal(), right.as_decimal()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(EvalError::unsupported_operator(
                    "Divide",
                    operand_types(&[&left, &right]),
                ));
            }
        };

        if b.is_zero() {
            return Ok(CqlValue::Null);
        }

        a.checked_div(b)
            .map(CqlValue::Decimal)
            .ok_or_else(|| EvalError::overflow("Divide"))
    }

    /// Evaluate TruncatedDivide (div) operator
    pub fn eval_truncated_divide(
        &self,
        expr: &BinaryExpression,
        ctx: &mut EvaluationContext,
    ) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;

        if left.is_null() || right.is_null() {
            return Ok(CqlValue::Null);
        }

        let result = match NumericPair::promote("TruncatedDivide", &left, &right)? {
            NumericPair::Integer(_, 0) | NumericPair::Long(_, 0) => return Ok(CqlValue::Null),
            NumericPair::Decimal(_, b) if b.is_zero() => return Ok(CqlValue::Null),
            NumericPair::Integer(a, b) => a.checked_div(b).map(CqlValue::Integer),
            NumericPair::Long(a, b) => a.checked_div(b).map(CqlValue::Long),
            NumericPair::Decimal(a, b) => a.checked_div(b).map(|q| CqlValue::Decimal(q.trunc())),
        };
        result.ok_or_else(|| EvalError::overflow("TruncatedDivide"))
    }

    /// Evaluate Modulo (mod) operator
    pub fn eval_modulo(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;

        if left.is_null() || right.is_null() {
            return Ok(CqlValue::Null);
        }

        let result = match NumericPair::promote("Modulo", &left, &right)? {
            NumericPair::Integer(_, 0) | NumericPair::Long(_, 0) => return Ok(CqlValue::Null),
            NumericPair::Decimal(_, b) if b.is_zero() => return Ok(CqlValue::Null),
            NumericPair::Integer(a, b) => a.checked_rem(b).map(CqlValue::Integer),
            NumericPair::Long(a, b) => a.checked_rem(b).map(CqlValue::Long),
            NumericPair::Decimal(a, b) => a.checked_rem(b).map(CqlValue::Decimal),
        };
        result.ok_or_else(|| EvalError::overflow("Modulo"))
    }

    /// Evaluate Power (^) operator
    ///
    /// A negative integer exponent yields a Decimal. Non-integral decimal
    /// exponents go through `f64`.
    pub fn eval_power(&self, expr: &BinaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let (left, right) = self.eval_binary_operands(expr, ctx)?;

        if left.is_null() || right.is_null() {
            return Ok(CqlValue::Null);
        }

        match NumericPair::promote("Power", &left, &right)? {
            NumericPair::Integer(a, b) if b >= 0 => u32::try_from(b)
                .ok()
                .and_then(|exp| a.checked_pow(exp))
                .map(CqlValue::Integer)
                .ok_or_else(|| EvalError::overflow("Power")),
            NumericPair::Long(a, b) if b >= 0 => u32::try_from(b)
                .ok()
                .and_then(|exp| a.checked_pow(exp))
                .map(CqlValue::Long)
                .ok_or_else(|| EvalError::overflow("Power")),
            NumericPair::Integer(a, b) => decimal_power(Decimal::from(a), Decimal::from(b)),
            NumericPair::Long(a, b) => decimal_power(Decimal::from(a), Decimal::from(b)),
            NumericPair::Decimal(a, b) => decimal_power(a, b),
        }
    }

    /// Evaluate Negate operator
    pub fn eval_negate(&self, expr: &UnaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let operand = self.eval_unary_operand(expr, ctx)?;

        match operand {
            CqlValue::Null => Ok(CqlValue::Null),
            CqlValue::Integer(i) => i
                .checked_neg()
                .map(CqlValue::Integer)
                .ok_or_else(|| EvalError::overflow("Negate")),
            CqlValue::Long(l) => l
                .checked_neg()
                .map(CqlValue::Long)
                .ok_or_else(|| EvalError::overflow("Negate")),
            CqlValue::Decimal(d) => Ok(CqlValue::Decimal(-d)),
            other => Err(EvalError::unsupported_operator("Negate", other.type_name())),
        }
    }

    /// Evaluate Abs operator
    pub fn eval_abs(&self, expr: &UnaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let operand = self.eval_unary_operand(expr, ctx)?;

        match operand {
            CqlValue::Null => Ok(CqlValue::Null),
            CqlValue::Integer(i) => i
                .checked_abs()
                .map(CqlValue::Integer)
                .ok_or_else(|| EvalError::overflow("Abs")),
            CqlValue::Long(l) => l
                .checked_abs()
                .map(CqlValue::Long)
                .ok_or_else(|| EvalError::overflow("Abs")),
            CqlValue::Decimal(d) => Ok(CqlValue::Decimal(d.abs())),
            other => Err(EvalError::unsupported_operator("Abs", other.type_name())),
        }
    }
}

fn decimal_power(base: Decimal, exponent: Decimal) -> EvalResult<CqlValue> {
    if exponent.fract().is_zero() {
        if let Some(exp) = exponent.to_i64() {
            return integral_power(base, exp).map(CqlValue::Decimal);
        }
    }

    let (Some(b), Some(e)) = (base.to_f64(), exponent.to_f64()) else {
        return Err(EvalError::overflow("Power"));
    };
    let result = b.powf(e);
    if result.is_nan() {
        return Ok(CqlValue::Null);
    }
    Decimal::from_f64(result)
        .map(CqlValue::Decimal)
        .ok_or_else(|| EvalError::overflow("Power"))
}

fn integral_power(base: Decimal, exp: i64) -> EvalResult<Decimal> {
    if exp == 0 || base == Decimal::ONE {
        return Ok(Decimal::ONE);
    }
    if base == Decimal::NEGATIVE_ONE {
        return Ok(if exp % 2 == 0 { Decimal::ONE } else { Decimal::NEGATIVE_ONE });
    }
    if base.is_zero() {
        return if exp > 0 {
            Ok(Decimal::ZERO)
        } else {
            Err(EvalError::overflow("Power"))
        };
    }

    let shrinks = base.abs() < Decimal::ONE;
    let magnitude = power_by_squaring(base, exp.unsigned_abs());
    if exp > 0 {
        return match magnitude {
            Some(result) => Ok(result),
            None if shrinks => Ok(Decimal::ZERO),
            None => Err(EvalError::overflow("Power")),
        };
    }
    match magnitude {
        Some(result) if !result.is_zero() => Decimal::ONE
            .checked_div(result)
            .ok_or_else(|| EvalError::overflow("Power")),
        // 1 / x^n underflows to zero once x^n no longer fits
        None if !shrinks => Ok(Decimal::ZERO),
        _ => Err(EvalError::overflow("Power")),
    }
}

/// `base^exp` in O(log exp) multiplications, `None` on overflow
fn power_by_squaring(mut base: Decimal, mut exp: u64) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base)?;
        }
    }
    Some(result)
}
