//! String Operators
//!
//! Implements: Concatenate

use crate::context::EvaluationContext;
use crate::engine::ElmEngine;
use crate::error::{EvalError, EvalResult};
use crate::model::NaryExpression;
use crate::value::CqlValue;

impl ElmEngine {
    /// Evaluate Concatenate operator (`+` and `&` on strings)
    ///
    /// Null if any operand is null. The translator wraps `&` operands in
    /// Coalesce, so empty-string semantics arrive already applied.
    pub fn eval_concatenate(&self, expr: &NaryExpression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        let mut result = String::new();
        let mut has_null = false;

        for operand in &expr.operand {
            match self.evaluate(operand, ctx)? {
                CqlValue::Null => has_null = true,
                CqlValue::String(s) => result.push_str(&s),
                other => {
                    return Err(EvalError::invalid_operand(
                        "Concatenate",
                        format!("expected String, found {}", other.type_name()),
                    ));
                }
            }
        }

        if has_null {
            Ok(CqlValue::Null)
        } else {
            Ok(CqlValue::String(result))
        }
    }
}
