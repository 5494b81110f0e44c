//! ELM Engine - expression dispatch and library evaluation
//!
//! The engine walks the ELM expression tree of a library and produces
//! [`CqlValue`]s. Operator implementations live in [`crate::operators`],
//! each module adding an `impl ElmEngine` block.

use crate::context::{DEFAULT_MAX_DEPTH, EvaluationContext};
use crate::error::{EvalError, EvalResult};
use crate::model::{
    ElmLibrary, Expression, ExpressionRef, FunctionRef, Literal, OperandRef, PATIENT_CONTEXT,
    StatementDef,
};
use crate::value::CqlValue;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Values of every expression definition, split by context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryResults {
    /// Unfiltered (or context-less) definitions, in declaration order
    pub unfiltered: IndexMap<String, CqlValue>,
    /// Patient-context definitions per patient id
    pub patients: IndexMap<String, IndexMap<String, CqlValue>>,
}

/// ELM evaluation engine
#[derive(Debug, Clone)]
pub struct ElmEngine {
    max_depth: usize,
}

impl Default for ElmEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ElmEngine {
    /// Create a new engine with the default recursion limit
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the maximum expression nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Evaluate every expression definition of `library`
    ///
    /// Unfiltered definitions are evaluated once. Patient-context definitions
    /// are evaluated once per entry in `patients`, keyed by the patient's `id`
    /// (or its position when it has none). Function definitions are skipped.
    pub fn evaluate_library(
        &self,
        library: &Arc<ElmLibrary>,
        patients: &[Value],
    ) -> EvalResult<LibraryResults> {
        let (patient_defs, unfiltered_defs): (Vec<&StatementDef>, Vec<&StatementDef>) = library
            .defs()
            .filter(|d| !d.is_function())
            .partition(|d| d.context_name() == PATIENT_CONTEXT);

        let mut results = LibraryResults::default();

        let mut ctx = EvaluationContext::new(Arc::clone(library)).with_max_depth(self.max_depth);
        for def in unfiltered_defs {
            let value = self.evaluate_definition(def, &mut ctx)?;
            results.unfiltered.insert(def.name.clone(), value);
        }

        if patient_defs.is_empty() {
            return Ok(results);
        }

        for (index, patient) in patients.iter().enumerate() {
            let patient_id = patient
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| index.to_string());

            let mut ctx = EvaluationContext::new(Arc::clone(library))
                .with_max_depth(self.max_depth)
                .with_context(PATIENT_CONTEXT, patient.clone());

            let mut values = IndexMap::new();
            for def in &patient_defs {
                let value = self.evaluate_definition(def, &mut ctx)?;
                values.insert(def.name.clone(), value);
            }
            results.patients.insert(patient_id, values);
        }

        Ok(results)
    }

    /// Evaluate a named expression definition, memoized per context
    pub fn evaluate_expression(&self, name: &str, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        if let Some(value) = ctx.cached_definition(name) {
            return Ok(value.clone());
        }

        let library = ctx.library();
        let def = library
            .expression_def(name)
            .ok_or_else(|| EvalError::undefined_expression(name))?;
        self.evaluate_definition(def, ctx)
    }

    fn evaluate_definition(&self, def: &StatementDef, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        if let Some(value) = ctx.cached_definition(&def.name) {
            return Ok(value.clone());
        }

        ctx.push_definition(def.name.as_str());
        let result = match &def.expression {
            Some(expr) => self.evaluate(expr, ctx),
            None => Ok(CqlValue::Null),
        };
        ctx.pop_definition();

        let value = result?;
        ctx.cache_definition(def.name.as_str(), value.clone());
        Ok(value)
    }

    /// Evaluate an ELM expression
    pub fn evaluate(&self, expr: &Expression, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        if !ctx.enter_recursion() {
            return Err(EvalError::RecursionLimit);
        }

        let result = match expr {
            // === Literals ===
            Expression::Null(_) => Ok(CqlValue::Null),
            Expression::Literal(lit) => self.eval_literal(lit),

            // === References ===
            Expression::ExpressionRef(r) => self.eval_expression_ref(r, ctx),
            Expression::FunctionRef(r) => self.eval_function_ref(r, ctx),
            Expression::OperandRef(r) => self.eval_operand_ref(r, ctx),

            // === Arithmetic ===
            Expression::Add(e) => self.eval_add(e, ctx),
            Expression::Subtract(e) => self.eval_subtract(e, ctx),
            Expression::Multiply(e) => self.eval_multiply(e, ctx),
            Expression::Divide(e) => self.eval_divide(e, ctx),
            Expression::TruncatedDivide(e) => self.eval_truncated_divide(e, ctx),
            Expression::Modulo(e) => self.eval_modulo(e, ctx),
            Expression::Power(e) => self.eval_power(e, ctx),
            Expression::Negate(e) => self.eval_negate(e, ctx),
            Expression::Abs(e) => self.eval_abs(e, ctx),

            // === Comparison ===
            Expression::Equal(e) => self.eval_equal(e, ctx),
            Expression::NotEqual(e) => self.eval_not_equal(e, ctx),
            Expression::Less(e) => self.eval_less(e, ctx),
            Expression::Greater(e) => self.eval_greater(e, ctx),
            Expression::LessOrEqual(e) => self.eval_less_or_equal(e, ctx),
            Expression::GreaterOrEqual(e) => self.eval_greater_or_equal(e, ctx),

            // === Logical ===
            Expression::And(e) => self.eval_and(e, ctx),
            Expression::Or(e) => self.eval_or(e, ctx),
            Expression::Xor(e) => self.eval_xor(e, ctx),
            Expression::Implies(e) => self.eval_implies(e, ctx),
            Expression::Not(e) => self.eval_not(e, ctx),

            // === Nullological ===
            Expression::IsNull(e) => self.eval_is_null(e, ctx),
            Expression::Coalesce(e) => self.eval_coalesce(e, ctx),
            Expression::If(e) => self.eval_if(e, ctx),

            // === String / List ===
            Expression::Concatenate(e) => self.eval_concatenate(e, ctx),
            Expression::List(e) => self.eval_list(e, ctx),
            Expression::Exists(e) => self.eval_exists(e, ctx),
            Expression::Count(e) => self.eval_count(e, ctx),

            // === Type Operations ===
            Expression::ToDecimal(e) => self.eval_to_decimal(e, ctx),
            Expression::ToString(e) => self.eval_to_string(e, ctx),
            Expression::As(e) => self.eval_as(e, ctx),

            Expression::Unsupported => Err(EvalError::UnsupportedExpression {
                definition: ctx.current_definition().to_string(),
            }),
        };

        ctx.exit_recursion();
        result
    }

    // =========================================================================
    // Literal evaluation
    // =========================================================================

    fn eval_literal(&self, lit: &Literal) -> EvalResult<CqlValue> {
        let value_str = match &lit.value {
            Some(v) => v.as_str(),
            None => return Ok(CqlValue::Null),
        };

        match lit.simple_type() {
            "Boolean" => value_str
                .parse::<bool>()
                .map(CqlValue::Boolean)
                .map_err(|_| EvalError::conversion_error(value_str, "Boolean")),
            "Integer" => value_str
                .parse::<i32>()
                .map(CqlValue::Integer)
                .map_err(|_| EvalError::conversion_error(value_str, "Integer")),
            "Long" => value_str
                .parse::<i64>()
                .map(CqlValue::Long)
                .map_err(|_| EvalError::conversion_error(value_str, "Long")),
            "Decimal" => Decimal::from_str(value_str)
                .map(CqlValue::Decimal)
                .map_err(|_| EvalError::conversion_error(value_str, "Decimal")),
            "String" => Ok(CqlValue::String(value_str.to_string())),
            other => Err(EvalError::conversion_error(value_str, other)),
        }
    }

    // =========================================================================
    // Reference evaluation
    // =========================================================================

    fn eval_expression_ref(&self, r: &ExpressionRef, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        if let Some(library) = &r.library_name {
            return Err(EvalError::ExternalReference {
                library: library.clone(),
                name: r.name.clone(),
            });
        }
        self.evaluate_expression(&r.name, ctx)
    }

    fn eval_function_ref(&self, r: &FunctionRef, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        if let Some(library) = &r.library_name {
            return Err(EvalError::ExternalReference {
                library: library.clone(),
                name: r.name.clone(),
            });
        }

        let args = r
            .operand
            .iter()
            .map(|op| self.evaluate(op, ctx))
            .collect::<EvalResult<Vec<_>>>()?;

        let library = ctx.library();
        let def = library
            .function_def(&r.name, args.len())
            .ok_or_else(|| EvalError::UndefinedFunction {
                name: r.name.clone(),
                arity: args.len(),
            })?;

        let bindings: HashMap<String, CqlValue> = def
            .operand
            .iter()
            .map(|o| o.name.clone())
            .zip(args)
            .collect();

        ctx.push_operands(bindings);
        ctx.push_definition(def.name.as_str());
        let result = match &def.expression {
            Some(body) => self.evaluate(body, ctx),
            None => Ok(CqlValue::Null),
        };
        ctx.pop_definition();
        ctx.pop_operands();
        result
    }

    fn eval_operand_ref(&self, r: &OperandRef, ctx: &mut EvaluationContext) -> EvalResult<CqlValue> {
        ctx.get_operand(&r.name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedOperand { name: r.name.clone() })
    }
}
