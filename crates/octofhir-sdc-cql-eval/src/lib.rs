//! Embedded ELM evaluator
//!
//! Executes the JSON ELM produced by the CQL-to-ELM translator directly in
//! process. It covers the expression subset that questionnaire calculations use:
//!
//! - **Literals and references**: Null, Literal, ExpressionRef, FunctionRef, OperandRef
//! - **Arithmetic**: Add, Subtract, Multiply, Divide, TruncatedDivide, Modulo, Power,
//!   Negate, Abs
//! - **Comparison**: Equal, NotEqual, Less, Greater, LessOrEqual, GreaterOrEqual
//! - **Logical**: And, Or, Xor, Implies, Not with three-valued logic
//! - **Nullological**: IsNull, Coalesce, If
//! - **Strings and lists**: Concatenate, List, Exists, Count
//! - **Conversions**: ToDecimal, ToString, As
//!
//! # Example
//!
//! ```ignore
//! use octofhir_sdc_cql_eval::{ElmEngine, ElmLibrary};
//!
//! let library = ElmLibrary::from_json(&elm_json)?;
//! let results = ElmEngine::new().evaluate_library(&library, &[])?;
//! let six = results.unfiltered.get("__lforms__main__");
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod model;
pub mod operators;
pub mod value;

pub use context::EvaluationContext;
pub use engine::{ElmEngine, LibraryResults};
pub use error::{EvalError, EvalResult};
pub use model::{ElmLibrary, Expression, StatementDef};
pub use value::CqlValue;
