//! Evaluation context for ELM execution

use crate::CqlValue;
use crate::model::ElmLibrary;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Default maximum nesting depth for expression evaluation
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Evaluation context for a single library evaluation pass
///
/// A context belongs to one pass over the library: one for the unfiltered
/// definitions and one per patient. Definition results are memoized within
/// the pass.
pub struct EvaluationContext {
    /// Library being evaluated
    library: Arc<ElmLibrary>,
    /// Current context type (e.g., "Patient")
    pub context_type: Option<String>,
    /// Current context value (the Patient resource for patient passes)
    pub context_value: Option<Value>,
    /// Memoized definition results
    definitions: HashMap<String, CqlValue>,
    /// Function operand bindings, innermost call last
    operand_scopes: Vec<HashMap<String, CqlValue>>,
    /// Definitions currently being evaluated, innermost last
    definition_stack: Vec<String>,
    depth: usize,
    max_depth: usize,
}

impl EvaluationContext {
    /// Create a context for the unfiltered pass over `library`
    pub fn new(library: Arc<ElmLibrary>) -> Self {
        Self {
            library,
            context_type: None,
            context_value: None,
            definitions: HashMap::new(),
            operand_scopes: Vec::new(),
            definition_stack: Vec::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the context type and value
    pub fn with_context(mut self, context_type: impl Into<String>, value: Value) -> Self {
        self.context_type = Some(context_type.into());
        self.context_value = Some(value);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn library(&self) -> Arc<ElmLibrary> {
        Arc::clone(&self.library)
    }

    pub fn cached_definition(&self, name: &str) -> Option<&CqlValue> {
        self.definitions.get(name)
    }

    pub fn cache_definition(&mut self, name: impl Into<String>, value: CqlValue) {
        self.definitions.insert(name.into(), value);
    }

    pub fn push_operands(&mut self, operands: HashMap<String, CqlValue>) {
        self.operand_scopes.push(operands);
    }

    pub fn pop_operands(&mut self) {
        self.operand_scopes.pop();
    }

    /// Look up an operand in the innermost function call
    pub fn get_operand(&self, name: &str) -> Option<&CqlValue> {
        self.operand_scopes.last().and_then(|scope| scope.get(name))
    }

    pub fn push_definition(&mut self, name: impl Into<String>) {
        self.definition_stack.push(name.into());
    }

    pub fn pop_definition(&mut self) {
        self.definition_stack.pop();
    }

    /// Name of the definition whose body is being evaluated
    pub fn current_definition(&self) -> &str {
        self.definition_stack.last().map(String::as_str).unwrap_or("<anonymous>")
    }

    /// Enter one level of nesting; returns false when the limit is reached
    pub fn enter_recursion(&mut self) -> bool {
        if self.depth >= self.max_depth {
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
