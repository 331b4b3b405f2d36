//! Comparison functions, registered per column type and operator.

use crate::ast::predicate::EvalType;
use alloc::format;
use hashbrown::HashMap;
use strata_core::pattern_match::Pattern;
use strata_core::{DataType, Error, Result, Value};

/// Compares a non-null column value with the predicate's literals.
pub type EvaluatorFn = fn(&Value, &[Value]) -> bool;

/// Lookup table from `(column type, operator)` to its evaluator.
#[derive(Clone, Debug)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<(DataType, EvalType), EvaluatorFn>,
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluatorRegistry {
    /// Creates a registry with the built-in evaluators: equality and IN for
    /// every type, ordering comparisons for ordered types, MATCH for
    /// strings.
    pub fn new() -> Self {
        let mut registry = Self {
            evaluators: HashMap::new(),
        };
        for data_type in DataType::ALL {
            registry.register(data_type, EvalType::Eq, eq);
            registry.register(data_type, EvalType::Neq, neq);
            registry.register(data_type, EvalType::In, in_list);
            if data_type.is_ordered() {
                registry.register(data_type, EvalType::Lt, lt);
                registry.register(data_type, EvalType::Lte, lte);
                registry.register(data_type, EvalType::Gt, gt);
                registry.register(data_type, EvalType::Gte, gte);
                registry.register(data_type, EvalType::Between, between);
            }
        }
        registry.register(DataType::String, EvalType::Match, matches);
        registry
    }

    /// Registers or replaces an evaluator.
    pub fn register(&mut self, data_type: DataType, eval_type: EvalType, f: EvaluatorFn) {
        self.evaluators.insert((data_type, eval_type), f);
    }

    /// Returns the evaluator for `eval_type` on columns of `data_type`.
    pub fn get(&self, data_type: DataType, eval_type: EvalType) -> Result<EvaluatorFn> {
        self.evaluators
            .get(&(data_type, eval_type))
            .copied()
            .ok_or_else(|| {
                Error::invalid_query(format!("operator {} is not supported on {}", eval_type, data_type))
            })
    }
}

fn eq(value: &Value, args: &[Value]) -> bool {
    args.first().is_some_and(|a| value == a)
}

fn neq(value: &Value, args: &[Value]) -> bool {
    args.first().is_some_and(|a| value != a)
}

fn lt(value: &Value, args: &[Value]) -> bool {
    args.first().is_some_and(|a| value < a)
}

fn lte(value: &Value, args: &[Value]) -> bool {
    args.first().is_some_and(|a| value <= a)
}

fn gt(value: &Value, args: &[Value]) -> bool {
    args.first().is_some_and(|a| value > a)
}

fn gte(value: &Value, args: &[Value]) -> bool {
    args.first().is_some_and(|a| value >= a)
}

fn between(value: &Value, args: &[Value]) -> bool {
    match args {
        [from, to] => from <= value && value <= to,
        _ => false,
    }
}

fn in_list(value: &Value, args: &[Value]) -> bool {
    args.iter().any(|a| a == value)
}

fn matches(value: &Value, args: &[Value]) -> bool {
    match (value.as_str(), args.first().and_then(Value::as_str)) {
        (Some(text), Some(source)) => Pattern::compile(source).is_ok_and(|p| p.is_match(text)),
        _ => false,
    }
}
