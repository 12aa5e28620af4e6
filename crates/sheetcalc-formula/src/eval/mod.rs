//! Formula evaluation
//!
//! Operands on the evaluation stack are [`ValueEval`]s. References stay
//! lazy ([`RefEval`], [`AreaEval`]) until a function or operator asks
//! [`OperandResolver`] for a scalar.

mod context;
mod error_eval;
mod evaluator;
mod operators;
mod options;
mod reference;
mod resolver;
mod value;
mod workbook;

pub use context::OperationContext;
pub use error_eval::{ErrorEval, EvalResult};
pub use evaluator::{count_tokens_to_be_skipped, FormulaEvaluator};
pub use operators::{
    compare_values, evaluate_binary, evaluate_unary, intersect, range, BinaryOperator,
    UnaryOperator,
};
pub use options::{EvaluatorOptions, UnimplementedPolicy};
pub use reference::{AreaEval, CellSource, RefEval, ValueBlock};
pub use resolver::{Coercion, OperandResolver};
pub use value::ValueEval;
pub use workbook::{EvaluationCell, EvaluationWorkbook, FormulaParsingWorkbook, InMemoryWorkbook};
