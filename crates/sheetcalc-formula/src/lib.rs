//! # sheetcalc-formula
//!
//! Formula tokens, parser and evaluator for sheetcalc.
//!
//! This crate provides:
//! - Formula parsing (text → BIFF8-style token stream, [`Ptg`])
//! - Token encoding and decoding ([`ptg::encode`], [`ptg::decode`])
//! - Stack-based evaluation with lazy references ([`FormulaEvaluator`])
//! - A built-in function registry with user-defined function lookup
//! - Conditional-formatting thresholds ([`threshold`])
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_formula::{parse_formula, Ptg};
//!
//! let ptgs = parse_formula("=1+2").unwrap();
//! assert_eq!(ptgs.len(), 3);
//! assert!(matches!(ptgs[0], Ptg::Int(1)));
//! ```
//!
//! ```rust
//! use sheetcalc_formula::{EvaluationCell, FormulaEvaluator, InMemoryWorkbook, ValueEval};
//!
//! let mut wb = InMemoryWorkbook::with_default_sheet();
//! wb.set_cell(0, "A1", 4.0).unwrap();
//! let evaluator = FormulaEvaluator::new(wb.into_shared());
//! let result = evaluator.evaluate_formula("SQRT(A1)*10", EvaluationCell::default()).unwrap();
//! assert_eq!(result, ValueEval::Number(20.0));
//! ```

pub mod error;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod ptg;
pub mod threshold;

pub use error::{FormulaError, FormulaResult};
pub use eval::{
    AreaEval, ErrorEval, EvalResult, EvaluationCell, EvaluationWorkbook, EvaluatorOptions,
    FormulaEvaluator, FormulaParsingWorkbook, InMemoryWorkbook, OperationContext, RefEval,
    UnimplementedPolicy, ValueEval,
};
pub use functions::{FreeRefFunction, Function, FunctionRegistry};
pub use parser::{parse_formula, FormulaParser};
pub use ptg::Ptg;
pub use threshold::{
    ColorGradientThreshold, IconMultiStateThreshold, Threshold, ThresholdRecord, ThresholdType,
};
