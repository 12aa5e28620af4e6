//! # sheetcalc
//!
//! Spreadsheet formula evaluation and number-format rendering.
//!
//! sheetcalc bundles the pieces a spreadsheet host needs to compute and
//! display cell values without owning a file format:
//!
//! - Cell addressing and range algebra ([`CellAddress`], [`CellRangeAddress`], [`CellRangeUtil`])
//! - Number-format parsing and rendering ([`CellFormat`])
//! - Formula parsing to BIFF8 tokens and stack evaluation ([`FormulaParser`], [`FormulaEvaluator`])
//! - Conditional-format thresholds ([`Threshold`])
//! - Cell display, formula result through a format ([`CellRenderer`])
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut wb = InMemoryWorkbook::with_default_sheet();
//! wb.set_cell(0, "A1", 10.0).unwrap();
//! wb.set_cell(0, "A2", 32.5).unwrap();
//!
//! let evaluator = FormulaEvaluator::new(wb.into_shared());
//! let total = evaluator.evaluate_formula("=SUM(A1:A2)", EvaluationCell::default()).unwrap();
//! assert_eq!(total, ValueEval::Number(42.5));
//!
//! let fmt = CellFormat::get_instance("0.0%").unwrap();
//! assert_eq!(fmt.apply(0.425).text, "42.5%");
//! ```

pub mod prelude;
pub mod render;

pub use render::{to_format_value, CellRenderer};

// Library crates, for items not re-exported below
pub use sheetcalc_core;
pub use sheetcalc_format;
pub use sheetcalc_formula;

// Re-export core types
pub use sheetcalc_core::{
    Bound, CellAddress, CellRangeAddress, CellRangeUtil, Color, Error, ErrorCode, RangeRelation,
    Result, SpreadsheetVersion, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export format types
pub use sheetcalc_format::{
    format_value, CellFormat, CellFormatPart, CellFormatResult, CellFormatType, DateSystem,
    FormatError, FormatOptions, FormatResult, FormatValue,
};

// Re-export formula types
pub use sheetcalc_formula::{
    parse_formula, ErrorEval, EvaluationCell, EvaluationWorkbook, EvaluatorOptions,
    FormulaError, FormulaEvaluator, FormulaParser, FormulaResult, FunctionRegistry,
    InMemoryWorkbook, Ptg, Threshold, ThresholdType, UnimplementedPolicy, ValueEval,
};
