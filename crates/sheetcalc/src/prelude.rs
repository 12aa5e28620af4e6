//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Addressing
    CellAddress,
    CellRangeAddress,
    CellRangeUtil,
    SpreadsheetVersion,

    // Formats
    CellFormat,
    DateSystem,
    FormatOptions,
    FormatValue,

    // Formulas
    EvaluationCell,
    EvaluationWorkbook,
    EvaluatorOptions,
    FormulaEvaluator,
    FormulaParser,
    InMemoryWorkbook,
    ValueEval,

    // Display
    CellRenderer,

    Color,
    ErrorCode,
};
