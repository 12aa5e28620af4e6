//! Cell display: evaluate a formula, then render the result through a
//! number format
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut wb = InMemoryWorkbook::with_default_sheet();
//! wb.set_cell(0, "A1", 1234.5).unwrap();
//! let renderer = CellRenderer::new(FormulaEvaluator::new(wb.into_shared()));
//!
//! let shown = renderer.render("A1*2", "#,##0.00", EvaluationCell::default()).unwrap();
//! assert_eq!(shown.text, "2,469.00");
//! ```

use sheetcalc_format::{CellFormat, CellFormatResult, FormatError, FormatOptions, FormatValue};
use sheetcalc_formula::{EvaluationCell, FormulaError, FormulaEvaluator, Ptg, ValueEval};
use thiserror::Error;

/// Error from rendering a cell
#[derive(Error, Debug)]
pub enum Error {
    /// The formula failed to parse or evaluate
    #[error("formula error: {0}")]
    Formula(#[from] FormulaError),

    /// The format string was rejected
    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

/// Result type for rendering
pub type Result<T> = std::result::Result<T, Error>;

/// Evaluates formulas and renders their results as a cell would show them
///
/// Dates produced by the formula and dates read by the format use the
/// evaluator's date system.
pub struct CellRenderer {
    evaluator: FormulaEvaluator,
}

impl CellRenderer {
    pub fn new(evaluator: FormulaEvaluator) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &FormulaEvaluator {
        &self.evaluator
    }

    /// Options matching the evaluator's date system
    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            date_system: self.evaluator.options().date_system,
        }
    }

    /// Evaluate `formula` at `cell` and render the value through `format`
    pub fn render(&self, formula: &str, format: &str, cell: EvaluationCell) -> Result<CellFormatResult> {
        let value = self.evaluator.evaluate_formula(formula, cell)?;
        self.render_value(&value, format)
    }

    /// Evaluate parsed tokens at `cell` and render the value through `format`
    pub fn render_tokens(&self, ptgs: &[Ptg], format: &str, cell: EvaluationCell) -> Result<CellFormatResult> {
        let value = self.evaluator.evaluate(ptgs, cell)?;
        self.render_value(&value, format)
    }

    /// Render an already evaluated value
    ///
    /// Error values are shown as their error text and bypass the format.
    pub fn render_value(&self, value: &ValueEval, format: &str) -> Result<CellFormatResult> {
        let format_value = match value {
            ValueEval::Error(e) => {
                return Ok(CellFormatResult {
                    applies: true,
                    text: e.to_string(),
                    text_color: None,
                })
            }
            other => to_format_value(other),
        };
        let format = CellFormat::get_instance(format)?;
        Ok(format.apply_with(&format_value, &self.format_options()))
    }
}

/// The format-engine view of an evaluated value
pub fn to_format_value(value: &ValueEval) -> FormatValue {
    match value {
        ValueEval::Number(n) => FormatValue::Number(*n),
        ValueEval::Text(s) => FormatValue::Text(s.clone()),
        ValueEval::Bool(b) => FormatValue::Bool(*b),
        ValueEval::Error(e) => FormatValue::Text(e.to_string()),
        ValueEval::Blank | ValueEval::MissingArg => FormatValue::Blank,
        other => {
            log::debug!("rendering unresolved {} as blank", other.type_name());
            FormatValue::Blank
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Color;
    use sheetcalc_formula::InMemoryWorkbook;

    fn renderer() -> CellRenderer {
        let mut wb = InMemoryWorkbook::with_default_sheet();
        wb.set_cell(0, "A1", -3.25).unwrap();
        wb.set_cell(0, "B1", "label").unwrap();
        CellRenderer::new(FormulaEvaluator::new(wb.into_shared()))
    }

    #[test]
    fn test_render_number_sections() {
        let r = renderer();
        let cell = EvaluationCell::default();
        let shown = r.render("A1", "0.00;[Red](0.00)", cell).unwrap();
        assert_eq!(shown.text, "(3.25)");
        assert_eq!(shown.text_color, Some(Color::RED));
    }

    #[test]
    fn test_render_date_uses_evaluator_epoch() {
        let r = renderer();
        let shown = r
            .render("DATE(2023,3,15)", "yyyy-mm-dd", EvaluationCell::default())
            .unwrap();
        assert_eq!(shown.text, "2023-03-15");
    }

    #[test]
    fn test_render_errors_and_text() {
        let r = renderer();
        let cell = EvaluationCell::default();
        assert_eq!(r.render("1/0", "0.00", cell).unwrap().text, "#DIV/0!");
        assert_eq!(r.render("B1", "0;0;0;\"<\"@\">\"", cell).unwrap().text, "<label>");
        assert!(matches!(r.render("1+", "0", cell), Err(Error::Formula(_))));
        assert!(matches!(r.render("1", "0;0;0;@;0", cell), Err(Error::Format(_))));
    }
}
