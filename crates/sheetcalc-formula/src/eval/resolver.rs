//! Dereferencing and type coercion of operands

use super::error_eval::{ErrorEval, EvalResult};
use crate::error::{FormulaError, FormulaResult};
use super::reference::AreaEval;
use super::value::ValueEval;
use lazy_regex::regex_is_match;
use sheetcalc_core::number_to_text;

/// Outcome of a coercion
///
/// The outer error is a defect in the caller: an operand that should have
/// been reduced to a scalar first. The inner error is a formula error.
pub type Coercion<T> = FormulaResult<EvalResult<T>>;

/// Conversions shared by operators and functions
///
/// Errors found in operands propagate as `Err(ErrorEval)`.
pub struct OperandResolver;

impl OperandResolver {
    /// Reduce an operand to a scalar using implicit intersection
    ///
    /// A single-cell reference yields the cell's value. A single-row or
    /// single-column area yields the cell lined up with the evaluating cell
    /// at `(src_row, src_col)`. Error values come back as `Err`.
    pub fn get_single_value(arg: &ValueEval, src_row: u32, src_col: u32) -> EvalResult<ValueEval> {
        let result = match arg {
            ValueEval::Ref(r) => {
                if r.number_of_sheets() > 1 {
                    return Err(ErrorEval::VALUE_INVALID);
                }
                r.inner_value(r.first_sheet_index())
            }
            ValueEval::Area(area) => Self::choose_single_element_from_area(area, src_row, src_col)?,
            other => other.clone(),
        };
        match result {
            ValueEval::Error(e) => Err(e),
            value => Ok(value),
        }
    }

    /// Implicit intersection of an area with the evaluating cell
    ///
    /// For areas more than one row high and one column wide the top-left
    /// cell is used when the evaluating cell lies inside the area.
    pub fn choose_single_element_from_area(
        area: &AreaEval,
        src_row: u32,
        src_col: u32,
    ) -> EvalResult<ValueEval> {
        if area.number_of_sheets() > 1 {
            return Err(ErrorEval::VALUE_INVALID);
        }
        if area.is_column() {
            if area.is_row() {
                return Ok(area.get_relative_value(0, 0));
            }
            if !area.contains_row(src_row) {
                return Err(ErrorEval::VALUE_INVALID);
            }
            return Ok(area.get_relative_value(src_row - area.first_row(), 0));
        }
        if !area.is_row() {
            if area.contains_row(src_row) && area.contains_column(src_col) {
                return Ok(area.get_relative_value(0, 0));
            }
            return Err(ErrorEval::VALUE_INVALID);
        }
        if !area.contains_column(src_col) {
            return Err(ErrorEval::VALUE_INVALID);
        }
        Ok(area.get_relative_value(0, src_col - area.first_column()))
    }

    /// Coerce a scalar to an integer, rounding toward negative infinity
    pub fn coerce_value_to_int(value: &ValueEval) -> Coercion<i32> {
        if value.is_blank() {
            return Ok(Ok(0));
        }
        Ok(Self::coerce_value_to_double(value)?.map(|d| d.floor() as i32))
    }

    /// Coerce a scalar to a number
    ///
    /// Blank is 0, booleans are 1/0 and text must parse as a number.
    pub fn coerce_value_to_double(value: &ValueEval) -> Coercion<f64> {
        Ok(match value {
            ValueEval::Blank | ValueEval::MissingArg => Ok(0.0),
            ValueEval::Number(n) => Ok(*n),
            ValueEval::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            ValueEval::Text(s) => Self::parse_double(s).ok_or(ErrorEval::VALUE_INVALID),
            ValueEval::Error(e) => Err(*e),
            other => return Err(unresolved(other, "a number")),
        })
    }

    /// Coerce a scalar to a boolean; `None` means "no value"
    ///
    /// With `strings_are_blanks` text is skipped, otherwise only `TRUE` and
    /// `FALSE` (any case) are accepted.
    pub fn coerce_value_to_boolean(
        value: &ValueEval,
        strings_are_blanks: bool,
    ) -> Coercion<Option<bool>> {
        Ok(match value {
            ValueEval::Blank | ValueEval::MissingArg => Ok(None),
            ValueEval::Bool(b) => Ok(Some(*b)),
            ValueEval::Text(_) if strings_are_blanks => Ok(None),
            ValueEval::Text(s) => {
                if s.eq_ignore_ascii_case("true") {
                    Ok(Some(true))
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(Some(false))
                } else {
                    Err(ErrorEval::VALUE_INVALID)
                }
            }
            ValueEval::Number(n) if n.is_nan() => Err(ErrorEval::VALUE_INVALID),
            ValueEval::Number(n) => Ok(Some(*n != 0.0)),
            ValueEval::Error(e) => Err(*e),
            other => return Err(unresolved(other, "a boolean")),
        })
    }

    /// Text form of a scalar
    pub fn coerce_value_to_string(value: &ValueEval) -> String {
        match value {
            ValueEval::Number(n) => number_to_text(*n),
            ValueEval::Text(s) => s.clone(),
            ValueEval::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            ValueEval::Error(e) => e.text().to_string(),
            _ => String::new(),
        }
    }

    /// Parse text the way numeric coercion does, ignoring surrounding spaces
    pub fn parse_double(text: &str) -> Option<f64> {
        let text = text.trim();
        if !regex_is_match!(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$", text) {
            return None;
        }
        text.parse::<f64>().ok().filter(|d| d.is_finite())
    }
}

fn unresolved(value: &ValueEval, target: &str) -> FormulaError {
    FormulaError::UnexpectedOperand(format!(
        "cannot coerce unresolved {} to {}",
        value.type_name(),
        target
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row_area() -> AreaEval {
        AreaEval::from_values(5, 0, vec![vec![10.0.into(), 20.0.into(), 30.0.into()]])
    }

    #[test]
    fn test_single_value_from_row() {
        let area = ValueEval::Area(row_area());
        assert_eq!(
            OperandResolver::get_single_value(&area, 9, 1),
            Ok(ValueEval::Number(20.0))
        );
        assert_eq!(
            OperandResolver::get_single_value(&area, 9, 5),
            Err(ErrorEval::VALUE_INVALID)
        );
    }

    #[test]
    fn test_single_value_from_column() {
        let col = AreaEval::from_values(
            2,
            3,
            vec![vec![1.0.into()], vec![2.0.into()], vec![3.0.into()]],
        );
        let value = ValueEval::Area(col);
        assert_eq!(
            OperandResolver::get_single_value(&value, 4, 0),
            Ok(ValueEval::Number(3.0))
        );
        assert_eq!(
            OperandResolver::get_single_value(&value, 0, 3),
            Err(ErrorEval::VALUE_INVALID)
        );
    }

    #[test]
    fn test_single_value_from_block() {
        let block = ValueEval::Area(AreaEval::from_values(
            0,
            0,
            vec![vec![1.0.into(), 2.0.into()], vec![3.0.into(), 4.0.into()]],
        ));
        assert_eq!(
            OperandResolver::get_single_value(&block, 1, 1),
            Ok(ValueEval::Number(1.0))
        );
        assert_eq!(
            OperandResolver::get_single_value(&block, 5, 5),
            Err(ErrorEval::VALUE_INVALID)
        );
    }

    #[test]
    fn test_single_value_error_propagates() {
        let err = ValueEval::Error(ErrorEval::DIV_ZERO);
        assert_eq!(
            OperandResolver::get_single_value(&err, 0, 0),
            Err(ErrorEval::DIV_ZERO)
        );
    }

    #[test]
    fn test_coerce_to_int_floors() {
        assert_eq!(OperandResolver::coerce_value_to_int(&(-1.5).into()).unwrap(), Ok(-2));
        assert_eq!(OperandResolver::coerce_value_to_int(&1.9.into()).unwrap(), Ok(1));
        assert_eq!(OperandResolver::coerce_value_to_int(&ValueEval::Blank).unwrap(), Ok(0));
    }

    #[test]
    fn test_coerce_to_double() {
        assert_eq!(OperandResolver::coerce_value_to_double(&" 2.5 ".into()).unwrap(), Ok(2.5));
        assert_eq!(OperandResolver::coerce_value_to_double(&true.into()).unwrap(), Ok(1.0));
        assert_eq!(
            OperandResolver::coerce_value_to_double(&"abc".into()).unwrap(),
            Err(ErrorEval::VALUE_INVALID)
        );
    }

    #[test]
    fn test_unresolved_operands_are_caller_defects() {
        let area = ValueEval::Area(row_area());
        assert!(matches!(
            OperandResolver::coerce_value_to_double(&area),
            Err(FormulaError::UnexpectedOperand(_))
        ));
        assert!(matches!(
            OperandResolver::coerce_value_to_int(&area),
            Err(FormulaError::UnexpectedOperand(_))
        ));
        assert!(matches!(
            OperandResolver::coerce_value_to_boolean(&ValueEval::FunctionName("F".into()), false),
            Err(FormulaError::UnexpectedOperand(_))
        ));
    }

    #[test]
    fn test_coerce_to_boolean() {
        let coerce = |v: ValueEval, skip_text| OperandResolver::coerce_value_to_boolean(&v, skip_text).unwrap();
        assert_eq!(coerce("True".into(), false), Ok(Some(true)));
        assert_eq!(coerce("x".into(), true), Ok(None));
        assert_eq!(coerce("x".into(), false), Err(ErrorEval::VALUE_INVALID));
        assert_eq!(coerce(0.0.into(), false), Ok(Some(false)));
        assert_eq!(coerce(ValueEval::Blank, false), Ok(None));
    }

    #[test]
    fn test_parse_double() {
        assert_eq!(OperandResolver::parse_double("1e3"), Some(1000.0));
        assert_eq!(OperandResolver::parse_double(".5"), Some(0.5));
        assert_eq!(OperandResolver::parse_double("-7."), Some(-7.0));
        assert_eq!(OperandResolver::parse_double("1,000"), None);
        assert_eq!(OperandResolver::parse_double(""), None);
        assert_eq!(OperandResolver::parse_double("inf"), None);
    }

    #[test]
    fn test_coerce_to_string() {
        assert_eq!(OperandResolver::coerce_value_to_string(&0.1.into()), "0.1");
        assert_eq!(OperandResolver::coerce_value_to_string(&false.into()), "FALSE");
        assert_eq!(OperandResolver::coerce_value_to_string(&ValueEval::Blank), "");
    }
}
