//! Operand values

use super::error_eval::ErrorEval;
use super::reference::{AreaEval, RefEval};
use sheetcalc_core::number_to_text;
use std::fmt;

/// A value on the evaluator's operand stack
///
/// `Ref` and `Area` are unresolved references; functions and operators
/// dereference them through [`OperandResolver`](super::OperandResolver)
/// when they need a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueEval {
    /// Numeric value (all numbers are f64)
    Number(f64),
    /// Text value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Spreadsheet error value
    Error(ErrorEval),
    /// Empty cell
    Blank,
    /// Argument left out of a function call, as in `IF(A1,,2)`
    MissingArg,
    /// Name of an add-in or user-defined function
    FunctionName(String),
    /// Single-cell reference
    Ref(RefEval),
    /// Rectangular area reference
    Area(AreaEval),
}

impl ValueEval {
    /// TRUE
    pub const TRUE: ValueEval = ValueEval::Bool(true);
    /// FALSE
    pub const FALSE: ValueEval = ValueEval::Bool(false);

    /// Create a text value
    pub fn text(s: impl Into<String>) -> Self {
        ValueEval::Text(s.into())
    }

    /// Whether this is an empty cell
    pub fn is_blank(&self) -> bool {
        matches!(self, ValueEval::Blank)
    }

    /// Whether this is an error value
    pub fn is_error(&self) -> bool {
        matches!(self, ValueEval::Error(_))
    }

    /// Whether this is a cell or area reference
    pub fn is_reference(&self) -> bool {
        matches!(self, ValueEval::Ref(_) | ValueEval::Area(_))
    }

    /// Numeric payload, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ValueEval::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form of number, text and boolean values
    pub fn string_value(&self) -> Option<String> {
        match self {
            ValueEval::Number(n) => Some(number_to_text(*n)),
            ValueEval::Text(s) => Some(s.clone()),
            ValueEval::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueEval::Number(_) => "number",
            ValueEval::Text(_) => "text",
            ValueEval::Bool(_) => "boolean",
            ValueEval::Error(_) => "error",
            ValueEval::Blank => "blank",
            ValueEval::MissingArg => "missing argument",
            ValueEval::FunctionName(_) => "function name",
            ValueEval::Ref(_) => "reference",
            ValueEval::Area(_) => "area",
        }
    }
}

impl From<f64> for ValueEval {
    fn from(n: f64) -> Self {
        ValueEval::Number(n)
    }
}

impl From<i32> for ValueEval {
    fn from(n: i32) -> Self {
        ValueEval::Number(n as f64)
    }
}

impl From<bool> for ValueEval {
    fn from(b: bool) -> Self {
        ValueEval::Bool(b)
    }
}

impl From<&str> for ValueEval {
    fn from(s: &str) -> Self {
        ValueEval::Text(s.to_string())
    }
}

impl From<String> for ValueEval {
    fn from(s: String) -> Self {
        ValueEval::Text(s)
    }
}

impl From<ErrorEval> for ValueEval {
    fn from(e: ErrorEval) -> Self {
        ValueEval::Error(e)
    }
}

impl fmt::Display for ValueEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueEval::Number(n) => f.write_str(&number_to_text(*n)),
            ValueEval::Text(s) => f.write_str(s),
            ValueEval::Bool(true) => f.write_str("TRUE"),
            ValueEval::Bool(false) => f.write_str("FALSE"),
            ValueEval::Error(e) => write!(f, "{}", e),
            ValueEval::Blank | ValueEval::MissingArg => Ok(()),
            ValueEval::FunctionName(name) => f.write_str(name),
            ValueEval::Ref(r) => write!(f, "{}", r),
            ValueEval::Area(a) => write!(f, "{}", a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_value() {
        assert_eq!(ValueEval::Number(1.5).string_value().as_deref(), Some("1.5"));
        assert_eq!(ValueEval::Bool(true).string_value().as_deref(), Some("TRUE"));
        assert_eq!(ValueEval::Blank.string_value(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueEval::from(3.0).to_string(), "3");
        assert_eq!(ValueEval::from("abc").to_string(), "abc");
        assert_eq!(ValueEval::from(ErrorEval::NA).to_string(), "#N/A");
        assert_eq!(ValueEval::Blank.to_string(), "");
    }
}
