//! Interned error values

use crate::error::FormulaResult;
use sheetcalc_core::ErrorCode;
use std::fmt;

/// Result of an operation that can fail with a spreadsheet error value
pub type EvalResult<T> = std::result::Result<T, ErrorEval>;

/// A spreadsheet error value such as `#VALUE!`
///
/// There is exactly one instance per [`ErrorCode`]; [`ErrorEval::value_of`]
/// hands out references into a static table, so identity and equality agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorEval {
    code: ErrorCode,
}

static INSTANCES: [ErrorEval; 9] = [
    ErrorEval::NULL_INTERSECTION,
    ErrorEval::DIV_ZERO,
    ErrorEval::VALUE_INVALID,
    ErrorEval::REF_INVALID,
    ErrorEval::NAME_INVALID,
    ErrorEval::NUM_ERROR,
    ErrorEval::NA,
    ErrorEval::FUNCTION_NOT_IMPLEMENTED,
    ErrorEval::CIRCULAR_REF_ERROR,
];

impl ErrorEval {
    pub const NULL_INTERSECTION: ErrorEval = ErrorEval::new(ErrorCode::Null);
    pub const DIV_ZERO: ErrorEval = ErrorEval::new(ErrorCode::Div0);
    pub const VALUE_INVALID: ErrorEval = ErrorEval::new(ErrorCode::Value);
    pub const REF_INVALID: ErrorEval = ErrorEval::new(ErrorCode::Ref);
    pub const NAME_INVALID: ErrorEval = ErrorEval::new(ErrorCode::Name);
    pub const NUM_ERROR: ErrorEval = ErrorEval::new(ErrorCode::Num);
    pub const NA: ErrorEval = ErrorEval::new(ErrorCode::Na);
    pub const FUNCTION_NOT_IMPLEMENTED: ErrorEval =
        ErrorEval::new(ErrorCode::FunctionNotImplemented);
    pub const CIRCULAR_REF_ERROR: ErrorEval = ErrorEval::new(ErrorCode::CircularRef);

    const fn new(code: ErrorCode) -> Self {
        Self { code }
    }

    /// The shared instance for a numeric error code
    ///
    /// Unknown codes are a caller bug and surface as a core error.
    pub fn value_of(code: i32) -> FormulaResult<&'static ErrorEval> {
        let code = ErrorCode::from_code(code)?;
        Ok(Self::of(code))
    }

    /// The shared instance for `code`
    pub fn of(code: ErrorCode) -> &'static ErrorEval {
        let slot = ErrorCode::ALL
            .iter()
            .position(|c| *c == code)
            .unwrap_or_default();
        &INSTANCES[slot]
    }

    /// The wrapped error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Display text, e.g. `#N/A`
    pub fn text(&self) -> &'static str {
        self.code.as_str()
    }
}

impl From<ErrorCode> for ErrorEval {
    fn from(code: ErrorCode) -> Self {
        ErrorEval::new(code)
    }
}

impl fmt::Display for ErrorEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;

    #[test]
    fn test_value_of_is_interned() {
        let a = ErrorEval::value_of(0x0F).unwrap();
        let b = ErrorEval::value_of(0x0F).unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(*a, ErrorEval::VALUE_INVALID);
        assert!(std::ptr::eq(a, ErrorEval::of(ErrorCode::Value)));
    }

    #[test]
    fn test_every_code_has_an_instance() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorEval::of(code).code(), code);
        }
    }

    #[test]
    fn test_internal_codes() {
        let e = ErrorEval::value_of(-30).unwrap();
        assert_eq!(*e, ErrorEval::FUNCTION_NOT_IMPLEMENTED);
        assert_eq!(ErrorEval::value_of(-60).unwrap().code(), ErrorCode::CircularRef);
    }

    #[test]
    fn test_unknown_code() {
        assert!(matches!(
            ErrorEval::value_of(99),
            Err(FormulaError::Core(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorEval::DIV_ZERO.to_string(), "#DIV/0!");
        assert_eq!(ErrorEval::NA.text(), "#N/A");
    }
}
