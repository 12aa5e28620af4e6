//! Spreadsheet error codes

use crate::error::{Error, Result};
use std::fmt;

/// Excel error values
///
/// The seven native codes carry their BIFF8 byte value. Two more codes are
/// synthesized by the evaluator and have no representation in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// #NULL! - Intersection of two areas is empty
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// Internal: a built-in function has no implementation
    FunctionNotImplemented,
    /// Internal: the cell takes part in a reference cycle
    CircularRef,
}

impl ErrorCode {
    /// Every code, native ones first
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::Null,
        ErrorCode::Div0,
        ErrorCode::Value,
        ErrorCode::Ref,
        ErrorCode::Name,
        ErrorCode::Num,
        ErrorCode::Na,
        ErrorCode::FunctionNotImplemented,
        ErrorCode::CircularRef,
    ];

    /// Numeric code (BIFF8 byte for native errors, negative for internal ones)
    pub const fn code(self) -> i32 {
        match self {
            ErrorCode::Null => 0x00,
            ErrorCode::Div0 => 0x07,
            ErrorCode::Value => 0x0F,
            ErrorCode::Ref => 0x17,
            ErrorCode::Name => 0x1D,
            ErrorCode::Num => 0x24,
            ErrorCode::Na => 0x2A,
            ErrorCode::FunctionNotImplemented => -30,
            ErrorCode::CircularRef => -60,
        }
    }

    /// Look up a code by its numeric value
    pub fn from_code(code: i32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.code() == code)
            .ok_or(Error::UnknownErrorCode(code))
    }

    /// Get the display string for this error
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Null => "#NULL!",
            ErrorCode::Div0 => "#DIV/0!",
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::Na => "#N/A",
            ErrorCode::FunctionNotImplemented => "~FUNCTION~NOT~IMPLEMENTED~",
            ErrorCode::CircularRef => "~CIRCULAR~REF~ERROR~",
        }
    }

    /// Parse a native error literal such as `#DIV/0!`
    pub fn from_text(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "#NULL!" => Some(ErrorCode::Null),
            "#DIV/0!" => Some(ErrorCode::Div0),
            "#VALUE!" => Some(ErrorCode::Value),
            "#REF!" => Some(ErrorCode::Ref),
            "#NAME?" => Some(ErrorCode::Name),
            "#NUM!" => Some(ErrorCode::Num),
            "#N/A" => Some(ErrorCode::Na),
            _ => None,
        }
    }

    /// Whether the code exists in spreadsheet files
    pub const fn is_native(self) -> bool {
        self.code() >= 0
    }

    /// Position used by `ERROR.TYPE` (1-based), internal codes have none
    pub const fn type_number(self) -> Option<u8> {
        match self {
            ErrorCode::Null => Some(1),
            ErrorCode::Div0 => Some(2),
            ErrorCode::Value => Some(3),
            ErrorCode::Ref => Some(4),
            ErrorCode::Name => Some(5),
            ErrorCode::Num => Some(6),
            ErrorCode::Na => Some(7),
            ErrorCode::FunctionNotImplemented | ErrorCode::CircularRef => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biff_codes() {
        assert_eq!(ErrorCode::Div0.code(), 7);
        assert_eq!(ErrorCode::Na.code(), 42);
        assert_eq!(ErrorCode::from_code(0x17).unwrap(), ErrorCode::Ref);
        assert_eq!(ErrorCode::from_code(-60).unwrap(), ErrorCode::CircularRef);
        assert_eq!(ErrorCode::from_code(3), Err(Error::UnknownErrorCode(3)));
    }

    #[test]
    fn test_text_round_trip() {
        for code in ErrorCode::ALL.iter().filter(|c| c.is_native()) {
            assert_eq!(ErrorCode::from_text(code.as_str()), Some(*code));
        }
        assert_eq!(ErrorCode::from_text("#n/a"), Some(ErrorCode::Na));
        assert_eq!(ErrorCode::from_text("~CIRCULAR~REF~ERROR~"), None);
    }

    #[test]
    fn test_internal_codes_are_not_native() {
        assert!(!ErrorCode::FunctionNotImplemented.is_native());
        assert!(!ErrorCode::CircularRef.is_native());
        assert_eq!(ErrorCode::CircularRef.type_number(), None);
        assert_eq!(ErrorCode::Na.type_number(), Some(7));
    }
}
