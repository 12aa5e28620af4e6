//! Error types for cell-format parsing

use thiserror::Error;

/// Result type for format operations
pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// Errors raised while parsing a format string
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    /// A section could not be parsed
    #[error("Unrecognized format '{format}': {reason}")]
    Unrecognized { format: String, reason: String },

    /// A `[...]` block that is neither a colour, a condition, a currency nor an elapsed unit
    #[error("Unsupported [] format block '{0}'")]
    UnsupportedBlock(String),

    /// A quoted literal or bracket block was not closed
    #[error("Unterminated {what} in format '{format}'")]
    Unterminated { what: &'static str, format: String },

    /// Unknown condition operator
    #[error("Unknown test: {0}")]
    UnknownOperator(String),

    /// A condition constant is not a number
    #[error("Invalid condition constant '{0}'")]
    InvalidConstant(String),

    /// More than one bracketed elapsed unit
    #[error("Duplicate '[' times in format '{0}'")]
    DuplicateElapsed(String),

    /// More than four sections
    #[error("Too many sections ({count}) in format '{format}'")]
    TooManySections { count: usize, format: String },
}

impl FormatError {
    pub(crate) fn unrecognized(format: &str, reason: impl Into<String>) -> Self {
        FormatError::Unrecognized {
            format: format.to_string(),
            reason: reason.into(),
        }
    }
}
