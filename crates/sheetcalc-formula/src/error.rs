//! Formula error types
//!
//! [`FormulaError`] covers malformed input and broken invariants of the
//! evaluator. Spreadsheet-level failures such as `#DIV/0!` are ordinary
//! values and travel as [`ErrorEval`](crate::eval::ErrorEval) instead.

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing, encoding or evaluation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error at {position}: {message}")]
    Parse { message: String, position: usize },

    /// Unknown function name with no workbook to register it against
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// A known built-in that has no implementation
    #[error("Function not implemented: {name}")]
    NotImplementedFunction { name: String },

    /// A built-in the evaluator handles itself, which cannot be replaced
    #[error("{0} is evaluated by the engine and cannot be replaced")]
    ReservedFunction(String),

    /// A function index with no entry in the function table
    #[error("No function registered at index {0}")]
    UnregisteredFunction(u16),

    /// Absolute coordinates outside an area
    #[error("Cell ({row}, {col}) is outside area {area}")]
    IndexOutOfRange { row: u32, col: u32, area: String },

    /// An operand of a type the operation cannot handle
    #[error("Unexpected operand: {0}")]
    UnexpectedOperand(String),

    /// A token needed more operands than the stack held
    #[error("Operand stack underflow at token {0}")]
    StackUnderflow(usize),

    /// Operands left over after the last token
    #[error("{0} operands left on the stack after evaluation")]
    StackNotEmpty(usize),

    /// A skip distance that does not land on a token boundary
    #[error("Bad skip distance of {distance} bytes from token {index}")]
    BadSkipDistance { index: usize, distance: usize },

    /// Token stream cannot be written in binary form
    #[error("Cannot encode token: {0}")]
    Encoding(String),

    /// Malformed binary token stream
    #[error("Cannot decode token at byte {offset}: {message}")]
    Decoding { offset: usize, message: String },

    /// Reference to invalid cell
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Address or range error from the core types
    #[error(transparent)]
    Core(#[from] sheetcalc_core::Error),
}

impl FormulaError {
    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        FormulaError::Parse {
            message: message.into(),
            position,
        }
    }
}
