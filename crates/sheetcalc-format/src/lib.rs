//! Spreadsheet number-format interpreter
//!
//! Parses format strings such as `#,##0.00;[Red](#,##0.00)` or
//! `yyyy-mm-dd hh:mm` and renders values through them.
//!
//! ```
//! use sheetcalc_format::CellFormat;
//!
//! let fmt = CellFormat::new("#,##0.00").unwrap();
//! assert_eq!(fmt.apply(1234.5).text, "1,234.50");
//! ```

pub mod cell_format;
pub mod condition;
pub mod error;
pub mod formatter;
mod lexer;
pub mod options;
pub mod part;
pub mod value;

pub use cell_format::{CellFormat, FormatCache, MAX_SECTIONS};
pub use condition::{CellFormatCondition, ConditionOperator};
pub use error::{FormatError, FormatResult};
pub use formatter::fraction::SimpleFraction;
pub use formatter::{CellFormatType, CellFormatter};
pub use options::{DateSystem, FormatOptions};
pub use part::{CellFormatPart, CellFormatResult};
pub use value::FormatValue;

/// Format `value` with `format` using the shared cache and default options
pub fn format_value(format: &str, value: impl Into<FormatValue>) -> FormatResult<String> {
    Ok(CellFormat::get_instance(format)?.apply(value).text)
}
