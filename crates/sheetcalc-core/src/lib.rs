//! # sheetcalc-core
//!
//! Core value types shared by the sheetcalc formula engine and cell-format
//! interpreter:
//! - [`CellAddress`] - A1-style cell coordinates
//! - [`CellRangeAddress`] and [`Bound`] - rectangular ranges with explicit
//!   unbounded edges
//! - [`CellRangeUtil`] - range intersection, containment and merge algebra
//! - [`ErrorCode`] - the spreadsheet error codes, including two internal ones
//! - [`Color`] - display colours and the legacy indexed palette
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{CellRangeAddress, CellRangeUtil, RangeRelation};
//!
//! let a = CellRangeAddress::parse("A1:C3").unwrap();
//! let b = CellRangeAddress::parse("B2").unwrap();
//! assert_eq!(CellRangeUtil::intersect(&a, &b), RangeRelation::Inside);
//! ```

pub mod cell;
pub mod color;
pub mod error;
pub mod number_text;
pub mod range;
pub mod version;

pub use cell::{CellAddress, ErrorCode};
pub use color::Color;
pub use error::{Error, Result};
pub use number_text::number_to_text;
pub use range::{Bound, CellRangeAddress, CellRangeUtil, RangeRelation};
pub use version::SpreadsheetVersion;

/// Maximum number of rows in a worksheet (Excel 2007 limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel 2007 limit)
pub const MAX_COLS: u32 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
