//! Cell-related types
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`ErrorCode`] - The error values a cell or formula can hold

mod address;
mod error_code;

pub use address::CellAddress;
pub use error_code::ErrorCode;
