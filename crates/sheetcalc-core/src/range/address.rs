//! Range value object

use super::Bound;
use crate::cell::CellAddress;
use crate::error::{Error, Result};
use crate::version::SpreadsheetVersion;
use std::fmt;
use std::str::FromStr;

/// A rectangular range of cells (e.g., "A1:B10", "C:C", "3:5")
///
/// Bounds are stored as concrete indices. Open edges are resolved against a
/// [`SpreadsheetVersion`] at construction time, so range algebra only ever
/// compares plain numbers. Ranges are immutable; every operation returns a
/// new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRangeAddress {
    first_row: u32,
    last_row: u32,
    first_col: u32,
    last_col: u32,
}

impl CellRangeAddress {
    /// Create a range from (first row, last row, first column, last column)
    ///
    /// Swapped bounds are normalised so that first <= last.
    pub fn new(first_row: u32, last_row: u32, first_col: u32, last_col: u32) -> Self {
        Self {
            first_row: first_row.min(last_row),
            last_row: first_row.max(last_row),
            first_col: first_col.min(last_col),
            last_col: first_col.max(last_col),
        }
    }

    /// Create a range from explicit bounds
    ///
    /// An unbounded first edge starts at index 0; an unbounded last edge ends
    /// at the last row/column of `version`.
    pub fn from_bounds(
        first_row: Bound,
        last_row: Bound,
        first_col: Bound,
        last_col: Bound,
        version: SpreadsheetVersion,
    ) -> Self {
        let first = |b: Bound, last_index: u32| match b {
            Bound::At(i) => i.min(last_index),
            Bound::Unbounded => 0,
        };
        Self::new(
            first(first_row, version.last_row_index()),
            last_row.resolve(version.last_row_index()),
            first(first_col, version.last_column_index()),
            last_col.resolve(version.last_column_index()),
        )
    }

    /// Create a range from the `-1` sentinel convention of legacy records
    pub fn from_legacy(
        first_row: i32,
        last_row: i32,
        first_col: i32,
        last_col: i32,
        version: SpreadsheetVersion,
    ) -> Result<Self> {
        Ok(Self::from_bounds(
            Bound::from_legacy(first_row)?,
            Bound::from_legacy(last_row)?,
            Bound::from_legacy(first_col)?,
            Bound::from_legacy(last_col)?,
            version,
        ))
    }

    /// A single-cell range
    pub fn single(row: u32, col: u32) -> Self {
        Self::new(row, row, col, col)
    }

    /// Whole columns `first_col..=last_col`
    pub fn full_columns(first_col: u32, last_col: u32, version: SpreadsheetVersion) -> Self {
        Self::new(0, version.last_row_index(), first_col, last_col)
    }

    /// Whole rows `first_row..=last_row`
    pub fn full_rows(first_row: u32, last_row: u32, version: SpreadsheetVersion) -> Self {
        Self::new(first_row, last_row, 0, version.last_column_index())
    }

    /// Parse "A1", "A1:B2", "A:C" or "1:3" using BIFF8 limits for open edges
    pub fn parse(s: &str) -> Result<Self> {
        Self::parse_with(s, SpreadsheetVersion::default())
    }

    /// Parse a range, resolving whole-row/column forms against `version`
    pub fn parse_with(s: &str, version: SpreadsheetVersion) -> Result<Self> {
        let s = s.trim();
        let (start, end) = match s.find(':') {
            Some(pos) => (&s[..pos], &s[pos + 1..]),
            None => (s, s),
        };

        let is_letters = |p: &str| {
            let p = p.trim_start_matches('$');
            !p.is_empty() && p.bytes().all(|b| b.is_ascii_alphabetic())
        };
        let is_digits = |p: &str| {
            let p = p.trim_start_matches('$');
            !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())
        };

        let range = if s.contains(':') && is_letters(start) && is_letters(end) {
            let c1 = CellAddress::letters_to_column(start.trim_start_matches('$'))?;
            let c2 = CellAddress::letters_to_column(end.trim_start_matches('$'))?;
            Self::full_columns(c1, c2, version)
        } else if s.contains(':') && is_digits(start) && is_digits(end) {
            let (r1, _) = CellAddress::parse_row(start, s)?;
            let (r2, _) = CellAddress::parse_row(end, s)?;
            Self::full_rows(r1, r2, version)
        } else {
            let a = CellAddress::parse(start)?;
            let b = CellAddress::parse(end)?;
            Self::new(a.row, b.row, a.col, b.col)
        };

        range.validate(version)?;
        Ok(range)
    }

    /// First row index
    pub fn first_row(&self) -> u32 {
        self.first_row
    }

    /// Last row index
    pub fn last_row(&self) -> u32 {
        self.last_row
    }

    /// First column index
    pub fn first_column(&self) -> u32 {
        self.first_col
    }

    /// Last column index
    pub fn last_column(&self) -> u32 {
        self.last_col
    }

    /// Number of rows
    pub fn height(&self) -> u32 {
        self.last_row - self.first_row + 1
    }

    /// Number of columns
    pub fn width(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    /// Total number of cells
    pub fn number_of_cells(&self) -> u64 {
        self.height() as u64 * self.width() as u64
    }

    /// Whether the range spans every row of `version`
    pub fn is_full_column_range(&self, version: SpreadsheetVersion) -> bool {
        self.first_row == 0 && self.last_row == version.last_row_index()
    }

    /// Whether the range spans every column of `version`
    pub fn is_full_row_range(&self, version: SpreadsheetVersion) -> bool {
        self.first_col == 0 && self.last_col == version.last_column_index()
    }

    /// The last row as a bound, `Unbounded` when it is the sheet edge
    pub fn last_row_bound(&self, version: SpreadsheetVersion) -> Bound {
        if self.last_row == version.last_row_index() {
            Bound::Unbounded
        } else {
            Bound::At(self.last_row)
        }
    }

    /// The last column as a bound, `Unbounded` when it is the sheet edge
    pub fn last_column_bound(&self, version: SpreadsheetVersion) -> Bound {
        if self.last_col == version.last_column_index() {
            Bound::Unbounded
        } else {
            Bound::At(self.last_col)
        }
    }

    /// Check that the range fits inside the grid of `version`
    pub fn validate(&self, version: SpreadsheetVersion) -> Result<()> {
        if self.last_row > version.last_row_index() {
            return Err(Error::RowOutOfBounds(
                self.last_row,
                version.last_row_index(),
            ));
        }
        if self.last_col > version.last_column_index() {
            return Err(Error::ColumnOutOfBounds(
                self.last_col,
                version.last_column_index(),
            ));
        }
        Ok(())
    }

    /// Whether the range fits inside the grid of `version`
    pub fn is_valid(&self, version: SpreadsheetVersion) -> bool {
        self.validate(version).is_ok()
    }

    /// Whether the cell at (`row`, `col`) lies inside the range
    pub fn is_in_range(&self, row: u32, col: u32) -> bool {
        self.contains_row(row) && self.contains_column(col)
    }

    /// Whether `row` lies between the first and last row
    pub fn contains_row(&self, row: u32) -> bool {
        self.first_row <= row && row <= self.last_row
    }

    /// Whether `col` lies between the first and last column
    pub fn contains_column(&self, col: u32) -> bool {
        self.first_col <= col && col <= self.last_col
    }

    /// Whether the two ranges share at least one cell
    pub fn intersects(&self, other: &CellRangeAddress) -> bool {
        self.first_row <= other.last_row
            && self.last_row >= other.first_row
            && self.first_col <= other.last_col
            && self.last_col >= other.first_col
    }

    /// Format as A1-style string, collapsing whole rows/columns for `version`
    pub fn format_as_string(&self, version: SpreadsheetVersion) -> String {
        let col = CellAddress::column_to_letters;
        if self.is_full_column_range(version) && !self.is_full_row_range(version) {
            return format!("{}:{}", col(self.first_col), col(self.last_col));
        }
        if self.is_full_row_range(version) && !self.is_full_column_range(version) {
            return format!("{}:{}", self.first_row + 1, self.last_row + 1);
        }
        self.to_a1_string()
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        let start = CellAddress::new(self.first_row, self.first_col);
        if self.height() == 1 && self.width() == 1 {
            start.to_a1_string()
        } else {
            let end = CellAddress::new(self.last_row, self.last_col);
            format!("{}:{}", start, end)
        }
    }
}

impl fmt::Display for CellRangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRangeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalises() {
        let r = CellRangeAddress::new(5, 2, 3, 1);
        assert_eq!((r.first_row(), r.last_row()), (2, 5));
        assert_eq!((r.first_column(), r.last_column()), (1, 3));
        assert_eq!(r.number_of_cells(), 12);
    }

    #[test]
    fn test_parse_forms() {
        let r = CellRangeAddress::parse("B2:D4").unwrap();
        assert_eq!(r, CellRangeAddress::new(1, 3, 1, 3));

        let r = CellRangeAddress::parse("C3").unwrap();
        assert_eq!(r, CellRangeAddress::single(2, 2));

        let r = CellRangeAddress::parse("A:B").unwrap();
        assert_eq!(r, CellRangeAddress::new(0, 65_535, 0, 1));
        assert!(r.is_full_column_range(SpreadsheetVersion::Excel97));

        let r = CellRangeAddress::parse("$3:$5").unwrap();
        assert_eq!(r, CellRangeAddress::new(2, 4, 0, 255));
    }

    #[test]
    fn test_parse_rejects_out_of_grid() {
        assert!(CellRangeAddress::parse("A1:A70000").is_err());
        assert!(
            CellRangeAddress::parse_with("A1:A70000", SpreadsheetVersion::Excel2007).is_ok()
        );
        assert!(CellRangeAddress::parse("A1:IW1").is_err());
    }

    #[test]
    fn test_from_legacy_sentinels() {
        let v = SpreadsheetVersion::Excel97;
        let r = CellRangeAddress::from_legacy(-1, -1, 2, 2, v).unwrap();
        assert_eq!(r, CellRangeAddress::full_columns(2, 2, v));
        assert_eq!(r.last_row_bound(v), Bound::Unbounded);
        assert_eq!(r.last_column_bound(v), Bound::At(2));
        assert_eq!(r.format_as_string(v), "C:C");
    }

    #[test]
    fn test_containment_helpers() {
        let r = CellRangeAddress::parse("B2:D4").unwrap();
        assert!(r.is_in_range(1, 1));
        assert!(r.is_in_range(3, 3));
        assert!(!r.is_in_range(0, 0));
        assert!(!r.is_in_range(4, 1));
        assert!(r.intersects(&CellRangeAddress::parse("D4:F6").unwrap()));
        assert!(!r.intersects(&CellRangeAddress::parse("E5").unwrap()));
    }

    #[test]
    fn test_display() {
        assert_eq!(CellRangeAddress::new(0, 9, 0, 1).to_string(), "A1:B10");
        assert_eq!(CellRangeAddress::single(2, 2).to_string(), "C3");
        let v = SpreadsheetVersion::Excel97;
        assert_eq!(CellRangeAddress::full_rows(0, 0, v).format_as_string(v), "1:1");
    }
}
