//! Spreadsheet grid limits

/// The grid dimensions of a file format generation.
///
/// Unbounded range edges are normalised to the last index of the version in
/// use, so two whole-column ranges built for the same version compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpreadsheetVersion {
    /// BIFF8 (`.xls`): 65536 rows, 256 columns
    #[default]
    Excel97,
    /// Office Open XML (`.xlsx`): 1048576 rows, 16384 columns
    Excel2007,
}

impl SpreadsheetVersion {
    /// Number of rows in a sheet
    pub const fn max_rows(self) -> u32 {
        match self {
            SpreadsheetVersion::Excel97 => 65_536,
            SpreadsheetVersion::Excel2007 => crate::MAX_ROWS,
        }
    }

    /// Number of columns in a sheet
    pub const fn max_columns(self) -> u32 {
        match self {
            SpreadsheetVersion::Excel97 => 256,
            SpreadsheetVersion::Excel2007 => crate::MAX_COLS,
        }
    }

    /// Index of the last row (65535 for BIFF8)
    pub const fn last_row_index(self) -> u32 {
        self.max_rows() - 1
    }

    /// Index of the last column (255 for BIFF8)
    pub const fn last_column_index(self) -> u32 {
        self.max_columns() - 1
    }

    /// Maximum number of arguments a function call may take
    pub const fn max_function_args(self) -> usize {
        match self {
            SpreadsheetVersion::Excel97 => 30,
            SpreadsheetVersion::Excel2007 => 255,
        }
    }
}
