//! Cell and area references
//!
//! References are views: they hold coordinates plus a [`CellSource`] and read
//! cell values lazily. Offsetting a reference keeps the same source, so an
//! offset area can reach cells outside the original one.

use super::error_eval::{ErrorEval, EvalResult};
use super::value::ValueEval;
use super::workbook::EvaluationWorkbook;
use crate::error::{FormulaError, FormulaResult};
use sheetcalc_core::{CellAddress, CellRangeAddress, SpreadsheetVersion};
use std::fmt;
use std::rc::Rc;

/// Where a reference reads its cell values from
#[derive(Clone)]
pub enum CellSource {
    /// Live workbook cells
    Workbook(Rc<dyn EvaluationWorkbook>),
    /// A fixed block of values; cells outside the block read as blank
    Values(Rc<ValueBlock>),
}

impl CellSource {
    fn value(&self, sheet: u32, row: u32, col: u32) -> ValueEval {
        match self {
            CellSource::Workbook(wb) => wb.cell_value(sheet, row, col),
            CellSource::Values(block) => block.get(row, col),
        }
    }
}

impl fmt::Debug for CellSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellSource::Workbook(wb) => write!(f, "Workbook({} sheets)", wb.sheet_count()),
            CellSource::Values(block) => f.debug_tuple("Values").field(block).finish(),
        }
    }
}

impl PartialEq for CellSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellSource::Workbook(a), CellSource::Workbook(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (CellSource::Values(a), CellSource::Values(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

/// A rectangular block of values anchored at a cell
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBlock {
    first_row: u32,
    first_col: u32,
    width: u32,
    values: Vec<ValueEval>,
}

impl ValueBlock {
    /// Build a block from rows of values; short rows are padded with blanks
    pub fn new(first_row: u32, first_col: u32, rows: Vec<Vec<ValueEval>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let mut values = Vec::with_capacity(rows.len() * width as usize);
        for mut row in rows {
            row.resize(width as usize, ValueEval::Blank);
            values.extend(row);
        }
        Self {
            first_row,
            first_col,
            width,
            values,
        }
    }

    fn height(&self) -> u32 {
        if self.width == 0 {
            0
        } else {
            self.values.len() as u32 / self.width
        }
    }

    fn get(&self, row: u32, col: u32) -> ValueEval {
        if row < self.first_row || col < self.first_col {
            return ValueEval::Blank;
        }
        let (r, c) = (row - self.first_row, col - self.first_col);
        if c >= self.width {
            return ValueEval::Blank;
        }
        self.values
            .get((r * self.width + c) as usize)
            .cloned()
            .unwrap_or(ValueEval::Blank)
    }
}

fn sheet_prefix(first: u32, last: u32) -> String {
    if first == last {
        format!("#{}!", first)
    } else {
        format!("#{}:#{}!", first, last)
    }
}

/// Normalise a relative span against `base` and reject anything past
/// `last_index`
fn offset_span(base: u32, rel_first: i64, rel_last: i64, last_index: u32) -> EvalResult<(u32, u32)> {
    let (lo, hi) = (rel_first.min(rel_last), rel_first.max(rel_last));
    let first = base as i64 + lo;
    let last = base as i64 + hi;
    if first < 0 || last > last_index as i64 {
        return Err(ErrorEval::REF_INVALID);
    }
    Ok((first as u32, last as u32))
}

/// A reference to one cell, possibly across several sheets
#[derive(Debug, Clone, PartialEq)]
pub struct RefEval {
    first_sheet: u32,
    last_sheet: u32,
    row: u32,
    col: u32,
    source: CellSource,
}

impl RefEval {
    /// Reference to a cell on one sheet
    pub fn new(sheet: u32, row: u32, col: u32, source: CellSource) -> Self {
        Self::new_3d(sheet, sheet, row, col, source)
    }

    /// Reference to the same cell on every sheet in `first..=last`
    pub fn new_3d(first_sheet: u32, last_sheet: u32, row: u32, col: u32, source: CellSource) -> Self {
        Self {
            first_sheet: first_sheet.min(last_sheet),
            last_sheet: first_sheet.max(last_sheet),
            row,
            col,
            source,
        }
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.col
    }

    pub fn first_sheet_index(&self) -> u32 {
        self.first_sheet
    }

    pub fn last_sheet_index(&self) -> u32 {
        self.last_sheet
    }

    pub fn number_of_sheets(&self) -> u32 {
        self.last_sheet - self.first_sheet + 1
    }

    /// Value of the referenced cell on `sheet`
    pub fn inner_value(&self, sheet: u32) -> ValueEval {
        self.source.value(sheet, self.row, self.col)
    }

    /// Area spanning the given offsets from this cell
    ///
    /// Offsets are normalised so either order works. A result that falls off
    /// the largest grid is `#REF!`.
    pub fn offset(
        &self,
        rel_first_row: i64,
        rel_last_row: i64,
        rel_first_col: i64,
        rel_last_col: i64,
    ) -> EvalResult<AreaEval> {
        self.offset_within(
            SpreadsheetVersion::Excel2007,
            rel_first_row,
            rel_last_row,
            rel_first_col,
            rel_last_col,
        )
    }

    /// [`offset`](Self::offset) bounded by the grid of `version`
    pub fn offset_within(
        &self,
        version: SpreadsheetVersion,
        rel_first_row: i64,
        rel_last_row: i64,
        rel_first_col: i64,
        rel_last_col: i64,
    ) -> EvalResult<AreaEval> {
        let (first_row, last_row) =
            offset_span(self.row, rel_first_row, rel_last_row, version.last_row_index())?;
        let (first_col, last_col) =
            offset_span(self.col, rel_first_col, rel_last_col, version.last_column_index())?;
        Ok(AreaEval::new_3d(
            self.first_sheet,
            self.last_sheet,
            CellRangeAddress::new(first_row, last_row, first_col, last_col),
            self.source.clone(),
        ))
    }

    /// The same cell as a one-cell area
    pub fn to_area(&self) -> AreaEval {
        AreaEval::new_3d(
            self.first_sheet,
            self.last_sheet,
            CellRangeAddress::single(self.row, self.col),
            self.source.clone(),
        )
    }
}

impl fmt::Display for RefEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            sheet_prefix(self.first_sheet, self.last_sheet),
            CellAddress::new(self.row, self.col)
        )
    }
}

/// A reference to a rectangle of cells, possibly across several sheets
#[derive(Debug, Clone, PartialEq)]
pub struct AreaEval {
    first_sheet: u32,
    last_sheet: u32,
    range: CellRangeAddress,
    source: CellSource,
}

impl AreaEval {
    /// Area on one sheet
    pub fn new(sheet: u32, range: CellRangeAddress, source: CellSource) -> Self {
        Self::new_3d(sheet, sheet, range, source)
    }

    /// Area repeated on every sheet in `first..=last`
    pub fn new_3d(first_sheet: u32, last_sheet: u32, range: CellRangeAddress, source: CellSource) -> Self {
        Self {
            first_sheet: first_sheet.min(last_sheet),
            last_sheet: first_sheet.max(last_sheet),
            range,
            source,
        }
    }

    /// Area over a fixed block of values anchored at `(first_row, first_col)`
    pub fn from_values(first_row: u32, first_col: u32, rows: Vec<Vec<ValueEval>>) -> Self {
        let block = ValueBlock::new(first_row, first_col, rows);
        let last_row = first_row + block.height().max(1) - 1;
        let last_col = first_col + block.width.max(1) - 1;
        Self::new(
            0,
            CellRangeAddress::new(first_row, last_row, first_col, last_col),
            CellSource::Values(Rc::new(block)),
        )
    }

    pub fn first_row(&self) -> u32 {
        self.range.first_row()
    }

    pub fn last_row(&self) -> u32 {
        self.range.last_row()
    }

    pub fn first_column(&self) -> u32 {
        self.range.first_column()
    }

    pub fn last_column(&self) -> u32 {
        self.range.last_column()
    }

    pub fn first_sheet_index(&self) -> u32 {
        self.first_sheet
    }

    pub fn last_sheet_index(&self) -> u32 {
        self.last_sheet
    }

    pub fn number_of_sheets(&self) -> u32 {
        self.last_sheet - self.first_sheet + 1
    }

    /// Covered range on each sheet
    pub fn range(&self) -> CellRangeAddress {
        self.range
    }

    pub fn width(&self) -> u32 {
        self.range.width()
    }

    pub fn height(&self) -> u32 {
        self.range.height()
    }

    /// Exactly one row high
    pub fn is_row(&self) -> bool {
        self.height() == 1
    }

    /// Exactly one column wide
    pub fn is_column(&self) -> bool {
        self.width() == 1
    }

    pub fn contains_row(&self, row: u32) -> bool {
        self.range.contains_row(row)
    }

    pub fn contains_column(&self, col: u32) -> bool {
        self.range.contains_column(col)
    }

    /// Whether `(row, col)` lies inside the area
    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.range.is_in_range(row, col)
    }

    /// Value at absolute sheet coordinates, which must lie inside the area
    pub fn get_absolute_value(&self, row: u32, col: u32) -> FormulaResult<ValueEval> {
        if !self.contains(row, col) {
            return Err(FormulaError::IndexOutOfRange {
                row,
                col,
                area: self.range.to_a1_string(),
            });
        }
        Ok(self.source.value(self.first_sheet, row, col))
    }

    /// Value at coordinates relative to the top-left cell, on the first sheet
    pub fn get_relative_value(&self, rel_row: u32, rel_col: u32) -> ValueEval {
        self.get_relative_value_on(0, rel_row, rel_col)
    }

    /// Value at relative coordinates on the `sheet_offset`-th covered sheet
    pub fn get_relative_value_on(&self, sheet_offset: u32, rel_row: u32, rel_col: u32) -> ValueEval {
        self.source.value(
            self.first_sheet + sheet_offset,
            self.first_row() + rel_row,
            self.first_column() + rel_col,
        )
    }

    /// Area spanning the given offsets from the top-left cell
    pub fn offset(
        &self,
        rel_first_row: i64,
        rel_last_row: i64,
        rel_first_col: i64,
        rel_last_col: i64,
    ) -> EvalResult<AreaEval> {
        self.offset_within(
            SpreadsheetVersion::Excel2007,
            rel_first_row,
            rel_last_row,
            rel_first_col,
            rel_last_col,
        )
    }

    /// [`offset`](Self::offset) bounded by the grid of `version`
    pub fn offset_within(
        &self,
        version: SpreadsheetVersion,
        rel_first_row: i64,
        rel_last_row: i64,
        rel_first_col: i64,
        rel_last_col: i64,
    ) -> EvalResult<AreaEval> {
        let (first_row, last_row) =
            offset_span(self.first_row(), rel_first_row, rel_last_row, version.last_row_index())?;
        let (first_col, last_col) = offset_span(
            self.first_column(),
            rel_first_col,
            rel_last_col,
            version.last_column_index(),
        )?;
        Ok(Self::new_3d(
            self.first_sheet,
            self.last_sheet,
            CellRangeAddress::new(first_row, last_row, first_col, last_col),
            self.source.clone(),
        ))
    }

    /// The `rel_row`-th row of the area
    pub fn row(&self, rel_row: u32) -> AreaEval {
        let row = self.first_row() + rel_row;
        Self::new_3d(
            self.first_sheet,
            self.last_sheet,
            CellRangeAddress::new(row, row, self.first_column(), self.last_column()),
            self.source.clone(),
        )
    }

    /// The `rel_col`-th column of the area
    pub fn column(&self, rel_col: u32) -> AreaEval {
        let col = self.first_column() + rel_col;
        Self::new_3d(
            self.first_sheet,
            self.last_sheet,
            CellRangeAddress::new(self.first_row(), self.last_row(), col, col),
            self.source.clone(),
        )
    }

    /// The area's top-left cell as a single-cell reference
    pub fn top_left(&self) -> RefEval {
        RefEval::new_3d(
            self.first_sheet,
            self.last_sheet,
            self.first_row(),
            self.first_column(),
            self.source.clone(),
        )
    }

    /// Every cell value, sheet by sheet in row-major order
    pub fn values(&self) -> impl Iterator<Item = ValueEval> + '_ {
        let (height, width) = (self.height(), self.width());
        (0..self.number_of_sheets()).flat_map(move |s| {
            (0..height).flat_map(move |r| (0..width).map(move |c| self.get_relative_value_on(s, r, c)))
        })
    }
}

impl fmt::Display for AreaEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            sheet_prefix(self.first_sheet, self.last_sheet),
            self.range.to_a1_string()
        )
    }
}
