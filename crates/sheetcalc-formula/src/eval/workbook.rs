//! Workbook access for parsing and evaluation

use super::value::ValueEval;
use crate::error::{FormulaError, FormulaResult};
use ahash::AHashMap;
use sheetcalc_core::{CellAddress, MAX_SHEET_NAME_LEN};
use std::rc::Rc;

/// Read access to cell values during evaluation
///
/// Cell values are expected to be already-computed scalars. Cells that were
/// never written read as [`ValueEval::Blank`].
pub trait EvaluationWorkbook {
    /// Number of sheets
    fn sheet_count(&self) -> u32;

    /// Index of the sheet called `name` (case-insensitive)
    fn sheet_index(&self, name: &str) -> Option<u32>;

    /// Name of the sheet at `index`
    fn sheet_name(&self, index: u32) -> Option<&str>;

    /// Resolve an extern-sheet index from a 3D token to a sheet span
    fn extern_sheet(&self, ixti: u16) -> Option<(u32, u32)>;

    /// Resolve the name carried by a `NameX` token
    fn external_name(&self, _ixti: u16, _name_index: u16) -> Option<String> {
        None
    }

    /// Value of a single cell
    fn cell_value(&self, sheet: u32, row: u32, col: u32) -> ValueEval;
}

/// Registration hooks the parser needs for sheet-qualified references and
/// unknown function names
pub trait FormulaParsingWorkbook {
    /// Extern-sheet index for `sheet_name`, or `None` if no such sheet exists
    fn extern_sheet_index(&mut self, sheet_name: &str) -> Option<u16>;

    /// `(ixti, name_index)` for an external function name, adding it if new
    fn external_name_index(&mut self, name: &str) -> (u16, u16);
}

/// Location of the formula being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EvaluationCell {
    /// Sheet index
    pub sheet: u32,
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based)
    pub col: u32,
}

impl EvaluationCell {
    /// Create a cell location
    pub fn new(sheet: u32, row: u32, col: u32) -> Self {
        Self { sheet, row, col }
    }

    /// Location of an A1-style address on `sheet`
    pub fn at(sheet: u32, a1: &str) -> FormulaResult<Self> {
        let addr = CellAddress::parse(a1)?;
        Ok(Self::new(sheet, addr.row, addr.col))
    }
}

#[derive(Debug, Clone)]
struct Sheet {
    name: String,
    cells: AHashMap<(u32, u32), ValueEval>,
}

/// A workbook held entirely in memory
///
/// Used to drive the evaluator from tests and the command line, and as the
/// reference implementation of both workbook traits.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: Vec<Sheet>,
    extern_sheets: Vec<(u32, u32)>,
    external_names: Vec<String>,
}

impl InMemoryWorkbook {
    /// Create an empty workbook
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workbook with one sheet named `Sheet1`
    pub fn with_default_sheet() -> Self {
        let mut wb = Self::new();
        // Name is valid
        let _ = wb.add_sheet("Sheet1");
        wb
    }

    /// Add a sheet, returning its index (or the index of an existing sheet
    /// with the same name)
    pub fn add_sheet(&mut self, name: &str) -> FormulaResult<u32> {
        if let Some(index) = self.sheet_index(name) {
            return Ok(index);
        }
        if name.is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(FormulaError::InvalidReference(format!(
                "invalid sheet name '{}'",
                name
            )));
        }
        self.sheets.push(Sheet {
            name: name.to_string(),
            cells: AHashMap::new(),
        });
        Ok(self.sheets.len() as u32 - 1)
    }

    /// Set a cell value by indices; writing [`ValueEval::Blank`] clears it
    pub fn set_value(&mut self, sheet: u32, row: u32, col: u32, value: impl Into<ValueEval>) {
        let Some(sheet) = self.sheets.get_mut(sheet as usize) else {
            log::warn!("set_value on missing sheet {}", sheet);
            return;
        };
        match value.into() {
            ValueEval::Blank => {
                sheet.cells.remove(&(row, col));
            }
            value => {
                sheet.cells.insert((row, col), value);
            }
        }
    }

    /// Set a cell value by A1 address
    pub fn set_cell(&mut self, sheet: u32, a1: &str, value: impl Into<ValueEval>) -> FormulaResult<()> {
        if sheet as usize >= self.sheets.len() {
            return Err(FormulaError::InvalidReference(format!("no sheet {}", sheet)));
        }
        let addr = CellAddress::parse(a1)?;
        self.set_value(sheet, addr.row, addr.col, value);
        Ok(())
    }

    /// Register a sheet span for 3D references, returning its extern index
    pub fn add_extern_sheet(&mut self, first: u32, last: u32) -> u16 {
        let span = (first.min(last), first.max(last));
        if let Some(pos) = self.extern_sheets.iter().position(|s| *s == span) {
            return pos as u16;
        }
        self.extern_sheets.push(span);
        (self.extern_sheets.len() - 1) as u16
    }

    /// Freeze the workbook for evaluation
    pub fn into_shared(self) -> Rc<dyn EvaluationWorkbook> {
        Rc::new(self)
    }
}

impl EvaluationWorkbook for InMemoryWorkbook {
    fn sheet_count(&self) -> u32 {
        self.sheets.len() as u32
    }

    fn sheet_index(&self, name: &str) -> Option<u32> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
            .map(|i| i as u32)
    }

    fn sheet_name(&self, index: u32) -> Option<&str> {
        self.sheets.get(index as usize).map(|s| s.name.as_str())
    }

    fn extern_sheet(&self, ixti: u16) -> Option<(u32, u32)> {
        self.extern_sheets.get(ixti as usize).copied()
    }

    fn external_name(&self, _ixti: u16, name_index: u16) -> Option<String> {
        self.external_names.get(name_index as usize).cloned()
    }

    fn cell_value(&self, sheet: u32, row: u32, col: u32) -> ValueEval {
        self.sheets
            .get(sheet as usize)
            .and_then(|s| s.cells.get(&(row, col)))
            .cloned()
            .unwrap_or(ValueEval::Blank)
    }
}

impl FormulaParsingWorkbook for InMemoryWorkbook {
    fn extern_sheet_index(&mut self, sheet_name: &str) -> Option<u16> {
        let index = self.sheet_index(sheet_name)?;
        Some(self.add_extern_sheet(index, index))
    }

    fn external_name_index(&mut self, name: &str) -> (u16, u16) {
        let pos = match self
            .external_names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
        {
            Some(pos) => pos,
            None => {
                self.external_names.push(name.to_string());
                self.external_names.len() - 1
            }
        };
        (0, pos as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cells() {
        let mut wb = InMemoryWorkbook::with_default_sheet();
        wb.set_cell(0, "B2", 4.0).unwrap();
        assert_eq!(wb.cell_value(0, 1, 1), ValueEval::Number(4.0));
        assert_eq!(wb.cell_value(0, 0, 0), ValueEval::Blank);
        wb.set_cell(0, "B2", ValueEval::Blank).unwrap();
        assert_eq!(wb.cell_value(0, 1, 1), ValueEval::Blank);
    }

    #[test]
    fn test_sheets() {
        let mut wb = InMemoryWorkbook::new();
        assert_eq!(wb.add_sheet("Data").unwrap(), 0);
        assert_eq!(wb.add_sheet("Summary").unwrap(), 1);
        assert_eq!(wb.add_sheet("data").unwrap(), 0);
        assert_eq!(wb.sheet_index("SUMMARY"), Some(1));
        assert_eq!(wb.sheet_name(1), Some("Summary"));
        assert!(wb.add_sheet("").is_err());
        assert!(wb.set_cell(5, "A1", 1.0).is_err());
    }

    #[test]
    fn test_extern_sheets() {
        let mut wb = InMemoryWorkbook::new();
        wb.add_sheet("A").unwrap();
        wb.add_sheet("B").unwrap();
        let ixti = wb.extern_sheet_index("B").unwrap();
        assert_eq!(wb.extern_sheet(ixti), Some((1, 1)));
        assert_eq!(wb.extern_sheet_index("b"), Some(ixti));
        assert_eq!(wb.extern_sheet_index("C"), None);
        let span = wb.add_extern_sheet(1, 0);
        assert_eq!(wb.extern_sheet(span), Some((0, 1)));
    }

    #[test]
    fn test_external_names() {
        let mut wb = InMemoryWorkbook::new();
        let (ixti, first) = wb.external_name_index("MyFunc");
        let (_, again) = wb.external_name_index("MYFUNC");
        assert_eq!(first, again);
        assert_eq!(wb.external_name(ixti, first).as_deref(), Some("MyFunc"));
    }
}
