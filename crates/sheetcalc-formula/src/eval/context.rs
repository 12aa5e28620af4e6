//! Per-call context handed to functions

use super::error_eval::{ErrorEval, EvalResult};
use super::options::EvaluatorOptions;
use super::reference::CellSource;
use super::resolver::Coercion;
use super::workbook::{EvaluationCell, EvaluationWorkbook};
use crate::error::FormulaError;
use crate::functions::FunctionRegistry;
use std::cell::Cell;
use std::rc::Rc;

/// Everything a function may consult besides its arguments
pub struct OperationContext<'a> {
    /// Cell holding the formula
    pub cell: EvaluationCell,
    /// Workbook being evaluated
    pub workbook: &'a Rc<dyn EvaluationWorkbook>,
    /// Function table, for add-in dispatch
    pub registry: &'a FunctionRegistry,
    /// Evaluator settings
    pub options: &'a EvaluatorOptions,
    /// First caller defect hit by the running function
    fault: Cell<Option<FormulaError>>,
}

impl<'a> OperationContext<'a> {
    pub fn new(
        cell: EvaluationCell,
        workbook: &'a Rc<dyn EvaluationWorkbook>,
        registry: &'a FunctionRegistry,
        options: &'a EvaluatorOptions,
    ) -> Self {
        Self {
            cell,
            workbook,
            registry,
            options,
            fault: Cell::new(None),
        }
    }

    /// Unwrap a coercion inside a function body
    ///
    /// A caller defect is recorded for the evaluator to raise once the
    /// function returns; the function itself sees `#VALUE!`.
    pub fn checked<T>(&self, coercion: Coercion<T>) -> EvalResult<T> {
        match coercion {
            Ok(result) => result,
            Err(defect) => {
                let first = self.fault.take().unwrap_or(defect);
                self.fault.set(Some(first));
                Err(ErrorEval::VALUE_INVALID)
            }
        }
    }

    /// Take the recorded caller defect, if any
    pub fn take_fault(&self) -> Option<FormulaError> {
        self.fault.take()
    }

    pub fn row(&self) -> u32 {
        self.cell.row
    }

    pub fn col(&self) -> u32 {
        self.cell.col
    }

    pub fn sheet(&self) -> u32 {
        self.cell.sheet
    }

    /// Source for new references into the workbook
    pub fn source(&self) -> CellSource {
        CellSource::Workbook(Rc::clone(self.workbook))
    }
}
