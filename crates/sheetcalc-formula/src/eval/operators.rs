//! Operator semantics

use super::error_eval::{ErrorEval, EvalResult};
use super::reference::AreaEval;
use super::resolver::{Coercion, OperandResolver};
use super::value::ValueEval;
use super::workbook::EvaluationCell;
use crate::error::{FormulaError, FormulaResult};
use std::cmp::Ordering;
use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Concat,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    /// `A1:B2` bounding area of two references
    Range,
    /// `A1:B2 B1:C3` shared cells of two references
    Intersect,
}

impl BinaryOperator {
    /// Operator text as written in a formula
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Concat => "&",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Range => ":",
            BinaryOperator::Intersect => " ",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Negate,
    Percent,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Negate => "-",
            UnaryOperator::Percent => "%",
        })
    }
}

/// Apply a binary operator to two stack operands
///
/// Spreadsheet errors come back as [`ValueEval::Error`]; `Err` is reserved
/// for operands no operator can handle.
pub fn evaluate_binary(
    op: BinaryOperator,
    left: &ValueEval,
    right: &ValueEval,
    cell: EvaluationCell,
) -> FormulaResult<ValueEval> {
    let value = match op {
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => numeric(op, left, right, cell)?,
        BinaryOperator::Concat => return concat(left, right, cell),
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => return relational(op, left, right, cell),
        BinaryOperator::Range => to_value(range(left, right)),
        BinaryOperator::Intersect => to_value(intersect(left, right)),
    };
    Ok(value)
}

/// Apply a unary operator to a stack operand
pub fn evaluate_unary(op: UnaryOperator, operand: &ValueEval, cell: EvaluationCell) -> FormulaResult<ValueEval> {
    let value = match OperandResolver::get_single_value(operand, cell.row, cell.col) {
        Ok(v) => v,
        Err(e) => return Ok(ValueEval::Error(e)),
    };
    if op == UnaryOperator::Plus {
        if let ValueEval::Text(_) = value {
            return Ok(value);
        }
    }
    let result = OperandResolver::coerce_value_to_double(&value)?.map(|d| match op {
        UnaryOperator::Plus => d,
        UnaryOperator::Negate => -d,
        UnaryOperator::Percent => d / 100.0,
    });
    Ok(number_value(result))
}

fn to_value(result: EvalResult<AreaEval>) -> ValueEval {
    match result {
        Ok(area) => ValueEval::Area(area),
        Err(e) => ValueEval::Error(e),
    }
}

fn number_value(result: EvalResult<f64>) -> ValueEval {
    match result {
        Ok(d) if d.is_nan() || d.is_infinite() => ValueEval::Error(ErrorEval::NUM_ERROR),
        // Normalise -0
        Ok(d) if d == 0.0 => ValueEval::Number(0.0),
        Ok(d) => ValueEval::Number(d),
        Err(e) => ValueEval::Error(e),
    }
}

fn numeric_operand(arg: &ValueEval, cell: EvaluationCell) -> Coercion<f64> {
    match OperandResolver::get_single_value(arg, cell.row, cell.col) {
        Ok(value) => OperandResolver::coerce_value_to_double(&value),
        Err(e) => Ok(Err(e)),
    }
}

fn numeric(
    op: BinaryOperator,
    left: &ValueEval,
    right: &ValueEval,
    cell: EvaluationCell,
) -> FormulaResult<ValueEval> {
    let right = numeric_operand(right, cell)?;
    let result = numeric_operand(left, cell)?.and_then(|a| {
        let b = right?;
        match op {
            BinaryOperator::Add => Ok(a + b),
            BinaryOperator::Subtract => Ok(a - b),
            BinaryOperator::Multiply => Ok(a * b),
            BinaryOperator::Divide if b == 0.0 => Err(ErrorEval::DIV_ZERO),
            BinaryOperator::Divide => Ok(a / b),
            _ => Ok(a.powf(b)),
        }
    });
    Ok(number_value(result))
}

fn concat(left: &ValueEval, right: &ValueEval, cell: EvaluationCell) -> FormulaResult<ValueEval> {
    let mut text = String::new();
    for arg in [left, right] {
        let value = match OperandResolver::get_single_value(arg, cell.row, cell.col) {
            Ok(v) => v,
            Err(e) => return Ok(ValueEval::Error(e)),
        };
        match value {
            ValueEval::Blank | ValueEval::MissingArg => {}
            ValueEval::Number(_) | ValueEval::Text(_) | ValueEval::Bool(_) => {
                text.push_str(&OperandResolver::coerce_value_to_string(&value));
            }
            other => {
                return Err(FormulaError::UnexpectedOperand(format!(
                    "cannot concatenate {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(ValueEval::Text(text))
}

fn relational(
    op: BinaryOperator,
    left: &ValueEval,
    right: &ValueEval,
    cell: EvaluationCell,
) -> FormulaResult<ValueEval> {
    let a = match OperandResolver::get_single_value(left, cell.row, cell.col) {
        Ok(v) => v,
        Err(e) => return Ok(ValueEval::Error(e)),
    };
    let b = match OperandResolver::get_single_value(right, cell.row, cell.col) {
        Ok(v) => v,
        Err(e) => return Ok(ValueEval::Error(e)),
    };
    let ordering = compare_values(&a, &b)?;
    let result = match op {
        BinaryOperator::Equal => ordering == Ordering::Equal,
        BinaryOperator::NotEqual => ordering != Ordering::Equal,
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(ValueEval::Bool(result))
}

/// Order two scalars the way comparison operators do
///
/// Numbers sort before text and text before booleans. Text compares
/// case-insensitively. Blank compares as 0, `""` or FALSE depending on the
/// other side.
pub fn compare_values(a: &ValueEval, b: &ValueEval) -> FormulaResult<Ordering> {
    if is_blank_like(a) {
        return compare_blank(b);
    }
    if is_blank_like(b) {
        return compare_blank(a).map(Ordering::reverse);
    }
    match (a, b) {
        (ValueEval::Bool(x), ValueEval::Bool(y)) => Ok(x.cmp(y)),
        (ValueEval::Bool(_), _) => Ok(Ordering::Greater),
        (_, ValueEval::Bool(_)) => Ok(Ordering::Less),
        (ValueEval::Text(x), ValueEval::Text(y)) => Ok(x.to_lowercase().cmp(&y.to_lowercase())),
        (ValueEval::Text(_), _) => Ok(Ordering::Greater),
        (_, ValueEval::Text(_)) => Ok(Ordering::Less),
        (ValueEval::Number(x), ValueEval::Number(y)) => Ok(compare_numbers(*x, *y)),
        _ => Err(FormulaError::UnexpectedOperand(format!(
            "cannot compare {} with {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn is_blank_like(v: &ValueEval) -> bool {
    matches!(v, ValueEval::Blank | ValueEval::MissingArg)
}

/// Ordering of blank relative to `v`
fn compare_blank(v: &ValueEval) -> FormulaResult<Ordering> {
    match v {
        ValueEval::Blank | ValueEval::MissingArg => Ok(Ordering::Equal),
        ValueEval::Bool(b) => Ok(if *b { Ordering::Less } else { Ordering::Equal }),
        ValueEval::Number(n) => Ok(compare_numbers(0.0, *n)),
        ValueEval::Text(s) => Ok(if s.is_empty() { Ordering::Equal } else { Ordering::Less }),
        other => Err(FormulaError::UnexpectedOperand(format!(
            "cannot compare blank with {}",
            other.type_name()
        ))),
    }
}

fn compare_numbers(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn as_area(arg: &ValueEval) -> EvalResult<AreaEval> {
    match arg {
        ValueEval::Area(a) => Ok(a.clone()),
        ValueEval::Ref(r) => Ok(r.to_area()),
        ValueEval::Error(e) => Err(*e),
        _ => Err(ErrorEval::VALUE_INVALID),
    }
}

/// Bounding area of two references on the same sheet
pub fn range(left: &ValueEval, right: &ValueEval) -> EvalResult<AreaEval> {
    let a = as_area(left)?;
    let b = as_area(right)?;
    if a.first_sheet_index() != b.first_sheet_index() || a.last_sheet_index() != b.last_sheet_index() {
        return Err(ErrorEval::VALUE_INVALID);
    }
    let first_row = a.first_row().min(b.first_row()) as i64;
    let last_row = a.last_row().max(b.last_row()) as i64;
    let first_col = a.first_column().min(b.first_column()) as i64;
    let last_col = a.last_column().max(b.last_column()) as i64;
    let (row0, col0) = (a.first_row() as i64, a.first_column() as i64);
    a.offset(first_row - row0, last_row - row0, first_col - col0, last_col - col0)
}

/// Cells shared by two references, `#NULL!` when they are disjoint
pub fn intersect(left: &ValueEval, right: &ValueEval) -> EvalResult<AreaEval> {
    let a = as_area(left)?;
    let b = as_area(right)?;
    if a.first_sheet_index() != b.first_sheet_index() {
        return Err(ErrorEval::NULL_INTERSECTION);
    }
    let first_row = a.first_row().max(b.first_row());
    let last_row = a.last_row().min(b.last_row());
    let first_col = a.first_column().max(b.first_column());
    let last_col = a.last_column().min(b.last_column());
    if first_row > last_row || first_col > last_col {
        return Err(ErrorEval::NULL_INTERSECTION);
    }
    let (row0, col0) = (a.first_row() as i64, a.first_column() as i64);
    a.offset(
        first_row as i64 - row0,
        last_row as i64 - row0,
        first_col as i64 - col0,
        last_col as i64 - col0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{CellSource, InMemoryWorkbook, RefEval};
    use pretty_assertions::assert_eq;
    use sheetcalc_core::CellRangeAddress;

    const CELL: EvaluationCell = EvaluationCell { sheet: 0, row: 0, col: 0 };

    fn bin(op: BinaryOperator, a: impl Into<ValueEval>, b: impl Into<ValueEval>) -> ValueEval {
        evaluate_binary(op, &a.into(), &b.into(), CELL).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(bin(BinaryOperator::Add, 1.0, "2"), ValueEval::Number(3.0));
        assert_eq!(bin(BinaryOperator::Multiply, true, 4.0), ValueEval::Number(4.0));
        assert_eq!(bin(BinaryOperator::Power, 2.0, 10.0), ValueEval::Number(1024.0));
        assert_eq!(bin(BinaryOperator::Subtract, 1.0, 1.0), ValueEval::Number(0.0));
    }

    #[test]
    fn test_arithmetic_errors() {
        assert_eq!(bin(BinaryOperator::Divide, 1.0, 0.0), ValueEval::Error(ErrorEval::DIV_ZERO));
        assert_eq!(bin(BinaryOperator::Add, "x", 1.0), ValueEval::Error(ErrorEval::VALUE_INVALID));
        assert_eq!(bin(BinaryOperator::Power, -1.0, 0.5), ValueEval::Error(ErrorEval::NUM_ERROR));
        // Left error wins
        assert_eq!(
            bin(BinaryOperator::Add, ErrorEval::NA, ErrorEval::DIV_ZERO),
            ValueEval::Error(ErrorEval::NA)
        );
    }

    #[test]
    fn test_unary() {
        let unary = |op, v: ValueEval| evaluate_unary(op, &v, CELL).unwrap();
        assert_eq!(unary(UnaryOperator::Negate, "3".into()), ValueEval::Number(-3.0));
        assert_eq!(unary(UnaryOperator::Percent, 50.0.into()), ValueEval::Number(0.5));
        assert_eq!(unary(UnaryOperator::Plus, "abc".into()), ValueEval::text("abc"));
    }

    #[test]
    fn test_concat() {
        assert_eq!(bin(BinaryOperator::Concat, "a", 1.5), ValueEval::text("a1.5"));
        assert_eq!(bin(BinaryOperator::Concat, true, ValueEval::Blank), ValueEval::text("TRUE"));
    }

    #[test]
    fn test_compare_mixed_types() {
        assert_eq!(bin(BinaryOperator::LessThan, 100.0, "a"), ValueEval::TRUE);
        assert_eq!(bin(BinaryOperator::GreaterThan, false, "zzz"), ValueEval::TRUE);
        assert_eq!(bin(BinaryOperator::Equal, "ABC", "abc"), ValueEval::TRUE);
        assert_eq!(bin(BinaryOperator::GreaterEqual, 2.0, 2.0), ValueEval::TRUE);
    }

    #[test]
    fn test_compare_blank() {
        assert_eq!(bin(BinaryOperator::Equal, ValueEval::Blank, 0.0), ValueEval::TRUE);
        assert_eq!(bin(BinaryOperator::Equal, ValueEval::Blank, ""), ValueEval::TRUE);
        assert_eq!(bin(BinaryOperator::Equal, false, ValueEval::Blank), ValueEval::TRUE);
        assert_eq!(bin(BinaryOperator::LessThan, ValueEval::Blank, 1.0), ValueEval::TRUE);
        assert_eq!(bin(BinaryOperator::GreaterThan, "a", ValueEval::Blank), ValueEval::TRUE);
    }

    fn area(range: &str) -> ValueEval {
        let source = CellSource::Workbook(InMemoryWorkbook::with_default_sheet().into_shared());
        let range = CellRangeAddress::parse(range).unwrap();
        ValueEval::Area(AreaEval::new(0, range, source))
    }

    #[test]
    fn test_range_operator() {
        let source = CellSource::Workbook(InMemoryWorkbook::with_default_sheet().into_shared());
        let a = ValueEval::Ref(RefEval::new(0, 0, 0, source.clone()));
        let b = ValueEval::Ref(RefEval::new(0, 2, 1, source));
        let r = range(&a, &b).unwrap();
        assert_eq!(r.range(), CellRangeAddress::parse("A1:B3").unwrap());
    }

    #[test]
    fn test_intersection() {
        let r = intersect(&area("A1:C3"), &area("B2:D4")).unwrap();
        assert_eq!(r.range(), CellRangeAddress::parse("B2:C3").unwrap());
        assert_eq!(
            intersect(&area("A1:A2"), &area("C1:C2")),
            Err(ErrorEval::NULL_INTERSECTION)
        );
    }
}
