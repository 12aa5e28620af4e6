//! Reference functions (ROW, COLUMN, ROWS, COLUMNS, INDEX)

use crate::eval::{AreaEval, ErrorEval, EvalResult, OperandResolver, OperationContext, ValueEval};

/// ROW([reference])
pub fn fn_row(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    match args {
        [] => ValueEval::Number(ctx.row() as f64 + 1.0),
        [ValueEval::Ref(r)] => ValueEval::Number(r.row() as f64 + 1.0),
        [ValueEval::Area(a)] => ValueEval::Number(a.first_row() as f64 + 1.0),
        [ValueEval::Error(e)] => ValueEval::Error(*e),
        _ => ValueEval::Error(ErrorEval::VALUE_INVALID),
    }
}

/// COLUMN([reference])
pub fn fn_column(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    match args {
        [] => ValueEval::Number(ctx.col() as f64 + 1.0),
        [ValueEval::Ref(r)] => ValueEval::Number(r.column() as f64 + 1.0),
        [ValueEval::Area(a)] => ValueEval::Number(a.first_column() as f64 + 1.0),
        [ValueEval::Error(e)] => ValueEval::Error(*e),
        _ => ValueEval::Error(ErrorEval::VALUE_INVALID),
    }
}

/// ROWS(array)
pub fn fn_rows(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    match args {
        [ValueEval::Ref(_)] => ValueEval::Number(1.0),
        [ValueEval::Area(a)] => ValueEval::Number(a.height() as f64),
        [ValueEval::Error(e)] => ValueEval::Error(*e),
        _ => ValueEval::Error(ErrorEval::VALUE_INVALID),
    }
}

/// COLUMNS(array)
pub fn fn_columns(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    match args {
        [ValueEval::Ref(_)] => ValueEval::Number(1.0),
        [ValueEval::Area(a)] => ValueEval::Number(a.width() as f64),
        [ValueEval::Error(e)] => ValueEval::Error(*e),
        _ => ValueEval::Error(ErrorEval::VALUE_INVALID),
    }
}

/// INDEX(array, row_num, [column_num])
///
/// Indexes are 1-based and 0 selects a whole row or column. With a single
/// index into a one-row area, the index counts columns. The result stays a
/// reference so it can feed ranges and other reference functions.
pub fn fn_index(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    super::value_of(index(args, ctx))
}

fn index(args: &[ValueEval], ctx: &OperationContext<'_>) -> EvalResult<ValueEval> {
    super::check_args(args, 2, 4)?;
    let area = match &args[0] {
        ValueEval::Area(a) => a.clone(),
        ValueEval::Ref(r) => r.to_area(),
        ValueEval::Error(e) => return Err(*e),
        _ => return Err(ErrorEval::VALUE_INVALID),
    };

    let first = index_arg(&args[1], ctx)?;
    let (row, col) = match args.get(2) {
        Some(arg) => (first, index_arg(arg, ctx)?),
        // A single index into a one-dimensional area picks a cell
        None if area.is_row() => (first.min(1), first),
        None if area.is_column() => (first, first.min(1)),
        None => (first, 0),
    };
    if row > area.height() || col > area.width() {
        return Err(ErrorEval::REF_INVALID);
    }

    Ok(match (row, col) {
        (0, 0) => ValueEval::Area(area),
        (0, c) => ValueEval::Area(area.column(c - 1)),
        (r, 0) => ValueEval::Area(area.row(r - 1)),
        (r, c) => ValueEval::Ref(cell_of(&area, r - 1, c - 1)),
    })
}

fn cell_of(area: &AreaEval, rel_row: u32, rel_col: u32) -> crate::eval::RefEval {
    area.row(rel_row).column(rel_col).top_left()
}

fn index_arg(arg: &ValueEval, ctx: &OperationContext<'_>) -> EvalResult<u32> {
    if matches!(arg, ValueEval::MissingArg) {
        return Ok(0);
    }
    let value = super::scalar_arg(arg, ctx)?;
    let n = ctx.checked(OperandResolver::coerce_value_to_int(&value))?;
    u32::try_from(n).map_err(|_| ErrorEval::VALUE_INVALID)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{err, num, Harness};
    use super::*;
    use crate::eval::InMemoryWorkbook;
    use pretty_assertions::assert_eq;

    fn grid() -> Harness {
        let mut wb = InMemoryWorkbook::with_default_sheet();
        for (row, values) in [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].iter().enumerate() {
            for (col, v) in values.iter().enumerate() {
                wb.set_value(0, row as u32 + 1, col as u32 + 1, *v);
            }
        }
        Harness::new(wb)
    }

    fn deref(v: ValueEval) -> ValueEval {
        match v {
            ValueEval::Ref(r) => r.inner_value(r.first_sheet_index()),
            other => other,
        }
    }

    #[test]
    fn test_row_and_column() {
        let mut h = grid();
        assert_eq!(h.call(fn_row, &[h.cell_ref("C7")]), num(7.0));
        assert_eq!(h.call(fn_column, &[h.area("C7:E9")]), num(3.0));
        h.cell = crate::eval::EvaluationCell::new(0, 4, 1);
        assert_eq!(h.call(fn_row, &[]), num(5.0));
        assert_eq!(h.call(fn_column, &[]), num(2.0));
        assert_eq!(h.call(fn_row, &[num(1.0)]), err(ErrorEval::VALUE_INVALID));
    }

    #[test]
    fn test_rows_and_columns() {
        let h = grid();
        assert_eq!(h.call(fn_rows, &[h.area("B2:D3")]), num(2.0));
        assert_eq!(h.call(fn_columns, &[h.area("B2:D3")]), num(3.0));
        assert_eq!(h.call(fn_rows, &[h.cell_ref("B2")]), num(1.0));
    }

    #[test]
    fn test_index_cell() {
        let h = grid();
        let result = h.call(fn_index, &[h.area("B2:D3"), num(2.0), num(3.0)]);
        assert!(matches!(result, ValueEval::Ref(_)));
        assert_eq!(deref(result), num(6.0));
    }

    #[test]
    fn test_index_single_row_uses_column() {
        let h = grid();
        let result = h.call(fn_index, &[h.area("B2:D2"), num(2.0)]);
        assert!(matches!(result, ValueEval::Ref(_)));
        assert_eq!(deref(result), num(2.0));

        let result = h.call(fn_index, &[h.area("C2:C3"), num(2.0)]);
        assert!(matches!(result, ValueEval::Ref(_)));
        assert_eq!(deref(result), num(5.0));

        assert!(matches!(
            h.call(fn_index, &[h.area("B2:D2"), num(0.0)]),
            ValueEval::Area(_)
        ));
    }

    #[test]
    fn test_index_whole_row_and_column() {
        let h = grid();
        match h.call(fn_index, &[h.area("B2:D3"), num(0.0), num(2.0)]) {
            ValueEval::Area(a) => assert_eq!(a.range().to_a1_string(), "C2:C3"),
            other => panic!("expected area, got {:?}", other),
        }
        match h.call(fn_index, &[h.area("B2:D3"), num(2.0)]) {
            ValueEval::Area(a) => assert_eq!(a.range().to_a1_string(), "B3:D3"),
            other => panic!("expected area, got {:?}", other),
        }
    }

    #[test]
    fn test_index_errors() {
        let h = grid();
        assert_eq!(
            h.call(fn_index, &[h.area("B2:D3"), num(3.0), num(1.0)]),
            err(ErrorEval::REF_INVALID)
        );
        assert_eq!(
            h.call(fn_index, &[h.area("B2:D3"), num(-1.0), num(1.0)]),
            err(ErrorEval::VALUE_INVALID)
        );
        assert_eq!(h.call(fn_index, &[num(1.0), num(1.0)]), err(ErrorEval::VALUE_INVALID));
    }
}
