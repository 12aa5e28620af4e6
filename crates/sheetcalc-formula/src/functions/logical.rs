//! Logical functions
//!
//! IF and CHOOSE live in [`special`](super::special) because the evaluator
//! controls which of their arguments get evaluated.

use super::{check_args, scalar_arg, value_of};
use crate::eval::{ErrorEval, EvalResult, OperandResolver, OperationContext, ValueEval};

/// Booleans found in the arguments of AND/OR
///
/// Text inside references is skipped; text passed directly must read
/// TRUE or FALSE. `#VALUE!` when nothing boolean was found.
fn collect_booleans(args: &[ValueEval], ctx: &OperationContext<'_>) -> EvalResult<Vec<bool>> {
    let mut found = Vec::new();
    for arg in args {
        match arg {
            ValueEval::Area(area) => {
                for value in area.values() {
                    found.extend(ctx.checked(OperandResolver::coerce_value_to_boolean(&value, true))?);
                }
            }
            ValueEval::Ref(r) => {
                for sheet in r.first_sheet_index()..=r.last_sheet_index() {
                    found.extend(ctx.checked(OperandResolver::coerce_value_to_boolean(&r.inner_value(sheet), true))?);
                }
            }
            ValueEval::MissingArg => {}
            other => found.extend(ctx.checked(OperandResolver::coerce_value_to_boolean(other, false))?),
        }
    }
    if found.is_empty() {
        return Err(ErrorEval::VALUE_INVALID);
    }
    Ok(found)
}

/// AND(logical1, [logical2], ...)
pub fn fn_and(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    value_of(collect_booleans(args, ctx).map(|b| ValueEval::Bool(b.iter().all(|x| *x))))
}

/// OR(logical1, [logical2], ...)
pub fn fn_or(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    value_of(collect_booleans(args, ctx).map(|b| ValueEval::Bool(b.iter().any(|x| *x))))
}

/// NOT(logical) - blank counts as FALSE
pub fn fn_not(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = check_args(args, 1, 1).and_then(|_| {
        let value = scalar_arg(&args[0], ctx)?;
        let b = ctx.checked(OperandResolver::coerce_value_to_boolean(&value, false))?.unwrap_or(false);
        Ok(ValueEval::Bool(!b))
    });
    value_of(result)
}

/// TRUE()
pub fn fn_true(_args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    ValueEval::TRUE
}

/// FALSE()
pub fn fn_false(_args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    ValueEval::FALSE
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{err, Harness};
    use super::*;
    use crate::eval::InMemoryWorkbook;
    use pretty_assertions::assert_eq;

    fn sheet() -> Harness {
        let mut wb = InMemoryWorkbook::with_default_sheet();
        wb.set_cell(0, "A1", true).unwrap();
        wb.set_cell(0, "A2", "text").unwrap();
        wb.set_cell(0, "A3", 0.0).unwrap();
        wb.set_cell(0, "B1", "only text").unwrap();
        Harness::new(wb)
    }

    #[test]
    fn test_and_or_over_ranges() {
        let h = sheet();
        assert_eq!(h.call(fn_and, &[h.area("A1:A3")]), ValueEval::FALSE);
        assert_eq!(h.call(fn_or, &[h.area("A1:A3")]), ValueEval::TRUE);
        assert_eq!(h.call(fn_and, &[h.area("A1:A2")]), ValueEval::TRUE);
    }

    #[test]
    fn test_and_needs_a_boolean() {
        let h = sheet();
        assert_eq!(h.call(fn_and, &[h.area("B1:B2")]), err(ErrorEval::VALUE_INVALID));
        assert_eq!(h.call(fn_or, &["maybe".into()]), err(ErrorEval::VALUE_INVALID));
        assert_eq!(h.call(fn_or, &["true".into(), ValueEval::MissingArg]), ValueEval::TRUE);
    }

    #[test]
    fn test_and_propagates_errors() {
        let h = sheet();
        assert_eq!(
            h.call(fn_and, &[true.into(), ErrorEval::DIV_ZERO.into()]),
            err(ErrorEval::DIV_ZERO)
        );
    }

    #[test]
    fn test_not() {
        let h = sheet();
        assert_eq!(h.call(fn_not, &[1.0.into()]), ValueEval::FALSE);
        assert_eq!(h.call(fn_not, &[h.cell_ref("Z9")]), ValueEval::TRUE);
        assert_eq!(h.call(fn_not, &["x".into()]), err(ErrorEval::VALUE_INVALID));
    }

    #[test]
    fn test_constants() {
        let h = Harness::empty();
        assert_eq!(h.call(fn_true, &[]), ValueEval::TRUE);
        assert_eq!(h.call(fn_false, &[]), ValueEval::FALSE);
    }
}
