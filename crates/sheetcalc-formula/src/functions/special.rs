//! Functions that need more than plain argument values
//!
//! IF and CHOOSE are normally short-circuited by the evaluator through
//! attribute tokens; the versions here run when a token stream calls them
//! directly. OFFSET and INDIRECT build new references, and EXTERNAL
//! dispatches to add-in functions by name.

use super::SpecialForm;
use crate::eval::{
    AreaEval, ErrorEval, EvalResult, OperandResolver, OperationContext, RefEval, ValueEval,
};
use lazy_regex::regex_captures;
use sheetcalc_core::{CellAddress, CellRangeAddress};

/// Run a special form against already-evaluated arguments
pub fn evaluate(form: SpecialForm, args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = match form {
        SpecialForm::If => if_func(args, ctx),
        SpecialForm::Choose => choose(args, ctx),
        SpecialForm::Offset => offset(args, ctx),
        SpecialForm::Indirect => indirect(args, ctx),
        SpecialForm::External => return external(args, ctx),
    };
    super::value_of(result)
}

fn branch(arg: &ValueEval) -> ValueEval {
    match arg {
        ValueEval::MissingArg => ValueEval::Blank,
        other => other.clone(),
    }
}

/// IF(logical_test, [value_if_true], [value_if_false])
fn if_func(args: &[ValueEval], ctx: &OperationContext<'_>) -> EvalResult<ValueEval> {
    super::check_args(args, 2, 3)?;
    let condition = super::scalar_arg(&args[0], ctx)?;
    let condition = ctx
        .checked(OperandResolver::coerce_value_to_boolean(&condition, false))?
        .unwrap_or(false);
    Ok(match (condition, args.get(2)) {
        (true, _) => branch(&args[1]),
        (false, Some(otherwise)) => branch(otherwise),
        (false, None) => ValueEval::FALSE,
    })
}

/// CHOOSE(index_num, value1, [value2], ...)
fn choose(args: &[ValueEval], ctx: &OperationContext<'_>) -> EvalResult<ValueEval> {
    if args.len() < 2 {
        return Err(ErrorEval::VALUE_INVALID);
    }
    let index = super::int_arg(&args[0], ctx)?;
    match usize::try_from(index) {
        Ok(k) if k >= 1 && k < args.len() => Ok(branch(&args[k])),
        _ => Err(ErrorEval::VALUE_INVALID),
    }
}

/// OFFSET(reference, rows, cols, [height], [width])
fn offset(args: &[ValueEval], ctx: &OperationContext<'_>) -> EvalResult<ValueEval> {
    super::check_args(args, 3, 5)?;
    let base = match &args[0] {
        ValueEval::Area(a) => a.clone(),
        ValueEval::Ref(r) => r.to_area(),
        ValueEval::Error(e) => return Err(*e),
        _ => return Err(ErrorEval::VALUE_INVALID),
    };

    let rows = offset_arg(args.get(1), ctx)?.unwrap_or(0);
    let cols = offset_arg(args.get(2), ctx)?.unwrap_or(0);
    let height = offset_arg(args.get(3), ctx)?.unwrap_or(base.height() as i64);
    let width = offset_arg(args.get(4), ctx)?.unwrap_or(base.width() as i64);
    if height == 0 || width == 0 {
        return Err(ErrorEval::REF_INVALID);
    }

    let (first_row, last_row) = span(rows, height);
    let (first_col, last_col) = span(cols, width);
    let moved = base.offset_within(ctx.options.version, first_row, last_row, first_col, last_col)?;
    Ok(ValueEval::Area(moved))
}

/// Relative first/last index of a span of `length` cells starting at `start`;
/// a negative length extends towards lower indexes
fn span(start: i64, length: i64) -> (i64, i64) {
    if length > 0 {
        (start, start + length - 1)
    } else {
        (start + length + 1, start)
    }
}

fn offset_arg(arg: Option<&ValueEval>, ctx: &OperationContext<'_>) -> EvalResult<Option<i64>> {
    match arg {
        None | Some(ValueEval::MissingArg) => Ok(None),
        Some(arg) => Ok(Some(super::int_arg(arg, ctx)? as i64)),
    }
}

/// INDIRECT(ref_text, [a1])
fn indirect(args: &[ValueEval], ctx: &OperationContext<'_>) -> EvalResult<ValueEval> {
    super::check_args(args, 1, 2)?;
    let text = super::text_arg(&args[0], ctx)?;
    let a1 = match args.get(1) {
        None | Some(ValueEval::MissingArg) => true,
        Some(arg) => {
            let value = super::scalar_arg(arg, ctx)?;
            ctx.checked(OperandResolver::coerce_value_to_boolean(&value, false))?
                .unwrap_or(false)
        }
    };

    let (sheet, reference) = split_sheet(text.trim());
    let sheet = match sheet {
        Some(name) => ctx.workbook.sheet_index(&name).ok_or(ErrorEval::REF_INVALID)?,
        None => ctx.sheet(),
    };

    let range = if a1 {
        CellRangeAddress::parse_with(reference, ctx.options.version).ok()
    } else {
        parse_r1c1(reference, ctx)
    };
    let range = range.ok_or_else(|| {
        log::debug!("INDIRECT could not resolve '{}'", text);
        ErrorEval::REF_INVALID
    })?;

    Ok(if range.height() == 1 && range.width() == 1 {
        ValueEval::Ref(RefEval::new(sheet, range.first_row(), range.first_column(), ctx.source()))
    } else {
        ValueEval::Area(AreaEval::new(sheet, range, ctx.source()))
    })
}

/// Split `Sheet!A1` or `'My Sheet'!A1` into sheet name and reference
fn split_sheet(text: &str) -> (Option<String>, &str) {
    let Some(bang) = text.rfind('!') else {
        return (None, text);
    };
    let (sheet, reference) = (&text[..bang], &text[bang + 1..]);
    let sheet = match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => sheet.to_string(),
    };
    (Some(sheet), reference)
}

fn parse_r1c1(text: &str, ctx: &OperationContext<'_>) -> Option<CellRangeAddress> {
    let (start, end) = match text.split_once(':') {
        Some((a, b)) => (a, b),
        None => (text, text),
    };
    let first = r1c1_cell(start, ctx)?;
    let last = r1c1_cell(end, ctx)?;
    Some(CellRangeAddress::new(first.row, last.row, first.col, last.col))
}

/// `R2C3`, `R[-1]C[2]` and `RC` style cell, relative parts measured from
/// the formula cell
fn r1c1_cell(text: &str, ctx: &OperationContext<'_>) -> Option<CellAddress> {
    let (_, row, col) = regex_captures!(r"^[Rr](\[-?\d+\]|\d*)[Cc](\[-?\d+\]|\d*)$", text)?;
    let row = r1c1_part(row, ctx.row())?;
    let col = r1c1_part(col, ctx.col())?;
    Some(CellAddress::new(row, col))
}

fn r1c1_part(part: &str, current: u32) -> Option<u32> {
    if part.is_empty() {
        return Some(current);
    }
    if let Some(relative) = part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
        let delta: i64 = relative.parse().ok()?;
        return u32::try_from(current as i64 + delta).ok();
    }
    let absolute: u32 = part.parse().ok()?;
    absolute.checked_sub(1)
}

/// EXTERNAL: first argument names an add-in function
fn external(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let Some((ValueEval::FunctionName(name), rest)) = args.split_first() else {
        return ValueEval::Error(ErrorEval::NAME_INVALID);
    };
    match ctx.registry.find_udf(name) {
        Some(function) => function(rest, ctx),
        None => {
            log::debug!("no add-in function registered as {}", name);
            ValueEval::Error(ErrorEval::NAME_INVALID)
        }
    }
}
