//! Text functions

use super::{check_args, int_arg, scalar_arg, text_arg, value_of};
use crate::eval::{ErrorEval, EvalResult, OperandResolver, OperationContext, ValueEval};
use sheetcalc_format::{CellFormat, FormatOptions, FormatValue};

fn one_text(
    args: &[ValueEval],
    ctx: &OperationContext<'_>,
    f: impl FnOnce(String) -> ValueEval,
) -> ValueEval {
    let result = check_args(args, 1, 1).and_then(|_| text_arg(&args[0], ctx)).map(f);
    value_of(result)
}

/// LEN(text)
pub fn fn_len(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    one_text(args, ctx, |s| ValueEval::Number(s.chars().count() as f64))
}

/// LOWER(text)
pub fn fn_lower(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    one_text(args, ctx, |s| ValueEval::Text(s.to_lowercase()))
}

/// UPPER(text)
pub fn fn_upper(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    one_text(args, ctx, |s| ValueEval::Text(s.to_uppercase()))
}

/// TRIM(text) - strips outer spaces and collapses inner runs to one
pub fn fn_trim(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    one_text(args, ctx, |s| {
        let words: Vec<&str> = s.split(' ').filter(|w| !w.is_empty()).collect();
        ValueEval::Text(words.join(" "))
    })
}

fn char_count_arg(args: &[ValueEval], ctx: &OperationContext<'_>) -> EvalResult<usize> {
    let n = match args.get(1) {
        None | Some(ValueEval::MissingArg) => 1,
        Some(arg) => int_arg(arg, ctx)?,
    };
    usize::try_from(n).map_err(|_| ErrorEval::VALUE_INVALID)
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = check_args(args, 1, 2).and_then(|_| {
        let text = text_arg(&args[0], ctx)?;
        let n = char_count_arg(args, ctx)?;
        Ok(ValueEval::Text(text.chars().take(n).collect()))
    });
    value_of(result)
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = check_args(args, 1, 2).and_then(|_| {
        let text = text_arg(&args[0], ctx)?;
        let n = char_count_arg(args, ctx)?;
        let len = text.chars().count();
        Ok(ValueEval::Text(text.chars().skip(len.saturating_sub(n)).collect()))
    });
    value_of(result)
}

/// MID(text, start_num, num_chars) - start is 1-based
pub fn fn_mid(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = check_args(args, 3, 3).and_then(|_| {
        let text = text_arg(&args[0], ctx)?;
        let start = int_arg(&args[1], ctx)?;
        let len = int_arg(&args[2], ctx)?;
        if start < 1 || len < 0 {
            return Err(ErrorEval::VALUE_INVALID);
        }
        Ok(ValueEval::Text(
            text.chars().skip(start as usize - 1).take(len as usize).collect(),
        ))
    });
    value_of(result)
}

/// EXACT(text1, text2) - case-sensitive comparison
pub fn fn_exact(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = check_args(args, 2, 2).and_then(|_| {
        let a = text_arg(&args[0], ctx)?;
        let b = text_arg(&args[1], ctx)?;
        Ok(ValueEval::Bool(a == b))
    });
    value_of(result)
}

/// CONCATENATE(text1, [text2], ...)
pub fn fn_concatenate(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = args
        .iter()
        .map(|arg| text_arg(arg, ctx))
        .collect::<EvalResult<String>>();
    value_of(result.map(ValueEval::Text))
}

/// Parse text as VALUE does: plain numbers, thousands separators and a
/// trailing percent sign
fn parse_value_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let (body, scale) = match trimmed.strip_suffix('%') {
        Some(body) => (body.trim_end(), 0.01),
        None => (trimmed, 1.0),
    };
    let plain: String = body.chars().filter(|c| *c != ',').collect();
    OperandResolver::parse_double(&plain).map(|n| n * scale)
}

/// VALUE(text)
pub fn fn_value(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = check_args(args, 1, 1).and_then(|_| match scalar_arg(&args[0], ctx)? {
        ValueEval::Number(n) => Ok(ValueEval::Number(n)),
        ValueEval::Blank => Ok(ValueEval::Number(0.0)),
        ValueEval::Text(s) => parse_value_text(&s)
            .map(ValueEval::Number)
            .ok_or(ErrorEval::VALUE_INVALID),
        _ => Err(ErrorEval::VALUE_INVALID),
    });
    value_of(result)
}

/// TEXT(value, format_text) - renders through the cell-format engine
pub fn fn_text(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = check_args(args, 2, 2).and_then(|_| {
        let value = match scalar_arg(&args[0], ctx)? {
            ValueEval::Number(n) => FormatValue::Number(n),
            ValueEval::Bool(b) => FormatValue::Bool(b),
            ValueEval::Text(s) => match OperandResolver::parse_double(&s) {
                Some(n) => FormatValue::Number(n),
                None => FormatValue::Text(s),
            },
            _ => FormatValue::Number(0.0),
        };
        let format_text = text_arg(&args[1], ctx)?;
        let format = CellFormat::get_instance(&format_text).map_err(|e| {
            log::debug!("TEXT format rejected: {}", e);
            ErrorEval::VALUE_INVALID
        })?;
        let options = FormatOptions {
            date_system: ctx.options.date_system,
        };
        Ok(ValueEval::Text(format.apply_with(&value, &options).text))
    });
    value_of(result)
}
