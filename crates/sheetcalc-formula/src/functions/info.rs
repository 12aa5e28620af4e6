//! Information functions

use crate::eval::{ErrorEval, OperationContext, ValueEval};
use sheetcalc_core::ErrorCode;

/// Resolve the single argument of an IS* function, keeping errors as values
fn inspected(args: &[ValueEval], ctx: &OperationContext<'_>) -> Option<ValueEval> {
    let [arg] = args else {
        return None;
    };
    Some(
        super::scalar_arg(arg, ctx).unwrap_or_else(ValueEval::Error),
    )
}

fn is(args: &[ValueEval], ctx: &OperationContext<'_>, test: impl FnOnce(&ValueEval) -> bool) -> ValueEval {
    match inspected(args, ctx) {
        Some(value) => ValueEval::Bool(test(&value)),
        None => ValueEval::Error(ErrorEval::VALUE_INVALID),
    }
}

/// ISNA(value)
pub fn fn_isna(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    is(args, ctx, |v| matches!(v, ValueEval::Error(e) if e.code() == ErrorCode::Na))
}

/// ISERROR(value)
pub fn fn_iserror(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    is(args, ctx, ValueEval::is_error)
}

/// ISERR(value) - any error except #N/A
pub fn fn_iserr(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    is(args, ctx, |v| matches!(v, ValueEval::Error(e) if e.code() != ErrorCode::Na))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    is(args, ctx, |v| matches!(v, ValueEval::Text(_)))
}

/// ISNONTEXT(value)
pub fn fn_isnontext(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    is(args, ctx, |v| !matches!(v, ValueEval::Text(_)))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    is(args, ctx, |v| matches!(v, ValueEval::Number(_)))
}

/// ISBLANK(value)
pub fn fn_isblank(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    is(args, ctx, ValueEval::is_blank)
}

/// ISLOGICAL(value)
pub fn fn_islogical(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    is(args, ctx, |v| matches!(v, ValueEval::Bool(_)))
}

/// ISREF(value) - looks at the unresolved argument
pub fn fn_isref(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    match args {
        [arg] => ValueEval::Bool(arg.is_reference()),
        _ => ValueEval::Error(ErrorEval::VALUE_INVALID),
    }
}

/// NA()
pub fn fn_na(_args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    ValueEval::Error(ErrorEval::NA)
}

/// ERROR.TYPE(error_val) - 1 for #NULL! through 7 for #N/A
pub fn fn_error_type(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    match inspected(args, ctx) {
        Some(ValueEval::Error(e)) => match e.code().type_number() {
            Some(n) => ValueEval::Number(n as f64),
            None => ValueEval::Error(ErrorEval::NA),
        },
        Some(_) => ValueEval::Error(ErrorEval::NA),
        None => ValueEval::Error(ErrorEval::VALUE_INVALID),
    }
}
