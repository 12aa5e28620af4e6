//! Math functions

use super::{check_args, number_arg, number_of};
use crate::eval::{ErrorEval, EvalResult, OperandResolver, OperationContext, ValueEval};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use std::str::FromStr;

/// Every number an aggregate should see
///
/// Numbers, booleans and numeric text count when passed directly. Inside
/// references only numbers count. Errors anywhere propagate.
pub(crate) fn collect_numbers(args: &[ValueEval]) -> EvalResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            ValueEval::Area(area) => {
                for value in area.values() {
                    referenced_number(&value, &mut numbers)?;
                }
            }
            ValueEval::Ref(r) => {
                for sheet in r.first_sheet_index()..=r.last_sheet_index() {
                    referenced_number(&r.inner_value(sheet), &mut numbers)?;
                }
            }
            ValueEval::Number(n) => numbers.push(*n),
            ValueEval::Bool(b) => numbers.push(if *b { 1.0 } else { 0.0 }),
            ValueEval::Text(s) => {
                numbers.push(OperandResolver::parse_double(s).ok_or(ErrorEval::VALUE_INVALID)?)
            }
            ValueEval::Error(e) => return Err(*e),
            ValueEval::Blank | ValueEval::MissingArg => {}
            ValueEval::FunctionName(_) => return Err(ErrorEval::VALUE_INVALID),
        }
    }
    Ok(numbers)
}

fn referenced_number(value: &ValueEval, numbers: &mut Vec<f64>) -> EvalResult<()> {
    match value {
        ValueEval::Number(n) => numbers.push(*n),
        ValueEval::Error(e) => return Err(*e),
        _ => {}
    }
    Ok(())
}

/// Every cell value behind the arguments, references expanded
fn flatten(args: &[ValueEval]) -> Vec<(ValueEval, bool)> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            ValueEval::Area(area) => values.extend(area.values().map(|v| (v, true))),
            ValueEval::Ref(r) => values.extend(
                (r.first_sheet_index()..=r.last_sheet_index()).map(|s| (r.inner_value(s), true)),
            ),
            other => values.push((other.clone(), false)),
        }
    }
    values
}

fn unary(
    args: &[ValueEval],
    ctx: &OperationContext<'_>,
    f: impl FnOnce(f64) -> EvalResult<f64>,
) -> ValueEval {
    let result = check_args(args, 1, 1)
        .and_then(|_| number_arg(&args[0], ctx))
        .and_then(f);
    number_of(result)
}

/// Sum starting from +0, so an empty list totals 0 rather than -0
fn total(numbers: &[f64]) -> f64 {
    numbers.iter().fold(0.0, |acc, n| acc + n)
}

/// SUM(number1, [number2], ...)
pub fn fn_sum(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    number_of(collect_numbers(args).map(|n| total(&n)))
}

/// AVERAGE(number1, [number2], ...) - `#DIV/0!` when there are no numbers
pub fn fn_average(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    let result = collect_numbers(args).and_then(|n| {
        if n.is_empty() {
            Err(ErrorEval::DIV_ZERO)
        } else {
            Ok(total(&n) / n.len() as f64)
        }
    });
    number_of(result)
}

/// MIN(number1, [number2], ...) - 0 when there are no numbers
pub fn fn_min(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    number_of(collect_numbers(args).map(|n| n.into_iter().reduce(f64::min).unwrap_or(0.0)))
}

/// MAX(number1, [number2], ...) - 0 when there are no numbers
pub fn fn_max(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    number_of(collect_numbers(args).map(|n| n.into_iter().reduce(f64::max).unwrap_or(0.0)))
}

/// PRODUCT(number1, [number2], ...)
pub fn fn_product(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    let result = collect_numbers(args).map(|n| {
        if n.is_empty() {
            0.0
        } else {
            n.iter().product()
        }
    });
    number_of(result)
}

/// COUNT(value1, [value2], ...) - counts numbers, errors are skipped
pub fn fn_count(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    let count = flatten(args)
        .into_iter()
        .filter(|(value, referenced)| match value {
            ValueEval::Number(_) => true,
            ValueEval::Bool(_) => !referenced,
            ValueEval::Text(s) => !referenced && OperandResolver::parse_double(s).is_some(),
            _ => false,
        })
        .count();
    ValueEval::Number(count as f64)
}

/// COUNTA(value1, [value2], ...) - counts non-empty values
pub fn fn_counta(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    let count = flatten(args)
        .into_iter()
        .filter(|(value, _)| !value.is_blank())
        .count();
    ValueEval::Number(count as f64)
}

/// COUNTBLANK(range) - empty cells and cells holding ""
pub fn fn_countblank(args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    if args.len() != 1 || !args[0].is_reference() {
        return ValueEval::Error(ErrorEval::VALUE_INVALID);
    }
    let count = flatten(args)
        .into_iter()
        .filter(|(value, _)| match value {
            ValueEval::Blank => true,
            ValueEval::Text(s) => s.is_empty(),
            _ => false,
        })
        .count();
    ValueEval::Number(count as f64)
}

/// ABS(number)
pub fn fn_abs(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    unary(args, ctx, |n| Ok(n.abs()))
}

/// INT(number) - rounds down to the nearest integer
pub fn fn_int(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    unary(args, ctx, |n| Ok(n.floor()))
}

/// SIGN(number)
pub fn fn_sign(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    unary(args, ctx, |n| {
        Ok(if n > 0.0 {
            1.0
        } else if n < 0.0 {
            -1.0
        } else {
            0.0
        })
    })
}

/// SQRT(number)
pub fn fn_sqrt(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    unary(args, ctx, |n| {
        if n < 0.0 {
            Err(ErrorEval::NUM_ERROR)
        } else {
            Ok(n.sqrt())
        }
    })
}

/// EXP(number)
pub fn fn_exp(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    unary(args, ctx, |n| Ok(n.exp()))
}

/// LN(number)
pub fn fn_ln(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    unary(args, ctx, |n| {
        if n <= 0.0 {
            Err(ErrorEval::NUM_ERROR)
        } else {
            Ok(n.ln())
        }
    })
}

/// LOG10(number)
pub fn fn_log10(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    unary(args, ctx, |n| {
        if n <= 0.0 {
            Err(ErrorEval::NUM_ERROR)
        } else {
            Ok(n.log10())
        }
    })
}

fn binary(
    args: &[ValueEval],
    ctx: &OperationContext<'_>,
    f: impl FnOnce(f64, f64) -> EvalResult<f64>,
) -> ValueEval {
    let result = check_args(args, 2, 2).and_then(|_| {
        let a = number_arg(&args[0], ctx)?;
        let b = number_arg(&args[1], ctx)?;
        f(a, b)
    });
    number_of(result)
}

/// MOD(number, divisor) - the result takes the sign of the divisor
pub fn fn_mod(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    binary(args, ctx, |n, d| {
        if d == 0.0 {
            return Err(ErrorEval::DIV_ZERO);
        }
        Ok(n - d * (n / d).floor())
    })
}

/// POWER(number, power)
pub fn fn_power(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    binary(args, ctx, |n, p| Ok(n.powf(p)))
}

/// PI()
pub fn fn_pi(_args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    ValueEval::Number(std::f64::consts::PI)
}

/// RAND() - uniform in [0, 1)
pub fn fn_rand(_args: &[ValueEval], _ctx: &OperationContext<'_>) -> ValueEval {
    ValueEval::Number(rand::thread_rng().gen::<f64>())
}

/// Round `number` to `digits` decimal places (negative digits round to the
/// left of the point)
pub(crate) fn round_to(number: f64, digits: i32, strategy: RoundingStrategy) -> f64 {
    if !number.is_finite() {
        return number;
    }
    let Ok(value) = Decimal::from_str(&number.to_string()) else {
        return round_binary(number, digits, strategy);
    };
    let rounded = if digits >= 0 {
        value.round_dp_with_strategy(digits.min(28) as u32, strategy)
    } else {
        let places = -digits;
        if places > 27 {
            return 0.0;
        }
        let factor = Decimal::from_i128_with_scale(10i128.pow(places as u32), 0);
        (value / factor).round_dp_with_strategy(0, strategy) * factor
    };
    rounded.to_string().parse::<f64>().unwrap_or(number)
}

/// Fallback for magnitudes outside the decimal range
fn round_binary(number: f64, digits: i32, strategy: RoundingStrategy) -> f64 {
    let multiplier = 10_f64.powi(digits);
    let scaled = number * multiplier;
    let rounded = match strategy {
        RoundingStrategy::AwayFromZero => scaled.abs().ceil() * scaled.signum(),
        RoundingStrategy::ToZero => scaled.trunc(),
        _ => scaled.round(),
    };
    rounded / multiplier
}

fn rounding(args: &[ValueEval], ctx: &OperationContext<'_>, strategy: RoundingStrategy) -> ValueEval {
    binary(args, ctx, |n, d| Ok(round_to(n, d as i32, strategy)))
}

/// ROUND(number, num_digits) - halves round away from zero
pub fn fn_round(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    rounding(args, ctx, RoundingStrategy::MidpointAwayFromZero)
}

/// ROUNDUP(number, num_digits)
pub fn fn_roundup(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    rounding(args, ctx, RoundingStrategy::AwayFromZero)
}

/// ROUNDDOWN(number, num_digits)
pub fn fn_rounddown(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    rounding(args, ctx, RoundingStrategy::ToZero)
}

/// TRUNC(number, [num_digits])
pub fn fn_trunc(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    let result = check_args(args, 1, 2).and_then(|_| {
        let n = number_arg(&args[0], ctx)?;
        let digits = match args.get(1) {
            Some(d) => number_arg(d, ctx)? as i32,
            None => 0,
        };
        Ok(round_to(n, digits, RoundingStrategy::ToZero))
    });
    number_of(result)
}
