//! Date functions

use crate::eval::{ErrorEval, EvalResult, OperationContext, ValueEval};
use chrono::{Duration, Months, NaiveDate};
use sheetcalc_format::DateSystem;

/// DATE(year, month, day)
///
/// Years below 1900 are offset by 1900. Months and days outside their
/// usual range roll over into neighbouring years and months.
pub fn fn_date(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    super::number_of(date(args, ctx))
}

fn date(args: &[ValueEval], ctx: &OperationContext<'_>) -> EvalResult<f64> {
    super::check_args(args, 3, 3)?;
    let year = super::int_arg(&args[0], ctx)?;
    let month = super::int_arg(&args[1], ctx)?;
    let day = super::int_arg(&args[2], ctx)?;
    date_serial(year, month, day, ctx.options.date_system)
}

/// Serial number of a (possibly denormalised) date in `system`
pub fn date_serial(year: i32, month: i32, day: i32, system: DateSystem) -> EvalResult<f64> {
    if year < 0 {
        return Err(ErrorEval::NUM_ERROR);
    }
    let year = if year < 1900 { year + 1900 } else { year };
    if year > 9999 {
        return Err(ErrorEval::NUM_ERROR);
    }

    // The 1900 system counts the nonexistent 29 February 1900
    if system == DateSystem::Excel1900 && year == 1900 && month == 2 && day == 29 {
        return Ok(60.0);
    }

    let date = normalise(year, month, day).ok_or(ErrorEval::NUM_ERROR)?;
    let serial = match system {
        DateSystem::Excel1900 => {
            let leap_bug = NaiveDate::from_ymd_opt(1900, 3, 1).ok_or(ErrorEval::NUM_ERROR)?;
            let epoch = if date >= leap_bug {
                NaiveDate::from_ymd_opt(1899, 12, 30)
            } else {
                NaiveDate::from_ymd_opt(1899, 12, 31)
            };
            days_since(date, epoch)?
        }
        DateSystem::Excel1904 => days_since(date, NaiveDate::from_ymd_opt(1904, 1, 1))?,
    };

    if serial < 0 {
        return Err(ErrorEval::NUM_ERROR);
    }
    Ok(serial as f64)
}

fn days_since(date: NaiveDate, epoch: Option<NaiveDate>) -> EvalResult<i64> {
    let epoch = epoch.ok_or(ErrorEval::NUM_ERROR)?;
    Ok(date.signed_duration_since(epoch).num_days())
}

fn normalise(year: i32, month: i32, day: i32) -> Option<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let months = month - 1;
    let shifted = if months >= 0 {
        start.checked_add_months(Months::new(months as u32))?
    } else {
        start.checked_sub_months(Months::new(months.unsigned_abs()))?
    };
    shifted.checked_add_signed(Duration::days(day as i64 - 1))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{err, num, Harness};
    use super::*;
    use pretty_assertions::assert_eq;

    fn serial(y: i32, m: i32, d: i32) -> EvalResult<f64> {
        date_serial(y, m, d, DateSystem::Excel1900)
    }

    #[test]
    fn test_known_serials() {
        assert_eq!(serial(1900, 1, 1), Ok(1.0));
        assert_eq!(serial(1900, 2, 28), Ok(59.0));
        assert_eq!(serial(1900, 2, 29), Ok(60.0));
        assert_eq!(serial(1900, 3, 1), Ok(61.0));
        assert_eq!(serial(2023, 3, 15), Ok(45000.0));
    }

    #[test]
    fn test_rollover() {
        assert_eq!(serial(2023, 14, 1), serial(2024, 2, 1));
        assert_eq!(serial(2024, 1, 0), serial(2023, 12, 31));
        assert_eq!(serial(2024, 0, 1), serial(2023, 12, 1));
        assert_eq!(serial(2023, 12, 31), Ok(45291.0));
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(serial(99, 1, 1), serial(1999, 1, 1));
        assert_eq!(serial(-1, 1, 1), Err(ErrorEval::NUM_ERROR));
        assert_eq!(serial(10000, 1, 1), Err(ErrorEval::NUM_ERROR));
    }

    #[test]
    fn test_1904_system() {
        assert_eq!(date_serial(1904, 1, 1, DateSystem::Excel1904), Ok(0.0));
        assert_eq!(date_serial(1904, 1, 2, DateSystem::Excel1904), Ok(1.0));
        assert_eq!(
            date_serial(1903, 12, 31, DateSystem::Excel1904),
            Err(ErrorEval::NUM_ERROR)
        );
    }

    #[test]
    fn test_fn_date() {
        let h = Harness::empty();
        assert_eq!(h.call(fn_date, &[num(2023.0), num(3.0), num(15.0)]), num(45000.0));
        assert_eq!(
            h.call(fn_date, &["x".into(), num(3.0), num(15.0)]),
            err(ErrorEval::VALUE_INVALID)
        );
        assert_eq!(h.call(fn_date, &[num(2023.0)]), err(ErrorEval::VALUE_INVALID));
    }
}
