//! Date and time-of-day sections

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::formatter::render_literal;
use crate::lexer::Token;
use crate::options::{DateSystem, FormatOptions};
use crate::value::FormatValue;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Largest serial rendered as a date, 9999-12-31 in the 1900 system
const MAX_SERIAL: f64 = 2_958_465.0;

/// Text shown for values that cannot be a date
pub(crate) fn invalid_date() -> String {
    "#".repeat(255)
}

/// Serial number of a date-time in the given date system
pub(crate) fn to_serial(dt: &NaiveDateTime, system: DateSystem) -> f64 {
    let (y, m, d) = match system {
        DateSystem::Excel1904 => (1904, 1, 1),
        DateSystem::Excel1900 if (dt.year(), dt.month()) < (1900, 3) => (1899, 12, 31),
        DateSystem::Excel1900 => (1899, 12, 30),
    };
    match NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(0, 0, 0)) {
        Some(base) => (*dt - base).num_milliseconds() as f64 / 86_400_000.0,
        None => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DatePiece {
    Literal(String),
    Year(usize),
    Month(usize),
    Day(usize),
    Hour(usize),
    Minute(usize),
    Second(usize),
    FracSecond(usize),
    AmPm(String),
}

/// Broken-down calendar fields of one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateParts {
    year: i32,
    month: u32,
    day: u32,
    /// 0 is Sunday
    weekday: u32,
    hour: u32,
    minute: u32,
    second: u32,
    /// Fractional second in units of 10^-precision
    fraction: u64,
}

/// A compiled date section
#[derive(Debug, Clone, PartialEq)]
pub struct DateFormatter {
    tokens: Vec<Token>,
    pieces: Vec<DatePiece>,
    twelve_hour: bool,
    sec_decimals: usize,
}

impl DateFormatter {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        let twelve_hour = tokens.iter().any(|t| matches!(t, Token::AmPm(_)));
        let mut pieces: Vec<DatePiece> = Vec::with_capacity(tokens.len());
        let mut sec_decimals = 0;

        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Date { letter, len } => {
                    let len = *len;
                    pieces.push(match letter {
                        'y' => DatePiece::Year(len),
                        'd' => DatePiece::Day(len),
                        'h' => DatePiece::Hour(len),
                        's' => DatePiece::Second(len),
                        _ if is_minute(&pieces, &tokens[i + 1..]) => DatePiece::Minute(len),
                        _ => DatePiece::Month(len),
                    });
                }
                Token::Point
                    if matches!(pieces.last(), Some(DatePiece::Second(_)))
                        && tokens.get(i + 1) == Some(&Token::Digit('0')) =>
                {
                    let zeros = tokens[i + 1..]
                        .iter()
                        .take_while(|t| **t == Token::Digit('0'))
                        .count();
                    sec_decimals = zeros;
                    pieces.push(DatePiece::FracSecond(zeros));
                    i += zeros;
                }
                Token::AmPm(s) => pieces.push(DatePiece::AmPm(s.clone())),
                Token::Digit(c) => pieces.push(DatePiece::Literal(c.to_string())),
                Token::Text => pieces.push(DatePiece::Literal("@".to_string())),
                other => {
                    let mut text = String::new();
                    render_literal(other, &mut text);
                    pieces.push(DatePiece::Literal(text));
                }
            }
            i += 1;
        }

        Self {
            tokens,
            pieces,
            twelve_hour,
            sec_decimals,
        }
    }

    /// The generic `mm/d/y` date format
    pub fn simple() -> Self {
        Self::new(vec![
            Token::Date { letter: 'm', len: 2 },
            Token::Slash,
            Token::Date { letter: 'd', len: 1 },
            Token::Slash,
            Token::Date { letter: 'y', len: 1 },
        ])
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Format a serial number, a date-time or, for other values, their text
    pub fn format(&self, value: &FormatValue, options: &FormatOptions) -> String {
        let parts = match value {
            FormatValue::Number(n) => self.parts_from_serial(*n, options.date_system),
            FormatValue::Date(dt) => Some(self.parts_from_datetime(dt)),
            other => return other.display_text(),
        };
        match parts {
            Some(parts) => self.render(&parts),
            None => invalid_date(),
        }
    }

    fn precision(&self) -> u64 {
        10u64.pow(self.sec_decimals.min(9) as u32)
    }

    fn parts_from_serial(&self, serial: f64, system: DateSystem) -> Option<DateParts> {
        if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
            return None;
        }

        let precision = self.precision();
        let ticks_per_day = 86_400 * precision;
        let ticks = (serial * ticks_per_day as f64).round() as u64;
        let days = (ticks / ticks_per_day) as i64;
        let in_day = ticks % ticks_per_day;
        let secs = in_day / precision;

        let (year, month, day, weekday) = match system {
            DateSystem::Excel1900 if days == 60 => (1900, 2, 29, 3),
            DateSystem::Excel1900 => {
                let (y, m, d) = if days < 60 { (1899, 12, 31) } else { (1899, 12, 30) };
                calendar(NaiveDate::from_ymd_opt(y, m, d)?, days)?
            }
            DateSystem::Excel1904 => calendar(NaiveDate::from_ymd_opt(1904, 1, 1)?, days)?,
        };

        Some(DateParts {
            year,
            month,
            day,
            weekday,
            hour: (secs / 3600) as u32,
            minute: ((secs / 60) % 60) as u32,
            second: (secs % 60) as u32,
            fraction: in_day % precision,
        })
    }

    fn parts_from_datetime(&self, dt: &NaiveDateTime) -> DateParts {
        let precision = self.precision();
        let nanos_per_tick = 1_000_000_000 / precision;
        let mut fraction = ((dt.nanosecond() as u64 + nanos_per_tick / 2) / nanos_per_tick).min(precision);
        let mut dt = *dt;
        if fraction == precision {
            dt += Duration::seconds(1);
            fraction = 0;
        }
        DateParts {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            weekday: dt.weekday().num_days_from_sunday(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            fraction,
        }
    }

    fn render(&self, parts: &DateParts) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                DatePiece::Literal(s) => out.push_str(s),
                DatePiece::Year(len) if *len <= 2 => {
                    out.push_str(&format!("{:02}", parts.year.rem_euclid(100)))
                }
                DatePiece::Year(_) => out.push_str(&format!("{:04}", parts.year)),
                DatePiece::Month(len) => {
                    let name = MONTHS[(parts.month as usize + 11) % 12];
                    match len {
                        1 => out.push_str(&parts.month.to_string()),
                        2 => out.push_str(&format!("{:02}", parts.month)),
                        3 => out.push_str(&name[..3]),
                        4 => out.push_str(name),
                        _ => out.push_str(&name[..1]),
                    }
                }
                DatePiece::Day(len) => {
                    let name = WEEKDAYS[parts.weekday as usize % 7];
                    match len {
                        1 => out.push_str(&parts.day.to_string()),
                        2 => out.push_str(&format!("{:02}", parts.day)),
                        3 => out.push_str(&name[..3]),
                        _ => out.push_str(name),
                    }
                }
                DatePiece::Hour(len) => {
                    let hour = if self.twelve_hour {
                        match parts.hour % 12 {
                            0 => 12,
                            h => h,
                        }
                    } else {
                        parts.hour
                    };
                    push_padded(&mut out, hour, *len);
                }
                DatePiece::Minute(len) => push_padded(&mut out, parts.minute, *len),
                DatePiece::Second(len) => push_padded(&mut out, parts.second, *len),
                DatePiece::FracSecond(n) => {
                    out.push('.');
                    out.push_str(&format!("{:0width$}", parts.fraction, width = *n));
                }
                DatePiece::AmPm(marker) => out.push_str(&am_pm(marker, parts.hour >= 12)),
            }
        }
        out
    }
}

/// `m` means minutes right after an hour or right before a second
fn is_minute(previous: &[DatePiece], rest: &[Token]) -> bool {
    let after_hour = previous
        .iter()
        .rev()
        .find(|p| !matches!(p, DatePiece::Literal(_)))
        .map_or(false, |p| matches!(p, DatePiece::Hour(_)));
    let before_second = rest
        .iter()
        .find(|t| matches!(t, Token::Date { .. } | Token::AmPm(_)))
        .map_or(false, |t| matches!(t, Token::Date { letter: 's', .. }));
    after_hour || before_second
}

fn calendar(base: NaiveDate, days: i64) -> Option<(i32, u32, u32, u32)> {
    let date = base.checked_add_signed(Duration::days(days))?;
    Some((
        date.year(),
        date.month(),
        date.day(),
        date.weekday().num_days_from_sunday(),
    ))
}

fn push_padded(out: &mut String, value: u32, len: usize) {
    if len >= 2 {
        out.push_str(&format!("{:02}", value));
    } else {
        out.push_str(&value.to_string());
    }
}

fn am_pm(marker: &str, pm: bool) -> String {
    let mut chars = marker.chars();
    let first = chars.next().unwrap_or('A');
    let second = chars.next().unwrap_or('/');
    if marker.len() >= 5 {
        let upper = first.is_ascii_uppercase() || second == 'm';
        match (upper, pm) {
            (true, true) => "PM".to_string(),
            (true, false) => "AM".to_string(),
            (false, true) => "pm".to_string(),
            (false, false) => "am".to_string(),
        }
    } else {
        let letter = if pm { 'p' } else { 'a' };
        if first.is_ascii_uppercase() {
            letter.to_ascii_uppercase().to_string()
        } else {
            letter.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn fmt_with(spec: &str, value: f64, options: FormatOptions) -> String {
        DateFormatter::new(tokenize(spec).unwrap()).format(&FormatValue::Number(value), &options)
    }

    fn fmt(spec: &str, value: f64) -> String {
        fmt_with(spec, value, FormatOptions::default())
    }

    #[test]
    fn test_1904_epoch() {
        assert_eq!(fmt("yyyy-mm-dd", 2.0), "1904-01-03");
        assert_eq!(fmt("yy/m/d", 0.0), "04/1/1");
    }

    #[test]
    fn test_1900_epoch_leap_bug() {
        let opts = FormatOptions::excel1900();
        assert_eq!(fmt_with("yyyy-mm-dd", 1.0, opts), "1900-01-01");
        assert_eq!(fmt_with("yyyy-mm-dd", 59.0, opts), "1900-02-28");
        assert_eq!(fmt_with("yyyy-mm-dd", 60.0, opts), "1900-02-29");
        assert_eq!(fmt_with("yyyy-mm-dd", 61.0, opts), "1900-03-01");
        assert_eq!(
            fmt_with("dddd, mmmm d, yyyy", 45000.0, opts),
            "Wednesday, March 15, 2023"
        );
        assert_eq!(fmt_with("ddd mmm mmmmm", 45000.0, opts), "Wed Mar M");
    }

    #[test]
    fn test_minutes_versus_months() {
        assert_eq!(fmt("h:mm", 0.75), "18:00");
        assert_eq!(fmt("mm:ss", 65.0 / 86400.0), "01:05");
        assert_eq!(fmt("mm/dd", 31.0), "02/01");
    }

    #[test]
    fn test_am_pm() {
        assert_eq!(fmt("h:mm AM/PM", 0.75), "6:00 PM");
        assert_eq!(fmt("hh:mm am/pm", 0.25), "06:00 AM");
        assert_eq!(fmt("h A/P", 0.0), "12 A");
        assert_eq!(fmt("h a/p", 0.5), "12 p");
    }

    #[test]
    fn test_fractional_seconds() {
        assert_eq!(fmt("mm:ss.00", 65.25 / 86400.0), "01:05.25");
        assert_eq!(fmt("h:mm:ss", 0.4999), "11:59:51");
        assert_eq!(fmt("h:mm:ss", 0.49999999), "12:00:00");
    }

    #[test]
    fn test_invalid_and_non_numeric() {
        assert_eq!(fmt("yyyy", -1.0), "#".repeat(255));
        let f = DateFormatter::new(tokenize("yyyy").unwrap());
        assert_eq!(f.format(&"text".into(), &FormatOptions::default()), "text");
    }

    #[test]
    fn test_to_serial() {
        let dt = NaiveDate::from_ymd_opt(2023, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(to_serial(&dt, DateSystem::Excel1900), 45000.5);
        let epoch = NaiveDate::from_ymd_opt(1904, 1, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(to_serial(&epoch, DateSystem::Excel1904), 2.0);
    }

    #[test]
    fn test_datetime_values() {
        let dt = NaiveDate::from_ymd_opt(2024, 7, 4)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        let f = DateFormatter::new(tokenize("yyyy-mm-dd hh:mm:ss").unwrap());
        assert_eq!(
            f.format(&dt.into(), &FormatOptions::default()),
            "2024-07-04 13:05:09"
        );
        assert_eq!(
            DateFormatter::simple().format(&dt.into(), &FormatOptions::default()),
            "07/4/24"
        );
    }
}
