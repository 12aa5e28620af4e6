//! Number sections: fixed, scientific and fraction layouts

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{FormatError, FormatResult};
use crate::formatter::fraction::SimpleFraction;
use crate::formatter::general::format_general;
use crate::formatter::render_literal;
use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Int,
    Frac,
    Exp,
    Num,
    Den,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Fixed,
    Scientific,
    Fraction,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    Digit { region: Region, ch: char },
    DecimalPoint,
    ExpMarker { plus: bool, upper: bool },
    Slash,
    FixedDen(i64),
}

/// A compiled number section
#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormatter {
    tokens: Vec<Token>,
    pieces: Vec<Piece>,
    layout: Layout,
    grouping: bool,
    scale: f64,
}

/// Rendered text for each digit slot, per region
#[derive(Default)]
struct Filled {
    int: Vec<String>,
    frac: Vec<String>,
    exp: Vec<String>,
    num: Vec<String>,
    den: Vec<String>,
    /// Integer digits with nowhere to go, emitted at the decimal point
    loose_int: String,
    exponent: i32,
    blank_fraction: Option<bool>,
}

impl NumberFormatter {
    pub(crate) fn new(tokens: Vec<Token>, source: &str) -> FormatResult<Self> {
        let exp_at = tokens
            .iter()
            .position(|t| matches!(t, Token::Exponent { .. }));
        let slash_at = match exp_at {
            Some(_) => None,
            None => find_fraction_slash(&tokens),
        };
        let layout = match (exp_at, slash_at) {
            (Some(_), _) => Layout::Scientific,
            (None, Some(_)) => Layout::Fraction,
            (None, None) => Layout::Fixed,
        };

        let mantissa_end = exp_at.unwrap_or(tokens.len());
        let point_at = match layout {
            Layout::Fraction => None,
            _ => tokens[..mantissa_end].iter().position(|t| *t == Token::Point),
        };

        let mut regions: Vec<Option<Region>> = vec![None; tokens.len()];
        let mut fixed_den: Option<(usize, usize)> = None;
        match slash_at {
            Some(slash) => {
                let num_start = (0..slash)
                    .rev()
                    .take_while(|&j| matches!(tokens[j], Token::Digit(_)))
                    .last()
                    .unwrap_or(slash);
                let den_end = (slash + 1..tokens.len())
                    .take_while(|&j| matches!(tokens[j], Token::Digit(_)))
                    .last()
                    .map(|j| j + 1)
                    .unwrap_or(slash + 1);
                if den_end == slash + 1 {
                    let end = (slash + 1..tokens.len())
                        .take_while(|&j| is_digit_literal(&tokens[j]))
                        .last()
                        .map(|j| j + 1)
                        .unwrap_or(slash + 1);
                    fixed_den = Some((slash + 1, end));
                }
                for (j, token) in tokens.iter().enumerate() {
                    if !matches!(token, Token::Digit(_)) {
                        continue;
                    }
                    regions[j] = if j < num_start {
                        Some(Region::Int)
                    } else if j < slash {
                        Some(Region::Num)
                    } else if j < den_end {
                        Some(Region::Den)
                    } else {
                        None
                    };
                }
            }
            None => {
                for (j, token) in tokens.iter().enumerate() {
                    if !matches!(token, Token::Digit(_)) {
                        continue;
                    }
                    regions[j] = if j > mantissa_end {
                        Some(Region::Exp)
                    } else if point_at.map_or(false, |p| j > p) {
                        Some(Region::Frac)
                    } else {
                        Some(Region::Int)
                    };
                }
            }
        }

        let mut pieces = Vec::with_capacity(tokens.len());
        let mut grouping = false;
        let mut scale = 1.0;
        let mut j = 0;
        while j < tokens.len() {
            let token = &tokens[j];
            if let Some((start, end)) = fixed_den {
                if j == start && end > start {
                    let digits: String = tokens[start..end]
                        .iter()
                        .filter_map(|t| match t {
                            Token::Literal(s) => Some(s.as_str()),
                            _ => None,
                        })
                        .collect();
                    let den = digits
                        .parse::<i64>()
                        .ok()
                        .filter(|d| *d > 0)
                        .ok_or_else(|| {
                            FormatError::unrecognized(source, "invalid fraction denominator")
                        })?;
                    pieces.push(Piece::FixedDen(den));
                    j = end;
                    continue;
                }
            }

            match token {
                Token::Digit(ch) => pieces.push(match regions[j] {
                    Some(region) => Piece::Digit { region, ch: *ch },
                    None => Piece::Literal(ch.to_string()),
                }),
                Token::Point if Some(j) == point_at => pieces.push(Piece::DecimalPoint),
                Token::Slash if Some(j) == slash_at => pieces.push(Piece::Slash),
                Token::Exponent { plus, upper } => pieces.push(Piece::ExpMarker {
                    plus: *plus,
                    upper: *upper,
                }),
                Token::Percent => {
                    scale *= 100.0;
                    pieces.push(Piece::Literal("%".to_string()));
                }
                Token::Comma => {
                    let is_int = |k: usize| regions[k] == Some(Region::Int);
                    let before = (0..j).any(is_int);
                    let after = (j + 1..tokens.len()).any(is_int);
                    if before && after {
                        grouping = true;
                    } else if layout != Layout::Fraction && follows_digit(&tokens, j) {
                        scale /= 1000.0;
                    } else {
                        pieces.push(Piece::Literal(",".to_string()));
                    }
                }
                Token::AmPm(s) => pieces.push(Piece::Literal(s.clone())),
                other => {
                    let mut text = String::new();
                    render_literal(other, &mut text);
                    if !text.is_empty() {
                        pieces.push(Piece::Literal(text));
                    }
                }
            }
            j += 1;
        }

        Ok(Self {
            tokens,
            pieces,
            layout,
            grouping,
            scale,
        })
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Format a number
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return format_general(value);
        }
        if !self
            .pieces
            .iter()
            .any(|p| matches!(p, Piece::Digit { .. } | Piece::DecimalPoint))
        {
            let mut out = self.assemble(&Filled::default());
            out.push_str(&format_general(value));
            return out;
        }

        let scaled = value.abs() * self.scale;
        let filled = match self.layout {
            Layout::Fixed => self.fill_fixed(scaled),
            Layout::Scientific => self.fill_scientific(scaled),
            Layout::Fraction => match self.fill_fraction(scaled) {
                Ok(filled) => filled,
                Err(err) => {
                    log::debug!("fraction fallback for {}: {}", value, err);
                    return format_general(value);
                }
            },
        };

        let mut out = self.assemble(&filled);
        if value < 0.0 {
            out.insert(0, '-');
        }
        out
    }

    fn slots(&self, region: Region) -> Vec<char> {
        self.pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Digit { region: r, ch } if *r == region => Some(*ch),
                _ => None,
            })
            .collect()
    }

    fn fill_fixed(&self, value: f64) -> Filled {
        let int_slots = self.slots(Region::Int);
        let frac_slots = self.slots(Region::Frac);
        let fixed = round_fixed(value, frac_slots.len());
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
        let int_digits = if int_part == "0" { "" } else { int_part };

        Filled {
            int: fill_right_aligned(&int_slots, int_digits, self.grouping),
            frac: fill_decimals(&frac_slots, frac_part),
            loose_int: loose_digits(&int_slots, int_digits),
            ..Filled::default()
        }
    }

    fn fill_scientific(&self, value: f64) -> Filled {
        let int_slots = self.slots(Region::Int);
        let frac_slots = self.slots(Region::Frac);
        let exp_slots = self.slots(Region::Exp);
        let n_int = int_slots.len() as i32;
        let engineering = n_int > 1 && int_slots.contains(&'#');

        let mut exponent = 0;
        let mut fixed = round_fixed(0.0, frac_slots.len());
        if value != 0.0 {
            let sci = format!("{:e}", value);
            let (mantissa, e0) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
            let e0: i32 = e0.parse().unwrap_or(0);
            let mut e = e0;
            loop {
                exponent = if engineering {
                    e.div_euclid(n_int) * n_int
                } else {
                    e - (n_int - 1)
                };
                fixed = shift_and_round(mantissa, e0 - exponent, value, frac_slots.len());
                let int_len = fixed.split('.').next().map_or(0, str::len) as i32;
                if int_len > (e - exponent + 1).max(1) && e == e0 {
                    e += 1;
                    continue;
                }
                break;
            }
        }

        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
        let int_digits = if int_part == "0" { "" } else { int_part };
        let exp_text = exponent.abs().to_string();
        let exp_digits = if exp_text == "0" { "" } else { exp_text.as_str() };

        Filled {
            int: fill_right_aligned(&int_slots, int_digits, self.grouping),
            frac: fill_decimals(&frac_slots, frac_part),
            exp: fill_right_aligned(&exp_slots, exp_digits, false),
            loose_int: loose_digits(&int_slots, int_digits),
            exponent,
            ..Filled::default()
        }
    }

    fn fill_fraction(&self, value: f64) -> FormatResult<Filled> {
        let int_slots = self.slots(Region::Int);
        let num_slots = self.slots(Region::Num);
        let den_slots = self.slots(Region::Den);
        let has_whole = !int_slots.is_empty();

        let (mut whole, fraction_value) = if has_whole {
            (value.trunc() as i64, value.fract())
        } else {
            (0, value)
        };

        let fixed_den = self.pieces.iter().find_map(|p| match p {
            Piece::FixedDen(d) => Some(*d),
            _ => None,
        });
        let fraction = match fixed_den {
            Some(den) => SimpleFraction::build_fraction_exact_denominator(fraction_value, den),
            None => {
                let max_den = 10i64.pow(den_slots.len().clamp(1, 9) as u32) - 1;
                SimpleFraction::build_fraction_max_denominator(fraction_value, max_den)?
            }
        };

        let mut numerator = fraction.numerator;
        let denominator = fraction.denominator;
        if has_whole && numerator == denominator && numerator != 0 {
            whole += 1;
            numerator = 0;
        }

        let blank_fraction = if numerator == 0 && !num_slots.contains(&'0') {
            let spaced = num_slots
                .iter()
                .chain(den_slots.iter())
                .any(|c| *c == '?');
            Some(spaced)
        } else {
            None
        };

        let whole_text = whole.to_string();
        let whole_digits = if whole == 0 {
            if numerator == 0 { "0" } else { "" }
        } else {
            whole_text.as_str()
        };

        Ok(Filled {
            int: fill_right_aligned(&int_slots, whole_digits, self.grouping),
            num: fill_right_aligned(&num_slots, &numerator.to_string(), false),
            den: fill_left_aligned(&den_slots, &denominator.to_string()),
            blank_fraction,
            ..Filled::default()
        })
    }

    fn assemble(&self, filled: &Filled) -> String {
        let mut int = filled.int.iter();
        let mut frac = filled.frac.iter();
        let mut exp = filled.exp.iter();
        let mut num = filled.num.iter();
        let mut den = filled.den.iter();

        let mut out = String::new();
        for piece in &self.pieces {
            let rendered: String = match piece {
                Piece::Literal(s) => s.clone(),
                Piece::Digit { region, .. } => {
                    let next = match region {
                        Region::Int => int.next(),
                        Region::Frac => frac.next(),
                        Region::Exp => exp.next(),
                        Region::Num => num.next(),
                        Region::Den => den.next(),
                    };
                    let text = next.cloned().unwrap_or_default();
                    if matches!(region, Region::Num | Region::Den) {
                        blank(text, filled.blank_fraction)
                    } else {
                        text
                    }
                }
                Piece::DecimalPoint => format!("{}.", filled.loose_int),
                Piece::ExpMarker { plus, upper } => {
                    let mut s = String::from(if *upper { "E" } else { "e" });
                    if filled.exponent < 0 {
                        s.push('-');
                    } else if *plus {
                        s.push('+');
                    }
                    s
                }
                Piece::Slash => blank("/".to_string(), filled.blank_fraction),
                Piece::FixedDen(d) => blank(d.to_string(), filled.blank_fraction),
            };
            out.push_str(&rendered);
        }
        out
    }
}

fn blank(text: String, mode: Option<bool>) -> String {
    match mode {
        Some(true) => " ".repeat(text.chars().count()),
        Some(false) => String::new(),
        None => text,
    }
}

fn is_digit_literal(token: &Token) -> bool {
    matches!(token, Token::Literal(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
}

fn find_fraction_slash(tokens: &[Token]) -> Option<usize> {
    tokens.iter().enumerate().find_map(|(i, t)| {
        let numerator_before = i > 0 && matches!(tokens[i - 1], Token::Digit(_));
        let denominator_after = tokens
            .get(i + 1)
            .map_or(false, |n| matches!(n, Token::Digit(_)) || is_digit_literal(n));
        (*t == Token::Slash && numerator_before && denominator_after).then_some(i)
    })
}

/// A comma that trails digit placeholders divides the value by a thousand
fn follows_digit(tokens: &[Token], at: usize) -> bool {
    let prev = tokens[..at].iter().rev().find(|t| **t != Token::Comma);
    let next = tokens[at + 1..].iter().find(|t| **t != Token::Comma);
    matches!(prev, Some(Token::Digit(_))) && !matches!(next, Some(Token::Digit(_)))
}

/// Round half away from zero to exactly `decimals` places
fn round_fixed(value: f64, decimals: usize) -> String {
    match Decimal::from_str(&value.to_string()) {
        Ok(d) => {
            let rounded =
                d.round_dp_with_strategy(decimals.min(28) as u32, RoundingStrategy::MidpointAwayFromZero);
            pad_decimals(rounded.to_string(), decimals)
        }
        Err(_) => format!("{:.*}", decimals, value),
    }
}

/// Move the decimal point of `mantissa` right by `shift` places and round
fn shift_and_round(mantissa: &str, shift: i32, value: f64, decimals: usize) -> String {
    match Decimal::from_scientific(&format!("{}e{}", mantissa, shift)) {
        Ok(d) => {
            let rounded =
                d.round_dp_with_strategy(decimals.min(28) as u32, RoundingStrategy::MidpointAwayFromZero);
            pad_decimals(rounded.to_string(), decimals)
        }
        Err(_) => round_fixed(value * 10f64.powi(shift - mantissa_exponent(value)), decimals),
    }
}

/// Right-pad the fraction of a plain decimal string to `decimals` digits
///
/// A `Decimal` holds at most 28 places and its `Display` cannot widen past
/// its own capacity, so the padding is done on the text.
fn pad_decimals(text: String, decimals: usize) -> String {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (text, String::new()),
    };
    if decimals == 0 {
        return int_part;
    }
    let mut frac: String = frac_part.chars().take(decimals).collect();
    while frac.len() < decimals {
        frac.push('0');
    }
    format!("{}.{}", int_part, frac)
}

fn mantissa_exponent(value: f64) -> i32 {
    format!("{:e}", value)
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0)
}

/// Digits that must be emitted at the decimal point when there is no
/// integer slot to hold them
fn loose_digits(slots: &[char], digits: &str) -> String {
    if slots.is_empty() {
        digits.to_string()
    } else {
        String::new()
    }
}

/// Fill slots right to left; the leftmost slot absorbs overflow digits
fn fill_right_aligned(slots: &[char], digits: &str, grouping: bool) -> Vec<String> {
    let digits: Vec<char> = digits.chars().rev().collect();
    let mut outputs = vec![String::new(); slots.len()];
    let mut emitted = 0usize;

    for (k, slot) in (0..slots.len()).rev().enumerate() {
        let taken: &[char] = if slot == 0 {
            digits.get(k..).unwrap_or(&[])
        } else {
            digits.get(k..k + 1).unwrap_or(&[])
        };

        let mut rev = String::new();
        let fill;
        let taken = if taken.is_empty() {
            fill = match slots[slot] {
                '0' => vec!['0'],
                '?' => {
                    rev.push(' ');
                    Vec::new()
                }
                _ => Vec::new(),
            };
            fill.as_slice()
        } else {
            taken
        };
        for d in taken {
            if grouping && emitted > 0 && emitted % 3 == 0 {
                rev.push(',');
            }
            rev.push(*d);
            emitted += 1;
        }
        outputs[slot] = rev.chars().rev().collect();
    }
    outputs
}

/// Fill slots left to right; the last slot absorbs overflow digits
fn fill_left_aligned(slots: &[char], digits: &str) -> Vec<String> {
    let digits: Vec<char> = digits.chars().collect();
    let last = slots.len().saturating_sub(1);
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let taken: String = if i == last {
                digits.get(i..).map(|d| d.iter().collect()).unwrap_or_default()
            } else {
                digits.get(i).map(|d| d.to_string()).unwrap_or_default()
            };
            if taken.is_empty() {
                match slot {
                    '0' => "0".to_string(),
                    '?' => " ".to_string(),
                    _ => String::new(),
                }
            } else {
                taken
            }
        })
        .collect()
}

/// Decimal digits; trailing zeros in `#` slots vanish and in `?` slots turn to spaces
fn fill_decimals(slots: &[char], digits: &str) -> Vec<String> {
    let digits: Vec<char> = digits.chars().collect();
    let mut outputs: Vec<String> = slots
        .iter()
        .enumerate()
        .map(|(i, _)| digits.get(i).map(|d| d.to_string()).unwrap_or_default())
        .collect();

    for i in (0..slots.len()).rev() {
        if digits.get(i) != Some(&'0') || slots[i] == '0' {
            break;
        }
        outputs[i] = if slots[i] == '?' {
            " ".to_string()
        } else {
            String::new()
        };
    }
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn fmt(spec: &str, value: f64) -> String {
        NumberFormatter::new(tokenize(spec).unwrap(), spec)
            .unwrap()
            .format(value)
    }

    #[test]
    fn test_fixed_layouts() {
        assert_eq!(fmt("#,##0.00", 1234.5), "1,234.50");
        assert_eq!(fmt("#,##0", 1234567.0), "1,234,567");
        assert_eq!(fmt("0", 2.5), "3");
        assert_eq!(fmt("0.00", -2.345), "-2.35");
        assert_eq!(fmt("000", 7.0), "007");
        assert_eq!(fmt("#", 0.0), "");
        assert_eq!(fmt("#.##", 3.1), "3.1");
        assert_eq!(fmt("0.0?", 3.1), "3.1 ");
        assert_eq!(fmt(".00", 12.5), "12.50");
        assert_eq!(fmt("000-0000", 5551234.0), "555-1234");
    }

    #[test]
    fn test_wide_fractions_past_decimal_capacity() {
        assert_eq!(
            fmt("0.0000000000000000", 1e16),
            "10000000000000000.0000000000000000"
        );
        let wide = "0000000000000000000000000000.0000000000000000000000";
        for value in [-2.5e15, 1e16] {
            let shown = fmt(wide, value);
            let (int_part, frac_part) = shown.split_once('.').unwrap();
            assert_eq!(frac_part, "0".repeat(22));
            assert!(int_part.ends_with(&format!("{}", value.abs() as i64)));
        }
        assert_eq!(pad_decimals("1.5".to_string(), 3), "1.500");
        assert_eq!(pad_decimals("7".to_string(), 0), "7");
    }

    #[test]
    fn test_percent_and_scaling() {
        assert_eq!(fmt("0.00%", 0.5), "50.00%");
        assert_eq!(fmt("0%", 0.123), "12%");
        assert_eq!(fmt("#,##0,", 1234567.0), "1,235");
        assert_eq!(fmt("0.0,,", 2500000.0), "2.5");
    }

    #[test]
    fn test_literals_and_currency() {
        assert_eq!(fmt("\"$\"#,##0.00", 12.0), "$12.00");
        assert_eq!(fmt("[$€-407]0.00", 3.0), "€3.00");
        assert_eq!(fmt("0.00_)", 1.0), "1.00 ");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(fmt("0.00E+00", 12345.0), "1.23E+04");
        assert_eq!(fmt("0.00E+00", 0.00012345), "1.23E-04");
        assert_eq!(fmt("0.0E+0", 0.0), "0.0E+0");
        assert_eq!(fmt("0.0E+00", 9.99), "1.0E+01");
        assert_eq!(fmt("##0.0E+0", 12345.0), "12.3E+3");
        assert_eq!(fmt("0.00e-00", 12345.0), "1.23e04");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(fmt("# ?/?", 2.5), "2 1/2");
        assert_eq!(fmt("# ?/?", 0.5), " 1/2");
        assert_eq!(fmt("?/?", 2.5), "5/2");
        assert_eq!(fmt("# ??/??", 3.1234), "3 10/81");
        assert_eq!(fmt("# ?/4", 1.3), "1 1/4");
        assert_eq!(fmt("# ?/?", 3.0), "3    ");
        assert_eq!(fmt("# #/#", 3.0), "3 ");
        assert_eq!(fmt("# ?/?", -1.5), "-1 1/2");
    }
}
