//! Elapsed-time sections such as `[h]:mm:ss`

use crate::error::{FormatError, FormatResult};
use crate::formatter::render_literal;
use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Unit {
    Hour,
    Minute,
    Second,
}

impl Unit {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'h' => Some(Unit::Hour),
            'm' => Some(Unit::Minute),
            's' => Some(Unit::Second),
            _ => None,
        }
    }

    fn seconds(self) -> u64 {
        match self {
            Unit::Hour => 3600,
            Unit::Minute => 60,
            Unit::Second => 1,
        }
    }

    fn modulus(self) -> u64 {
        match self {
            Unit::Hour => 24,
            Unit::Minute | Unit::Second => 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ElapsedPiece {
    Literal(String),
    Unit { unit: Unit, len: usize, topmost: bool },
    Fraction(usize),
}

/// A compiled elapsed-time section
#[derive(Debug, Clone, PartialEq)]
pub struct ElapsedFormatter {
    tokens: Vec<Token>,
    pieces: Vec<ElapsedPiece>,
}

impl ElapsedFormatter {
    pub(crate) fn new(tokens: Vec<Token>, source: &str) -> FormatResult<Self> {
        let bracketed = tokens
            .iter()
            .filter(|t| matches!(t, Token::Elapsed { .. }))
            .count();
        if bracketed > 1 {
            return Err(FormatError::DuplicateElapsed(source.to_string()));
        }

        let mut pieces = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Elapsed { letter, len } | Token::Date { letter, len } => {
                    let topmost = matches!(tokens[i], Token::Elapsed { .. });
                    match Unit::from_letter(*letter) {
                        Some(unit) => pieces.push(ElapsedPiece::Unit {
                            unit,
                            len: *len,
                            topmost,
                        }),
                        None => {
                            return Err(FormatError::unrecognized(
                                source,
                                format!("'{}' in an elapsed-time format", letter),
                            ))
                        }
                    }
                }
                Token::Point if tokens.get(i + 1) == Some(&Token::Digit('0')) => {
                    let zeros = tokens[i + 1..]
                        .iter()
                        .take_while(|t| **t == Token::Digit('0'))
                        .count();
                    pieces.push(ElapsedPiece::Fraction(zeros));
                    i += zeros;
                }
                other => {
                    let mut text = String::new();
                    if !render_literal(other, &mut text) {
                        if let Token::Digit(c) = other {
                            text.push(*c);
                        }
                    }
                    pieces.push(ElapsedPiece::Literal(text));
                }
            }
            i += 1;
        }

        Ok(Self { tokens, pieces })
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn fraction_digits(&self) -> Option<usize> {
        self.pieces.iter().find_map(|p| match p {
            ElapsedPiece::Fraction(n) => Some((*n).min(9)),
            _ => None,
        })
    }

    fn finest_unit(&self) -> Unit {
        self.pieces
            .iter()
            .filter_map(|p| match p {
                ElapsedPiece::Unit { unit, .. } => Some(*unit),
                _ => None,
            })
            .max()
            .unwrap_or(Unit::Second)
    }

    /// Format a duration given in days
    pub fn format(&self, value: f64) -> String {
        let elapsed = value.abs();

        let (ticks_per_second, ticks_per_unit) = match self.fraction_digits() {
            Some(n) => (10u64.pow(n as u32), 1u64),
            None => (1, self.finest_unit().seconds()),
        };
        let seconds = elapsed * 86_400.0;
        let total = match self.fraction_digits() {
            Some(_) => (seconds * ticks_per_second as f64).round() as u64,
            None => ((seconds / ticks_per_unit as f64) + 1e-9).floor() as u64 * ticks_per_unit,
        };

        let mut out = String::new();
        if value < 0.0 {
            out.push('-');
        }
        for piece in &self.pieces {
            match piece {
                ElapsedPiece::Literal(s) => out.push_str(s),
                ElapsedPiece::Unit { unit, len, topmost } => {
                    let mut amount = total / (unit.seconds() * ticks_per_second);
                    if !topmost {
                        amount %= unit.modulus();
                    }
                    out.push_str(&format!("{:0width$}", amount, width = *len));
                }
                ElapsedPiece::Fraction(n) => {
                    out.push('.');
                    out.push_str(&format!("{:0width$}", total % ticks_per_second, width = *n));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn fmt(spec: &str, value: f64) -> String {
        ElapsedFormatter::new(tokenize(spec).unwrap(), spec)
            .unwrap()
            .format(value)
    }

    #[test]
    fn test_topmost_unit_does_not_wrap() {
        assert_eq!(fmt("[h]:mm:ss", 1.5), "36:00:00");
        assert_eq!(fmt("[mm]:ss", 0.5 / 24.0), "30:00");
        assert_eq!(fmt("[h]:mm", 25.0 / 24.0 + 5.0 / 1440.0), "25:05");
    }

    #[test]
    fn test_fractional_seconds() {
        assert_eq!(fmt("[s].00", 1.5 / 86400.0), "1.50");
        assert_eq!(fmt("[m]:ss.0", 61.3 / 86400.0), "1:01.3");
    }

    #[test]
    fn test_negative_duration() {
        assert_eq!(fmt("[h]:mm", -0.25), "-6:00");
    }

    #[test]
    fn test_duplicate_brackets_rejected() {
        let tokens = tokenize("[h]:[mm]").unwrap();
        assert!(matches!(
            ElapsedFormatter::new(tokens, "[h]:[mm]"),
            Err(FormatError::DuplicateElapsed(_))
        ));
    }
}
