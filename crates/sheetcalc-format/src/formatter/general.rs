//! The `General` format

use crate::formatter::render_literal;
use crate::lexer::Token;
use crate::value::FormatValue;

/// Render a number the way the `General` format does
///
/// Magnitudes above 10^10 or below 10^-9 use scientific notation with five
/// fractional digits; other non-integers get up to nine decimals. Trailing
/// zeros are dropped in both cases.
pub(crate) fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let exp = value.abs().log10();
    if exp > 10.0 || exp < -9.0 {
        let formatted = format!("{:.5e}", value);
        let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}E{}{:02}",
            strip_fraction_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else if value.fract() != 0.0 {
        strip_fraction_zeros(&format!("{:.9}", value)).to_string()
    } else {
        format!("{:.0}", value)
    }
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// A `General` section, possibly wrapped in literal text
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralFormatter {
    tokens: Vec<Token>,
}

impl GeneralFormatter {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// A bare `General` formatter
    pub fn plain() -> Self {
        Self { tokens: Vec::new() }
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn format(&self, value: &FormatValue) -> String {
        let body = value.display_text();
        if !self.tokens.iter().any(|t| *t == Token::General) {
            return body;
        }

        let mut out = String::new();
        for token in &self.tokens {
            if *token == Token::General {
                out.push_str(&body);
            } else if !render_literal(token, &mut out) {
                if let Token::Digit(c) = token {
                    out.push(*c);
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

    #[test]
    fn test_format_general() {
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(42.0), "42");
        assert_eq!(format_general(-7.0), "-7");
        assert_eq!(format_general(3.5), "3.5");
        assert_eq!(format_general(1.0 / 3.0), "0.333333333");
        assert_eq!(format_general(123456789012.0), "1.23457E+11");
        assert_eq!(format_general(1e15), "1E+15");
        assert_eq!(format_general(0.00000000012), "1.2E-10");
    }

    #[test]
    fn test_general_with_affixes() {
        let f = GeneralFormatter::new(tokenize("\"Qty: \"General\" pcs\"").unwrap());
        assert_eq!(f.format(&FormatValue::Number(12.0)), "Qty: 12 pcs");
        assert_eq!(GeneralFormatter::plain().format(&"abc".into()), "abc");
        assert_eq!(GeneralFormatter::plain().format(&true.into()), "TRUE");
    }
}
