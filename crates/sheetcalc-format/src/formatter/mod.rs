//! Per-type formatters
//!
//! A section body is classified into a [`CellFormatType`] and compiled into
//! the matching formatter. Formatters are immutable once built.

pub(crate) mod date;
pub(crate) mod elapsed;
pub mod fraction;
pub(crate) mod general;
pub(crate) mod number;
pub(crate) mod text;

use crate::error::FormatResult;
use crate::lexer::Token;
use crate::options::FormatOptions;
use crate::value::FormatValue;

pub use date::DateFormatter;
pub use elapsed::ElapsedFormatter;
pub use general::GeneralFormatter;
pub use number::NumberFormatter;
pub use text::TextFormatter;

/// Kind of a format section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellFormatType {
    General,
    Number,
    Date,
    Elapsed,
    Text,
}

impl CellFormatType {
    /// Whether a literal `ch` would be read as a format token in a section of
    /// this type, and so has to be escaped when written back out
    pub fn is_special(self, ch: char) -> bool {
        let always = matches!(ch, '"' | '\\' | '_' | '*' | '[' | '@' | ';');
        match self {
            CellFormatType::General => always,
            CellFormatType::Text => always,
            CellFormatType::Number => {
                always
                    || matches!(ch, '0' | '#' | '?' | '.' | ',' | '%' | '/' | 'e' | 'E')
                    || matches!(ch.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's')
            }
            CellFormatType::Date => always || ch == '0' || ch == '/' || ch.is_ascii_alphabetic(),
            CellFormatType::Elapsed => {
                always || ch == '0' || matches!(ch.to_ascii_lowercase(), 'h' | 'm' | 's')
            }
        }
    }

    /// Classify a tokenized section body
    ///
    /// `@` means text and a `d`/`y` token means date. A bracketed elapsed
    /// unit means elapsed. A `#`, `?` or currency tag means number. These
    /// are decided on first sight. `h`/`m`/`s` and `0` only mark a
    /// possibility: after the scan a possible date wins over a seen zero,
    /// and anything else is text.
    pub(crate) fn classify(tokens: &[Token]) -> CellFormatType {
        if tokens.is_empty() {
            return CellFormatType::General;
        }

        let mut could_be_date = false;
        let mut seen_zero = false;
        for token in tokens {
            match token {
                Token::General => return CellFormatType::General,
                Token::Text => return CellFormatType::Text,
                Token::Date { letter: 'd' | 'y', .. } => return CellFormatType::Date,
                Token::Date { .. } => could_be_date = true,
                Token::Elapsed { .. } => return CellFormatType::Elapsed,
                Token::Digit('0') => seen_zero = true,
                Token::Digit(_) | Token::Currency(_) => return CellFormatType::Number,
                _ => {}
            }
        }

        if could_be_date {
            CellFormatType::Date
        } else if seen_zero {
            CellFormatType::Number
        } else {
            CellFormatType::Text
        }
    }
}

/// A compiled section formatter
#[derive(Debug, Clone, PartialEq)]
pub enum CellFormatter {
    General(GeneralFormatter),
    Number(NumberFormatter),
    Date(DateFormatter),
    Elapsed(ElapsedFormatter),
    Text(TextFormatter),
}

impl CellFormatter {
    /// Compile `tokens` as a section of type `kind`
    pub(crate) fn build(
        kind: CellFormatType,
        tokens: Vec<Token>,
        source: &str,
    ) -> FormatResult<Self> {
        Ok(match kind {
            CellFormatType::General => CellFormatter::General(GeneralFormatter::new(tokens)),
            CellFormatType::Number => CellFormatter::Number(NumberFormatter::new(tokens, source)?),
            CellFormatType::Date => CellFormatter::Date(DateFormatter::new(tokens)),
            CellFormatType::Elapsed => {
                CellFormatter::Elapsed(ElapsedFormatter::new(tokens, source)?)
            }
            CellFormatType::Text => CellFormatter::Text(TextFormatter::new(tokens)),
        })
    }

    /// Render `value` with the full format
    pub fn format(&self, value: &FormatValue, options: &FormatOptions) -> String {
        match self {
            CellFormatter::General(f) => f.format(value),
            CellFormatter::Number(f) => match value {
                FormatValue::Number(n) => f.format(*n),
                other => other.display_text(),
            },
            CellFormatter::Date(f) => f.format(value, options),
            CellFormatter::Elapsed(f) => match value {
                FormatValue::Number(n) => f.format(*n),
                other => other.display_text(),
            },
            CellFormatter::Text(f) => f.format(value),
        }
    }

    /// Render `value` with a generic format of the same type, used when a
    /// section's condition does not accept the value
    pub fn simple_format(&self, value: &FormatValue, options: &FormatOptions) -> String {
        match self {
            CellFormatter::Date(_) => DateFormatter::simple().format(value, options),
            CellFormatter::Elapsed(f) => self_or_text(value, |n| f.format(n)),
            _ => value.display_text(),
        }
    }

    /// The type this formatter was compiled for
    pub fn format_type(&self) -> CellFormatType {
        match self {
            CellFormatter::General(_) => CellFormatType::General,
            CellFormatter::Number(_) => CellFormatType::Number,
            CellFormatter::Date(_) => CellFormatType::Date,
            CellFormatter::Elapsed(_) => CellFormatType::Elapsed,
            CellFormatter::Text(_) => CellFormatType::Text,
        }
    }

    /// Tokens the formatter was compiled from, used to print the section back
    pub(crate) fn tokens(&self) -> &[Token] {
        match self {
            CellFormatter::General(f) => f.tokens(),
            CellFormatter::Number(f) => f.tokens(),
            CellFormatter::Date(f) => f.tokens(),
            CellFormatter::Elapsed(f) => f.tokens(),
            CellFormatter::Text(f) => f.tokens(),
        }
    }
}

fn self_or_text(value: &FormatValue, f: impl Fn(f64) -> String) -> String {
    match value {
        FormatValue::Number(n) => f(*n),
        other => other.display_text(),
    }
}

/// Render one literal-like token the same way in every formatter
pub(crate) fn render_literal(token: &Token, out: &mut String) -> bool {
    match token {
        Token::Literal(s) | Token::Currency(s) => out.push_str(s),
        Token::Skip(_) => out.push(' '),
        Token::Fill(c) => out.push(*c),
        Token::Point => out.push('.'),
        Token::Comma => out.push(','),
        Token::Percent => out.push('%'),
        Token::Slash => out.push('/'),
        _ => return false,
    }
    true
}
