//! Text sections, where `@` stands for the value

use crate::formatter::render_literal;
use crate::lexer::Token;
use crate::value::FormatValue;

/// A compiled text section
#[derive(Debug, Clone, PartialEq)]
pub struct TextFormatter {
    tokens: Vec<Token>,
}

impl TextFormatter {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn format(&self, value: &FormatValue) -> String {
        let text = value.display_text();
        let mut out = String::new();
        for token in &self.tokens {
            if render_literal(token, &mut out) {
                continue;
            }
            match token {
                Token::Text => out.push_str(&text),
                Token::Digit(c) => out.push(*c),
                Token::Date { letter, len } => {
                    out.extend(std::iter::repeat(*letter).take(*len))
                }
                Token::AmPm(s) => out.push_str(s),
                Token::General => out.push_str(&text),
                _ => {}
            }
        }
        out
    }
}
