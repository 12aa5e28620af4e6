//! Tokenizer for the body of one format section

use crate::error::{FormatError, FormatResult};

/// One lexical element of a format specification
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Literal text: quoted, backslash-escaped, or a plain character
    Literal(String),
    /// `@`, the text value
    Text,
    /// Digit placeholder `0`, `#` or `?`
    Digit(char),
    /// `.`
    Point,
    /// `,`
    Comma,
    /// `%`
    Percent,
    /// `/`
    Slash,
    /// `E+`, `E-`, `e+` or `e-`
    Exponent { plus: bool, upper: bool },
    /// A run of one date letter (`y`, `m`, `d`, `h`, `s`), lowercased
    Date { letter: char, len: usize },
    /// `AM/PM` or `A/P` in any case, kept verbatim
    AmPm(String),
    /// `[h]`, `[mm]`, `[ss]`: a total-elapsed unit
    Elapsed { letter: char, len: usize },
    /// `_x`: a space as wide as `x`
    Skip(char),
    /// `*x`: repeat `x` to fill the cell
    Fill(char),
    /// `[$USD]`, `[$€-407]`: a currency symbol
    Currency(String),
    /// The `General` keyword
    General,
}

/// Split a section body into tokens
pub(crate) fn tokenize(spec: &str) -> FormatResult<Vec<Token>> {
    let chars: Vec<char> = spec.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let lower = c.to_ascii_lowercase();
        match c {
            '\\' if i + 1 < chars.len() => {
                tokens.push(Token::Literal(chars[i + 1].to_string()));
                i += 2;
            }
            '"' => {
                let (text, next) = read_quoted(&chars, i + 1, spec)?;
                tokens.push(Token::Literal(text));
                i = next;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|p| p + i)
                    .ok_or_else(|| FormatError::Unterminated {
                        what: "bracket",
                        format: spec.to_string(),
                    })?;
                let inner: String = chars[i + 1..close].iter().collect();
                tokens.push(bracket_token(&inner)?);
                i = close + 1;
            }
            '_' if i + 1 < chars.len() => {
                tokens.push(Token::Skip(chars[i + 1]));
                i += 2;
            }
            '*' if i + 1 < chars.len() => {
                tokens.push(Token::Fill(chars[i + 1]));
                i += 2;
            }
            '@' => {
                tokens.push(Token::Text);
                i += 1;
            }
            '0' | '#' | '?' => {
                tokens.push(Token::Digit(c));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Point);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            'e' | 'E' if matches!(chars.get(i + 1), Some('+') | Some('-')) => {
                tokens.push(Token::Exponent {
                    plus: chars[i + 1] == '+',
                    upper: c == 'E',
                });
                i += 2;
            }
            'g' | 'G' if starts_with_ignore_case(&chars[i..], "general") => {
                tokens.push(Token::General);
                i += "general".len();
            }
            'a' | 'A' if starts_with_ignore_case(&chars[i..], "am/pm") => {
                tokens.push(Token::AmPm(chars[i..i + 5].iter().collect()));
                i += 5;
            }
            'a' | 'A' if starts_with_ignore_case(&chars[i..], "a/p") => {
                tokens.push(Token::AmPm(chars[i..i + 3].iter().collect()));
                i += 3;
            }
            _ if matches!(lower, 'y' | 'm' | 'd' | 'h' | 's') => {
                let len = chars[i..]
                    .iter()
                    .take_while(|ch| ch.to_ascii_lowercase() == lower)
                    .count();
                tokens.push(Token::Date { letter: lower, len });
                i += len;
            }
            _ => {
                tokens.push(Token::Literal(c.to_string()));
                i += 1;
            }
        }
    }

    Ok(tokens)
}

fn read_quoted(chars: &[char], start: usize, spec: &str) -> FormatResult<(String, usize)> {
    let mut text = String::new();
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((text, i + 1)),
            '\\' if i + 1 < chars.len() => {
                text.push(chars[i + 1]);
                i += 2;
            }
            ch => {
                text.push(ch);
                i += 1;
            }
        }
    }
    Err(FormatError::Unterminated {
        what: "quoted string",
        format: spec.to_string(),
    })
}

fn bracket_token(inner: &str) -> FormatResult<Token> {
    let lower = inner.to_ascii_lowercase();
    if let Some(first) = lower.chars().next() {
        if matches!(first, 'h' | 'm' | 's') && lower.chars().all(|c| c == first) {
            return Ok(Token::Elapsed {
                letter: first,
                len: lower.len(),
            });
        }
    }

    if let Some(currency) = inner.strip_prefix('$') {
        let symbol = if currency.starts_with('-') {
            "$"
        } else {
            match currency.rfind('-') {
                Some(pos) => &currency[..pos],
                None => currency,
            }
        };
        return Ok(Token::Currency(symbol.to_string()));
    }

    Err(FormatError::UnsupportedBlock(format!("[{}]", inner)))
}

fn starts_with_ignore_case(chars: &[char], word: &str) -> bool {
    chars.len() >= word.len()
        && chars
            .iter()
            .zip(word.chars())
            .all(|(a, b)| a.to_ascii_lowercase() == b)
}

/// Split a whole format string on top-level `;`
pub(crate) fn split_sections(format: &str) -> FormatResult<Vec<String>> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut chars = format.chars();
    let mut in_quote = false;
    let mut in_bracket = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_quote => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            '"' => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            ';' if !in_quote && !in_bracket => {
                sections.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    if in_quote {
        return Err(FormatError::Unterminated {
            what: "quoted string",
            format: format.to_string(),
        });
    }
    sections.push(current);
    Ok(sections)
}
