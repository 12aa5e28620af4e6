//! One `;`-separated section of a format, with its colour and condition

use std::fmt;

use lazy_regex::regex_captures;
use sheetcalc_core::Color;

use crate::condition::CellFormatCondition;
use crate::error::FormatResult;
use crate::formatter::{CellFormatType, CellFormatter, TextFormatter};
use crate::lexer::{tokenize, Token};
use crate::options::FormatOptions;
use crate::value::FormatValue;

const NAMED_COLORS: [(&str, Color); 8] = [
    ("black", Color::BLACK),
    ("white", Color::WHITE),
    ("red", Color::RED),
    ("green", Color::GREEN),
    ("blue", Color::BLUE),
    ("yellow", Color::YELLOW),
    ("magenta", Color::MAGENTA),
    ("cyan", Color::CYAN),
];

/// Result of applying a format to a value
#[derive(Debug, Clone, PartialEq)]
pub struct CellFormatResult {
    /// Whether the section's condition accepted the value
    pub applies: bool,
    /// Rendered text
    pub text: String,
    /// Colour the text should be shown in, if the section names one
    pub text_color: Option<Color>,
}

/// One section of a cell format
#[derive(Debug, Clone, PartialEq)]
pub struct CellFormatPart {
    color: Option<Color>,
    condition: Option<CellFormatCondition>,
    formatter: CellFormatter,
}

impl CellFormatPart {
    /// Parse a section, including any leading `[colour]`, `[condition]` and
    /// `[$-locale]` blocks
    pub fn new(desc: &str) -> FormatResult<Self> {
        let mut color = None;
        let mut condition = None;
        let mut rest = desc;

        while let Some(inner) = rest.strip_prefix('[') {
            let Some(close) = inner.find(']') else {
                break;
            };
            let block = &inner[..close];
            if let Some(named) = parse_color(block) {
                color = named;
            } else if let Some((_, op, constant)) =
                regex_captures!(r"^\s*(<=|>=|<>|!=|==|<|>|=)\s*([^\s]+)\s*$", block)
            {
                condition = Some(CellFormatCondition::new(op, constant)?);
            } else if is_locale(block) {
                log::trace!("ignoring locale block [{}]", block);
            } else {
                break;
            }
            rest = &inner[close + 1..];
        }

        let tokens = tokenize(rest)?;
        let kind = CellFormatType::classify(&tokens);
        let formatter = CellFormatter::build(kind, tokens, desc)?;
        Ok(Self {
            color,
            condition,
            formatter,
        })
    }

    /// An empty text section, which renders nothing
    pub(crate) fn empty_text() -> Self {
        Self {
            color: None,
            condition: None,
            formatter: CellFormatter::Text(TextFormatter::new(Vec::new())),
        }
    }

    /// The `@` section used when a format has no text section of its own
    pub(crate) fn default_text() -> Self {
        Self {
            color: None,
            condition: None,
            formatter: CellFormatter::Text(TextFormatter::new(vec![Token::Text])),
        }
    }

    /// A bare `General` section
    pub(crate) fn general() -> Self {
        Self {
            color: None,
            condition: None,
            formatter: CellFormatter::General(crate::formatter::GeneralFormatter::plain()),
        }
    }

    /// Whether this section accepts `value`; non-numbers always pass
    pub fn applies(&self, value: &FormatValue) -> bool {
        match (&self.condition, value) {
            (Some(condition), FormatValue::Number(n)) => condition.pass(*n),
            _ => true,
        }
    }

    /// Format `value`, falling back to a plain rendering without colour when
    /// the condition rejects it
    pub fn apply(&self, value: &FormatValue, options: &FormatOptions) -> CellFormatResult {
        if self.applies(value) {
            CellFormatResult {
                applies: true,
                text: self.formatter.format(value, options),
                text_color: self.color,
            }
        } else {
            CellFormatResult {
                applies: false,
                text: self.formatter.simple_format(value, options),
                text_color: None,
            }
        }
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn condition(&self) -> Option<&CellFormatCondition> {
        self.condition.as_ref()
    }

    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    pub fn format_type(&self) -> CellFormatType {
        self.formatter.format_type()
    }

    pub fn formatter(&self) -> &CellFormatter {
        &self.formatter
    }
}

/// `Some(colour)` for a colour block, `Some(None)` for an out-of-range
/// `ColorN`, `None` if the block is not a colour at all
fn parse_color(block: &str) -> Option<Option<Color>> {
    let lower = block.trim().to_ascii_lowercase();
    if let Some((_, color)) = NAMED_COLORS.iter().find(|(name, _)| *name == lower) {
        return Some(Some(*color));
    }
    let (_, number) = regex_captures!(r"^color\s*([0-9]+)$", &lower)?;
    match number.parse::<u8>() {
        Ok(n @ 1..=56) => Some(Some(Color::Indexed(n + 7))),
        _ => {
            log::warn!("Unknown colour [{}] in number format", block);
            Some(None)
        }
    }
}

fn is_locale(block: &str) -> bool {
    block
        .strip_prefix("$-")
        .map_or(false, |hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn color_name(color: Color) -> Option<String> {
    if let Some((name, _)) = NAMED_COLORS.iter().find(|(_, c)| *c == color) {
        let mut chars = name.chars();
        return chars
            .next()
            .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str());
    }
    match color {
        Color::Indexed(n) if (8..=63).contains(&n) => Some(format!("Color{}", n - 7)),
        _ => None,
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, text: &str, kind: CellFormatType) -> fmt::Result {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if kind.is_special(c) || !" -:()$+".contains(c) => write!(f, "\\{}", c),
        (Some(_), None) | (None, _) => f.write_str(text),
        _ => write!(f, "\"{}\"", text.replace('"', "\\\"")),
    }
}

impl fmt::Display for CellFormatPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.color.and_then(color_name) {
            write!(f, "[{}]", name)?;
        }
        if let Some(condition) = &self.condition {
            write!(f, "{}", condition)?;
        }

        let kind = self.format_type();
        for token in self.formatter.tokens() {
            match token {
                Token::Literal(s) => write_literal(f, s, kind)?,
                Token::Text => f.write_str("@")?,
                Token::Digit(c) => write!(f, "{}", c)?,
                Token::Point => f.write_str(".")?,
                Token::Comma => f.write_str(",")?,
                Token::Percent => f.write_str("%")?,
                Token::Slash => f.write_str("/")?,
                Token::Exponent { plus, upper } => write!(
                    f,
                    "{}{}",
                    if *upper { 'E' } else { 'e' },
                    if *plus { '+' } else { '-' }
                )?,
                Token::Date { letter, len } | Token::Elapsed { letter, len } => {
                    let run = letter.to_string().repeat(*len);
                    if matches!(token, Token::Elapsed { .. }) {
                        write!(f, "[{}]", run)?
                    } else {
                        f.write_str(&run)?
                    }
                }
                Token::AmPm(s) => f.write_str(s)?,
                Token::Skip(c) => write!(f, "_{}", c)?,
                Token::Fill(c) => write!(f, "*{}", c)?,
                Token::Currency(s) => write!(f, "[${}]", s)?,
                Token::General => f.write_str("General")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionOperator;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_blocks() {
        let part = CellFormatPart::new("[Red][<=-10]0.00").unwrap();
        assert_eq!(part.color(), Some(Color::RED));
        let condition = part.condition().unwrap();
        assert_eq!(condition.operator(), ConditionOperator::Le);
        assert_eq!(condition.constant(), -10.0);
        assert_eq!(part.format_type(), CellFormatType::Number);
    }

    #[test]
    fn test_indexed_colours() {
        assert_eq!(
            CellFormatPart::new("[Color3]0").unwrap().color(),
            Some(Color::Indexed(10))
        );
        assert_eq!(CellFormatPart::new("[COLOR 57]0").unwrap().color(), None);
        assert_eq!(CellFormatPart::new("[cyan]@").unwrap().color(), Some(Color::CYAN));
    }

    #[test]
    fn test_locale_block_is_ignored() {
        let part = CellFormatPart::new("[$-409]h:mm AM/PM").unwrap();
        assert_eq!(part.format_type(), CellFormatType::Date);
        assert_eq!(part.color(), None);
    }

    #[test]
    fn test_unknown_block_is_rejected() {
        assert!(CellFormatPart::new("[Orange]0").is_err());
        assert!(CellFormatPart::new("[>abc]0").is_err());
    }

    #[test]
    fn test_condition_gates_apply() {
        let part = CellFormatPart::new("[Blue][>100]0.0").unwrap();
        let opts = FormatOptions::default();

        let hit = part.apply(&FormatValue::Number(150.0), &opts);
        assert!(hit.applies);
        assert_eq!(hit.text, "150.0");
        assert_eq!(hit.text_color, Some(Color::BLUE));

        let miss = part.apply(&FormatValue::Number(50.0), &opts);
        assert!(!miss.applies);
        assert_eq!(miss.text, "50");
        assert_eq!(miss.text_color, None);

        assert!(part.applies(&"text".into()));
    }

    #[test]
    fn test_display_round_trips_structure() {
        for spec in ["[Red][<=-10]0.00", "#,##0.00_)", "yyyy\\-mm\\-dd", "[h]:mm:ss", "\"Total \"@"] {
            let part = CellFormatPart::new(spec).unwrap();
            let printed = part.to_string();
            let reparsed = CellFormatPart::new(&printed).unwrap();
            assert_eq!(reparsed, part, "{} printed as {}", spec, printed);
        }
    }
}
