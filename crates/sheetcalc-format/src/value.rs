//! Values accepted by the formatter

use chrono::NaiveDateTime;

/// A typed value to render
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    /// A number, also the serial form of dates and times
    Number(f64),
    /// A string
    Text(String),
    /// A boolean, rendered as `TRUE`/`FALSE` through the text section
    Bool(bool),
    /// A calendar date-time, converted to a serial with the active date system
    Date(NaiveDateTime),
    /// An empty cell
    Blank,
}

impl FormatValue {
    /// The text used when the value is rendered through a text section
    pub(crate) fn display_text(&self) -> String {
        match self {
            FormatValue::Text(s) => s.clone(),
            FormatValue::Bool(true) => "TRUE".to_string(),
            FormatValue::Bool(false) => "FALSE".to_string(),
            FormatValue::Blank => String::new(),
            FormatValue::Number(n) => crate::formatter::general::format_general(*n),
            FormatValue::Date(d) => d.to_string(),
        }
    }
}

impl From<f64> for FormatValue {
    fn from(n: f64) -> Self {
        FormatValue::Number(n)
    }
}

impl From<i32> for FormatValue {
    fn from(n: i32) -> Self {
        FormatValue::Number(n as f64)
    }
}

impl From<bool> for FormatValue {
    fn from(b: bool) -> Self {
        FormatValue::Bool(b)
    }
}

impl From<&str> for FormatValue {
    fn from(s: &str) -> Self {
        FormatValue::Text(s.to_string())
    }
}

impl From<String> for FormatValue {
    fn from(s: String) -> Self {
        FormatValue::Text(s)
    }
}

impl From<NaiveDateTime> for FormatValue {
    fn from(d: NaiveDateTime) -> Self {
        FormatValue::Date(d)
    }
}
