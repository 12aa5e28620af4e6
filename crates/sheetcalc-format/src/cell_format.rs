//! Whole format strings and the shared parse cache

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use ahash::AHashMap;
use once_cell::sync::Lazy;

use crate::error::{FormatError, FormatResult};
use crate::formatter::date::{invalid_date, to_serial};
use crate::formatter::CellFormatType;
use crate::lexer::split_sections;
use crate::options::FormatOptions;
use crate::part::{CellFormatPart, CellFormatResult};
use crate::value::FormatValue;

/// Most sections a format may have: positive, negative, zero, text
pub const MAX_SECTIONS: usize = 4;

static GLOBAL_CACHE: Lazy<FormatCache> = Lazy::new(FormatCache::new);

/// A parsed number format such as `#,##0.00;[Red]-#,##0.00`
#[derive(Debug, Clone, PartialEq)]
pub struct CellFormat {
    format: String,
    parts: Vec<CellFormatPart>,
}

impl CellFormat {
    /// Parse a format string
    pub fn new(format: &str) -> FormatResult<Self> {
        let sections = split_sections(format)?;
        if sections.len() > MAX_SECTIONS {
            return Err(FormatError::TooManySections {
                count: sections.len(),
                format: format.to_string(),
            });
        }

        let multi = sections.len() > 1;
        let parts = sections
            .iter()
            .map(|section| {
                if multi && section.is_empty() {
                    Ok(CellFormatPart::empty_text())
                } else {
                    CellFormatPart::new(section)
                }
            })
            .collect::<FormatResult<Vec<_>>>()?;

        Ok(Self {
            format: format.to_string(),
            parts,
        })
    }

    /// Parse through the process-wide cache
    pub fn get_instance(format: &str) -> FormatResult<Arc<CellFormat>> {
        GLOBAL_CACHE.get(format)
    }

    /// The format string this was parsed from
    pub fn format_string(&self) -> &str {
        &self.format
    }

    pub fn parts(&self) -> &[CellFormatPart] {
        &self.parts
    }

    /// Format with the default options
    pub fn apply(&self, value: impl Into<FormatValue>) -> CellFormatResult {
        self.apply_with(&value.into(), &FormatOptions::default())
    }

    /// Format a value, picking the section by sign and condition
    pub fn apply_with(&self, value: &FormatValue, options: &FormatOptions) -> CellFormatResult {
        match value {
            FormatValue::Number(n) => self.apply_number(*n, options),
            FormatValue::Date(dt) => {
                let serial = to_serial(dt, options.date_system);
                if serial < 0.0 {
                    return invalid_result();
                }
                let part = match self.applicable_part(serial) {
                    Some(part) => part,
                    None => return invalid_result(),
                };
                if part.format_type() == CellFormatType::Date {
                    part.apply(value, options)
                } else {
                    part.apply(&FormatValue::Number(serial), options)
                }
            }
            FormatValue::Text(_) | FormatValue::Bool(_) | FormatValue::Blank => {
                self.text_part().apply(value, options)
            }
        }
    }

    fn apply_number(&self, n: f64, options: &FormatOptions) -> CellFormatResult {
        let negative_section = match self.parts.as_slice() {
            [pos, neg] if !pos.has_condition() && !neg.has_condition() => Some(neg),
            [_, neg, _] | [_, neg, _, _] if !neg.has_condition() => Some(neg),
            _ => None,
        };

        match negative_section {
            Some(neg) if n < 0.0 => neg.apply(&FormatValue::Number(-n), options),
            _ => match self.applicable_part(n) {
                Some(part) => part.apply(&FormatValue::Number(n), options),
                None => invalid_result(),
            },
        }
    }

    /// The section that handles number `n`
    ///
    /// `None` means no section accepts the value.
    fn applicable_part(&self, n: f64) -> Option<CellFormatPart> {
        let accepts = |part: &CellFormatPart| {
            part.condition().map_or(false, |condition| condition.pass(n))
        };

        match self.parts.as_slice() {
            [] => Some(CellFormatPart::general()),
            [only] => {
                if !only.has_condition() || accepts(only) {
                    Some(only.clone())
                } else {
                    Some(CellFormatPart::general())
                }
            }
            [pos, neg] => {
                if (!pos.has_condition() && n >= 0.0) || accepts(pos) {
                    Some(pos.clone())
                } else if !neg.has_condition() || accepts(neg) {
                    Some(neg.clone())
                } else {
                    None
                }
            }
            [pos, neg, zero, ..] => {
                if (!pos.has_condition() && n > 0.0) || accepts(pos) {
                    Some(pos.clone())
                } else if (!neg.has_condition() && n < 0.0) || accepts(neg) {
                    Some(neg.clone())
                } else {
                    Some(zero.clone())
                }
            }
        }
    }

    /// The section used for text, booleans and blanks
    fn text_part(&self) -> CellFormatPart {
        match self.parts.as_slice() {
            [only] if only.format_type() == CellFormatType::Text => only.clone(),
            [_, _, _, text] => text.clone(),
            _ => CellFormatPart::default_text(),
        }
    }
}

impl fmt::Display for CellFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format)
    }
}

fn invalid_result() -> CellFormatResult {
    CellFormatResult {
        applies: false,
        text: invalid_date(),
        text_color: None,
    }
}

/// Parsed formats keyed by their source string
///
/// Only successful parses are stored.
#[derive(Debug, Default)]
pub struct FormatCache {
    entries: Mutex<AHashMap<String, Arc<CellFormat>>>,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached format, parsing and storing it on first use
    pub fn get(&self, format: &str) -> FormatResult<Arc<CellFormat>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = entries.get(format) {
            return Ok(Arc::clone(found));
        }

        let parsed = Arc::new(CellFormat::new(format)?);
        log::debug!("cached cell format {:?}", format);
        entries.insert(format.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Color;

    fn text(format: &str, value: impl Into<FormatValue>) -> String {
        CellFormat::new(format).unwrap().apply(value).text
    }

    #[test]
    fn test_single_section() {
        assert_eq!(text("#,##0.00", 1234.5), "1,234.50");
        assert_eq!(text("0.00", -3.0), "-3.00");
        assert_eq!(text("General", 0.25), "0.25");
        assert_eq!(text("", 12.0), "12");
    }

    #[test]
    fn test_sign_sections_use_magnitude() {
        let f = CellFormat::new("[Green]0;[Red]0").unwrap();
        let pos = f.apply(5.0);
        assert_eq!((pos.text.as_str(), pos.text_color), ("5", Some(Color::GREEN)));
        let neg = f.apply(-5.0);
        assert_eq!((neg.text.as_str(), neg.text_color), ("5", Some(Color::RED)));

        let three = CellFormat::new("0.0;(0.0);\"zero\"").unwrap();
        assert_eq!(three.apply(-1.5).text, "(1.5)");
        assert_eq!(three.apply(0.0).text, "zero");
        assert_eq!(three.apply(2.0).text, "2.0");
    }

    #[test]
    fn test_conditional_sections() {
        let f = CellFormat::new("[>=100]\"big \"0;[<0]\"neg \"0;\"small \"0").unwrap();
        assert_eq!(f.apply(150.0).text, "big 150");
        assert_eq!(f.apply(-3.0).text, "-neg 3");
        assert_eq!(f.apply(7.0).text, "small 7");

        let two = CellFormat::new("[>10]0.0;[<-10]0.0").unwrap();
        assert_eq!(two.apply(5.0).text, "#".repeat(255));
        assert_eq!(two.apply(11.0).text, "11.0");
    }

    #[test]
    fn test_single_conditional_section_falls_back_to_general() {
        let f = CellFormat::new("[>100]0.00").unwrap();
        assert_eq!(f.apply(150.0).text, "150.00");
        assert_eq!(f.apply(5.5).text, "5.5");
    }

    #[test]
    fn test_text_and_boolean_values() {
        assert_eq!(text("0;0;0;\"[\"@\"]\"", "abc"), "[abc]");
        assert_eq!(text("0.00", "abc"), "abc");
        assert_eq!(text("0.00", true), "TRUE");
        assert_eq!(text("\"x\"@", "y"), "xy");
        assert_eq!(text("0;0;0;", "hidden"), "");
    }

    #[test]
    fn test_empty_sections() {
        let f = CellFormat::new("0;;0").unwrap();
        assert_eq!(f.apply(-4.0).text, "");
        assert_eq!(f.apply(4.0).text, "4");
    }

    #[test]
    fn test_dates_and_elapsed() {
        assert_eq!(text("yyyy-mm-dd", 2.0), "1904-01-03");
        assert_eq!(text("[h]:mm:ss", 1.5), "36:00:00");
        let dt = NaiveDate::from_ymd_opt(1904, 1, 3)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        assert_eq!(text("yyyy-mm-dd hh:mm", dt), "1904-01-03 06:00");
        assert_eq!(text("0.00", dt), "2.25");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            CellFormat::new("0;0;0;@;0"),
            Err(FormatError::TooManySections { count: 5, .. })
        ));
        assert!(CellFormat::new("\"open").is_err());
        assert!(CellFormat::new("[h]:[m]").is_err());
    }

    #[test]
    fn test_cache_stores_only_successful_parses() {
        let cache = FormatCache::new();
        let first = cache.get("0.00").unwrap();
        let second = cache.get("0.00").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.get("[Bogus]0").is_err());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_global_instance() {
        let a = CellFormat::get_instance("#,##0").unwrap();
        let b = CellFormat::get_instance("#,##0").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.to_string(), "#,##0");
    }
}
