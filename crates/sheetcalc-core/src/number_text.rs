//! Conversion of numbers to the text Excel shows when a number is used as a
//! string (concatenation, `TEXT` coercion, string comparison).
//!
//! Values are rounded to 15 significant digits. Large magnitudes switch to
//! `E+` notation once the decimal exponent passes 19; small magnitudes switch
//! to `E-` notation when the plain form would exceed 20 characters.

/// Longest plain rendering before falling back to scientific notation
const MAX_TEXT_LEN: usize = 20;

/// Render `value` the way Excel converts a number to text
///
/// ```
/// use sheetcalc_core::number_to_text;
///
/// assert_eq!(number_to_text(1.5), "1.5");
/// assert_eq!(number_to_text(0.1 + 0.2), "0.3");
/// assert_eq!(number_to_text(1e20), "1E+20");
/// ```
pub fn number_to_text(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return "#NUM!".to_string();
    }

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }

    let (digits, exponent) = significant_digits(value.abs());
    let count = digits.trim_end_matches('0').len().max(1);
    let digits = &digits[..count];

    if exponent < 0 {
        format_less_than_one(&mut out, digits, exponent);
    } else {
        format_greater_than_one(&mut out, digits, exponent);
    }
    out
}

/// The 15 significant decimal digits of `value` and its decimal exponent
fn significant_digits(value: f64) -> (String, i32) {
    let formatted = format!("{:.14e}", value);
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits, exponent.parse().unwrap_or(0))
}

fn format_less_than_one(out: &mut String, digits: &str, exponent: i32) {
    let leading_zeros = (-exponent - 1) as usize;
    let normal_len = 2 + leading_zeros + digits.len();

    if normal_len > MAX_TEXT_LEN {
        push_scientific(out, digits, '-', -exponent);
        return;
    }

    out.push_str("0.");
    out.extend(std::iter::repeat('0').take(leading_zeros));
    out.push_str(digits);
}

fn format_greater_than_one(out: &mut String, digits: &str, exponent: i32) {
    if exponent > 19 {
        push_scientific(out, digits, '+', exponent);
        return;
    }

    let int_len = exponent as usize + 1;
    if digits.len() > int_len {
        out.push_str(&digits[..int_len]);
        out.push('.');
        out.push_str(&digits[int_len..]);
    } else {
        out.push_str(digits);
        out.extend(std::iter::repeat('0').take(int_len - digits.len()));
    }
}

fn push_scientific(out: &mut String, digits: &str, sign: char, exponent: i32) {
    out.push_str(&digits[..1]);
    if digits.len() > 1 {
        out.push('.');
        out.push_str(&digits[1..]);
    }
    out.push('E');
    out.push(sign);
    if exponent < 10 {
        out.push('0');
    }
    out.push_str(&exponent.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_integers() {
        assert_eq!(number_to_text(0.0), "0");
        assert_eq!(number_to_text(42.0), "42");
        assert_eq!(number_to_text(-7.0), "-7");
        assert_eq!(number_to_text(1_000_000.0), "1000000");
        assert_eq!(number_to_text(123456789012345.0), "123456789012345");
    }

    #[test]
    fn test_fifteen_digit_rounding() {
        assert_eq!(number_to_text(0.1 + 0.2), "0.3");
        assert_eq!(number_to_text(1.0 / 3.0), "0.333333333333333");
        assert_eq!(number_to_text(2.0 / 3.0), "0.666666666666667");
        assert_eq!(number_to_text(1234567890123456.0), "1234567890123460");
    }

    #[test]
    fn test_small_values() {
        assert_eq!(number_to_text(0.5), "0.5");
        assert_eq!(number_to_text(0.0001), "0.0001");
        assert_eq!(number_to_text(1.5e-25), "1.5E-25");
    }

    #[test]
    fn test_large_values() {
        assert_eq!(number_to_text(1e19), "10000000000000000000");
        assert_eq!(number_to_text(1e20), "1E+20");
        assert_eq!(number_to_text(-2.5e100), "-2.5E+100");
    }
}
