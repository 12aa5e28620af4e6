//! Rational approximation for fraction formats

use crate::error::{FormatError, FormatResult};

const MAX_ITERATIONS: usize = 100;

/// A fraction `numerator/denominator`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleFraction {
    pub numerator: i64,
    pub denominator: i64,
}

impl SimpleFraction {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// The fraction nearest to `value` with exactly `denominator` as its
    /// denominator
    pub fn build_fraction_exact_denominator(value: f64, denominator: i64) -> Self {
        let numerator = (value * denominator as f64).round() as i64;
        Self::new(numerator, denominator)
    }

    /// The best approximation of `value` whose denominator does not exceed
    /// `max_denominator`, found by continued-fraction expansion
    pub fn build_fraction_max_denominator(value: f64, max_denominator: i64) -> FormatResult<Self> {
        let overflow = i32::MAX as i64;
        let mut r0 = value;
        let mut a0 = r0.floor() as i64;
        if a0.abs() > overflow {
            return Err(fraction_overflow(value));
        }

        let (mut p0, mut q0) = (1i64, 0i64);
        let (mut p1, mut q1) = (a0, 1i64);
        let (mut p2, mut q2);
        let mut n = 0;

        loop {
            n += 1;
            let remainder = r0 - a0 as f64;
            if remainder == 0.0 {
                return Ok(Self::new(p1, q1));
            }
            let r1 = 1.0 / remainder;
            let a1 = r1.floor().min(overflow as f64) as i64;
            p2 = a1.saturating_mul(p1).saturating_add(p0);
            q2 = a1.saturating_mul(q1).saturating_add(q0);

            if max_denominator > 0 && q2.abs() > max_denominator && q1.abs() < max_denominator {
                return Ok(Self::new(p1, q1));
            }
            if p2.abs() > overflow || q2.abs() > overflow {
                return Err(fraction_overflow(value));
            }

            let convergent = p2 as f64 / q2 as f64;
            if n < MAX_ITERATIONS && (convergent - value).abs() > 0.0 && q2 < max_denominator {
                p0 = p1;
                p1 = p2;
                q0 = q1;
                q1 = q2;
                a0 = a1;
                r0 = r1;
            } else {
                break;
            }
        }

        if n >= MAX_ITERATIONS {
            return Err(FormatError::unrecognized(
                &value.to_string(),
                "unable to convert to a fraction",
            ));
        }
        if q2 < max_denominator {
            Ok(Self::new(p2, q2))
        } else {
            Ok(Self::new(p1, q1))
        }
    }
}

fn fraction_overflow(value: f64) -> FormatError {
    FormatError::unrecognized(&value.to_string(), "overflow converting to a fraction")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_denominator() {
        assert_eq!(
            SimpleFraction::build_fraction_max_denominator(0.5, 9).unwrap(),
            SimpleFraction::new(1, 2)
        );
        assert_eq!(
            SimpleFraction::build_fraction_max_denominator(0.333, 9).unwrap(),
            SimpleFraction::new(1, 3)
        );
        assert_eq!(
            SimpleFraction::build_fraction_max_denominator(0.1234, 99).unwrap(),
            SimpleFraction::new(10, 81)
        );
        assert_eq!(
            SimpleFraction::build_fraction_max_denominator(0.0, 9).unwrap(),
            SimpleFraction::new(0, 1)
        );
    }

    #[test]
    fn test_exact_denominator() {
        assert_eq!(
            SimpleFraction::build_fraction_exact_denominator(0.3, 4),
            SimpleFraction::new(1, 4)
        );
        assert_eq!(
            SimpleFraction::build_fraction_exact_denominator(0.9, 8),
            SimpleFraction::new(7, 8)
        );
    }
}
