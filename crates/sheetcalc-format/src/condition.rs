//! Section conditions such as `[>=100]`

use crate::error::{FormatError, FormatResult};
use std::fmt;

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOperator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl ConditionOperator {
    /// Parse `<`, `<=`, `>`, `>=`, `=`, `==`, `!=` or `<>`
    pub fn parse(op: &str) -> FormatResult<Self> {
        match op {
            "<" => Ok(ConditionOperator::Lt),
            "<=" => Ok(ConditionOperator::Le),
            ">" => Ok(ConditionOperator::Gt),
            ">=" => Ok(ConditionOperator::Ge),
            "=" | "==" => Ok(ConditionOperator::Eq),
            "!=" | "<>" => Ok(ConditionOperator::Ne),
            other => Err(FormatError::UnknownOperator(other.to_string())),
        }
    }

    /// Canonical spelling
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionOperator::Lt => "<",
            ConditionOperator::Le => "<=",
            ConditionOperator::Gt => ">",
            ConditionOperator::Ge => ">=",
            ConditionOperator::Eq => "=",
            ConditionOperator::Ne => "<>",
        }
    }
}

/// A numeric predicate gating a format section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellFormatCondition {
    operator: ConditionOperator,
    constant: f64,
}

impl CellFormatCondition {
    /// Build a condition from its operator and constant text
    pub fn new(operator: &str, constant: &str) -> FormatResult<Self> {
        let operator = ConditionOperator::parse(operator)?;
        let constant = constant
            .trim()
            .parse::<f64>()
            .map_err(|_| FormatError::InvalidConstant(constant.to_string()))?;
        Ok(Self { operator, constant })
    }

    /// Whether `value` satisfies the condition
    pub fn pass(&self, value: f64) -> bool {
        match self.operator {
            ConditionOperator::Lt => value < self.constant,
            ConditionOperator::Le => value <= self.constant,
            ConditionOperator::Gt => value > self.constant,
            ConditionOperator::Ge => value >= self.constant,
            ConditionOperator::Eq => value == self.constant,
            ConditionOperator::Ne => value != self.constant,
        }
    }

    pub fn operator(&self) -> ConditionOperator {
        self.operator
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }
}

impl fmt::Display for CellFormatCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}{}]", self.operator.as_str(), self.constant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators() {
        let ge = CellFormatCondition::new(">=", "10").unwrap();
        assert!(ge.pass(10.0));
        assert!(!ge.pass(9.99));

        let ne = CellFormatCondition::new("<>", "0").unwrap();
        assert!(ne.pass(-1.0));
        assert!(!ne.pass(0.0));

        let eq = CellFormatCondition::new("==", "-.5").unwrap();
        assert!(eq.pass(-0.5));
        assert_eq!(eq.operator(), ConditionOperator::Eq);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            CellFormatCondition::new("=<", "1"),
            Err(FormatError::UnknownOperator("=<".into()))
        );
        assert!(CellFormatCondition::new(">", "abc").is_err());
    }

    #[test]
    fn test_display() {
        let c = CellFormatCondition::new("!=", "2.5").unwrap();
        assert_eq!(c.to_string(), "[<>2.5]");
    }
}
