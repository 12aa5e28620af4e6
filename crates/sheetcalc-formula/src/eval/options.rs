//! Evaluator configuration

use sheetcalc_core::SpreadsheetVersion;
use sheetcalc_format::DateSystem;

/// What to do when a formula calls a known but unimplemented built-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnimplementedPolicy {
    /// Abort evaluation with `FormulaError::NotImplementedFunction`
    #[default]
    Fail,
    /// Log a warning and produce `#NAME?`
    NameError,
}

/// Settings for a [`FormulaEvaluator`](super::FormulaEvaluator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Grid limits used for reference checks
    pub version: SpreadsheetVersion,
    /// Handling of unimplemented built-ins
    pub unimplemented: UnimplementedPolicy,
    /// Epoch for date serials produced by DATE and read by TEXT
    pub date_system: DateSystem,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            version: SpreadsheetVersion::default(),
            unimplemented: UnimplementedPolicy::default(),
            date_system: DateSystem::Excel1900,
        }
    }
}

impl EvaluatorOptions {
    /// Set the spreadsheet version
    pub fn with_version(mut self, version: SpreadsheetVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the unimplemented-function policy
    pub fn with_unimplemented(mut self, policy: UnimplementedPolicy) -> Self {
        self.unimplemented = policy;
        self
    }

    /// Set the date system
    pub fn with_date_system(mut self, date_system: DateSystem) -> Self {
        self.date_system = date_system;
        self
    }
}
