//! Formatting options

/// The epoch used to turn serial numbers into calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateSystem {
    /// Day 0 is 1904-01-01
    #[default]
    Excel1904,
    /// Day 1 is 1900-01-01, and day 60 is the fictitious 1900-02-29
    Excel1900,
}

/// Options for rendering values through a [`CellFormat`](crate::CellFormat)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatOptions {
    /// Date system used for serial numbers in date formats
    pub date_system: DateSystem,
}

impl FormatOptions {
    /// Options using the 1900 date system
    pub fn excel1900() -> Self {
        Self {
            date_system: DateSystem::Excel1900,
        }
    }
}
