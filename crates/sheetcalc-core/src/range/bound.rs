//! Range edges

use crate::error::{Error, Result};

/// One edge of a range: a concrete index or the end of the sheet.
///
/// `Unbounded` orders after every `At`, so a comparison between bounds never
/// needs to know which argument carries the open edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bound {
    /// A 0-based row or column index
    At(u32),
    /// The whole extent of the sheet in this direction
    Unbounded,
}

impl Bound {
    /// Convert the `-1` sentinel used by BIFF records
    pub fn from_legacy(value: i32) -> Result<Self> {
        match value {
            -1 => Ok(Bound::Unbounded),
            v if v >= 0 => Ok(Bound::At(v as u32)),
            v => Err(Error::InvalidRange(format!("invalid range bound {}", v))),
        }
    }

    /// The `-1` sentinel form
    pub fn to_legacy(self) -> i32 {
        match self {
            Bound::At(i) => i as i32,
            Bound::Unbounded => -1,
        }
    }

    /// Concrete index, using `last_index` for an open edge
    pub fn resolve(self, last_index: u32) -> u32 {
        match self {
            Bound::At(i) => i.min(last_index),
            Bound::Unbounded => last_index,
        }
    }

    /// Whether this is an open edge
    pub fn is_unbounded(self) -> bool {
        matches!(self, Bound::Unbounded)
    }
}

impl From<u32> for Bound {
    fn from(i: u32) -> Self {
        Bound::At(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_orders_last() {
        assert!(Bound::At(0) < Bound::At(1));
        assert!(Bound::At(u32::MAX) < Bound::Unbounded);
        assert_eq!(Bound::Unbounded.max(Bound::At(7)), Bound::Unbounded);
    }

    #[test]
    fn test_legacy_sentinel() {
        assert_eq!(Bound::from_legacy(-1).unwrap(), Bound::Unbounded);
        assert_eq!(Bound::from_legacy(5).unwrap(), Bound::At(5));
        assert!(Bound::from_legacy(-2).is_err());
        assert_eq!(Bound::Unbounded.to_legacy(), -1);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Bound::Unbounded.resolve(65_535), 65_535);
        assert_eq!(Bound::At(12).resolve(65_535), 12);
        assert_eq!(Bound::At(70_000).resolve(65_535), 65_535);
    }
}
