//! Range intersection, containment and merge algebra

use super::CellRangeAddress;

/// How one range relates to another, as seen from the first range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeRelation {
    /// The ranges share no cell
    NoIntersection,
    /// The ranges share some cells but neither contains the other
    Overlap,
    /// The second range lies entirely inside the first
    Inside,
    /// The first range lies entirely inside the second
    Encloses,
}

impl RangeRelation {
    /// Numeric code used by conditional-formatting records
    pub const fn code(self) -> i32 {
        match self {
            RangeRelation::NoIntersection => 1,
            RangeRelation::Overlap => 2,
            RangeRelation::Inside => 3,
            RangeRelation::Encloses => 4,
        }
    }
}

/// Algebra over [`CellRangeAddress`] values
pub struct CellRangeUtil;

impl CellRangeUtil {
    /// Classify how `b` relates to `a`
    ///
    /// Equal ranges classify as [`RangeRelation::Inside`].
    pub fn intersect(a: &CellRangeAddress, b: &CellRangeAddress) -> RangeRelation {
        if a.first_row() > b.last_row()
            || a.last_row() < b.first_row()
            || a.first_column() > b.last_column()
            || a.last_column() < b.first_column()
        {
            RangeRelation::NoIntersection
        } else if Self::contains(a, b) {
            RangeRelation::Inside
        } else if Self::contains(b, a) {
            RangeRelation::Encloses
        } else {
            RangeRelation::Overlap
        }
    }

    /// Whether every cell of `b` lies inside `a`
    pub fn contains(a: &CellRangeAddress, b: &CellRangeAddress) -> bool {
        a.first_row() <= b.first_row()
            && a.last_row() >= b.last_row()
            && a.first_column() <= b.first_column()
            && a.last_column() >= b.last_column()
    }

    /// Whether `a` and `b` abut along one complete edge
    ///
    /// The ranges must touch without overlapping and have identical extents
    /// along the shared edge.
    pub fn has_exact_shared_border(a: &CellRangeAddress, b: &CellRangeAddress) -> bool {
        let touches = |a_first: u32, b_last: u32| a_first > 0 && a_first - 1 == b_last;

        if touches(a.first_row(), b.last_row()) || touches(b.first_row(), a.last_row()) {
            // horizontal border, columns must line up
            return a.first_column() == b.first_column() && a.last_column() == b.last_column();
        }
        if touches(a.first_column(), b.last_column()) || touches(b.first_column(), a.last_column())
        {
            // vertical border, rows must line up
            return a.first_row() == b.first_row() && a.last_row() == b.last_row();
        }
        false
    }

    /// The smallest range containing both `a` and `b`
    pub fn create_enclosing_cell_range(
        a: &CellRangeAddress,
        b: &CellRangeAddress,
    ) -> CellRangeAddress {
        CellRangeAddress::new(
            a.first_row().min(b.first_row()),
            a.last_row().max(b.last_row()),
            a.first_column().min(b.first_column()),
            a.last_column().max(b.last_column()),
        )
    }

    /// Merge ranges until no pair can be combined
    ///
    /// Adjacent ranges with an exact shared border become their bounding
    /// rectangle and nested ranges collapse into the outer one. Partially
    /// overlapping ranges are left as they are. The result is a fixed point:
    /// merging it again returns the same list.
    pub fn merge_cell_ranges(ranges: &[CellRangeAddress]) -> Vec<CellRangeAddress> {
        let mut list = ranges.to_vec();

        while list.len() > 1 {
            let mut merged_any = false;
            let mut i = 0;
            while i < list.len() {
                let mut j = i + 1;
                while j < list.len() {
                    match Self::merge_pair(&list[i], &list[j]) {
                        Some(merged) => {
                            list[i] = merged;
                            list.remove(j);
                            merged_any = true;
                        }
                        None => j += 1,
                    }
                }
                i += 1;
            }
            if !merged_any {
                break;
            }
        }

        list
    }

    fn merge_pair(a: &CellRangeAddress, b: &CellRangeAddress) -> Option<CellRangeAddress> {
        match Self::intersect(a, b) {
            RangeRelation::NoIntersection if Self::has_exact_shared_border(a, b) => {
                Some(Self::create_enclosing_cell_range(a, b))
            }
            RangeRelation::NoIntersection | RangeRelation::Overlap => None,
            RangeRelation::Inside => Some(*a),
            RangeRelation::Encloses => Some(*b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn r(first_row: u32, last_row: u32, first_col: u32, last_col: u32) -> CellRangeAddress {
        CellRangeAddress::new(first_row, last_row, first_col, last_col)
    }

    #[test]
    fn test_intersect_cases() {
        let a = r(0, 4, 0, 4);
        assert_eq!(CellRangeUtil::intersect(&a, &r(1, 2, 1, 2)), RangeRelation::Inside);
        assert_eq!(CellRangeUtil::intersect(&r(1, 2, 1, 2), &a), RangeRelation::Encloses);
        assert_eq!(CellRangeUtil::intersect(&a, &r(3, 8, 3, 8)), RangeRelation::Overlap);
        assert_eq!(
            CellRangeUtil::intersect(&a, &r(5, 6, 0, 4)),
            RangeRelation::NoIntersection
        );
        assert_eq!(CellRangeUtil::intersect(&a, &a), RangeRelation::Inside);
    }

    #[test]
    fn test_shared_border() {
        // A1 and B1: vertical border, same rows
        assert!(CellRangeUtil::has_exact_shared_border(&r(0, 0, 0, 0), &r(0, 0, 1, 1)));
        // A1:A2 and B1: rows differ
        assert!(!CellRangeUtil::has_exact_shared_border(&r(0, 1, 0, 0), &r(0, 0, 1, 1)));
        // A1:B1 above A2:B2
        assert!(CellRangeUtil::has_exact_shared_border(&r(1, 1, 0, 1), &r(0, 0, 0, 1)));
        // A1 and C1: gap
        assert!(!CellRangeUtil::has_exact_shared_border(&r(0, 0, 0, 0), &r(0, 0, 2, 2)));
        // diagonal neighbours
        assert!(!CellRangeUtil::has_exact_shared_border(&r(0, 0, 0, 0), &r(1, 1, 1, 1)));
    }

    #[test]
    fn test_merge_adjacent_cells() {
        let merged = CellRangeUtil::merge_cell_ranges(&[r(0, 0, 0, 0), r(0, 0, 1, 1)]);
        assert_eq!(merged, vec![r(0, 0, 0, 1)]);

        let again = CellRangeUtil::merge_cell_ranges(&merged);
        assert_eq!(again, vec![r(0, 0, 0, 1)]);
    }

    #[test]
    fn test_merge_chain_and_nested() {
        // A1, A2, A3 collapse into A1:A3; B2 inside a bigger block is dropped
        let merged = CellRangeUtil::merge_cell_ranges(&[
            r(0, 0, 0, 0),
            r(2, 2, 0, 0),
            r(1, 1, 0, 0),
            r(1, 1, 1, 1),
            r(0, 5, 1, 3),
        ]);
        assert_eq!(merged, vec![r(0, 2, 0, 0), r(0, 5, 1, 3)]);
    }

    #[test]
    fn test_merge_leaves_overlaps() {
        let input = [r(0, 2, 0, 2), r(1, 3, 1, 3)];
        assert_eq!(CellRangeUtil::merge_cell_ranges(&input), input.to_vec());
    }

    #[test]
    fn test_merge_empty_and_single() {
        assert!(CellRangeUtil::merge_cell_ranges(&[]).is_empty());
        assert_eq!(
            CellRangeUtil::merge_cell_ranges(&[r(3, 4, 5, 6)]),
            vec![r(3, 4, 5, 6)]
        );
    }

    fn arb_range() -> impl Strategy<Value = CellRangeAddress> {
        (0u32..8, 0u32..8, 0u32..8, 0u32..8).prop_map(|(a, b, c, d)| r(a, b, c, d))
    }

    proptest! {
        #[test]
        fn prop_inside_iff_encloses(a in arb_range(), b in arb_range()) {
            let ab = CellRangeUtil::intersect(&a, &b);
            let ba = CellRangeUtil::intersect(&b, &a);
            if a != b {
                prop_assert_eq!(ab == RangeRelation::Inside, ba == RangeRelation::Encloses);
            }
            prop_assert_eq!(
                ab == RangeRelation::NoIntersection,
                ba == RangeRelation::NoIntersection
            );
        }

        #[test]
        fn prop_contains_matches_inside(a in arb_range(), b in arb_range()) {
            prop_assert_eq!(
                CellRangeUtil::contains(&a, &b),
                CellRangeUtil::intersect(&a, &b) == RangeRelation::Inside
            );
        }

        #[test]
        fn prop_merge_is_fixed_point(ranges in proptest::collection::vec(arb_range(), 0..6)) {
            let once = CellRangeUtil::merge_cell_ranges(&ranges);
            let twice = CellRangeUtil::merge_cell_ranges(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
