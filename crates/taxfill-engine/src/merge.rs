use taxfill_common::{CellRange, CellRef};
use taxfill_io::MergedRange;

/// Merged ranges of one worksheet in workbook order.
///
/// Lookups scan in that order, so a cell covered by overlapping ranges
/// resolves through the first one, repeatedly, until it reaches a cell that
/// is the master of its own first covering range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeIndex {
    ranges: Vec<CellRange>,
}

impl MergeIndex {
    pub fn new(ranges: impl IntoIterator<Item = CellRange>) -> Self {
        Self {
            ranges: ranges.into_iter().collect(),
        }
    }

    /// Build from backend metadata, dropping ranges that fall off the grid.
    pub fn from_merged(merged: &[MergedRange]) -> Self {
        Self::new(merged.iter().filter_map(|m| match m.to_range() {
            Ok(range) => Some(range),
            Err(err) => {
                tracing::warn!(?m, %err, "ignoring merged range outside the grid");
                None
            }
        }))
    }

    pub fn ranges(&self) -> &[CellRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// First range covering `cell`.
    pub fn covering(&self, cell: CellRef) -> Option<&CellRange> {
        self.ranges.iter().find(|r| r.contains(cell))
    }

    /// The writable cell for `cell`: itself, or the master of its merge.
    pub fn resolve_master(&self, cell: CellRef) -> CellRef {
        resolve_master(&self.ranges, cell)
    }

    /// The master `cell` resolves to, when that is not `cell` itself.
    pub fn placeholder_owner(&self, cell: CellRef) -> Option<CellRef> {
        let master = self.resolve_master(cell);
        (master != cell).then_some(master)
    }

    /// Pairs of ranges that share at least one cell, in scan order.
    pub fn overlaps(&self) -> Vec<(CellRange, CellRange)> {
        let mut out = Vec::new();
        for (i, a) in self.ranges.iter().enumerate() {
            for b in &self.ranges[i + 1..] {
                if a.intersects(b) {
                    out.push((*a, *b));
                }
            }
        }
        out
    }
}

/// Follow first-covering masters from `cell` until a fixed point.
///
/// Each step moves up and/or left, so the walk ends after at most
/// `row + col` steps. Without overlaps it is a single step.
pub fn resolve_master(ranges: &[CellRange], cell: CellRef) -> CellRef {
    let mut current = cell;
    while let Some(range) = ranges.iter().find(|r| r.contains(current)) {
        let master = range.master();
        if master == current {
            break;
        }
        current = master;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(a1: &str) -> CellRef {
        CellRef::parse_a1(a1).unwrap()
    }

    fn index(ranges: &[&str]) -> MergeIndex {
        MergeIndex::new(ranges.iter().map(|r| CellRange::parse_a1(r).unwrap()))
    }

    #[test]
    fn placeholder_resolves_to_master() {
        let merges = index(&["C2:D2", "A10:B12"]);
        assert_eq!(merges.resolve_master(cell("D2")), cell("C2"));
        assert_eq!(merges.resolve_master(cell("C2")), cell("C2"));
        assert_eq!(merges.resolve_master(cell("B12")), cell("A10"));
        assert_eq!(merges.resolve_master(cell("E2")), cell("E2"));
    }

    #[test]
    fn placeholder_owner_ignores_masters() {
        let merges = index(&["C2:D2"]);
        assert_eq!(merges.placeholder_owner(cell("D2")), Some(cell("C2")));
        assert_eq!(merges.placeholder_owner(cell("C2")), None);
        assert_eq!(merges.placeholder_owner(cell("C3")), None);
    }

    #[test]
    fn overlapping_ranges_pick_first_and_are_reported() {
        let merges = index(&["B2:D2", "C2:C4"]);
        assert_eq!(merges.resolve_master(cell("C2")), cell("B2"));
        // C3 -> C2 (second range) -> B2 (first range).
        assert_eq!(merges.resolve_master(cell("C3")), cell("B2"));
        assert_eq!(merges.resolve_master(cell("B2")), cell("B2"));
        assert_eq!(merges.placeholder_owner(cell("C2")), Some(cell("B2")));
        assert_eq!(merges.placeholder_owner(cell("B2")), None);
        let overlaps = merges.overlaps();
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].0.to_string(), "B2:D2");
    }

    #[test]
    fn resolved_master_is_never_a_placeholder() {
        for order in [["B2:D2", "C2:C4"], ["C2:C4", "B2:D2"]] {
            let merges = index(&order);
            for a1 in ["B2", "C2", "D2", "C3", "C4"] {
                let master = merges.resolve_master(cell(a1));
                assert_eq!(merges.resolve_master(master), master, "{order:?} {a1}");
                assert_eq!(merges.placeholder_owner(master), None, "{order:?} {a1}");
            }
        }
    }

    #[test]
    fn from_merged_keeps_order() {
        let merged = vec![
            MergedRange {
                start_row: 2,
                start_col: 3,
                end_row: 2,
                end_col: 4,
            },
            MergedRange {
                start_row: 0,
                start_col: 1,
                end_row: 1,
                end_col: 1,
            },
        ];
        let merges = MergeIndex::from_merged(&merged);
        assert_eq!(merges.ranges().len(), 1);
        assert_eq!(merges.ranges()[0].to_string(), "C2:D2");
    }
}
