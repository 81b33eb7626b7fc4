use taxfill_common::CellRef;
use taxfill_io::CellData;

use crate::merge::MergeIndex;

/// Go/no-go for a single write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    /// `target` sits inside a merge whose master is `master`.
    Placeholder { master: CellRef },
    /// The cell holds a formula; carries its text.
    Formula(String),
    NoValue,
}

impl Verdict {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Verdict::Proceed)
    }
}

/// Decide whether `target` may be overwritten.
///
/// Checks run in a fixed order: merge placeholder, existing formula, missing
/// value. Never mutates anything.
pub fn check(
    merges: &MergeIndex,
    target: CellRef,
    current: Option<&CellData>,
    value_present: bool,
) -> Verdict {
    if let Some(master) = merges.placeholder_owner(target) {
        return Verdict::Placeholder { master };
    }
    if let Some(cell) = current.filter(|c| c.is_formula()) {
        return Verdict::Formula(cell.display_text());
    }
    if !value_present {
        return Verdict::NoValue;
    }
    Verdict::Proceed
}
