//! Field location: a declared coordinate, a label search in the top-left
//! scan window, or both.

use std::collections::BTreeMap;

use taxfill_common::CellRef;
use taxfill_io::CellData;
use taxfill_spec::{DEFAULT_HEADER_ROWS, DEFAULT_LEADING_COLS};

/// Where the answer sits relative to a matched label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerTarget {
    /// Column delta on the label's row.
    Offset(i64),
    /// Absolute 1-based column on the label's row.
    Column(u32),
}

/// Bounded region scanned for labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub header_rows: u32,
    pub leading_cols: u32,
    pub answer: AnswerTarget,
}

impl Default for ScanWindow {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HEADER_ROWS,
            leading_cols: DEFAULT_LEADING_COLS,
            answer: AnswerTarget::Offset(1),
        }
    }
}

impl ScanWindow {
    /// Inclusive `(start, end)` corners as `(row, col)`.
    pub fn bounds(&self) -> ((u32, u32), (u32, u32)) {
        ((1, 1), (self.header_rows, self.leading_cols))
    }

    pub(crate) fn contains(&self, row: u32, col: u32) -> bool {
        row >= 1 && row <= self.header_rows && col >= 1 && col <= self.leading_cols
    }

    fn answer_for(&self, label: CellRef) -> Option<CellRef> {
        match self.answer {
            AnswerTarget::Offset(delta) => label.offset(0, delta).ok(),
            AnswerTarget::Column(col) => label.with_col(col).ok(),
        }
    }
}

/// Bound form of a field's locator. `keyword` is already normalised.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundLocator {
    pub fixed: Option<CellRef>,
    pub keyword: Option<String>,
}

impl BoundLocator {
    pub fn fixed(cell: CellRef) -> Self {
        Self {
            fixed: Some(cell),
            keyword: None,
        }
    }

    pub fn search(keyword: &str) -> Self {
        Self {
            fixed: None,
            keyword: Some(normalize_label(keyword)),
        }
    }

    pub fn needs_window(&self) -> bool {
        self.keyword.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatedVia {
    Fixed,
    Search { label: CellRef },
    /// The label moved off the declared row; the search result replaced
    /// the declared coordinate.
    Drift { declared: CellRef, label: CellRef },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    Found { target: CellRef, via: LocatedVia },
    NotFound,
}

/// Case-fold, drop punctuation, collapse whitespace.
pub fn normalize_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else if ch.is_whitespace() {
            pending_space = true;
        }
    }
    out
}

pub fn try_fixed(locator: &BoundLocator) -> Option<CellRef> {
    locator.fixed
}

/// First label in row-major order whose normalised text contains `keyword`,
/// with the answer cell derived from it.
pub fn try_search(
    cells: &BTreeMap<(u32, u32), CellData>,
    window: &ScanWindow,
    keyword: &str,
) -> Option<(CellRef, CellRef)> {
    if keyword.is_empty() {
        return None;
    }
    let ((row, col), _) = cells.iter().find(|((row, col), data)| {
        window.contains(*row, *col)
            && data
                .value
                .as_ref()
                .is_some_and(|v| normalize_label(&v.to_string()).contains(keyword))
    })?;
    let label = CellRef::new(*row, *col).ok()?;
    let target = window.answer_for(label)?;
    Some((label, target))
}

/// Resolve a locator against the scan-window cells of its sheet.
///
/// A declared coordinate is kept unless a search keyword is also declared and
/// its label turns up on a different row.
pub fn locate(
    locator: &BoundLocator,
    window: &ScanWindow,
    cells: &BTreeMap<(u32, u32), CellData>,
) -> Located {
    let searched = locator
        .keyword
        .as_deref()
        .and_then(|kw| try_search(cells, window, kw));
    match (try_fixed(locator), searched) {
        (Some(declared), Some((label, target))) if label.row() != declared.row() => {
            tracing::warn!(%declared, %label, %target, "label moved; using searched coordinate");
            Located::Found {
                target,
                via: LocatedVia::Drift { declared, label },
            }
        }
        (Some(declared), _) => Located::Found {
            target: declared,
            via: LocatedVia::Fixed,
        },
        (None, Some((label, target))) => Located::Found {
            target,
            via: LocatedVia::Search { label },
        },
        (None, None) => Located::NotFound,
    }
}
