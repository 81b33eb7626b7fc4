use rustc_hash::FxHashMap;
use taxfill_spec::SheetSelector;

/// How a selector matched a worksheet name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetMatch {
    Exact,
    CaseInsensitive,
    Substring,
}

/// Find a worksheet for `selector` among `names` (declaration order).
///
/// Stages run in order and the first hit of the earliest stage wins:
/// exact, then case-insensitive exact, then (keyword selectors only)
/// case-insensitive substring.
pub fn match_sheet(names: &[String], selector: &SheetSelector) -> Option<(usize, SheetMatch)> {
    let wanted = selector.text().trim();
    if wanted.is_empty() {
        return None;
    }
    if let Some(idx) = names.iter().position(|n| n == wanted) {
        return Some((idx, SheetMatch::Exact));
    }
    let folded = wanted.to_lowercase();
    if let Some(idx) = names.iter().position(|n| n.to_lowercase() == folded) {
        return Some((idx, SheetMatch::CaseInsensitive));
    }
    match selector {
        SheetSelector::Exact(_) => None,
        SheetSelector::Keyword(_) => names
            .iter()
            .position(|n| n.to_lowercase().contains(&folded))
            .map(|idx| (idx, SheetMatch::Substring)),
    }
}

/// Sheet lookup for one workbook instance with memoised hits.
///
/// Misses are not cached; a selector that failed once is searched again.
#[derive(Debug, Clone)]
pub struct SheetResolver {
    names: Vec<String>,
    cache: FxHashMap<SheetSelector, usize>,
}

impl SheetResolver {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            cache: FxHashMap::default(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn resolve(&mut self, selector: &SheetSelector) -> Option<&str> {
        if let Some(&idx) = self.cache.get(selector) {
            return Some(self.names[idx].as_str());
        }
        let (idx, how) = match_sheet(&self.names, selector)?;
        tracing::debug!(%selector, sheet = %self.names[idx], ?how, "sheet resolved");
        self.cache.insert(selector.clone(), idx);
        Some(self.names[idx].as_str())
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
