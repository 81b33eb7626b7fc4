use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::coerce::coerce_number;
use crate::payload::{TransactionKind, TransactionRecord};

/// Which transactions an aggregate sums over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KindFilter {
    Any,
    Kind(TransactionKind),
}

impl KindFilter {
    /// `any` selects every record; anything else names a kind.
    pub fn parse(text: &str) -> Self {
        if text.trim().eq_ignore_ascii_case("any") {
            KindFilter::Any
        } else {
            KindFilter::Kind(TransactionKind::parse(text))
        }
    }

    pub fn matches(&self, kind: &TransactionKind) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Kind(k) => k == kind,
        }
    }
}

impl fmt::Display for KindFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindFilter::Any => f.write_str("ANY"),
            KindFilter::Kind(k) => write!(f, "{k}"),
        }
    }
}

/// A matching record whose amount could not be read. It contributed zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmountFailure {
    /// Position in the payload's transaction list.
    pub index: usize,
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Aggregate {
    pub total: Decimal,
    /// Records selected by the predicate, readable or not.
    pub matched: usize,
    pub failures: Vec<AmountFailure>,
    /// Index of the record whose amount pushed the sum out of range.
    /// `total` then holds the sum before that record and is not usable.
    pub overflow: Option<usize>,
}

impl Aggregate {
    /// The total, unless it overflowed.
    pub fn sum(&self) -> Option<Decimal> {
        match self.overflow {
            Some(_) => None,
            None => Some(self.total),
        }
    }

    /// `round(total × rate, 2)`, halves away from zero. `None` when the total
    /// or the product is out of range.
    pub fn rated(&self, rate: Decimal) -> Option<Decimal> {
        self.sum()?
            .checked_mul(rate)
            .map(|v| v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

/// Sum `amount` over the records whose kind satisfies `predicate`.
///
/// Unreadable or missing amounts count as zero and are reported in
/// [`Aggregate::failures`]; the sum itself never fails.
pub fn aggregate_by<P>(records: &[TransactionRecord], predicate: P) -> Aggregate
where
    P: Fn(&TransactionKind) -> bool,
{
    let mut out = Aggregate::default();
    for (index, record) in records.iter().enumerate() {
        if !predicate(&record.kind) {
            continue;
        }
        out.matched += 1;
        let Some(raw) = &record.amount else {
            tracing::warn!(index, kind = %record.kind, "transaction has no amount; counted as zero");
            out.failures.push(AmountFailure { index, raw: None });
            continue;
        };
        match coerce_number(raw) {
            Ok(amount) => match out.total.checked_add(amount) {
                Some(total) => out.total = total,
                None => {
                    if out.overflow.is_none() {
                        tracing::warn!(index, kind = %record.kind, "aggregate total out of range");
                        out.overflow = Some(index);
                    }
                }
            },
            Err(err) => {
                tracing::warn!(index, kind = %record.kind, %err, "unreadable amount counted as zero");
                out.failures.push(AmountFailure {
                    index,
                    raw: Some(err.raw),
                });
            }
        }
    }
    out
}

pub fn aggregate(records: &[TransactionRecord], filter: &KindFilter) -> Aggregate {
    aggregate_by(records, |kind| filter.matches(kind))
}
