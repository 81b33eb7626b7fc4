// Property tests for merge resolution, aggregation and the write guard.
// Soak: PROPTEST_CASES=10000 cargo test -p taxfill-engine --test properties

use proptest::prelude::*;
use taxfill_common::{CellRange, CellRef, RawValue};
use taxfill_engine::{
    KindFilter, MergeIndex, TransactionKind, TransactionRecord, Verdict, aggregate, check,
    normalize_label, resolve_master,
};
use taxfill_io::CellData;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn arb_cell() -> impl Strategy<Value = CellRef> {
    (1u32..40, 1u32..20).prop_map(|(r, c)| CellRef::new(r, c).unwrap())
}

fn arb_range() -> impl Strategy<Value = CellRange> {
    (arb_cell(), 0u32..4, 0u32..4).prop_map(|(start, h, w)| {
        let end = CellRef::new(start.row() + h, start.col() + w).unwrap();
        CellRange::new(start, end)
    })
}

/// Ranges with overlapping latecomers dropped, keeping generation order.
fn arb_disjoint_ranges() -> impl Strategy<Value = Vec<CellRange>> {
    prop::collection::vec(arb_range(), 0..12).prop_map(|ranges| {
        let mut kept: Vec<CellRange> = Vec::new();
        for r in ranges {
            if kept.iter().all(|k| !k.intersects(&r)) {
                kept.push(r);
            }
        }
        kept
    })
}

fn arb_amount() -> impl Strategy<Value = RawValue> {
    prop_oneof![
        3 => r"-?[0-9]{1,3}(,[0-9]{3})?(\.[0-9]{1,2})?".prop_map(RawValue::Text),
        2 => (-100_000i64..100_000).prop_map(RawValue::Int),
        1 => r"[a-z]{1,6}".prop_map(RawValue::Text),
    ]
}

fn arb_record() -> impl Strategy<Value = TransactionRecord> {
    (any::<bool>(), arb_amount()).prop_map(|(income, amount)| {
        let kind = if income {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        };
        TransactionRecord::new(kind, amount)
    })
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn master_resolution_is_idempotent(ranges in arb_disjoint_ranges(), cell in arb_cell()) {
        let once = resolve_master(&ranges, cell);
        prop_assert_eq!(resolve_master(&ranges, once), once);
        let index = MergeIndex::new(ranges.iter().copied());
        prop_assert_eq!(index.resolve_master(cell), once);
        prop_assert!(index.placeholder_owner(once).is_none());
    }

    #[test]
    fn overlapping_sets_still_resolve_to_a_fixed_point(
        ranges in prop::collection::vec(arb_range(), 0..12),
        cell in arb_cell(),
    ) {
        let index = MergeIndex::new(ranges.iter().copied());
        let master = index.resolve_master(cell);
        prop_assert_eq!(index.resolve_master(master), master);
        prop_assert!(index.placeholder_owner(master).is_none());
        prop_assert!(master.row() <= cell.row() && master.col() <= cell.col());
        let verdict = check(&index, master, None, true);
        prop_assert!(verdict.is_proceed());
    }

    #[test]
    fn resolved_master_stays_inside_the_covering_range(ranges in arb_disjoint_ranges(), cell in arb_cell()) {
        let master = resolve_master(&ranges, cell);
        match ranges.iter().find(|r| r.contains(cell)) {
            Some(range) => {
                prop_assert!(range.contains(master));
                prop_assert!(master.row() <= cell.row() && master.col() <= cell.col());
            }
            None => prop_assert_eq!(master, cell),
        }
    }

    #[test]
    fn kinds_partition_the_total(records in prop::collection::vec(arb_record(), 0..40)) {
        let income = aggregate(&records, &KindFilter::Kind(TransactionKind::Income));
        let expense = aggregate(&records, &KindFilter::Kind(TransactionKind::Expense));
        let any = aggregate(&records, &KindFilter::Any);
        prop_assert_eq!(income.total + expense.total, any.total);
        prop_assert_eq!(income.matched + expense.matched, any.matched);
        prop_assert_eq!(income.failures.len() + expense.failures.len(), any.failures.len());
    }

    #[test]
    fn total_ignores_record_order(records in prop::collection::vec(arb_record(), 0..40)) {
        let forward = aggregate(&records, &KindFilter::Any);
        let mut reversed = records.clone();
        reversed.reverse();
        prop_assert_eq!(aggregate(&reversed, &KindFilter::Any).total, forward.total);
    }

    #[test]
    fn guard_never_proceeds_over_formula_text(body in r"[A-Z0-9*+()]{0,12}", pad in r" {0,3}") {
        let current = CellData::from_value(format!("{pad}={body}"));
        let verdict = check(&MergeIndex::default(), CellRef::new(6, 3).unwrap(), Some(&current), true);
        prop_assert!(matches!(verdict, Verdict::Formula(_)));
    }

    #[test]
    fn label_normalisation_is_idempotent(text in r"[A-Za-z0-9 *:()\-\t]{0,40}") {
        let once = normalize_label(&text);
        prop_assert_eq!(normalize_label(&once), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
    }
}

#[test]
fn empty_aggregate_is_exactly_zero() {
    let agg = aggregate(&[], &KindFilter::Any);
    assert!(agg.total.is_zero());
    assert_eq!(agg.total.to_string(), "0");
}
