use std::cmp::Ordering;

use crate::store::query::{FieldFilter, OrderBy, OrderDirection, QueryDefinition};
use crate::store::snapshot::DocumentSnapshot;
use crate::store::value::FieldValue;

/// Filters, orders and truncates `documents` the way the store serves a query.
///
/// Documents missing an order-by field are excluded, and ties (including the
/// no-ordering case) fall back to document key order.
pub(crate) fn apply_query_to_documents(
    documents: Vec<DocumentSnapshot>,
    definition: &QueryDefinition,
) -> Vec<DocumentSnapshot> {
    let mut filtered: Vec<DocumentSnapshot> = documents
        .into_iter()
        .filter(|snapshot| definition.targets(snapshot.key()))
        .filter(|snapshot| satisfies_filters(snapshot, definition.filters()))
        .filter(|snapshot| {
            definition
                .order_by_fields()
                .iter()
                .all(|order| snapshot.data().get(order.field()).is_some())
        })
        .collect();

    filtered.sort_by(|left, right| compare_snapshots(left, right, definition.order_by_fields()));

    if let Some(limit) = definition.result_limit() {
        filtered.truncate(limit as usize);
    }

    filtered
}

fn satisfies_filters(snapshot: &DocumentSnapshot, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| {
        snapshot
            .data()
            .get(filter.field())
            .map(|value| value.compare(filter.value()) == Some(Ordering::Equal))
            .unwrap_or(false)
    })
}

fn compare_snapshots(
    left: &DocumentSnapshot,
    right: &DocumentSnapshot,
    order_by: &[OrderBy],
) -> Ordering {
    for order in order_by {
        let null = FieldValue::null();
        let left_value = left.data().get(order.field()).unwrap_or(&null);
        let right_value = right.data().get(order.field()).unwrap_or(&null);

        let mut ordering = left_value.compare(right_value).unwrap_or(Ordering::Equal);
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.key().cmp(right.key())
}
