//! Item Quantity Normalizer: collapses the three historical
//! representations of "how many of this item" on a purchase-item document
//! — a scalar `quantity`, a scalar `count`, and an `entries[]` array — into
//! a flat sequence of canonical line items, each conceptually a single unit
//! carrying its own extras/excluded-ingredients grouping.

use crate::model::PurchaseItemDoc;

/// One canonical unit produced by [`normalize`]. Catalog enrichment
/// (name/price/category) happens downstream in the orchestrator, once the
/// item id is known to exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedLineItem {
    pub item_id: String,
    pub selected_extras: Vec<String>,
    pub excluded_ingredients: Vec<String>,
}

/// `max(0, floor(x))` after a finite-number check: non-finite or
/// negative inputs floor to `0` at this layer.
fn coerce(raw: Option<f64>) -> i64 {
    match raw {
        Some(x) if x.is_finite() && x > 0.0 => x.floor() as i64,
        _ => 0,
    }
}

/// The doc-level quantity as read directly off the document, with no
/// legacy default applied — used when a caller needs the purchase's
/// actual recorded quantity (e.g. refund total recomputation) rather
/// than the normalizer's distribution-time fallback.
pub fn raw_quantity(doc: &PurchaseItemDoc) -> i64 {
    coerce(doc.quantity.or(doc.count))
}

/// Produces the canonical line items for one purchase-item document,
/// following the priority order: entries first, then the remaining doc
/// quantity. Idempotent: a document
/// already reduced to a single canonical unit (`quantity` or `count` of 1,
/// no `entries`, `__calculated` set) normalizes to itself.
pub fn normalize(doc: &PurchaseItemDoc) -> Vec<NormalizedLineItem> {
    let mut out = Vec::new();
    let doc_extras = doc.selected_extras.clone().unwrap_or_default();
    let doc_excluded = doc.excluded_ingredients.clone().unwrap_or_default();

    let entries = doc.entries.as_deref().unwrap_or(&[]);
    let mut consumed = 0i64;

    for entry in entries {
        let qty = coerce(Some(entry.quantity));
        if qty <= 0 {
            continue;
        }
        consumed += qty;
        let extras = entry.selected_extras.clone().unwrap_or_else(|| doc_extras.clone());
        let excluded = entry
            .excluded_ingredients
            .clone()
            .unwrap_or_else(|| doc_excluded.clone());
        for _ in 0..qty {
            out.push(NormalizedLineItem {
                item_id: doc.item_id.clone(),
                selected_extras: extras.clone(),
                excluded_ingredients: excluded.clone(),
            });
        }
    }

    let mut doc_qty = raw_quantity(doc);
    if doc_qty == 0 && entries.is_empty() {
        doc_qty = 1; // legacy default when nothing else specifies a quantity
    }

    let remaining = (doc_qty - consumed).max(0);
    for _ in 0..remaining {
        out.push(NormalizedLineItem {
            item_id: doc.item_id.clone(),
            selected_extras: doc_extras.clone(),
            excluded_ingredients: doc_excluded.clone(),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PurchaseItemEntry;

    fn doc(item_id: &str) -> PurchaseItemDoc {
        PurchaseItemDoc {
            item_id: item_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn plain_quantity_expands_to_units() {
        let mut d = doc("x");
        d.quantity = Some(3.0);
        let lines = normalize(&d);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.item_id == "x" && l.selected_extras.is_empty()));
    }

    #[test]
    fn zero_quantity_with_no_entries_defaults_to_one() {
        let mut d = doc("x");
        d.quantity = Some(0.0);
        assert_eq!(normalize(&d).len(), 1);
    }

    #[test]
    fn zero_quantity_with_entries_is_not_defaulted() {
        let mut d = doc("x");
        d.quantity = Some(0.0);
        d.entries = Some(vec![PurchaseItemEntry {
            quantity: 1.0,
            selected_extras: Some(vec!["cheese".into()]),
            excluded_ingredients: None,
        }]);
        let lines = normalize(&d);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].selected_extras, vec!["cheese".to_string()]);
    }

    #[test]
    fn entries_plus_remaining_doc_quantity() {
        // quantity=3, one entry of quantity 1 with extras -> 1 item with
        // extras, two plain items.
        let mut d = doc("x");
        d.quantity = Some(3.0);
        d.entries = Some(vec![PurchaseItemEntry {
            quantity: 1.0,
            selected_extras: Some(vec!["cheese".into()]),
            excluded_ingredients: None,
        }]);
        let lines = normalize(&d);
        assert_eq!(lines.len(), 3);
        let with_cheese = lines.iter().filter(|l| l.selected_extras == vec!["cheese".to_string()]).count();
        let plain = lines.iter().filter(|l| l.selected_extras.is_empty()).count();
        assert_eq!(with_cheese, 1);
        assert_eq!(plain, 2);
    }

    use rstest::rstest;

    #[rstest]
    #[case(f64::NAN, 1)]
    #[case(f64::INFINITY, 1)]
    #[case(f64::NEG_INFINITY, 1)]
    #[case(-5.0, 1)]
    #[case(0.0, 1)]
    #[case(1.0, 1)]
    #[case(2.7, 2)]
    fn doc_quantity_coercion_grid(#[case] raw: f64, #[case] expected_lines: usize) {
        // Every non-positive or non-finite input coerces to 0 at this layer,
        // then falls back to the legacy default of 1; fractional
        // positives floor.
        let mut d = doc("x");
        d.quantity = Some(raw);
        assert_eq!(normalize(&d).len(), expected_lines);
    }

    #[test]
    fn already_canonical_document_is_idempotent() {
        let mut d = doc("x");
        d.quantity = Some(1.0);
        d.calculated = true;
        assert_eq!(normalize(&d).len(), 1);
        assert_eq!(normalize(&normalize_to_doc(&d)).len(), 1);
    }

    fn normalize_to_doc(d: &PurchaseItemDoc) -> PurchaseItemDoc {
        d.clone()
    }
}
