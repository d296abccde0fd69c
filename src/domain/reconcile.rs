//! Line-item reconciliation.
//!
//! A request names a product, a count and a mode. The rules are the same for
//! wishlists and orders:
//!
//! - `Add` with no line for the product creates one; otherwise the counts are summed.
//! - `Remove` with no line changes nothing and yields `None`. A line holding more than
//!   the requested count is decremented, any other line is deleted.
//!
//! At most one line per product ever exists in a container.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Count;
use crate::domain::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Add,
    Remove,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reconciled {
    Created { count: Count },
    Merged { count: Count },
    Decremented { count: Count },
    Removed,
}

pub trait LineItem {
    fn product_id(&self) -> ProductId;
    fn count(&self) -> Count;
    fn set_count(&mut self, count: Count);
}

/// Adds `requested` to the product's line. `create` builds the line for a product seen
/// for the first time and receives the requested count.
pub fn add<L, F>(items: &mut Vec<L>, product_id: ProductId, requested: Count, create: F) -> Reconciled
where
    L: LineItem,
    F: FnOnce(Count) -> L,
{
    if let Some(existing) = items.iter_mut().find(|i| i.product_id() == product_id) {
        let count = existing.count().saturating_add(requested);
        existing.set_count(count);
        return Reconciled::Merged { count };
    }
    items.push(create(requested));
    Reconciled::Created { count: requested }
}

/// `None` when the container holds no line for the product.
pub fn remove<L: LineItem>(items: &mut Vec<L>, product_id: ProductId, requested: Count) -> Option<Reconciled> {
    let idx = items.iter().position(|i| i.product_id() == product_id)?;
    match items[idx].count().checked_sub(requested) {
        Some(count) => {
            items[idx].set_count(count);
            Some(Reconciled::Decremented { count })
        }
        None => {
            items.remove(idx);
            Some(Reconciled::Removed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Line { product_id: ProductId, count: Count }

    impl LineItem for Line {
        fn product_id(&self) -> ProductId { self.product_id }
        fn count(&self) -> Count { self.count }
        fn set_count(&mut self, count: Count) { self.count = count; }
    }

    fn n(v: u32) -> Count { Count::new(v).unwrap() }

    fn apply(items: &mut Vec<Line>, product_id: ProductId, count: u32, mode: Mode) -> Option<Reconciled> {
        match mode {
            Mode::Add => Some(add(items, product_id, n(count), |count| Line { product_id, count })),
            Mode::Remove => remove(items, product_id, n(count)),
        }
    }

    #[test]
    fn test_add_creates_then_merges() {
        let mut items = vec![];
        assert_eq!(apply(&mut items, 1, 2, Mode::Add), Some(Reconciled::Created { count: n(2) }));
        assert_eq!(apply(&mut items, 1, 3, Mode::Add), Some(Reconciled::Merged { count: n(5) }));
        assert_eq!(items, vec![Line { product_id: 1, count: n(5) }]);
    }

    #[test]
    fn test_add_keeps_other_products_apart() {
        let mut items = vec![];
        apply(&mut items, 1, 1, Mode::Add);
        apply(&mut items, 2, 4, Mode::Add);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Line { product_id: 2, count: n(4) });
    }

    #[test]
    fn test_remove_decrements_when_more_remains() {
        let mut items = vec![Line { product_id: 7, count: n(4) }];
        assert_eq!(apply(&mut items, 7, 3, Mode::Remove), Some(Reconciled::Decremented { count: n(1) }));
        assert_eq!(items[0].count, n(1));
    }

    #[test]
    fn test_remove_exact_count_deletes() {
        let mut items = vec![Line { product_id: 7, count: n(3) }];
        assert_eq!(apply(&mut items, 7, 3, Mode::Remove), Some(Reconciled::Removed));
        assert!(items.is_empty());
    }

    #[test]
    fn test_remove_more_than_present_deletes() {
        let mut items = vec![Line { product_id: 7, count: n(2) }, Line { product_id: 8, count: n(1) }];
        assert_eq!(apply(&mut items, 7, 10, Mode::Remove), Some(Reconciled::Removed));
        assert_eq!(items, vec![Line { product_id: 8, count: n(1) }]);
    }

    #[test]
    fn test_remove_unknown_product_yields_nothing() {
        let mut items = vec![Line { product_id: 7, count: n(2) }];
        assert_eq!(apply(&mut items, 9, 1, Mode::Remove), None);
        assert_eq!(items.len(), 1);
    }
}
