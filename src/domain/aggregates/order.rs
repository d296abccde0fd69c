//! Order Aggregate
//!
//! A user's order collects line items while it is `new` (the cart). Every line keeps
//! the price the product had when it was first added, and the order total is
//! recomputed from those snapshots after each change. Once paid the order is history.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::reconcile::{self, LineItem, Reconciled};
use crate::domain::value_objects::{Count, Price};
use crate::domain::{OrderId, ProductId, UserId};

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    date: NaiveDate,
    status: OrderStatus,
    total: Decimal,
    items: Vec<OrderItem>,
    /// Status as last read from or written to storage.
    stored_status: OrderStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderItem { pub product_id: ProductId, pub price: Price, pub count: Count }

impl OrderItem {
    pub fn line_total(&self) -> Decimal { self.price.multiply(self.count) }
}

impl LineItem for OrderItem {
    fn product_id(&self) -> ProductId { self.product_id }
    fn count(&self) -> Count { self.count }
    fn set_count(&mut self, count: Count) { self.count = count; }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] New, Paid, Delivered }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::New => "new", Self::Paid => "paid", Self::Delivered => "delivered" }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "paid" => Ok(Self::Paid),
            "delivered" => Ok(Self::Delivered),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

impl Order {
    /// A fresh cart: status `new`, no lines, zero total.
    pub fn open(id: OrderId, user_id: UserId, date: NaiveDate) -> Self {
        Self { id, user_id, date, status: OrderStatus::New, total: Decimal::ZERO, items: vec![], stored_status: OrderStatus::New }
    }

    /// Rebuilds an order from storage, trusting the recorded total.
    pub fn restore(id: OrderId, user_id: UserId, date: NaiveDate, status: OrderStatus, total: Decimal, items: Vec<OrderItem>) -> Self {
        Self { id, user_id, date, status, total, items, stored_status: status }
    }

    pub fn id(&self) -> OrderId { self.id }
    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn date(&self) -> NaiveDate { self.date }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total(&self) -> Decimal { self.total }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn is_open(&self) -> bool { self.status == OrderStatus::New }

    /// Stores refuse to save the order when their status no longer matches this one.
    pub fn stored_status(&self) -> OrderStatus { self.stored_status }

    pub fn mark_stored(&mut self) { self.stored_status = self.status; }

    /// Adds `count` of a product. `price` is captured only when the line is created.
    pub fn add(&mut self, product_id: ProductId, price: Price, count: Count) -> Result<Reconciled, OrderError> {
        self.ensure_open()?;
        let outcome = reconcile::add(&mut self.items, product_id, count, |count| OrderItem { product_id, price, count });
        self.recalculate();
        Ok(outcome)
    }

    /// `Ok(None)` if the order has no line for the product.
    pub fn remove(&mut self, product_id: ProductId, count: Count) -> Result<Option<Reconciled>, OrderError> {
        self.ensure_open()?;
        let outcome = reconcile::remove(&mut self.items, product_id, count);
        if outcome.is_some() { self.recalculate(); }
        Ok(outcome)
    }

    /// Returns whether the status actually changed. Repeating the current status is
    /// accepted; moving back along `new -> paid -> delivered` is not.
    pub fn set_status(&mut self, status: OrderStatus) -> Result<bool, OrderError> {
        if status == self.status { return Ok(false); }
        if status < self.status {
            return Err(OrderError::BackwardTransition { from: self.status, to: status });
        }
        self.status = status;
        Ok(true)
    }

    /// Drops lines for a deleted product. Totals of closed orders stay as recorded.
    pub fn purge_product(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        let purged = self.items.len() != before;
        if purged && self.is_open() { self.recalculate(); }
        purged
    }

    fn ensure_open(&self) -> Result<(), OrderError> {
        if self.is_open() { Ok(()) } else { Err(OrderError::Closed(self.status)) }
    }

    fn recalculate(&mut self) {
        self.total = self.items.iter().map(OrderItem::line_total).sum();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    Closed(OrderStatus),
    UnknownStatus(String),
    BackwardTransition { from: OrderStatus, to: OrderStatus },
}

impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(status) => write!(f, "order is {status} and can no longer change"),
            Self::UnknownStatus(s) => write!(f, "unknown order status '{s}'"),
            Self::BackwardTransition { from, to } => write!(f, "cannot move order from {from} back to {to}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: u32) -> Count { Count::new(v).unwrap() }
    fn price(cents: i64) -> Price { Price::new(Decimal::new(cents, 2)).unwrap() }
    fn cart() -> Order { Order::open(14, 3, NaiveDate::from_ymd_opt(2025, 5, 17).unwrap()) }

    #[test]
    fn test_adds_merge_and_total_follows_snapshot() {
        let mut order = cart();
        assert_eq!(order.add(1, price(12_000_000), n(1)).unwrap(), Reconciled::Created { count: n(1) });
        // the product got more expensive in between; the line keeps the first price
        assert_eq!(order.add(1, price(15_000_000), n(1)).unwrap(), Reconciled::Merged { count: n(2) });
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.items()[0].price, price(12_000_000));
        assert_eq!(order.total(), Decimal::new(240_000, 0));
    }

    #[test]
    fn test_total_sums_all_lines() {
        let mut order = cart();
        order.add(1, price(1050), n(2)).unwrap();
        order.add(2, price(199), n(3)).unwrap();
        assert_eq!(order.total(), Decimal::new(2697, 2));
        order.remove(1, n(1)).unwrap();
        assert_eq!(order.total(), Decimal::new(1647, 2));
        order.remove(2, n(5)).unwrap();
        assert_eq!(order.total(), Decimal::new(1050, 2));
    }

    #[test]
    fn test_remove_missing_line_leaves_order_untouched() {
        let mut order = cart();
        order.add(1, price(100), n(1)).unwrap();
        assert_eq!(order.remove(2, n(1)).unwrap(), None);
        assert_eq!(order.total(), Decimal::new(100, 2));
    }

    #[test]
    fn test_closed_order_rejects_changes() {
        let mut order = cart();
        order.add(1, price(100), n(1)).unwrap();
        order.set_status(OrderStatus::Paid).unwrap();
        assert_eq!(order.add(1, price(100), n(1)), Err(OrderError::Closed(OrderStatus::Paid)));
        assert_eq!(order.remove(1, n(1)), Err(OrderError::Closed(OrderStatus::Paid)));
    }

    #[test]
    fn test_status_moves_forward_only() {
        let mut order = cart();
        assert_eq!(order.set_status(OrderStatus::Paid), Ok(true));
        assert_eq!(order.set_status(OrderStatus::Delivered), Ok(true));
        assert_eq!(order.set_status(OrderStatus::Delivered), Ok(false));
        assert_eq!(
            order.set_status(OrderStatus::New),
            Err(OrderError::BackwardTransition { from: OrderStatus::Delivered, to: OrderStatus::New })
        );
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn test_stored_status_moves_on_mark_only() {
        let mut order = cart();
        order.set_status(OrderStatus::Paid).unwrap();
        assert_eq!(order.stored_status(), OrderStatus::New);
        order.mark_stored();
        assert_eq!(order.stored_status(), OrderStatus::Paid);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("paid".parse::<OrderStatus>(), Ok(OrderStatus::Paid));
        assert_eq!("bogus".parse::<OrderStatus>(), Err(OrderError::UnknownStatus("bogus".into())));
    }

    #[test]
    fn test_purge_recomputes_open_orders_only() {
        let mut open = cart();
        open.add(1, price(500), n(2)).unwrap();
        open.add(2, price(100), n(1)).unwrap();
        assert!(open.purge_product(1));
        assert_eq!(open.total(), Decimal::new(100, 2));

        let mut paid = cart();
        paid.add(1, price(500), n(2)).unwrap();
        paid.set_status(OrderStatus::Paid).unwrap();
        assert!(paid.purge_product(1));
        assert_eq!(paid.total(), Decimal::new(1000, 2));
        assert!(!paid.purge_product(1));
    }
}
