//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::OrderStatus;
use crate::domain::reconcile::{Mode, Reconciled};
use crate::domain::{CategoryId, OrderId, ProductId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEvent {
    Catalog(CatalogEvent),
    Wishlist(WishlistEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogEvent {
    CategoryCreated { category_id: CategoryId, slug: String },
    CategoryDeleted { slug: String },
    ProductCreated { product_id: ProductId, slug: String },
    ProductUpdated { product_id: ProductId },
    ProductDeleted { product_id: ProductId },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WishlistEvent {
    Reconciled { user_id: UserId, product_id: ProductId, mode: Mode, outcome: Reconciled },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Opened { order_id: OrderId, user_id: UserId },
    Reconciled { order_id: OrderId, product_id: ProductId, mode: Mode, outcome: Reconciled, total: Decimal },
    StatusChanged { order_id: OrderId, from: OrderStatus, to: OrderStatus },
}

impl DomainEvent {
    /// Message subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Catalog(CatalogEvent::CategoryCreated { .. }) => "shop.catalog.category_created",
            Self::Catalog(CatalogEvent::CategoryDeleted { .. }) => "shop.catalog.category_deleted",
            Self::Catalog(CatalogEvent::ProductCreated { .. }) => "shop.catalog.product_created",
            Self::Catalog(CatalogEvent::ProductUpdated { .. }) => "shop.catalog.product_updated",
            Self::Catalog(CatalogEvent::ProductDeleted { .. }) => "shop.catalog.product_deleted",
            Self::Wishlist(WishlistEvent::Reconciled { .. }) => "shop.wishlist.reconciled",
            Self::Order(OrderEvent::Opened { .. }) => "shop.order.opened",
            Self::Order(OrderEvent::Reconciled { .. }) => "shop.order.reconciled",
            Self::Order(OrderEvent::StatusChanged { .. }) => "shop.order.status_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_change_payload() {
        let event = DomainEvent::Order(OrderEvent::StatusChanged { order_id: 14, from: OrderStatus::New, to: OrderStatus::Delivered });
        assert_eq!(event.subject(), "shop.order.status_changed");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"order": {"status_changed": {"order_id": 14, "from": "new", "to": "delivered"}}})
        );
    }
}
