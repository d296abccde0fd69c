//! Carts and order history.
//!
//! A user has at most one order in status `new`; adding to the cart goes to that
//! order and creates it when missing. Managers see every order and move orders
//! forward through `new -> paid -> delivered`.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::auth::{self, Access, Principal};
use crate::domain::aggregates::{Order, OrderStatus, Product};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::reconcile::{Mode, Reconciled};
use crate::domain::value_objects::{Count, Price};
use crate::domain::{OrderId, ProductId};
use crate::messaging::EventPublisher;
use crate::service::UserLocks;
use crate::store::Repositories;
use crate::{Result, ShopError};

/// An order line joined with its product. `price` is the snapshot taken when the
/// line was created, not the product's current price.
#[derive(Clone, Debug)]
pub struct OrderLine {
    pub product: Product,
    pub price: Price,
    pub count: Count,
}

#[derive(Clone, Debug)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[derive(Clone)]
pub struct OrderService {
    repos: Repositories,
    events: Arc<dyn EventPublisher>,
    access: Access,
    locks: Arc<UserLocks>,
}

impl OrderService {
    pub fn new(repos: Repositories, events: Arc<dyn EventPublisher>, access: Access, locks: Arc<UserLocks>) -> Self {
        Self { repos, events, access, locks }
    }

    pub async fn list(&self, principal: Option<&Principal>) -> Result<Vec<Order>> {
        self.access.require_manager(principal)?;
        self.repos.orders.list().await
    }

    /// Visible to the order's owner and to managers.
    pub async fn get(&self, principal: Option<&Principal>, id: OrderId) -> Result<OrderDetails> {
        let user = auth::require_user(principal)?;
        let order = self.repos.orders.find_by_id(id).await?.ok_or(ShopError::NotFound("order"))?;
        if order.user_id() != user.user_id && !self.access.can_manage(user) {
            return Err(ShopError::Forbidden);
        }
        let mut lines = Vec::with_capacity(order.items().len());
        for item in order.items() {
            if let Some(product) = self.repos.products.find_by_id(item.product_id).await? {
                lines.push(OrderLine { product, price: item.price, count: item.count });
            }
        }
        Ok(OrderDetails { order, lines })
    }

    pub async fn add(&self, principal: Option<&Principal>, product_id: ProductId, count: Count) -> Result<(Order, Reconciled)> {
        let user = auth::require_user(principal)?;
        let _guard = self.locks.lock(user.user_id).await;
        let product = self.repos.products.find_by_id(product_id).await?.ok_or(ShopError::NotFound("product"))?;
        let mut order = match self.repos.orders.find_open(user.user_id).await? {
            Some(order) => order,
            None => {
                let order = self.repos.orders.create_open(user.user_id, Utc::now().date_naive()).await?;
                info!(order_id = order.id(), user_id = user.user_id, "order opened");
                self.events.publish(DomainEvent::Order(OrderEvent::Opened { order_id: order.id(), user_id: user.user_id })).await;
                order
            }
        };
        let outcome = order.add(product_id, product.price, count)?;
        self.commit(&order, product_id, Mode::Add, outcome).await?;
        Ok((order, outcome))
    }

    pub async fn remove(&self, principal: Option<&Principal>, product_id: ProductId, count: Count) -> Result<(Order, Reconciled)> {
        let user = auth::require_user(principal)?;
        let _guard = self.locks.lock(user.user_id).await;
        let mut order = self.repos.orders.find_open(user.user_id).await?.ok_or(ShopError::NotFound("order"))?;
        let outcome = order.remove(product_id, count)?.ok_or(ShopError::NotFound("order item"))?;
        self.commit(&order, product_id, Mode::Remove, outcome).await?;
        Ok((order, outcome))
    }

    pub async fn set_status(&self, principal: Option<&Principal>, id: OrderId, status: &str) -> Result<Order> {
        self.access.require_manager(principal)?;
        let status: OrderStatus = status.parse()?;
        let owner = self.repos.orders.find_by_id(id).await?.ok_or(ShopError::NotFound("order"))?.user_id();
        // serialized with the owner's cart changes
        let _guard = self.locks.lock(owner).await;
        let mut order = self.repos.orders.find_by_id(id).await?.ok_or(ShopError::NotFound("order"))?;
        let from = order.status();
        if order.set_status(status)? {
            self.repos.orders.save(&order).await?;
            order.mark_stored();
            info!(order_id = id, %from, to = %status, "order status changed");
            self.events.publish(DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, from, to: status })).await;
        }
        Ok(order)
    }

    async fn commit(&self, order: &Order, product_id: ProductId, mode: Mode, outcome: Reconciled) -> Result<()> {
        self.repos.orders.save(order).await?;
        info!(order_id = order.id(), product_id, ?outcome, total = %order.total(), "order reconciled");
        self.events
            .publish(DomainEvent::Order(OrderEvent::Reconciled { order_id: order.id(), product_id, mode, outcome, total: order.total() }))
            .await;
        Ok(())
    }
}
