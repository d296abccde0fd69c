use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::{Count, Price};
use crate::domain::OrderId;
use crate::http::extract::MaybePrincipal;
use crate::http::wishlist::{outcome_message, LineRequest, ProductSummary};
use crate::http::{messages, AppState};
use crate::Result;

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub date: NaiveDate,
    pub status: OrderStatus,
    pub total: Decimal,
}

impl From<&Order> for OrderSummary {
    fn from(o: &Order) -> Self { Self { id: o.id(), date: o.date(), status: o.status(), total: o.total() } }
}

#[derive(Debug, Serialize)]
pub struct OrderRef {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub order: OrderRef,
    pub product: ProductSummary,
    /// Price when the line was created.
    pub price: Price,
    pub count: Count,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub status: String,
}

pub async fn list_orders(State(s): State<AppState>, principal: MaybePrincipal) -> Result<Json<Vec<OrderSummary>>> {
    let orders = s.shop.orders.list(principal.as_ref()).await?;
    Ok(Json(orders.iter().map(OrderSummary::from).collect()))
}

pub async fn get_order(State(s): State<AppState>, principal: MaybePrincipal, Path(id): Path<OrderId>) -> Result<Json<Vec<OrderLineResponse>>> {
    let details = s.shop.orders.get(principal.as_ref(), id).await?;
    let order = &details.order;
    let lines = details
        .lines
        .into_iter()
        .map(|line| OrderLineResponse {
            order: OrderRef { id: order.id(), status: order.status(), total: order.total() },
            product: ProductSummary { title: line.product.title, price: line.product.price },
            price: line.price,
            count: line.count,
        })
        .collect();
    Ok(Json(lines))
}

pub async fn add_to_order(State(s): State<AppState>, principal: MaybePrincipal, Json(r): Json<LineRequest>) -> Result<Json<&'static str>> {
    let (_, outcome) = s.shop.orders.add(principal.as_ref(), r.product, r.count()?).await?;
    Ok(Json(outcome_message(outcome)))
}

pub async fn remove_from_order(State(s): State<AppState>, principal: MaybePrincipal, Json(r): Json<LineRequest>) -> Result<Json<&'static str>> {
    let (_, outcome) = s.shop.orders.remove(principal.as_ref(), r.product, r.count()?).await?;
    Ok(Json(outcome_message(outcome)))
}

pub async fn set_status(
    State(s): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<OrderId>,
    Query(q): Query<StatusQuery>,
) -> Result<Json<&'static str>> {
    s.shop.orders.set_status(principal.as_ref(), id, &q.status).await?;
    Ok(Json(messages::STATUS_CHANGED))
}
