use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::reconcile::Reconciled;
use crate::domain::value_objects::{Count, Price};
use crate::domain::ProductId;
use crate::http::extract::MaybePrincipal;
use crate::http::{messages, AppState};
use crate::service::WishlistEntry;
use crate::Result;

/// Body of every add/remove request, for wishlists and orders alike.
#[derive(Debug, Deserialize, Validate)]
pub struct LineRequest {
    pub product: ProductId,
    #[serde(default = "one")]
    #[validate(range(min = 1))]
    pub count: i64,
}

fn one() -> i64 { 1 }

impl LineRequest {
    pub fn count(&self) -> Result<Count> {
        self.validate()?;
        Ok(Count::try_from(self.count)?)
    }
}

pub fn outcome_message(outcome: Reconciled) -> &'static str {
    match outcome {
        Reconciled::Created { .. } => messages::LINE_CREATED,
        Reconciled::Removed => messages::LINE_DELETED,
        Reconciled::Merged { .. } | Reconciled::Decremented { .. } => messages::LINE_UPDATED,
    }
}

#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub title: String,
    pub price: Price,
}

#[derive(Debug, Serialize)]
pub struct WishlistLine {
    pub product: ProductSummary,
    pub count: Count,
}

impl From<WishlistEntry> for WishlistLine {
    fn from(e: WishlistEntry) -> Self {
        Self { product: ProductSummary { title: e.product.title, price: e.product.price }, count: e.count }
    }
}

pub async fn get_wishlist(State(s): State<AppState>, principal: MaybePrincipal) -> Result<Json<Vec<WishlistLine>>> {
    let entries = s.shop.wishlists.get(principal.as_ref()).await?;
    Ok(Json(entries.into_iter().map(WishlistLine::from).collect()))
}

pub async fn add_to_wishlist(State(s): State<AppState>, principal: MaybePrincipal, Json(r): Json<LineRequest>) -> Result<Json<&'static str>> {
    let outcome = s.shop.wishlists.add(principal.as_ref(), r.product, r.count()?).await?;
    Ok(Json(outcome_message(outcome)))
}

pub async fn remove_from_wishlist(State(s): State<AppState>, principal: MaybePrincipal, Json(r): Json<LineRequest>) -> Result<Json<&'static str>> {
    let outcome = s.shop.wishlists.remove(principal.as_ref(), r.product, r.count()?).await?;
    Ok(Json(outcome_message(outcome)))
}
