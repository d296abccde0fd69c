//! Wishlist Aggregate

use crate::domain::reconcile::{self, LineItem, Reconciled};
use crate::domain::value_objects::Count;
use crate::domain::{ProductId, UserId, WishlistId};

#[derive(Clone, Debug, PartialEq)]
pub struct Wishlist {
    id: WishlistId,
    user_id: UserId,
    items: Vec<WishlistItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WishlistItem { pub product_id: ProductId, pub count: Count }

impl LineItem for WishlistItem {
    fn product_id(&self) -> ProductId { self.product_id }
    fn count(&self) -> Count { self.count }
    fn set_count(&mut self, count: Count) { self.count = count; }
}

impl Wishlist {
    pub fn new(id: WishlistId, user_id: UserId) -> Self { Self { id, user_id, items: vec![] } }

    pub fn restore(id: WishlistId, user_id: UserId, items: Vec<WishlistItem>) -> Self { Self { id, user_id, items } }

    pub fn id(&self) -> WishlistId { self.id }
    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn items(&self) -> &[WishlistItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add(&mut self, product_id: ProductId, count: Count) -> Reconciled {
        reconcile::add(&mut self.items, product_id, count, |count| WishlistItem { product_id, count })
    }

    /// `None` if the wishlist has no line for the product.
    pub fn remove(&mut self, product_id: ProductId, count: Count) -> Option<Reconciled> {
        reconcile::remove(&mut self.items, product_id, count)
    }

    pub fn purge_product(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }
}
