//! Domain model: catalog entities, wishlist and order aggregates.

pub mod aggregates;
pub mod events;
pub mod reconcile;
pub mod value_objects;

pub type UserId = i64;
pub type CategoryId = i64;
pub type ProductId = i64;
pub type WishlistId = i64;
pub type OrderId = i64;
