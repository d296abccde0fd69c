//! Aggregates module
pub mod category;
pub mod order;
pub mod product;
pub mod wishlist;

pub use category::{Category, NewCategory};
pub use order::{Order, OrderError, OrderItem, OrderStatus};
pub use product::{NewProduct, Product, ProductChanges, ProductFilter, ProductOrder};
pub use wishlist::{Wishlist, WishlistItem};
