//! Repositories, one trait per entity.
//!
//! # Implementations
//!
//! - `MemoryStore`: everything in process, used for tests and when no database is configured
//! - `PgStore`: PostgreSQL through `sqlx`, schema in `migrations/`
//!
//! Both delete products together with their category and line items together with
//! their product, and both reject a duplicate slug with `ShopError::Conflict`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::auth::{NewUser, User};
use crate::domain::aggregates::{Category, NewCategory, NewProduct, Order, Product, ProductChanges, ProductFilter, Wishlist};
use crate::domain::value_objects::Slug;
use crate::domain::{CategoryId, OrderId, ProductId, UserId};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, token: &str, user_id: UserId) -> Result<()>;
    async fn find_user(&self, token: &str) -> Result<Option<UserId>>;
    async fn delete(&self, token: &str) -> Result<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: NewCategory) -> Result<Category>;
    async fn list(&self) -> Result<Vec<Category>>;
    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>>;
    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Category>>;
    /// Removes the category and, with it, its products. Returns `false` if it did not exist.
    async fn delete(&self, slug: &Slug) -> Result<bool>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: NewProduct) -> Result<Product>;
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>>;
    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Product>>;
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
    async fn update(&self, id: ProductId, changes: ProductChanges) -> Result<Option<Product>>;
    /// Removes the product and every line item referring to it.
    async fn delete(&self, id: ProductId) -> Result<bool>;
}

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Wishlist>>;
    async fn create(&self, user_id: UserId) -> Result<Wishlist>;
    /// Replaces the stored line items with the aggregate's.
    async fn save(&self, wishlist: &Wishlist) -> Result<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;
    /// The user's order in status `new`, if any.
    async fn find_open(&self, user_id: UserId) -> Result<Option<Order>>;
    async fn create_open(&self, user_id: UserId, date: NaiveDate) -> Result<Order>;
    async fn list(&self) -> Result<Vec<Order>>;
    /// Persists status, total and line items in one step.
    async fn save(&self, order: &Order) -> Result<()>;
}

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub wishlists: Arc<dyn WishlistRepository>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Repositories {
    pub fn memory() -> Self { Self::backed_by(Arc::new(MemoryStore::new())) }

    pub fn postgres(pool: sqlx::PgPool) -> Self { Self::backed_by(Arc::new(PgStore::new(pool))) }

    /// Every repository served by the one store.
    pub fn backed_by<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + SessionRepository + CategoryRepository + ProductRepository + WishlistRepository + OrderRepository + 'static,
    {
        Self {
            users: store.clone(),
            sessions: store.clone(),
            categories: store.clone(),
            products: store.clone(),
            wishlists: store.clone(),
            orders: store,
        }
    }
}
