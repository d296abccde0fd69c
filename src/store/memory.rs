//! In-memory repositories.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::auth::{NewUser, User};
use crate::domain::aggregates::{Category, NewCategory, NewProduct, Order, Product, ProductChanges, ProductFilter, ProductOrder, Wishlist};
use crate::domain::value_objects::Slug;
use crate::domain::{CategoryId, OrderId, ProductId, UserId, WishlistId};
use crate::store::{CategoryRepository, OrderRepository, ProductRepository, SessionRepository, UserRepository, WishlistRepository};
use crate::{Result, ShopError};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    sessions: HashMap<String, UserId>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    wishlists: BTreeMap<WishlistId, Wishlist>,
    orders: BTreeMap<OrderId, Order>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn delete_product(&mut self, id: ProductId) -> bool {
        if self.products.remove(&id).is_none() { return false; }
        for wishlist in self.wishlists.values_mut() { wishlist.purge_product(id); }
        for order in self.orders.values_mut() { order.purge_product(id); }
        true
    }

    /// Lines must not bring back a product deleted after the container was read.
    fn require_products(&self, mut ids: impl Iterator<Item = ProductId>) -> Result<()> {
        if ids.all(|id| self.products.contains_key(&id)) { Ok(()) } else { Err(ShopError::NotFound("product")) }
    }
}

/// Single shared set of tables behind one lock, so every repository call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(ShopError::Conflict(format!("user '{}' already exists", user.username)));
        }
        let id = t.allocate_id();
        let user = User { id, username: user.username, password_hash: user.password_hash, is_superuser: user.is_superuser, groups: user.groups };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.values().find(|u| u.username == username).cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, token: &str, user_id: UserId) -> Result<()> {
        self.tables.write().await.sessions.insert(token.to_string(), user_id);
        Ok(())
    }

    async fn find_user(&self, token: &str) -> Result<Option<UserId>> {
        Ok(self.tables.read().await.sessions.get(token).copied())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: NewCategory) -> Result<Category> {
        let mut t = self.tables.write().await;
        if t.categories.values().any(|c| c.slug == category.slug) {
            return Err(ShopError::Conflict(format!("category slug '{}' already exists", category.slug)));
        }
        let id = t.allocate_id();
        let category = Category { id, title: category.title, slug: category.slug };
        t.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn list(&self) -> Result<Vec<Category>> {
        Ok(self.tables.read().await.categories.values().cloned().collect())
    }

    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.values().find(|c| &c.slug == slug).cloned())
    }

    async fn delete(&self, slug: &Slug) -> Result<bool> {
        let mut t = self.tables.write().await;
        let Some(id) = t.categories.values().find(|c| &c.slug == slug).map(|c| c.id) else {
            return Ok(false);
        };
        t.categories.remove(&id);
        let orphans: Vec<ProductId> = t.products.values().filter(|p| p.category_id == id).map(|p| p.id).collect();
        for product_id in orphans { t.delete_product(product_id); }
        Ok(true)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, product: NewProduct) -> Result<Product> {
        let mut t = self.tables.write().await;
        if !t.categories.contains_key(&product.category_id) {
            return Err(ShopError::NotFound("category"));
        }
        if t.products.values().any(|p| p.slug == product.slug) {
            return Err(ShopError::Conflict(format!("product slug '{}' already exists", product.slug)));
        }
        let id = t.allocate_id();
        let product = Product {
            id,
            title: product.title,
            slug: product.slug,
            price: product.price,
            description: product.description,
            image: product.image,
            category_id: product.category_id,
        };
        t.products.insert(id, product.clone());
        Ok(product)
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.values().find(|p| &p.slug == slug).cloned())
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let t = self.tables.read().await;
        let mut products: Vec<Product> = t.products.values().filter(|p| filter.matches(p)).cloned().collect();
        match filter.order {
            ProductOrder::Id => {}
            ProductOrder::PriceAscending => products.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
            ProductOrder::PriceDescending => products.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id))),
        }
        Ok(products)
    }

    async fn update(&self, id: ProductId, changes: ProductChanges) -> Result<Option<Product>> {
        let mut t = self.tables.write().await;
        if !t.categories.contains_key(&changes.category_id) {
            return Err(ShopError::NotFound("category"));
        }
        let Some(product) = t.products.get_mut(&id) else { return Ok(None) };
        product.apply(changes);
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId) -> Result<bool> {
        Ok(self.tables.write().await.delete_product(id))
    }
}

#[async_trait]
impl WishlistRepository for MemoryStore {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Wishlist>> {
        Ok(self.tables.read().await.wishlists.values().find(|w| w.user_id() == user_id).cloned())
    }

    async fn create(&self, user_id: UserId) -> Result<Wishlist> {
        let mut t = self.tables.write().await;
        if t.wishlists.values().any(|w| w.user_id() == user_id) {
            return Err(ShopError::Conflict(format!("user {user_id} already has a wishlist")));
        }
        let id = t.allocate_id();
        let wishlist = Wishlist::new(id, user_id);
        t.wishlists.insert(id, wishlist.clone());
        Ok(wishlist)
    }

    async fn save(&self, wishlist: &Wishlist) -> Result<()> {
        let mut t = self.tables.write().await;
        t.require_products(wishlist.items().iter().map(|i| i.product_id))?;
        let stored = t.wishlists.get_mut(&wishlist.id()).ok_or(ShopError::NotFound("wishlist"))?;
        *stored = wishlist.clone();
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn find_open(&self, user_id: UserId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.values().find(|o| o.user_id() == user_id && o.is_open()).cloned())
    }

    async fn create_open(&self, user_id: UserId, date: NaiveDate) -> Result<Order> {
        let mut t = self.tables.write().await;
        if t.orders.values().any(|o| o.user_id() == user_id && o.is_open()) {
            return Err(ShopError::Conflict(format!("user {user_id} already has an open order")));
        }
        let id = t.allocate_id();
        let order = Order::open(id, user_id, date);
        t.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().await.orders.values().cloned().collect())
    }

    async fn save(&self, order: &Order) -> Result<()> {
        let mut t = self.tables.write().await;
        t.require_products(order.items().iter().map(|i| i.product_id))?;
        let stored = t.orders.get_mut(&order.id()).ok_or(ShopError::NotFound("order"))?;
        if stored.status() != order.stored_status() {
            return Err(ShopError::Conflict(format!("order {} is {} by now", order.id(), stored.status())));
        }
        let mut saved = order.clone();
        saved.mark_stored();
        *stored = saved;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Count, Price};
    use crate::store::Repositories;
    use rust_decimal::Decimal;

    fn price(units: i64) -> Price { Price::new(Decimal::from(units)).unwrap() }

    async fn seed(repos: &Repositories) -> (Category, Product) {
        let category = repos.categories.create(NewCategory::from_title("Phones").unwrap()).await.unwrap();
        let product = repos
            .products
            .create(NewProduct::new("IPhone", category.id, "A very expensive phone", price(120_000), "").unwrap())
            .await
            .unwrap();
        (category, product)
    }

    #[tokio::test]
    async fn test_duplicate_slugs_conflict() {
        let repos = Repositories::memory();
        let (category, _) = seed(&repos).await;
        let err = repos.categories.create(NewCategory::from_title("phones").unwrap()).await.unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
        let err = repos
            .products
            .create(NewProduct::new("iphone", category.id, "again", price(1), "").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_category_delete_cascades_to_products_and_lines() {
        let repos = Repositories::memory();
        let (category, product) = seed(&repos).await;
        let mut order = repos.orders.create_open(1, NaiveDate::from_ymd_opt(2025, 5, 17).unwrap()).await.unwrap();
        order.add(product.id, product.price, Count::ONE).unwrap();
        repos.orders.save(&order).await.unwrap();

        assert!(repos.categories.delete(&category.slug).await.unwrap());
        assert!(repos.products.find_by_id(product.id).await.unwrap().is_none());
        let order = repos.orders.find_by_id(order.id()).await.unwrap().unwrap();
        assert!(order.items().is_empty());
        assert_eq!(order.total(), Decimal::ZERO);
        assert!(!repos.categories.delete(&category.slug).await.unwrap());
    }

    #[tokio::test]
    async fn test_price_ordering() {
        let repos = Repositories::memory();
        let (category, _) = seed(&repos).await;
        repos.products.create(NewProduct::new("Case", category.id, "Plastic", price(500), "").unwrap()).await.unwrap();
        let desc = repos.products.list(&ProductFilter { order: ProductOrder::PriceDescending, ..Default::default() }).await.unwrap();
        assert_eq!(desc.iter().map(|p| p.title.as_str()).collect::<Vec<_>>(), ["IPhone", "Case"]);
        let asc = repos.products.list(&ProductFilter { order: ProductOrder::PriceAscending, ..Default::default() }).await.unwrap();
        assert_eq!(asc[0].title, "Case");
    }

    #[tokio::test]
    async fn test_single_open_order_per_user() {
        let repos = Repositories::memory();
        let date = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();
        let mut order = repos.orders.create_open(7, date).await.unwrap();
        assert!(matches!(repos.orders.create_open(7, date).await, Err(ShopError::Conflict(_))));
        order.set_status(crate::domain::aggregates::OrderStatus::Paid).unwrap();
        repos.orders.save(&order).await.unwrap();
        assert!(repos.orders.find_open(7).await.unwrap().is_none());
        assert!(repos.orders.create_open(7, date).await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_order_cannot_overwrite_status() {
        use crate::domain::aggregates::OrderStatus;
        let repos = Repositories::memory();
        let (_, product) = seed(&repos).await;
        let order = repos.orders.create_open(1, NaiveDate::from_ymd_opt(2025, 5, 17).unwrap()).await.unwrap();

        let mut stale = order.clone();
        let mut paid = repos.orders.find_by_id(order.id()).await.unwrap().unwrap();
        paid.set_status(OrderStatus::Paid).unwrap();
        repos.orders.save(&paid).await.unwrap();

        stale.add(product.id, product.price, Count::ONE).unwrap();
        assert!(matches!(repos.orders.save(&stale).await, Err(ShopError::Conflict(_))));
        let stored = repos.orders.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Paid);
        assert!(stored.items().is_empty());

        let mut delivered = stored;
        delivered.set_status(OrderStatus::Delivered).unwrap();
        repos.orders.save(&delivered).await.unwrap();
    }

    #[tokio::test]
    async fn test_lines_of_deleted_product_are_not_saved_back() {
        let repos = Repositories::memory();
        let (_, product) = seed(&repos).await;
        let mut order = repos.orders.create_open(1, NaiveDate::from_ymd_opt(2025, 5, 17).unwrap()).await.unwrap();
        let mut wishlist = repos.wishlists.create(1).await.unwrap();
        order.add(product.id, product.price, Count::ONE).unwrap();
        wishlist.add(product.id, Count::ONE);

        assert!(repos.products.delete(product.id).await.unwrap());
        assert!(matches!(repos.orders.save(&order).await, Err(ShopError::NotFound("product"))));
        assert!(matches!(repos.wishlists.save(&wishlist).await, Err(ShopError::NotFound("product"))));
        assert!(repos.orders.find_by_id(order.id()).await.unwrap().unwrap().items().is_empty());
        assert!(repos.wishlists.find_by_user(1).await.unwrap().unwrap().is_empty());
    }
}
