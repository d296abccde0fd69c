//! PostgreSQL repositories.
//!
//! Cascades come from the foreign keys in `migrations/`. Aggregates are written back
//! inside a transaction that first locks their container row.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::auth::{NewUser, User};
use crate::domain::aggregates::{
    Category, NewCategory, NewProduct, Order, OrderItem, OrderStatus, Product, ProductChanges, ProductFilter, ProductOrder, Wishlist, WishlistItem,
};
use crate::domain::value_objects::{Count, Price, Slug};
use crate::domain::{CategoryId, OrderId, ProductId, UserId};
use crate::store::{CategoryRepository, OrderRepository, ProductRepository, SessionRepository, UserRepository, WishlistRepository};
use crate::{Result, ShopError};

const USER_SELECT: &str = "SELECT u.id, u.username, u.password_hash, u.is_superuser, \
     COALESCE(array_agg(g.group_name::text) FILTER (WHERE g.group_name IS NOT NULL), '{}'::text[]) AS groups \
     FROM users u LEFT JOIN user_groups g ON g.user_id = u.id";
const PRODUCT_COLUMNS: &str = "id, title, slug, price, description, image, category_id";
const ORDER_COLUMNS: &str = "id, user_id, date, status, total";
const RECOMPUTE_OPEN_TOTALS: &str = "UPDATE orders o SET total = COALESCE( \
     (SELECT SUM(i.price * i.count) FROM order_items i WHERE i.order_id = o.id), 0) \
     WHERE o.status = 'new'";

#[derive(sqlx::FromRow)]
struct UserRow { id: i64, username: String, password_hash: String, is_superuser: bool, groups: Vec<String> }

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User { id: r.id, username: r.username, password_hash: r.password_hash, is_superuser: r.is_superuser, groups: r.groups }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow { id: i64, title: String, slug: String }

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self { Category { id: r.id, title: r.title, slug: Slug::from_stored(r.slug) } }
}

#[derive(sqlx::FromRow)]
struct ProductRow { id: i64, title: String, slug: String, price: Decimal, description: String, image: String, category_id: i64 }

impl TryFrom<ProductRow> for Product {
    type Error = ShopError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id,
            title: r.title,
            slug: Slug::from_stored(r.slug),
            price: Price::new(r.price).map_err(corrupt)?,
            description: r.description,
            image: r.image,
            category_id: r.category_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow { id: i64, user_id: i64, date: NaiveDate, status: String, total: Decimal }

#[derive(sqlx::FromRow)]
struct OrderItemRow { order_id: i64, product_id: i64, price: Decimal, count: i64 }

#[derive(sqlx::FromRow)]
struct WishlistItemRow { product_id: i64, count: i64 }

/// Stored data that no longer satisfies a domain invariant.
fn corrupt<E: std::error::Error + Send + Sync + 'static>(err: E) -> ShopError {
    ShopError::Storage(sqlx::Error::Decode(Box::new(err)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// A line refers to a product deleted after the container was read.
fn deleted_product(err: sqlx::Error) -> ShopError {
    if is_foreign_key_violation(&err) { ShopError::NotFound("product") } else { err.into() }
}

/// `%needle%` for ILIKE with the wildcard characters of `needle` escaped.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') { pattern.push('\\'); }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn load_orders(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>("SELECT order_id, product_id, price, count FROM order_items WHERE order_id = ANY($1) ORDER BY id")
            .bind(&ids[..])
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| -> Result<Order> {
                let lines = items
                    .iter()
                    .filter(|i| i.order_id == row.id)
                    .map(|i| -> Result<OrderItem> { Ok(OrderItem { product_id: i.product_id, price: Price::new(i.price).map_err(corrupt)?, count: Count::try_from(i.count).map_err(corrupt)? }) })
                    .collect::<Result<Vec<_>>>()?;
                let status: OrderStatus = row.status.parse().map_err(corrupt)?;
                Ok(Order::restore(row.id, row.user_id, row.date, status, row.total, lines))
            })
            .collect()
    }

    async fn lock_row(tx: &mut Transaction<'_, Postgres>, table: &'static str, id: i64) -> Result<bool> {
        let row = sqlx::query(&format!("SELECT id FROM {table} WHERE id = $1 FOR UPDATE")).bind(id).fetch_optional(&mut **tx).await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;
        let (id,): (i64,) = sqlx::query_as("INSERT INTO users (username, password_hash, is_superuser) VALUES ($1, $2, $3) RETURNING id")
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.is_superuser)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| if is_unique_violation(&e) { ShopError::Conflict(format!("user '{}' already exists", user.username)) } else { e.into() })?;
        for group in &user.groups {
            sqlx::query("INSERT INTO user_groups (user_id, group_name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(id)
                .bind(group)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(User { id, username: user.username, password_hash: user.password_hash, is_superuser: user.is_superuser, groups: user.groups })
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE u.id = $1 GROUP BY u.id"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE u.username = $1 GROUP BY u.id"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} GROUP BY u.id ORDER BY u.id")).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn create(&self, token: &str, user_id: UserId) -> Result<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES ($1, $2, NOW())").bind(token).bind(user_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, token: &str) -> Result<Option<UserId>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM sessions WHERE token = $1").bind(token).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id,)| id))
    }

    async fn delete(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1").bind(token).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn create(&self, category: NewCategory) -> Result<Category> {
        let row = sqlx::query_as::<_, CategoryRow>("INSERT INTO categories (title, slug) VALUES ($1, $2) RETURNING id, title, slug")
            .bind(&category.title)
            .bind(category.slug.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| if is_unique_violation(&e) { ShopError::Conflict(format!("category slug '{}' already exists", category.slug)) } else { e.into() })?;
        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT id, title, slug FROM categories ORDER BY id").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>("SELECT id, title, slug FROM categories WHERE id = $1").bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Category::from))
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>("SELECT id, title, slug FROM categories WHERE slug = $1")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Category::from))
    }

    async fn delete(&self, slug: &Slug) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM categories WHERE slug = $1").bind(slug.as_str()).execute(&mut *tx).await?.rows_affected() > 0;
        if deleted {
            sqlx::query(RECOMPUTE_OPEN_TOTALS).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn create(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (title, slug, price, description, image, category_id) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.title)
        .bind(product.slug.as_str())
        .bind(product.price.amount())
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ShopError::Conflict(format!("product slug '{}' already exists", product.slug))
            } else if is_foreign_key_violation(&e) {
                ShopError::NotFound("category")
            } else {
                e.into()
            }
        })?;
        row.try_into()
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"))
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(title) = &filter.title_contains {
            query.push(" AND title ILIKE ").push_bind(like_pattern(title));
        }
        if let Some(description) = &filter.description_contains {
            query.push(" AND description ILIKE ").push_bind(like_pattern(description));
        }
        query.push(match filter.order {
            ProductOrder::Id => " ORDER BY id",
            ProductOrder::PriceAscending => " ORDER BY price ASC, id",
            ProductOrder::PriceDescending => " ORDER BY price DESC, id",
        });
        let rows = query.build_query_as::<ProductRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn update(&self, id: ProductId, changes: ProductChanges) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET title = $2, category_id = $3, description = $4, price = $5 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(changes.category_id)
        .bind(&changes.description)
        .bind(changes.price.amount())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| if is_foreign_key_violation(&e) { ShopError::NotFound("category") } else { e.into() })?;
        row.map(Product::try_from).transpose()
    }

    async fn delete(&self, id: ProductId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&mut *tx).await?.rows_affected() > 0;
        if deleted {
            sqlx::query(RECOMPUTE_OPEN_TOTALS).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl WishlistRepository for PgStore {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Wishlist>> {
        let Some((id,)): Option<(i64,)> = sqlx::query_as("SELECT id FROM wishlists WHERE user_id = $1").bind(user_id).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let rows = sqlx::query_as::<_, WishlistItemRow>("SELECT product_id, count FROM wishlist_items WHERE wishlist_id = $1 ORDER BY id")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .into_iter()
            .map(|r| -> Result<WishlistItem> { Ok(WishlistItem { product_id: r.product_id, count: Count::try_from(r.count).map_err(corrupt)? }) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Wishlist::restore(id, user_id, items)))
    }

    async fn create(&self, user_id: UserId) -> Result<Wishlist> {
        let (id,): (i64,) = sqlx::query_as("INSERT INTO wishlists (user_id) VALUES ($1) RETURNING id")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| if is_unique_violation(&e) { ShopError::Conflict(format!("user {user_id} already has a wishlist")) } else { e.into() })?;
        Ok(Wishlist::new(id, user_id))
    }

    async fn save(&self, wishlist: &Wishlist) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_row(&mut tx, "wishlists", wishlist.id()).await? {
            return Err(ShopError::NotFound("wishlist"));
        }
        sqlx::query("DELETE FROM wishlist_items WHERE wishlist_id = $1").bind(wishlist.id()).execute(&mut *tx).await?;
        if !wishlist.items().is_empty() {
            let mut insert = QueryBuilder::<Postgres>::new("INSERT INTO wishlist_items (wishlist_id, product_id, count) ");
            insert.push_values(wishlist.items(), |mut row, item| {
                row.push_bind(wishlist.id()).push_bind(item.product_id).push_bind(i64::from(item.count.value()));
            });
            insert.build().execute(&mut *tx).await.map_err(deleted_product)?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1")).bind(id).fetch_all(&self.pool).await?;
        Ok(self.load_orders(rows).await?.pop())
    }

    async fn find_open(&self, user_id: UserId) -> Result<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND status = 'new'"))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(self.load_orders(rows).await?.pop())
    }

    async fn create_open(&self, user_id: UserId, date: NaiveDate) -> Result<Order> {
        let (id,): (i64,) = sqlx::query_as("INSERT INTO orders (user_id, date, status, total) VALUES ($1, $2, 'new', 0) RETURNING id")
            .bind(user_id)
            .bind(date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| if is_unique_violation(&e) { ShopError::Conflict(format!("user {user_id} already has an open order")) } else { e.into() })?;
        Ok(Order::open(id, user_id, date))
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id")).fetch_all(&self.pool).await?;
        self.load_orders(rows).await
    }

    async fn save(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_row(&mut tx, "orders", order.id()).await? {
            return Err(ShopError::NotFound("order"));
        }
        let updated = sqlx::query("UPDATE orders SET status = $2, total = $3 WHERE id = $1 AND status = $4")
            .bind(order.id())
            .bind(order.status().as_str())
            .bind(order.total())
            .bind(order.stored_status().as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(ShopError::Conflict(format!("order {} changed status concurrently", order.id())));
        }
        sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(order.id()).execute(&mut *tx).await?;
        if !order.items().is_empty() {
            let mut insert = QueryBuilder::<Postgres>::new("INSERT INTO order_items (order_id, product_id, price, count) ");
            insert.push_values(order.items(), |mut row, item| {
                row.push_bind(order.id()).push_bind(item.product_id).push_bind(item.price.amount()).push_bind(i64::from(item.count.value()));
            });
            insert.build().execute(&mut *tx).await.map_err(deleted_product)?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("phone"), "%phone%");
        assert_eq!(like_pattern("100%_off\\"), "%100\\%\\_off\\\\%");
    }
}
