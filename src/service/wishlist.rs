use std::sync::Arc;

use tracing::info;

use crate::auth::{self, Principal};
use crate::domain::aggregates::{Product, Wishlist};
use crate::domain::events::{DomainEvent, WishlistEvent};
use crate::domain::reconcile::{Mode, Reconciled};
use crate::domain::value_objects::Count;
use crate::domain::ProductId;
use crate::messaging::EventPublisher;
use crate::service::UserLocks;
use crate::store::Repositories;
use crate::{Result, ShopError};

#[derive(Clone, Debug)]
pub struct WishlistEntry {
    pub product: Product,
    pub count: Count,
}

#[derive(Clone)]
pub struct WishlistService {
    repos: Repositories,
    events: Arc<dyn EventPublisher>,
    locks: Arc<UserLocks>,
}

impl WishlistService {
    pub fn new(repos: Repositories, events: Arc<dyn EventPublisher>, locks: Arc<UserLocks>) -> Self {
        Self { repos, events, locks }
    }

    /// The caller's wishlist lines. A user who never added anything has no wishlist.
    pub async fn get(&self, principal: Option<&Principal>) -> Result<Vec<WishlistEntry>> {
        let user = auth::require_user(principal)?;
        let wishlist = self.repos.wishlists.find_by_user(user.user_id).await?.ok_or(ShopError::NotFound("wishlist"))?;
        let mut entries = Vec::with_capacity(wishlist.items().len());
        for item in wishlist.items() {
            if let Some(product) = self.repos.products.find_by_id(item.product_id).await? {
                entries.push(WishlistEntry { product, count: item.count });
            }
        }
        Ok(entries)
    }

    /// Creates the wishlist on first use.
    pub async fn add(&self, principal: Option<&Principal>, product_id: ProductId, count: Count) -> Result<Reconciled> {
        let user = auth::require_user(principal)?;
        let _guard = self.locks.lock(user.user_id).await;
        if self.repos.products.find_by_id(product_id).await?.is_none() {
            return Err(ShopError::NotFound("product"));
        }
        let mut wishlist = match self.repos.wishlists.find_by_user(user.user_id).await? {
            Some(wishlist) => wishlist,
            None => self.repos.wishlists.create(user.user_id).await?,
        };
        let outcome = wishlist.add(product_id, count);
        self.commit(&wishlist, product_id, Mode::Add, outcome).await?;
        Ok(outcome)
    }

    pub async fn remove(&self, principal: Option<&Principal>, product_id: ProductId, count: Count) -> Result<Reconciled> {
        let user = auth::require_user(principal)?;
        let _guard = self.locks.lock(user.user_id).await;
        let mut wishlist = self.repos.wishlists.find_by_user(user.user_id).await?.ok_or(ShopError::NotFound("wishlist"))?;
        let outcome = wishlist.remove(product_id, count).ok_or(ShopError::NotFound("wishlist item"))?;
        self.commit(&wishlist, product_id, Mode::Remove, outcome).await?;
        Ok(outcome)
    }

    async fn commit(&self, wishlist: &Wishlist, product_id: ProductId, mode: Mode, outcome: Reconciled) -> Result<()> {
        self.repos.wishlists.save(wishlist).await?;
        info!(user_id = wishlist.user_id(), product_id, ?outcome, "wishlist reconciled");
        self.events
            .publish(DomainEvent::Wishlist(WishlistEvent::Reconciled { user_id: wishlist.user_id(), product_id, mode, outcome }))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{NewCategory, NewProduct};
    use crate::domain::value_objects::Price;
    use crate::messaging::MemoryPublisher;
    use rust_decimal::Decimal;

    async fn setup() -> (WishlistService, Repositories, Arc<MemoryPublisher>, ProductId, ProductId) {
        let repos = Repositories::memory();
        let category = repos.categories.create(NewCategory::from_title("Phones").unwrap()).await.unwrap();
        let mut ids = vec![];
        for (title, price) in [("IPhone", 120_000), ("Case", 15)] {
            let new = NewProduct::new(title, category.id, "", Price::new(Decimal::from(price)).unwrap(), "").unwrap();
            ids.push(repos.products.create(new).await.unwrap().id);
        }
        let events = Arc::new(MemoryPublisher::new());
        let service = WishlistService::new(repos.clone(), events.clone(), Arc::new(UserLocks::new()));
        (service, repos, events, ids[0], ids[1])
    }

    fn user(id: i64) -> Principal { Principal { user_id: id, username: format!("user{id}"), is_superuser: false, groups: vec![] } }

    fn count(n: u32) -> Count { Count::new(n).unwrap() }

    #[tokio::test]
    async fn test_add_creates_wishlist_then_merges() {
        let (wishlists, _, events, phone, _) = setup().await;
        let u = user(1);
        assert!(matches!(wishlists.get(Some(&u)).await, Err(ShopError::NotFound("wishlist"))));

        assert_eq!(wishlists.add(Some(&u), phone, count(2)).await.unwrap(), Reconciled::Created { count: count(2) });
        assert_eq!(wishlists.add(Some(&u), phone, count(3)).await.unwrap(), Reconciled::Merged { count: count(5) });

        let entries = wishlists.get(Some(&u)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].count, count(5));
        assert_eq!(events.events().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_exact_count_deletes_line() {
        let (wishlists, _, _, phone, case) = setup().await;
        let u = user(1);
        wishlists.add(Some(&u), phone, count(3)).await.unwrap();
        wishlists.add(Some(&u), case, count(3)).await.unwrap();

        assert_eq!(wishlists.remove(Some(&u), phone, count(3)).await.unwrap(), Reconciled::Removed);
        assert_eq!(wishlists.remove(Some(&u), case, count(2)).await.unwrap(), Reconciled::Decremented { count: count(1) });

        let entries = wishlists.get(Some(&u)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product.id, case);
        assert_eq!(entries[0].count, count(1));
    }

    #[tokio::test]
    async fn test_remove_unknown_line_is_not_found() {
        let (wishlists, _, events, phone, case) = setup().await;
        let u = user(1);
        assert!(matches!(wishlists.remove(Some(&u), phone, count(1)).await, Err(ShopError::NotFound("wishlist"))));
        wishlists.add(Some(&u), phone, count(1)).await.unwrap();
        assert!(matches!(wishlists.remove(Some(&u), case, count(1)).await, Err(ShopError::NotFound("wishlist item"))));
        assert_eq!(events.events().len(), 1);
    }

    #[tokio::test]
    async fn test_requires_login_and_known_product() {
        let (wishlists, _, _, phone, _) = setup().await;
        assert!(matches!(wishlists.add(None, phone, count(1)).await, Err(ShopError::Unauthorized)));
        assert!(matches!(wishlists.add(Some(&user(1)), 999, count(1)).await, Err(ShopError::NotFound("product"))));
    }

    #[tokio::test]
    async fn test_wishlists_are_per_user() {
        let (wishlists, _, _, phone, _) = setup().await;
        wishlists.add(Some(&user(1)), phone, count(1)).await.unwrap();
        assert!(matches!(wishlists.remove(Some(&user(2)), phone, count(1)).await, Err(ShopError::NotFound("wishlist"))));
        assert_eq!(wishlists.get(Some(&user(1))).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_merge_into_one_line() {
        let (wishlists, _, _, phone, _) = setup().await;
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let wishlists = wishlists.clone();
                tokio::spawn(async move { wishlists.add(Some(&user(1)), phone, count(1)).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        let entries = wishlists.get(Some(&user(1))).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].count, count(8));
    }
}
