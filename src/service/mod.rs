//! Use cases. Every operation receives the request's principal explicitly.

use std::sync::Arc;

use crate::auth::Access;
use crate::media::MediaStorage;
use crate::messaging::EventPublisher;
use crate::store::Repositories;

pub mod accounts;
pub mod catalog;
pub mod locks;
pub mod orders;
pub mod wishlist;

pub use accounts::AccountService;
pub use catalog::{CatalogService, ImageUpload, ProductDraft, ProductView};
pub use locks::UserLocks;
pub use orders::{OrderDetails, OrderLine, OrderService};
pub use wishlist::{WishlistEntry, WishlistService};

#[derive(Clone)]
pub struct Shop {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub wishlists: WishlistService,
    pub orders: OrderService,
}

impl Shop {
    pub fn new(repos: Repositories, media: MediaStorage, events: Arc<dyn EventPublisher>, access: Access) -> Self {
        let locks = Arc::new(UserLocks::new());
        Self {
            accounts: AccountService::new(repos.clone(), access.clone()),
            catalog: CatalogService::new(repos.clone(), media, events.clone(), access.clone()),
            wishlists: WishlistService::new(repos.clone(), events.clone(), locks.clone()),
            orders: OrderService::new(repos, events, access, locks),
        }
    }
}
