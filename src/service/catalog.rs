//! Categories and products.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::auth::{Access, Principal};
use crate::domain::aggregates::{Category, NewCategory, NewProduct, Product, ProductChanges, ProductFilter, ProductOrder};
use crate::domain::events::{CatalogEvent, DomainEvent};
use crate::domain::value_objects::{Price, Slug};
use crate::domain::{CategoryId, ProductId};
use crate::media::MediaStorage;
use crate::messaging::EventPublisher;
use crate::store::Repositories;
use crate::{Result, ShopError};

/// Product fields as submitted for create and update.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub title: String,
    pub category_id: CategoryId,
    pub description: String,
    pub price: Decimal,
}

impl ProductDraft {
    fn check_lengths(&self) -> Result<()> {
        check_length("title", &self.title, Product::MAX_TITLE_CHARS)?;
        check_length("description", &self.description, Product::MAX_DESCRIPTION_CHARS)
    }
}

/// Lengths count characters, the way the database columns do.
fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(ShopError::Validation(format!("{field} is {len} characters long, at most {max} allowed")));
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A product together with the category it belongs to.
#[derive(Clone, Debug)]
pub struct ProductView {
    pub product: Product,
    pub category: Category,
}

#[derive(Clone)]
pub struct CatalogService {
    repos: Repositories,
    media: MediaStorage,
    events: Arc<dyn EventPublisher>,
    access: Access,
}

impl CatalogService {
    pub fn new(repos: Repositories, media: MediaStorage, events: Arc<dyn EventPublisher>, access: Access) -> Self {
        Self { repos, media, events, access }
    }

    pub async fn create_category(&self, principal: Option<&Principal>, title: &str) -> Result<Category> {
        self.access.require_manager(principal)?;
        check_length("title", title, Category::MAX_TITLE_CHARS)?;
        let category = self.repos.categories.create(NewCategory::from_title(title)?).await?;
        info!(category_id = category.id, slug = %category.slug, "category created");
        self.events
            .publish(DomainEvent::Catalog(CatalogEvent::CategoryCreated { category_id: category.id, slug: category.slug.to_string() }))
            .await;
        Ok(category)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> { self.repos.categories.list().await }

    pub async fn get_category(&self, slug: &str) -> Result<Category> {
        self.repos.categories.find_by_slug(&Slug::from_stored(slug)).await?.ok_or(ShopError::NotFound("category"))
    }

    /// Deletes the category with all of its products.
    pub async fn delete_category(&self, principal: Option<&Principal>, slug: &str) -> Result<()> {
        self.access.require_manager(principal)?;
        let category = self.get_category(slug).await?;
        let products = self.repos.products.list(&ProductFilter { category_id: Some(category.id), ..Default::default() }).await?;
        if !self.repos.categories.delete(&category.slug).await? {
            return Err(ShopError::NotFound("category"));
        }
        for product in &products {
            self.media.remove(&product.image).await;
        }
        info!(slug = %category.slug, products = products.len(), "category deleted");
        self.events.publish(DomainEvent::Catalog(CatalogEvent::CategoryDeleted { slug: category.slug.into_inner() })).await;
        Ok(())
    }

    pub async fn create_product(&self, principal: Option<&Principal>, draft: ProductDraft, image: ImageUpload) -> Result<Product> {
        self.access.require_manager(principal)?;
        draft.check_lengths()?;
        let price = Price::new(draft.price)?;
        self.require_category(draft.category_id).await?;
        let new = NewProduct::new(draft.title, draft.category_id, draft.description, price, String::new())?;
        if self.repos.products.find_by_slug(&new.slug).await?.is_some() {
            return Err(ShopError::Conflict(format!("product slug '{}' already exists", new.slug)));
        }

        let image_path = self.media.save_image(&image.file_name, &image.bytes).await?;
        let product = match self.repos.products.create(NewProduct { image: image_path.clone(), ..new }).await {
            Ok(product) => product,
            Err(e) => {
                self.media.remove(&image_path).await;
                return Err(e);
            }
        };
        info!(product_id = product.id, slug = %product.slug, "product created");
        self.events
            .publish(DomainEvent::Catalog(CatalogEvent::ProductCreated { product_id: product.id, slug: product.slug.to_string() }))
            .await;
        Ok(product)
    }

    pub async fn list_products(&self) -> Result<Vec<ProductView>> {
        let products = self.repos.products.list(&ProductFilter::default()).await?;
        self.with_categories(products).await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<ProductView> {
        let product = self.repos.products.find_by_id(id).await?.ok_or(ShopError::NotFound("product"))?;
        let category = self.require_category(product.category_id).await?;
        Ok(ProductView { product, category })
    }

    /// The slug keeps the value derived at creation.
    pub async fn update_product(&self, principal: Option<&Principal>, id: ProductId, draft: ProductDraft) -> Result<Product> {
        self.access.require_manager(principal)?;
        draft.check_lengths()?;
        let price = Price::new(draft.price)?;
        self.require_category(draft.category_id).await?;
        let changes = ProductChanges { title: draft.title, category_id: draft.category_id, description: draft.description, price };
        let product = self.repos.products.update(id, changes).await?.ok_or(ShopError::NotFound("product"))?;
        info!(product_id = id, "product updated");
        self.events.publish(DomainEvent::Catalog(CatalogEvent::ProductUpdated { product_id: id })).await;
        Ok(product)
    }

    pub async fn delete_product(&self, principal: Option<&Principal>, id: ProductId) -> Result<()> {
        self.access.require_manager(principal)?;
        let product = self.repos.products.find_by_id(id).await?.ok_or(ShopError::NotFound("product"))?;
        if !self.repos.products.delete(id).await? {
            return Err(ShopError::NotFound("product"));
        }
        self.media.remove(&product.image).await;
        info!(product_id = id, "product deleted");
        self.events.publish(DomainEvent::Catalog(CatalogEvent::ProductDeleted { product_id: id })).await;
        Ok(())
    }

    pub async fn products_in_category(&self, slug: &str) -> Result<Vec<ProductView>> {
        let category = self.get_category(slug).await?;
        let products = self.repos.products.list(&ProductFilter { category_id: Some(category.id), ..Default::default() }).await?;
        Ok(products.into_iter().map(|product| ProductView { product, category: category.clone() }).collect())
    }

    pub async fn products_by_price(&self, order: ProductOrder) -> Result<Vec<Product>> {
        self.repos.products.list(&ProductFilter { order, ..Default::default() }).await
    }

    pub async fn search_by_title(&self, needle: &str) -> Result<Vec<Product>> {
        self.repos.products.list(&ProductFilter { title_contains: Some(needle.to_string()), ..Default::default() }).await
    }

    pub async fn search_by_description(&self, needle: &str) -> Result<Vec<Product>> {
        self.repos.products.list(&ProductFilter { description_contains: Some(needle.to_string()), ..Default::default() }).await
    }

    async fn require_category(&self, id: CategoryId) -> Result<Category> {
        self.repos.categories.find_by_id(id).await?.ok_or(ShopError::NotFound("category"))
    }

    async fn with_categories(&self, products: Vec<Product>) -> Result<Vec<ProductView>> {
        let categories: HashMap<CategoryId, Category> = self.repos.categories.list().await?.into_iter().map(|c| (c.id, c)).collect();
        Ok(products
            .into_iter()
            .filter_map(|product| match categories.get(&product.category_id) {
                Some(category) => Some(ProductView { category: category.clone(), product }),
                None => {
                    warn!(product_id = product.id, "product without category skipped");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::MemoryPublisher;

    struct Fixture {
        catalog: CatalogService,
        events: Arc<MemoryPublisher>,
        manager: Principal,
        media_dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let media = tempfile::tempdir().unwrap();
        let events = Arc::new(MemoryPublisher::new());
        let catalog = CatalogService::new(Repositories::memory(), MediaStorage::new(media.path()), events.clone(), Access::new("Менеджер"));
        let manager = Principal { user_id: 1, username: "manager".into(), is_superuser: false, groups: vec!["Менеджер".into()] };
        Fixture { catalog, events, manager, media_dir: media }
    }

    fn draft(title: &str, category_id: CategoryId, price: i64) -> ProductDraft {
        ProductDraft { title: title.into(), category_id, description: format!("{title} description"), price: Decimal::from(price) }
    }

    fn image() -> ImageUpload { ImageUpload { file_name: "photo.png".into(), bytes: vec![1, 2, 3] } }

    #[tokio::test]
    async fn test_create_category_derives_slug() {
        let f = fixture();
        let category = f.catalog.create_category(Some(&f.manager), "new Category").await.unwrap();
        assert_eq!(category.slug.as_str(), "new-category");
        assert_eq!(f.catalog.get_category("new-category").await.unwrap(), category);
        assert_eq!(f.events.events().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_product_slug_is_conflict_and_leaves_no_file() {
        let f = fixture();
        let category = f.catalog.create_category(Some(&f.manager), "Phones").await.unwrap();
        f.catalog.create_product(Some(&f.manager), draft("IPhone", category.id, 120_000), image()).await.unwrap();
        let err = f.catalog.create_product(Some(&f.manager), draft("iPhone", category.id, 1), image()).await.unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
        let files = std::fs::read_dir(f.media_dir.path().join("images")).unwrap().count();
        assert_eq!(files, 1);
    }

    #[tokio::test]
    async fn test_product_requires_existing_category() {
        let f = fixture();
        let err = f.catalog.create_product(Some(&f.manager), draft("IPhone", 99, 1), image()).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound("category")));
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let f = fixture();
        let category = f.catalog.create_category(Some(&f.manager), "Phones").await.unwrap();
        let err = f.catalog.create_product(Some(&f.manager), draft("IPhone", category.id, -5), image()).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn test_title_and_description_lengths_are_capped() {
        let f = fixture();
        let err = f.catalog.create_category(Some(&f.manager), &"a".repeat(150)).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        f.catalog.create_category(Some(&f.manager), &"ф".repeat(100)).await.unwrap();

        let category = f.catalog.create_category(Some(&f.manager), "Phones").await.unwrap();
        let err = f.catalog.create_product(Some(&f.manager), draft(&"a".repeat(101), category.id, 10), image()).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        let long_description = ProductDraft { description: "d".repeat(301), ..draft("IPhone", category.id, 10) };
        let err = f.catalog.create_product(Some(&f.manager), long_description, image()).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));

        let product = f.catalog.create_product(Some(&f.manager), draft("IPhone", category.id, 10), image()).await.unwrap();
        let err = f.catalog.update_product(Some(&f.manager), product.id, draft(&"b".repeat(101), category.id, 10)).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        assert_eq!(f.catalog.get_product(product.id).await.unwrap().product.title, "IPhone");
    }

    #[tokio::test]
    async fn test_delete_category_removes_products() {
        let f = fixture();
        let category = f.catalog.create_category(Some(&f.manager), "Phones").await.unwrap();
        let product = f.catalog.create_product(Some(&f.manager), draft("IPhone", category.id, 10), image()).await.unwrap();
        f.catalog.delete_category(Some(&f.manager), "phones").await.unwrap();
        assert!(matches!(f.catalog.get_product(product.id).await, Err(ShopError::NotFound("product"))));
        assert!(!f.media_dir.path().join(&product.image).exists());
    }

    #[tokio::test]
    async fn test_update_keeps_slug() {
        let f = fixture();
        let phones = f.catalog.create_category(Some(&f.manager), "Phones").await.unwrap();
        let other = f.catalog.create_category(Some(&f.manager), "Other").await.unwrap();
        let product = f.catalog.create_product(Some(&f.manager), draft("IPhone", phones.id, 10), image()).await.unwrap();
        let updated = f.catalog.update_product(Some(&f.manager), product.id, draft("IPhone 2", other.id, 20)).await.unwrap();
        assert_eq!(updated.slug.as_str(), "iphone");
        assert_eq!(updated.title, "IPhone 2");
        assert_eq!(f.catalog.get_product(product.id).await.unwrap().category, other);
    }

    #[tokio::test]
    async fn test_searches() {
        let f = fixture();
        let category = f.catalog.create_category(Some(&f.manager), "Phones").await.unwrap();
        f.catalog.create_product(Some(&f.manager), draft("IPhone", category.id, 120_000), image()).await.unwrap();
        f.catalog.create_product(Some(&f.manager), draft("Case", category.id, 15), image()).await.unwrap();
        assert_eq!(f.catalog.search_by_title("phone").await.unwrap().len(), 1);
        assert_eq!(f.catalog.search_by_description("DESCRIPTION").await.unwrap().len(), 2);
        assert!(f.catalog.search_by_title("something-silly").await.unwrap().is_empty());
        let cheapest_first = f.catalog.products_by_price(ProductOrder::PriceAscending).await.unwrap();
        assert_eq!(cheapest_first[0].title, "Case");
    }

    #[tokio::test]
    async fn test_ordinary_user_cannot_manage() {
        let f = fixture();
        let user = Principal { user_id: 2, username: "user".into(), is_superuser: false, groups: vec![] };
        assert!(matches!(f.catalog.create_category(Some(&user), "X").await, Err(ShopError::Forbidden)));
        assert!(matches!(f.catalog.create_category(None, "X").await, Err(ShopError::Forbidden)));
        assert!(f.catalog.list_categories().await.unwrap().is_empty());
    }
}
