//! Catalog products

use crate::domain::value_objects::{Price, Slug, SlugError};
use crate::domain::{CategoryId, ProductId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: Slug,
    pub price: Price,
    pub description: String,
    /// Path relative to the media root, e.g. `images/phone.png`.
    pub image: String,
    pub category_id: CategoryId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProduct {
    pub title: String,
    pub slug: Slug,
    pub price: Price,
    pub description: String,
    pub image: String,
    pub category_id: CategoryId,
}

impl NewProduct {
    pub fn new(title: impl Into<String>, category_id: CategoryId, description: impl Into<String>, price: Price, image: impl Into<String>) -> Result<Self, SlugError> {
        let title = title.into();
        let slug = Slug::from_title(&title)?;
        Ok(Self { title, slug, price, description: description.into(), image: image.into(), category_id })
    }
}

/// Editable product fields. The slug stays what it was at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductChanges {
    pub title: String,
    pub category_id: CategoryId,
    pub description: String,
    pub price: Price,
}

impl Product {
    pub const MAX_TITLE_CHARS: usize = 100;
    pub const MAX_DESCRIPTION_CHARS: usize = 300;

    pub fn apply(&mut self, changes: ProductChanges) {
        self.title = changes.title;
        self.category_id = changes.category_id;
        self.description = changes.description;
        self.price = changes.price;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductOrder { #[default] Id, PriceAscending, PriceDescending }

/// Listing criteria. Text filters are case-insensitive substring matches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub title_contains: Option<String>,
    pub description_contains: Option<String>,
    pub order: ProductOrder,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle.as_ref().map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
        }
        self.category_id.map_or(true, |id| product.category_id == id)
            && contains(&product.title, &self.title_contains)
            && contains(&product.description, &self.description_contains)
    }
}
