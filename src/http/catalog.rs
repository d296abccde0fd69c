use std::str::FromStr;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::domain::aggregates::{Category, Product, ProductOrder};
use crate::domain::value_objects::Price;
use crate::domain::{CategoryId, ProductId};
use crate::http::extract::MaybePrincipal;
use crate::http::{messages, AppState};
use crate::service::{ImageUpload, ProductDraft, ProductView};
use crate::{Result, ShopError};

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub category: CategoryId,
    #[serde(default)]
    #[validate(length(max = 300))]
    pub description: String,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CategoryTitle {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub category: CategoryTitle,
    pub description: String,
    pub price: Price,
    pub image: String,
}

impl From<ProductView> for ProductResponse {
    fn from(view: ProductView) -> Self {
        let p = view.product;
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug.into_inner(),
            category: CategoryTitle { title: view.category.title },
            description: p.description,
            price: p.price,
            image: format!("/media/{}", p.image),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PricedTitle {
    pub title: String,
    pub price: Price,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub description: String,
    pub price: Price,
}

impl From<Product> for SearchHit {
    fn from(p: Product) -> Self { Self { title: p.title, description: p.description, price: p.price } }
}

#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DescriptionQuery {
    #[serde(default)]
    pub desc: String,
}

// =============================================================================
// Categories
// =============================================================================

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.shop.catalog.list_categories().await?))
}

pub async fn create_category(State(s): State<AppState>, principal: MaybePrincipal, Json(r): Json<CategoryRequest>) -> Result<(StatusCode, Json<String>)> {
    r.validate()?;
    let category = s.shop.catalog.create_category(principal.as_ref(), &r.title).await?;
    Ok((StatusCode::CREATED, Json(messages::category_created(&category.title))))
}

pub async fn get_category(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<Category>> {
    Ok(Json(s.shop.catalog.get_category(&slug).await?))
}

pub async fn delete_category(State(s): State<AppState>, principal: MaybePrincipal, Path(slug): Path<String>) -> Result<Json<Value>> {
    s.shop.catalog.delete_category(principal.as_ref(), &slug).await?;
    Ok(Json(json!({ "success": messages::CATEGORY_DELETED })))
}

// =============================================================================
// Products
// =============================================================================

pub async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<ProductResponse>>> {
    let products = s.shop.catalog.list_products().await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// Multipart form with `title`, `category`, `description`, `price` and an `image` file.
pub async fn create_product(State(s): State<AppState>, principal: MaybePrincipal, multipart: Multipart) -> Result<(StatusCode, Json<String>)> {
    // reject before reading the upload
    s.shop.accounts.access().require_manager(principal.as_ref())?;
    let (draft, image) = read_product_form(multipart).await?;
    let product = s.shop.catalog.create_product(principal.as_ref(), draft, image).await?;
    Ok((StatusCode::CREATED, Json(messages::product_created(&product.title))))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<ProductId>) -> Result<Json<ProductResponse>> {
    Ok(Json(s.shop.catalog.get_product(id).await?.into()))
}

pub async fn update_product(
    State(s): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<ProductId>,
    Json(r): Json<ProductRequest>,
) -> Result<Json<Value>> {
    r.validate()?;
    let draft = ProductDraft { title: r.title, category_id: r.category, description: r.description, price: r.price };
    s.shop.catalog.update_product(principal.as_ref(), id, draft).await?;
    Ok(Json(json!({ "success": messages::PRODUCT_UPDATED })))
}

pub async fn delete_product(State(s): State<AppState>, principal: MaybePrincipal, Path(id): Path<ProductId>) -> Result<Json<Value>> {
    s.shop.catalog.delete_product(principal.as_ref(), id).await?;
    Ok(Json(json!({ "success": messages::PRODUCT_DELETED })))
}

// =============================================================================
// Filters
// =============================================================================

pub async fn products_in_category(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<Vec<ProductResponse>>> {
    let products = s.shop.catalog.products_in_category(&slug).await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

pub async fn most_expensive_first(State(s): State<AppState>) -> Result<Json<Vec<PricedTitle>>> {
    by_price(&s, ProductOrder::PriceDescending).await
}

pub async fn cheapest_first(State(s): State<AppState>) -> Result<Json<Vec<PricedTitle>>> {
    by_price(&s, ProductOrder::PriceAscending).await
}

async fn by_price(s: &AppState, order: ProductOrder) -> Result<Json<Vec<PricedTitle>>> {
    let products = s.shop.catalog.products_by_price(order).await?;
    Ok(Json(products.into_iter().map(|p| PricedTitle { title: p.title, price: p.price }).collect()))
}

pub async fn search_by_name(State(s): State<AppState>, Query(q): Query<NameQuery>) -> Result<Json<Vec<SearchHit>>> {
    let products = s.shop.catalog.search_by_title(&q.name).await?;
    Ok(Json(products.into_iter().map(SearchHit::from).collect()))
}

pub async fn search_by_description(State(s): State<AppState>, Query(q): Query<DescriptionQuery>) -> Result<Json<Vec<SearchHit>>> {
    let products = s.shop.catalog.search_by_description(&q.desc).await?;
    Ok(Json(products.into_iter().map(SearchHit::from).collect()))
}

async fn read_product_form(mut multipart: Multipart) -> Result<(ProductDraft, ImageUpload)> {
    let (mut title, mut category, mut description, mut price, mut image) = (None, None, String::new(), None, None);
    while let Some(field) = multipart.next_field().await.map_err(|e| ShopError::Validation(e.to_string()))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let bytes = field.bytes().await.map_err(|e| ShopError::Validation(e.to_string()))?;
                image = Some(ImageUpload { file_name, bytes: bytes.to_vec() });
            }
            "title" | "category" | "description" | "price" => {
                let value = field.text().await.map_err(|e| ShopError::Validation(e.to_string()))?;
                match name.as_str() {
                    "title" => title = Some(value),
                    "category" => category = Some(value),
                    "description" => description = value,
                    _ => price = Some(value),
                }
            }
            _ => {}
        }
    }

    let request = ProductRequest {
        title: title.ok_or_else(|| missing("title"))?,
        category: parse(category.ok_or_else(|| missing("category"))?.trim(), "category")?,
        description,
        price: parse(price.ok_or_else(|| missing("price"))?.trim(), "price")?,
    };
    request.validate()?;
    let image = image.filter(|i| !i.bytes.is_empty()).ok_or_else(|| missing("image"))?;
    let draft = ProductDraft { title: request.title, category_id: request.category, description: request.description, price: request.price };
    Ok((draft, image))
}

fn missing(field: &str) -> ShopError { ShopError::Validation(format!("{field}: field is required")) }

fn parse<T: FromStr>(value: &str, field: &str) -> Result<T> {
    value.parse().map_err(|_| ShopError::Validation(format!("{field}: invalid value '{value}'")))
}
