//! HTTP boundary: routes, extractors and the error-to-status mapping.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::service::Shop;

pub mod accounts;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod messages;
pub mod orders;
pub mod wishlist;

#[derive(Clone)]
pub struct AppState {
    pub shop: Arc<Shop>,
}

pub fn router(shop: Shop, config: &Config) -> Router {
    let state = AppState { shop: Arc::new(shop) };

    let api = Router::new()
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/user", get(accounts::current_user))
        .route("/users", get(accounts::list_users))
        .route("/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/categories/:slug", get(catalog::get_category))
        .route("/category/:slug", delete(catalog::delete_category))
        .route("/products", get(catalog::list_products).post(catalog::create_product))
        .route("/products/:id", get(catalog::get_product).put(catalog::update_product).delete(catalog::delete_product))
        .route("/filter_by_category/:slug", get(catalog::products_in_category))
        .route("/filter/min", get(catalog::most_expensive_first))
        .route("/filter/max", get(catalog::cheapest_first))
        .route("/filter/name", get(catalog::search_by_name))
        .route("/filter/description", get(catalog::search_by_description))
        .route("/wishlist", get(wishlist::get_wishlist).post(wishlist::add_to_wishlist))
        .route("/wishlist/delete", post(wishlist::remove_from_wishlist))
        .route("/order", get(orders::list_orders))
        .route("/order/add", post(orders::add_to_order))
        .route("/order/remove", post(orders::remove_from_order))
        .route("/order/:id", get(orders::get_order).put(orders::set_status));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shopfront"})) }))
        .nest("/api", api)
        .nest_service("/media", ServeDir::new(&config.media_root))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
