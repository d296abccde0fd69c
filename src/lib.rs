//! Shopfront catalog and ordering backend
//!
//! Categories and products with slug identity, per-user wishlists and orders,
//! and session authentication with a manager role.
//!
//! ## Layout
//! - `domain`: aggregates, value objects, the line-item reconciler, events
//! - `store`: repository traits with in-memory and Postgres backends
//! - `service`: use cases invoked with an explicit request principal
//! - `http`: axum router and the mapping of errors to status codes

pub mod auth;
pub mod config;
pub mod domain;
pub mod http;
pub mod media;
pub mod messaging;
pub mod service;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::OrderError;
use crate::domain::value_objects::{CountError, PriceError, SlugError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("invalid payload: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("order status change rejected: {0}")]
    InvalidStatus(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("media error: {0}")]
    Media(#[from] std::io::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<OrderError> for ShopError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Closed(_) => ShopError::Conflict(err.to_string()),
            OrderError::UnknownStatus(_) | OrderError::BackwardTransition { .. } => {
                ShopError::InvalidStatus(err.to_string())
            }
        }
    }
}

impl From<SlugError> for ShopError {
    fn from(err: SlugError) -> Self { ShopError::Validation(err.to_string()) }
}

impl From<PriceError> for ShopError {
    fn from(err: PriceError) -> Self { ShopError::Validation(err.to_string()) }
}

impl From<CountError> for ShopError {
    fn from(err: CountError) -> Self { ShopError::Validation(err.to_string()) }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(err: validator::ValidationErrors) -> Self { ShopError::Validation(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, ShopError>;
