use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::http::messages;
use crate::ShopError;

impl ShopError {
    pub fn status(&self) -> StatusCode {
        match self {
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::Unauthorized => StatusCode::UNAUTHORIZED,
            ShopError::Forbidden => StatusCode::FORBIDDEN,
            ShopError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ShopError::Conflict(_) => StatusCode::CONFLICT,
            ShopError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            ShopError::Storage(_) | ShopError::Media(_) | ShopError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ShopError::NotFound(_) => messages::NOT_FOUND.to_string(),
            ShopError::Unauthorized => messages::UNAUTHORIZED.to_string(),
            ShopError::Forbidden => messages::FORBIDDEN.to_string(),
            ShopError::InvalidStatus(_) => messages::STATUS_REJECTED.to_string(),
            ShopError::Validation(msg) | ShopError::Conflict(msg) => msg.clone(),
            ShopError::Storage(_) | ShopError::Media(_) | ShopError::PasswordHash(_) => {
                error!(error = %self, "request failed");
                messages::INTERNAL.to_string()
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
