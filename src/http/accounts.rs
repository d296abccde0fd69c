use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::domain::UserId;
use crate::http::extract::{self, MaybePrincipal, SessionToken};
use crate::http::{messages, AppState};
use crate::Result;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub username: String,
    pub is_authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}

pub async fn login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> Result<impl IntoResponse> {
    r.validate()?;
    let (_, token) = s.shop.accounts.login(&r.username, &r.password).await?;
    Ok(([(SET_COOKIE, extract::session_cookie_header(&token))], Json(json!({ "username": messages::LOGGED_IN }))))
}

pub async fn logout(State(s): State<AppState>, SessionToken(token): SessionToken) -> Result<impl IntoResponse> {
    s.shop.accounts.logout(token.as_deref()).await?;
    Ok(([(SET_COOKIE, extract::expired_session_cookie_header())], Json(messages::LOGGED_OUT)))
}

pub async fn current_user(principal: MaybePrincipal) -> Json<CurrentUser> {
    Json(match principal.0 {
        Some(p) => CurrentUser { username: p.username, is_authenticated: true },
        None => CurrentUser { username: String::new(), is_authenticated: false },
    })
}

pub async fn list_users(State(s): State<AppState>, principal: MaybePrincipal) -> Result<Json<Vec<UserSummary>>> {
    let users = s.shop.accounts.list_users(principal.as_ref()).await?;
    Ok(Json(users.into_iter().map(|u| UserSummary { id: u.id, username: u.username }).collect()))
}
