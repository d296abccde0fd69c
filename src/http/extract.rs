//! Session cookie and principal extractors.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;

use crate::auth::Principal;
use crate::http::AppState;
use crate::ShopError;

pub const SESSION_COOKIE: &str = "sessionid";

/// The raw session token, if the request carries one.
pub struct SessionToken(pub Option<String>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_cookie(parts)))
    }
}

/// The caller, or `None` for anonymous requests and stale sessions.
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    pub fn as_ref(&self) -> Option<&Principal> { self.0.as_ref() }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_cookie(parts) else { return Ok(Self(None)) };
        Ok(Self(state.shop.accounts.principal(&token).await?))
    }
}

fn session_cookie(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie_header(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax")
}

pub fn expired_session_cookie_header() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(cookie: &str) -> Parts {
        Request::builder().header(COOKIE, cookie).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_finds_session_among_cookies() {
        assert_eq!(session_cookie(&parts("csrftoken=abc; sessionid=42f; theme=dark")).as_deref(), Some("42f"));
        assert_eq!(session_cookie(&parts("sessionid=")), None);
        assert_eq!(session_cookie(&parts("csrftoken=abc")), None);
    }
}
