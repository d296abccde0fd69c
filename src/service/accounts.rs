//! Login sessions and user administration.

use tracing::{info, warn};

use crate::auth::{self, Access, NewUser, Principal, User};
use crate::store::Repositories;
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct AccountService {
    repos: Repositories,
    access: Access,
}

impl AccountService {
    pub fn new(repos: Repositories, access: Access) -> Self { Self { repos, access } }

    pub fn access(&self) -> &Access { &self.access }

    pub async fn register(&self, username: &str, password: &str, is_superuser: bool, groups: Vec<String>) -> Result<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ShopError::Validation("username and password are required".into()));
        }
        let user = self
            .repos
            .users
            .create(NewUser { username: username.to_string(), password_hash: auth::hash_password(password)?, is_superuser, groups })
            .await?;
        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Creates the superuser unless a user with that name already exists.
    pub async fn ensure_superuser(&self, username: &str, password: &str) -> Result<()> {
        if self.repos.users.find_by_username(username).await?.is_some() {
            return Ok(());
        }
        self.register(username, password, true, vec![]).await.map(|_| ())
    }

    /// Returns the principal and a fresh session token.
    pub async fn login(&self, username: &str, password: &str) -> Result<(Principal, String)> {
        let user = self.repos.users.find_by_username(username).await?;
        let Some(user) = user.filter(|u| auth::verify_password(password, &u.password_hash)) else {
            warn!(username, "failed login");
            return Err(ShopError::Unauthorized);
        };
        let token = auth::new_session_token();
        self.repos.sessions.create(&token, user.id).await?;
        info!(user_id = user.id, "logged in");
        Ok((user.into(), token))
    }

    pub async fn logout(&self, token: Option<&str>) -> Result<()> {
        if let Some(token) = token {
            self.repos.sessions.delete(token).await?;
        }
        Ok(())
    }

    /// Resolves a session token. User and group data are read fresh on every call.
    pub async fn principal(&self, token: &str) -> Result<Option<Principal>> {
        let Some(user_id) = self.repos.sessions.find_user(token).await? else { return Ok(None) };
        Ok(self.repos.users.find_by_id(user_id).await?.map(Principal::from))
    }

    pub async fn list_users(&self, principal: Option<&Principal>) -> Result<Vec<User>> {
        self.access.require_manager(principal)?;
        self.repos.users.list().await
    }
}
