//! Users, request principals and the manager capability check.

use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Algorithm, Params, Pbkdf2};
use rand::RngCore;
use serde::Serialize;

use crate::domain::UserId;
use crate::{Result, ShopError};

const HASH_ROUNDS: u32 = 100_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub groups: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub groups: Vec<String>,
}

/// The authenticated caller of one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub is_superuser: bool,
    pub groups: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool { self.groups.iter().any(|g| g == role) }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self { user_id: user.id, username: user.username, is_superuser: user.is_superuser, groups: user.groups }
    }
}

/// Grants elevated access to superusers and members of the manager group alike.
#[derive(Clone, Debug)]
pub struct Access {
    manager_role: String,
}

impl Access {
    pub fn new(manager_role: impl Into<String>) -> Self { Self { manager_role: manager_role.into() } }

    pub fn can_manage(&self, principal: &Principal) -> bool {
        principal.is_superuser || principal.has_role(&self.manager_role)
    }

    /// Anonymous callers fail the same way as ordinary users.
    pub fn require_manager<'a>(&self, principal: Option<&'a Principal>) -> Result<&'a Principal> {
        match principal {
            Some(p) if self.can_manage(p) => Ok(p),
            _ => Err(ShopError::Forbidden),
        }
    }
}

pub fn require_user(principal: Option<&Principal>) -> Result<&Principal> {
    principal.ok_or(ShopError::Unauthorized)
}

/// PBKDF2-SHA256 in PHC form: `$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| ShopError::PasswordHash(e.to_string()))?;
    let params = Params { rounds: HASH_ROUNDS, output_length: 32 };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), Some(Algorithm::Pbkdf2Sha256.ident()), None, params, &salt)
        .map_err(|e| ShopError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Malformed or foreign hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    PasswordHash::new(encoded).is_ok_and(|hash| Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok())
}

pub fn new_session_token() -> String { uuid::Uuid::new_v4().simple().to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(is_superuser: bool, groups: &[&str]) -> Principal {
        Principal { user_id: 1, username: "u".into(), is_superuser, groups: groups.iter().map(|g| g.to_string()).collect() }
    }

    #[test]
    fn test_password_roundtrip() {
        let encoded = hash_password("admin").unwrap();
        assert!(encoded.starts_with("$pbkdf2-sha256$i=100000,l=32$"));
        assert!(verify_password("admin", &encoded));
        assert!(!verify_password("123", &encoded));
        assert!(!verify_password("admin", "md5$1$aa$bb"));
        assert!(!verify_password("admin", "garbage"));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_manager_check() {
        let access = Access::new("Менеджер");
        assert!(access.can_manage(&principal(true, &[])));
        assert!(access.can_manage(&principal(false, &["Менеджер"])));
        assert!(!access.can_manage(&principal(false, &["Покупатель"])));
        assert!(matches!(access.require_manager(None), Err(ShopError::Forbidden)));
        assert!(matches!(require_user(None), Err(ShopError::Unauthorized)));
    }
}
