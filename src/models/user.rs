//! Authenticated actor and JWT claims

use serde::{Deserialize, Serialize};

use super::id::UserId;
use crate::error::AppError;

/// Roles granted by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

/// The user a lending operation is performed for.
///
/// Identity is resolved upstream; the engine trusts this value as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(id: UserId, roles: Vec<Role>) -> Self {
        Self { id, roles }
    }

    pub fn member(id: impl Into<UserId>) -> Self {
        Self::new(id.into(), vec![Role::Member])
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: UserId,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Lending and projections are open to members; admins are members too
    pub fn require_member(&self) -> Result<(), AppError> {
        if self.roles.iter().any(|r| matches!(r, Role::Member | Role::Admin)) {
            Ok(())
        } else {
            Err(AppError::Authorization("Membership required to use the lending catalog".to_string()))
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.roles.clone())
    }
}
