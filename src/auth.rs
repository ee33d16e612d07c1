//! Bearer-token verification. Tokens are issued elsewhere; this side only
//! checks the signature and reads the claims.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ShopError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, rename = "isAdmin")]
    pub is_admin: bool,
    pub email: Option<String>,
    pub name: Option<String>,
    pub exp: i64,
}

/// The caller behind a verified token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_admin: bool,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Principal {
    pub fn customer(user_id: Uuid) -> Self { Self { user_id, is_admin: false, email: None, name: None } }
    pub fn admin(user_id: Uuid) -> Self { Self { is_admin: true, ..Self::customer(user_id) } }

    pub fn require_admin(&self) -> Result<(), ShopError> {
        if self.is_admin { Ok(()) } else { Err(ShopError::Unauthorized) }
    }
}

pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn hs256(secret: &str) -> Self {
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation: Validation::new(Algorithm::HS256) }
    }

    pub fn verify(&self, token: &str) -> Result<Principal, ShopError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            ShopError::Unauthenticated
        })?;
        let c = data.claims;
        Ok(Principal { user_id: c.sub, is_admin: c.is_admin, email: c.email, name: c.name })
    }
}

/// Extracts the authenticated caller from `Authorization: Bearer <jwt>`.
pub struct AuthUser(pub Principal);

/// Like [`AuthUser`] but rejects non-admins with 403.
pub struct AdminUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts.headers.get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ShopError::Unauthenticated)?;
        Arc::<TokenVerifier>::from_ref(state).verify(token).map(AuthUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        principal.require_admin()?;
        Ok(AdminUser(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, is_admin: bool, exp: i64) -> (Uuid, String) {
        let sub = Uuid::new_v4();
        let claims = Claims { sub, is_admin, email: Some("a@b.test".into()), name: None, exp };
        (sub, encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap())
    }

    #[test]
    fn test_verify_roundtrip() {
        let (sub, t) = token("s3cret", true, chrono::Utc::now().timestamp() + 600);
        let p = TokenVerifier::hs256("s3cret").verify(&t).unwrap();
        assert_eq!(p.user_id, sub);
        assert!(p.is_admin);
        assert_eq!(p.email.as_deref(), Some("a@b.test"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (_, t) = token("s3cret", false, chrono::Utc::now().timestamp() + 600);
        assert!(matches!(TokenVerifier::hs256("other").verify(&t), Err(ShopError::Unauthenticated)));
    }

    #[test]
    fn test_expired_rejected() {
        let (_, t) = token("s3cret", false, chrono::Utc::now().timestamp() - 3600);
        assert!(TokenVerifier::hs256("s3cret").verify(&t).is_err());
    }

    #[test]
    fn test_require_admin() {
        assert!(Principal::admin(Uuid::new_v4()).require_admin().is_ok());
        assert!(matches!(Principal::customer(Uuid::new_v4()).require_admin(), Err(ShopError::Unauthorized)));
    }
}
