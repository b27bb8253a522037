use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;
use uuid::Uuid;

use super::jwt::SessionKeys;
use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Identity of the caller, taken from a validated session token and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Checks a raw `Authorization` header value. Every failure is the same `Unauthorized`.
pub fn authenticate(keys: &SessionKeys, header: Option<&str>) -> Result<AuthUser, AppError> {
    let Some(header) = header else {
        debug!("authorization header missing");
        return Err(AppError::Unauthorized);
    };
    let Some(rest) = header.strip_prefix(BEARER_PREFIX) else {
        debug!("authorization header without bearer scheme");
        return Err(AppError::Unauthorized);
    };
    let token = rest.trim();
    if token.is_empty() {
        debug!("empty bearer token");
        return Err(AppError::Unauthorized);
    }

    let claims = keys.validate(token).map_err(|_| AppError::Unauthorized)?;
    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        // A header that isn't visible ASCII counts as missing.
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        authenticate(&keys, header)
    }
}
