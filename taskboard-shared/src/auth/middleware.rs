/// Identity resolution for authenticated requests
///
/// Turns the `Authorization: Bearer <token>` header into an [`AuthContext`]:
/// the token is validated as an access token, then its subject is looked up so
/// that a token for a deleted or never-existing user is rejected here rather
/// than deeper in the request.
///
/// The HTTP layer calls [`resolve_identity`] from its middleware and inserts
/// the context into request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::Extension;
/// use taskboard_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::store::UserStore;

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Verified, existing user ID
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for identity resolution
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its subject no longer exists
    #[error("User not found")]
    UnknownUser,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Extracts the bearer token from request headers
///
/// # Errors
///
/// - `AuthError::MissingCredentials` if there is no `Authorization` header
/// - `AuthError::InvalidFormat` if it is not a `Bearer` credential
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the request's access token and confirms its subject exists
pub async fn resolve_identity<U>(
    users: &U,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError>
where
    U: UserStore + ?Sized,
{
    let token = bearer_token(headers)?;

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
    })?;

    let user = users
        .find_user_by_id(claims.sub)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext::new(user.id))
}
