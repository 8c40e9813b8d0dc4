// Request extractors for authenticated, optional and admin callers

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::Role, token::TokenService};

/// Authenticated user extractor for protected routes
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

/// Caller that may be a guest
///
/// No Authorization header yields `MaybeUser(None)`. A header that is
/// present but invalid is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

/// Authenticated caller holding the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;

    // Verify Bearer token format
    value
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| {
            warn!("Authorization header missing 'Bearer ' prefix");
            AuthError::InvalidToken
        })
}

fn authenticate(token_service: &TokenService, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let claims = token_service.validate_access_token(token)?;
    Ok(AuthenticatedUser {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingToken)?;
        let token_service = Arc::<TokenService>::from_ref(state);
        authenticate(&token_service, token)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => {
                let token_service = Arc::<TokenService>::from_ref(state);
                Ok(MaybeUser(Some(authenticate(&token_service, token)?)))
            }
            None => {
                debug!("No Authorization header, treating caller as guest");
                Ok(MaybeUser(None))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            return Err(AuthError::InsufficientPermissions {
                required: Role::Admin,
                actual: user.role,
            });
        }

        debug!("Admin access granted to user_id={}", user.user_id);
        Ok(AdminUser(user))
    }
}
