//! Bearer authentication and permission guard middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::client::client_ip;
use crate::auth::{AccessClaims, AuthError, AuthorizationEngine, Permission, PermissionSet, SessionMetadata, TokenIssuer};
use crate::web::error::ApiError;

/// Extract the token from an `Authorization` header value.
///
/// Only the exact `Bearer <token>` form is accepted.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?;
    if token.is_empty() || token.starts_with(' ') {
        return None;
    }
    Some(token)
}

/// Extractor for authenticated users.
///
/// Use this extractor to require authentication for a handler.
/// The handler receives the verified access token claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AccessClaims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = parts
                .headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_bearer)
                .ok_or(AuthError::Unauthorized)?;

            // Set by `inject_token_issuer`
            let issuer = parts
                .extensions
                .get::<Arc<TokenIssuer>>()
                .ok_or_else(|| {
                    tracing::error!("Token issuer missing from request extensions");
                    ApiError::internal()
                })?;

            let claims = issuer.verify(token).map_err(|e| {
                tracing::debug!(code = e.code(), "Access token rejected");
                ApiError::from(e)
            })?;

            Ok(AuthUser(claims))
        })
    }
}

/// Client details for session bookkeeping.
#[derive(Debug, Clone)]
pub struct ClientInfo(pub SessionMetadata);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_agent = parts
                .headers
                .get(axum::http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let ip_address = client_ip(&parts.headers, &parts.extensions);

            Ok(ClientInfo(SessionMetadata {
                user_agent,
                ip_address,
            }))
        })
    }
}

/// Middleware function to inject the token issuer into request extensions.
pub async fn inject_token_issuer(
    issuer: Arc<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(issuer);
    next.run(request).await
}

/// Permission required by a guarded route.
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    engine: AuthorizationEngine,
    required: Permission,
}

impl PermissionGuard {
    /// Require `resource.action`.
    pub fn new(engine: AuthorizationEngine, resource: &str, action: &str) -> Self {
        Self {
            engine,
            required: Permission::new(resource, action),
        }
    }
}

/// Effective permissions of the caller, set by [`require_permission`].
#[derive(Debug, Clone)]
pub struct GrantedPermissions(pub PermissionSet);

/// Reject callers lacking the guard's permission.
///
/// No token gives 401; a valid token without the permission gives 403.
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    AuthUser(claims): AuthUser,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let granted = guard.engine.authorize(&claims.sub, &guard.required).await?;
    request.extensions_mut().insert(GrantedPermissions(granted));
    Ok(next.run(request).await)
}
