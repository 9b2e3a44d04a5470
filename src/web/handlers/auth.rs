//! Authentication handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use crate::auth::ValidationError;
use crate::web::cookie::REFRESH_COOKIE;
use crate::web::dto::{
    ApiJson, ApiResponse, AuthResponse, Empty, LoginRequest, MessageResponse,
    PermissionsResponse, RefreshRequest, RefreshResponse, RegisterRequest, SessionInfo,
    UnlockRequest, UnlockResponse, UserInfo, VerifyEmailRequest, VerifyEmailResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, ClientInfo};

/// POST /api/auth/register - User registration.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ClientInfo(meta): ClientInfo,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.auth.register(req.into(), &meta).await?;
    let cookie = state
        .cookies
        .refresh_cookie(&outcome.tokens.refresh_token, outcome.tokens.refresh_expires_at);

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::new(AuthResponse::from(&outcome))),
    ))
}

/// POST /api/auth/login - User login by email or username.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientInfo(meta): ClientInfo,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .auth
        .login(req.identifier(), &req.password, &meta)
        .await?;
    let cookie = state
        .cookies
        .refresh_cookie(&outcome.tokens.refresh_token, outcome.tokens.refresh_expires_at);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::new(AuthResponse::from(&outcome))),
    ))
}

/// POST /api/auth/refresh - Rotate the refresh token.
///
/// The cookie is used when present, otherwise `{refreshToken}` in the body.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ClientInfo(meta): ClientInfo,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = match jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) {
        Some(token) if !token.is_empty() => token,
        _ => serde_json::from_slice::<RefreshRequest>(&body)
            .ok()
            .and_then(|req| req.refresh_token)
            .unwrap_or_default(),
    };

    let tokens = state.auth.refresh(&token, &meta).await?;
    let cookie = state
        .cookies
        .refresh_cookie(&tokens.refresh_token, tokens.refresh_expires_at);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::new(RefreshResponse::from(&tokens))),
    ))
}

/// POST /api/auth/logout - End the session tied to the refresh cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    state.auth.logout(&claims, refresh_token.as_deref()).await?;

    Ok((
        [(SET_COOKIE, state.cookies.clear_cookie())],
        Json(ApiResponse::new(Empty::default())),
    ))
}

/// GET /api/auth/me - Get current user info.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = state.auth.current_user(&claims.sub).await?;
    Ok(Json(ApiResponse::new(UserInfo::from(&user))))
}

/// GET /api/auth/permissions - Caller's roles and effective permissions.
pub async fn permissions(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<PermissionsResponse>>, ApiError> {
    let engine = state.auth.authorization();
    let permissions = engine.effective_permissions(&claims.sub).await?;
    let roles = engine.role_names(&claims.sub).await?;

    Ok(Json(ApiResponse::new(PermissionsResponse {
        roles,
        permissions: permissions.to_strings(),
    })))
}

/// GET /api/auth/sessions - Caller's active sessions.
pub async fn sessions(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<SessionInfo>>>, ApiError> {
    let sessions = state.auth.active_sessions(&claims.sub).await?;
    Ok(Json(ApiResponse::new(
        sessions.iter().map(SessionInfo::from).collect(),
    )))
}

/// POST /api/auth/verify-email - Confirm an email address.
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<VerifyEmailRequest>,
) -> Result<Json<ApiResponse<VerifyEmailResponse>>, ApiError> {
    if req.token.trim().is_empty() {
        return Err(crate::auth::AuthError::from(ValidationError::Required("token")).into());
    }

    let outcome = state.auth.verify_email(&req.token).await?;
    let message = if outcome.already_verified {
        "Email already verified"
    } else {
        "Email verified successfully"
    };

    Ok(Json(ApiResponse::new(VerifyEmailResponse {
        message: message.to_string(),
        user: UserInfo::from(&outcome.user),
    })))
}

/// POST /api/auth/resend-verification - Issue a new verification token.
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth.resend_verification(&claims.sub).await?;
    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Verification email sent",
    ))))
}

/// POST /api/auth/unlock - Clear a login lockout.
pub async fn unlock(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<UnlockRequest>,
) -> Result<Json<ApiResponse<UnlockResponse>>, ApiError> {
    let cleared = state.auth.unlock(&req.identifier).await?;
    Ok(Json(ApiResponse::new(UnlockResponse {
        identifier: req.identifier.trim().to_string(),
        cleared,
    })))
}
