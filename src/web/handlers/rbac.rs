//! Role administration handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::Permission;
use crate::web::dto::{
    ApiJson, ApiResponse, AssignRoleRequest, CreateRoleRequest, RoleAssignmentResponse,
    RoleResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /api/rbac/roles - List roles with their permissions.
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<RoleResponse>>>, ApiError> {
    let roles = state.auth.authorization().list_roles().await?;
    Ok(Json(ApiResponse::new(
        roles.iter().map(RoleResponse::from).collect(),
    )))
}

/// POST /api/rbac/roles - Create a role.
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoleResponse>>), ApiError> {
    let permissions = req
        .permissions
        .iter()
        .map(|p| p.parse::<Permission>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::validation("permissions", e.to_string()))?;

    let details = state
        .auth
        .authorization()
        .create_role(&req.name, &req.description, &permissions)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(RoleResponse::from(&details))),
    ))
}

/// POST /api/rbac/users/:id/roles - Assign a role to a user.
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<AssignRoleRequest>,
) -> Result<Json<ApiResponse<RoleAssignmentResponse>>, ApiError> {
    let changed = state
        .auth
        .authorization()
        .assign_role(&user_id, &req.role)
        .await?;

    Ok(Json(ApiResponse::new(RoleAssignmentResponse {
        user_id,
        role: req.role.trim().to_string(),
        changed,
    })))
}

/// DELETE /api/rbac/users/:id/roles/:role - Revoke a role from a user.
pub async fn revoke_role(
    State(state): State<Arc<AppState>>,
    Path((user_id, role)): Path<(String, String)>,
) -> Result<Json<ApiResponse<RoleAssignmentResponse>>, ApiError> {
    let changed = state
        .auth
        .authorization()
        .revoke_role(&user_id, &role)
        .await?;

    Ok(Json(ApiResponse::new(RoleAssignmentResponse {
        user_id,
        role,
        changed,
    })))
}
