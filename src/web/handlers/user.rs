//! User administration handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::UserStatus;
use crate::web::dto::{ApiJson, ApiResponse, UpdateStatusRequest, UserInfo};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// PUT /api/users/:id/status - Change a user's status.
///
/// Disabling a user ends all of their sessions.
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let status: UserStatus = req
        .status
        .trim()
        .parse()
        .map_err(|e: String| ApiError::validation("status", e))?;

    let user = state.auth.set_user_status(&user_id, status).await?;
    Ok(Json(ApiResponse::new(UserInfo::from(&user))))
}
