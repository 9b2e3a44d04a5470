//! Navigation handler.

use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::auth::{filter_navigation, NavigationItem};
use crate::web::dto::ApiResponse;
use crate::web::handlers::AppState;
use crate::web::middleware::GrantedPermissions;

/// GET /api/navigation - Navigation tree visible to the caller.
pub async fn navigation(
    State(state): State<Arc<AppState>>,
    Extension(GrantedPermissions(granted)): Extension<GrantedPermissions>,
) -> Json<ApiResponse<Vec<NavigationItem>>> {
    Json(ApiResponse::new(filter_navigation(&state.navigation, &granted)))
}
