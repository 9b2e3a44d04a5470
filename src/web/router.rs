//! Router configuration for Web API.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    assign_role, create_role, list_roles, login, logout, me, navigation, permissions, refresh,
    register, resend_verification, revoke_role, sessions, unlock, update_user_status,
    verify_email, AppState,
};
use super::middleware::rate_limit::{
    api_rate_limit, login_rate_limit, refresh_rate_limit, register_rate_limit,
};
use super::middleware::{
    create_cors_layer, inject_token_issuer, require_permission, security_headers,
    PermissionGuard, RateLimitState,
};

/// Create the main API router.
///
/// `rate_limits` of `None` disables rate limiting.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limits: Option<Arc<RateLimitState>>,
    cors_origins: &[String],
) -> Router {
    let engine = app_state.auth.authorization().clone();
    let guard = |resource: &str, action: &str| PermissionGuard::new(engine.clone(), resource, action);

    let mut register_route = post(register);
    let mut login_route = post(login);
    let mut refresh_route = post(refresh);
    if let Some(limits) = &rate_limits {
        register_route = register_route.route_layer(middleware::from_fn_with_state(
            limits.clone(),
            register_rate_limit,
        ));
        login_route =
            login_route.route_layer(middleware::from_fn_with_state(limits.clone(), login_rate_limit));
        refresh_route = refresh_route.route_layer(middleware::from_fn_with_state(
            limits.clone(),
            refresh_rate_limit,
        ));
    }

    // Auth routes
    let auth_routes = Router::new()
        .route("/register", register_route)
        .route("/login", login_route)
        .route("/refresh", refresh_route)
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/permissions", get(permissions))
        .route("/sessions", get(sessions))
        .route("/verify-email", post(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route(
            "/unlock",
            post(unlock).route_layer(middleware::from_fn_with_state(
                guard("users", "unlock"),
                require_permission,
            )),
        );

    // Role administration
    let rbac_routes = Router::new()
        .route(
            "/roles",
            get(list_roles)
                .route_layer(middleware::from_fn_with_state(
                    guard("roles", "read"),
                    require_permission,
                ))
                .merge(post(create_role).route_layer(middleware::from_fn_with_state(
                    guard("roles", "create"),
                    require_permission,
                ))),
        )
        .route(
            "/users/:id/roles",
            post(assign_role).route_layer(middleware::from_fn_with_state(
                guard("roles", "assign"),
                require_permission,
            )),
        )
        .route(
            "/users/:id/roles/:role",
            delete(revoke_role).route_layer(middleware::from_fn_with_state(
                guard("roles", "assign"),
                require_permission,
            )),
        );

    let user_routes = Router::new().route(
        "/:id/status",
        put(update_user_status).route_layer(middleware::from_fn_with_state(
            guard("users", "update"),
            require_permission,
        )),
    );

    let mut api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/rbac", rbac_routes)
        .nest("/users", user_routes)
        .route(
            "/navigation",
            get(navigation).route_layer(middleware::from_fn_with_state(
                guard("navigation", "read"),
                require_permission,
            )),
        );
    if let Some(limits) = rate_limits {
        api_routes = api_routes.layer(middleware::from_fn_with_state(limits, api_rate_limit));
    }

    let issuer = Arc::new(app_state.auth.token_issuer().clone());

    Router::new()
        .nest("/api", api_routes)
        .merge(create_health_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    inject_token_issuer(issuer.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
