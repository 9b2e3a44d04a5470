//! API handlers.

pub mod auth;
pub mod navigation;
pub mod rbac;
pub mod user;

pub use auth::*;
pub use navigation::*;
pub use rbac::*;
pub use user::*;

use crate::auth::{AuthService, NavigationItem};
use crate::web::cookie::CookieSettings;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Authentication service.
    pub auth: AuthService,
    /// Full navigation tree, pruned per caller.
    pub navigation: Vec<NavigationItem>,
    /// Refresh cookie attributes.
    pub cookies: CookieSettings,
}

impl AppState {
    /// Create a new application state.
    pub fn new(auth: AuthService, navigation: Vec<NavigationItem>, cookies: CookieSettings) -> Self {
        Self {
            auth,
            navigation,
            cookies,
        }
    }
}
