//! Web API module for Aegis.
//!
//! Exposes the authentication core over HTTP: JSON envelopes, bearer
//! authentication, permission-guarded routes and the refresh cookie.

pub mod cookie;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
