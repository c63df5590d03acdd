//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for the token workflow under `/api/tokens`
//! - Bearer-token authentication middleware
//! - Mapping of workflow errors to HTTP responses

pub mod middleware;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use gatepass_core::token::TokenService;
use gatepass_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token workflow service.
    pub service: Arc<TokenService>,
    /// JWT service for verifying bearer tokens.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
