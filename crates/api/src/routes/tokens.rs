//! Token workflow routes.
//!
//! Every handler builds the actor context from the verified claims and hands
//! the operation to [`TokenService`](gatepass_core::token::TokenService); the
//! service is the only place where transition rules are decided.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser};
use gatepass_core::token::{
    AllowedActions, ApprovalLevel, DeliveryInput, EvidenceInput, NewToken, Token, TokenError,
    TokenType,
};

/// Creates the token routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tokens", post(create_token))
        .route("/tokens/pending-approval", get(list_pending_approval))
        .route("/tokens/pending-validation", get(list_pending_validation))
        .route("/tokens/validate", post(validate_token))
        .route("/tokens/code/{token_code}", get(get_token_by_code))
        .route("/tokens/{id}", get(get_token))
        .route("/tokens/{id}/actions", get(get_allowed_actions))
        .route("/tokens/{id}/submit", post(submit_token))
        .route("/tokens/{id}/approve", post(approve_token))
        .route("/tokens/{id}/reject", post(reject_token))
        .route("/tokens/{id}/cancel", post(cancel_token))
        .route("/tokens/{id}/complete-delivery", post(complete_delivery))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for approving the outstanding level.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    /// Level being granted (1, 2 or 3).
    pub level: ApprovalLevel,
    /// Optional notes, signature and photo.
    #[serde(flatten)]
    pub evidence: EvidenceInput,
}

/// Request body for rejecting a pending token.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Why the token is turned down.
    pub reason: String,
}

/// Request body for validating an approved token.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Opaque code read from the QR or link.
    pub token_code: String,
    /// Optional notes, signature and photo.
    #[serde(flatten)]
    pub evidence: EvidenceInput,
}

/// A token with derived fields.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// The stored token.
    #[serde(flatten)]
    pub token: Token,
    /// Type derived from the detail.
    pub token_type: TokenType,
    /// Whether the QR/PDF document can be handed out.
    pub document_available: bool,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            token_type: token.token_type(),
            document_available: token.document_available(),
            token,
        }
    }
}

/// A list of tokens.
#[derive(Debug, Serialize)]
pub struct TokenListResponse {
    /// Matching tokens, newest first.
    pub tokens: Vec<TokenResponse>,
    /// Number of tokens returned.
    pub total: usize,
}

impl From<Vec<Token>> for TokenListResponse {
    fn from(tokens: Vec<Token>) -> Self {
        let tokens: Vec<TokenResponse> = tokens.into_iter().map(TokenResponse::from).collect();
        Self {
            total: tokens.len(),
            tokens,
        }
    }
}

/// Actions the caller may currently perform on a token.
#[derive(Debug, Serialize)]
pub struct AllowedActionsResponse {
    /// Token ID.
    pub token_id: Uuid,
    /// The hints.
    #[serde(flatten)]
    pub actions: AllowedActions,
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<NewToken>,
) -> Response {
    let result = state.service.create(payload, &auth.actor()).await;
    token_response(result, StatusCode::CREATED)
}

async fn get_token(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Response {
    token_response(state.service.get(id).await, StatusCode::OK)
}

async fn get_token_by_code(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(token_code): Path<String>,
) -> Response {
    token_response(state.service.get_by_code(&token_code).await, StatusCode::OK)
}

async fn get_allowed_actions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Response {
    match state.service.allowed_actions(id, &auth.actor()).await {
        Ok(actions) => (
            StatusCode::OK,
            Json(AllowedActionsResponse {
                token_id: id,
                actions,
            }),
        )
            .into_response(),
        Err(e) => token_error_response(&e),
    }
}

async fn submit_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Response {
    token_response(state.service.submit(id, &auth.actor()).await, StatusCode::OK)
}

async fn approve_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> Response {
    let result = state
        .service
        .approve(id, payload.level, payload.evidence, &auth.actor())
        .await;
    token_response(result, StatusCode::OK)
}

async fn reject_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Response {
    let result = state
        .service
        .reject(id, payload.reason, &auth.actor())
        .await;
    token_response(result, StatusCode::OK)
}

async fn cancel_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Response {
    token_response(state.service.cancel(id, &auth.actor()).await, StatusCode::OK)
}

async fn validate_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ValidateRequest>,
) -> Response {
    let result = state
        .service
        .validate(&payload.token_code, payload.evidence, &auth.actor())
        .await;
    token_response(result, StatusCode::OK)
}

async fn complete_delivery(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeliveryInput>,
) -> Response {
    let result = state
        .service
        .complete_delivery(id, payload, &auth.actor())
        .await;
    token_response(result, StatusCode::OK)
}

async fn list_pending_approval(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.service.list_pending_approvals(&auth.actor()).await {
        Ok(tokens) => (StatusCode::OK, Json(TokenListResponse::from(tokens))).into_response(),
        Err(e) => token_error_response(&e),
    }
}

async fn list_pending_validation(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.service.list_pending_validation(&auth.actor()).await {
        Ok(tokens) => (StatusCode::OK, Json(TokenListResponse::from(tokens))).into_response(),
        Err(e) => token_error_response(&e),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn token_response(result: Result<Token, TokenError>, success: StatusCode) -> Response {
    match result {
        Ok(token) => (success, Json(TokenResponse::from(token))).into_response(),
        Err(e) => token_error_response(&e),
    }
}

/// Maps a workflow error to `{"error", "message"}` with its HTTP status.
fn token_error_response(e: &TokenError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match e {
        TokenError::Storage(_) => error!(error = %e, "Token storage failure"),
        TokenError::Conflict(id) => warn!(token_id = %id, "Concurrent modification reported to caller"),
        _ => {}
    }

    // Storage details stay in the logs.
    let message = if matches!(e, TokenError::Storage(_)) {
        "Internal server error".to_string()
    } else {
        e.to_string()
    };

    (
        status,
        Json(json!({
            "error": e.error_code(),
            "message": message
        })),
    )
        .into_response()
}
