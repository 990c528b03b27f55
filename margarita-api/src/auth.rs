use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use margarita_core::{CapabilitySet, ObjectId, Session};
use serde::{Deserialize, Serialize};

use crate::credentials::IssuedToken;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    ok: bool,
    uid: ObjectId,
    name: String,
    email: String,
    token: String,
    capabilities: CapabilitySet,
}

impl From<IssuedToken> for AuthResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            ok: true,
            uid: issued.user.id,
            name: issued.user.name,
            email: issued.user.email,
            token: issued.token,
            capabilities: issued.user.capabilities,
        }
    }
}

/// Routes that need no token.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Routes mounted behind the session middleware.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/api/auth/renew", get(renew))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(req) = payload?;
    let issued = state
        .credentials
        .register(&req.name, &req.email, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(req) = payload?;
    let issued = state.credentials.authenticate(&req.email, &req.password).await?;
    tracing::info!(user_id = %issued.user.id, "User logged in");
    Ok(Json(issued.into()))
}

async fn renew(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<AuthResponse>, AppError> {
    let issued = state.credentials.renew_session(&session).await?;
    Ok(Json(issued.into()))
}
