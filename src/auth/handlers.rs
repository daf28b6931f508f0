use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            AccessResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest,
            NON_FIELD_ERRORS,
        },
        extractors::AuthUser,
        jwt::TokenPair,
        services,
    },
    error::{AuthError, FieldErrors, RegisterError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), RegisterError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "unreadable registration body");
        let mut fields = FieldErrors::new();
        fields.insert(NON_FIELD_ERRORS, vec![rejection.body_text()]);
        RegisterError::Validation(fields)
    })?;
    let req = RegisterRequest::from_json(&body).map_err(RegisterError::Validation)?;

    let user = services::register(
        state.users.as_ref(),
        Arc::clone(&state.hasher),
        &state.config.auth,
        req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "unreadable login body");
        AuthError::MissingCredentials
    })?;
    let req = LoginRequest::from_json(&body);

    services::login(
        state.users.as_ref(),
        Arc::clone(&state.hasher),
        &state.jwt,
        &req,
    )
    .await
    .map(Json)
    .map_err(|e| e.conceal_unknown_user(state.config.auth.reveal_unknown_user))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AccessResponse>, AuthError> {
    let Json(body) = payload.map_err(|_| AuthError::MissingCredentials)?;
    let req = RefreshRequest::from_json(&body);
    let access =
        services::refresh_access(state.users.as_ref(), &state.jwt, req.refresh.as_deref())
            .await?;
    Ok(Json(AccessResponse { access }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = services::current_user(state.users.as_ref(), user_id).await?;
    Ok(Json(user))
}
