use axum::{Json, extract::State, http::StatusCode};

use crate::auth::{hash_password, verify_password};
use crate::db::repository;
use crate::error::AppError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::state::AppState;
use crate::validation::{validate_login, validate_registration};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let registration = validate_registration(&req)?;

    if repository::find_user_by_email(&state.db, &registration.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = hash_password(&registration.password)?;
    let user = repository::insert_user(
        &state.db,
        &registration.name,
        &registration.email,
        &password_hash,
    )
    .await?;

    let token = state.jwt.issue(&user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into_profile(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let credentials = validate_login(&req)?;

    // One generic message for unknown email and wrong password alike.
    let user = repository::find_user_by_email(&state.db, &credentials.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&credentials.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    let token = state.jwt.issue(&user.id)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into_profile(),
    }))
}
