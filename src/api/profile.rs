use axum::{Extension, Json, extract::State};

use crate::auth::AuthUser;
use crate::db::repository;
use crate::error::AppError;
use crate::models::UserProfile;
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>, AppError> {
    let user = repository::find_user_by_id(&state.db, &user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(user.into_profile()))
}
