use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::auth::AuthUser;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{NewTaskRequest, Task, TaskListQuery, UpdateTaskRequest};
use crate::state::AppState;
use crate::validation::{validate_list_query, validate_new_task, validate_task_update};

pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let new = validate_new_task(&req)?;
    let task = repository::insert_task(&state.db, &user.id, new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let filter = validate_list_query(&query)?;
    let tasks = repository::fetch_tasks(&state.db, &user.id, &filter).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let task = repository::find_task(&state.db, &user.id, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let changes = validate_task_update(&req)?;
    let task = repository::update_task(&state.db, &user.id, &id, changes)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repository::delete_task(&state.db, &user.id, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
