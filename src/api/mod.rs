//! Router assembly. `/api/auth` is open; `/api/tasks` and `/api/profile`
//! sit behind the bearer-token middleware. In production mode unmatched
//! routes fall back to the bundled frontend build.

pub mod auth;
pub mod profile;
pub mod tasks;

use std::path::Path;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::auth::require_auth;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState, config: &AppConfig) -> Router {
    let protected = Router::new()
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/profile", get(profile::get_profile))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected);

    let mut app = Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    if config.production {
        let index = Path::new(&config.static_dir).join("index.html");
        app = app.fallback_service(
            ServeDir::new(&config.static_dir).fallback(ServeFile::new(index)),
        );
    }

    app
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}
