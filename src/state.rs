use sqlx::SqlitePool;

use crate::auth::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt: JwtService,
}
