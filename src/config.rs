use tracing::warn;

/// Process configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub production: bool,
    pub static_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://taskflow.db".to_string());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(5000);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using development fallback");
            "taskflow-dev-secret".to_string()
        });

        // 7 days
        let jwt_ttl_secs = std::env::var("JWT_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(604_800);

        let production = std::env::var("APP_ENV")
            .map(|env| env == "production")
            .unwrap_or(false);

        let static_dir = std::env::var("STATIC_DIR")
            .unwrap_or_else(|_| "../frontend/build".to_string());

        Self {
            database_url,
            port,
            jwt_secret,
            jwt_ttl_secs,
            production,
            static_dir,
        }
    }
}
