use anyhow::Result;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub port: u16,
    pub jwt_secret: String,
    pub bootstrap_admin_email: String,
    pub bootstrap_admin_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./clinic.db".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("⚠️  JWT_SECRET not set, using insecure development secret");
            "clinic-dev-secret-change-me".to_string()
        });

        let bootstrap_admin_email = std::env::var("ADMIN_EMAIL")
            .unwrap_or_else(|_| "admin@clinic.local".to_string());

        let bootstrap_admin_password =
            std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

        Ok(Self {
            database_path,
            port,
            jwt_secret,
            bootstrap_admin_email,
            bootstrap_admin_password,
        })
    }
}
