//! Clinic Backend
//! Mission: Staff and doctor authentication, patient records, and
//! appointment scheduling behind a JSON HTTP API

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_backend::{
    api::create_router,
    auth::JwtHandler,
    db::Database,
    models::Config,
};

#[derive(Parser, Debug)]
#[command(name = "clinicd", about = "Clinic management backend")]
struct Args {
    /// Listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database path (overrides DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    info!("🏥 Clinic backend starting");

    let db = Arc::new(Database::new(&config.database_path)?);
    db.bootstrap_superuser(
        &config.bootstrap_admin_email,
        &config.bootstrap_admin_password,
    )?;

    let jwt = Arc::new(JwtHandler::new(config.jwt_secret.clone()));
    let app = create_router(db, jwt);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
