use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{AppState, Settings, routes};
use auth::AuthState;
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting YaMDb API service");

    let settings = Settings::load()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if !health_check(&pool).await? {
        anyhow::bail!("Failed to connect to database");
    }
    run_migrations(&pool).await?;

    let auth = AuthState::from_env(pool.clone())?;
    let state = AppState::new(pool, auth, &settings);
    let app = routes::create_router(state);

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
