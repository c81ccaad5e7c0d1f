mod config;
mod error;
mod routes;
mod state;
mod store;
mod todos;

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use crate::routes::middleware_auth::AuthKeys;
use crate::store::PgTaskStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("todo_web=info,tower_http=info")),
        )
        .init();

    let config = config::Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Error connecting DB")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Error running migrations")?;

    let state = state::AppState::new(
        db.clone(),
        Arc::new(PgTaskStore::new(db)),
        AuthKeys::new(&config.jwt_secret, config.token_ttl_hours),
        config.sync_mode,
        config.session_idle,
    );

    let app = routes::routes(state);

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("could not bind {}", config.addr()))?;

    tracing::info!(sync_mode = ?config.sync_mode, "server is chilling at http://{}", config.addr());

    axum::serve(listener, app).await?;
    Ok(())
}
