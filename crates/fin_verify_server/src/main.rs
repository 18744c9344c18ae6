//! fin_verify_server: standalone REST server for the verification pipeline.
//!
//! Reads config from env vars (a `.env` file is honored):
//!   VERIFY_PROVIDER_BASE_URL      provider API base URL (required)
//!   VERIFY_PROVIDER_API_KEY       provider credential (required)
//!   VERIFY_PROVIDER_AUTH_HEADER   credential header (default: Authorization)
//!   VERIFY_PROVIDER_TIMEOUT_SECS  provider request timeout (default: 30)
//!   VERIFY_DATABASE_URL           Postgres connection string (optional; in-memory when unset)
//!   VERIFY_DATABASE_POOL_SIZE     pool size (default: 10)
//!   VERIFY_JWT_SECRET             JWT HMAC secret (required)
//!   VERIFY_BIND_ADDR              listen address (default: 0.0.0.0:4200)

use std::sync::Arc;

use anyhow::Context;
use fin_verify_core::config::ProviderConfig;
use fin_verify_core::{ChallengeOrchestrator, HttpGateway, MemoryStore, VerificationGateway};
use fin_verify_postgres::{connect, run_migrations, DatabaseConfig, PgStores};
use fin_verify_server::config::ServerConfig;
use fin_verify_server::middleware::jwt::JwtConfig;
use fin_verify_server::router::build_router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fin_verify_server=debug".into()),
        )
        .init();

    let server_config = ServerConfig::from_env()?;
    let provider_config = ProviderConfig::from_env()?;
    tracing::info!(
        base_url = %provider_config.base_url,
        timeout_secs = provider_config.timeout.as_secs(),
        "Verification provider configured"
    );
    let gateway: Arc<dyn VerificationGateway> = Arc::new(HttpGateway::new(provider_config)?);

    let orchestrator = match DatabaseConfig::from_env() {
        Some(db_config) => {
            let pool = connect(&db_config)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!("Connected to database");

            let stores = PgStores::new(pool);
            ChallengeOrchestrator::new(
                gateway,
                Arc::new(stores.challenges),
                Arc::new(stores.consents),
                Arc::new(stores.summaries),
                Arc::new(stores.tax_records),
            )
        }
        None => {
            tracing::warn!(
                "VERIFY_DATABASE_URL not set; using in-memory store (state is lost on restart)"
            );
            ChallengeOrchestrator::in_memory(gateway, Arc::new(MemoryStore::new()))
        }
    };

    let jwt_config = JwtConfig::from_secret(server_config.jwt_secret.as_bytes());
    let app = build_router(Arc::new(orchestrator), jwt_config);

    let listener = TcpListener::bind(&server_config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", server_config.bind_addr))?;
    tracing::info!("fin_verify_server listening on {}", server_config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
