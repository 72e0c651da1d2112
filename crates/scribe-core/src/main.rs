use anyhow::Result;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe_core::background;
use scribe_core::config::Config;
use scribe_core::conversation_service::ConversationService;
use scribe_core::db::Db;
use scribe_core::embedding_client::EmbeddingClient;
use scribe_core::llm::client::LlmClient;
use scribe_core::llm::predict::configure_lm;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "scribe_core=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("conversation core starting up...");

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    info!("configuration loaded (model: {})", config.llm_model);

    // Run database migrations first, exactly once, before anything touches the pool.
    {
        use diesel::prelude::*;
        use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
        pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

        let mut conn = diesel::PgConnection::establish(&config.database_url)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("migration failed: {}", e))?;
        info!("database migrations applied");
    }

    let llm_api_key = config
        .llm_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("LLM_API_KEY not set"))?;

    // Configure the global DSRs LM once, for the router-fallback and
    // summary-generation `Predict` calls (see SPEC_FULL.md §9 for why these
    // are separate from the direct streaming client below).
    configure_lm(
        &config.llm_api_url,
        &llm_api_key,
        &config.llm_model,
        config.summary_max_output_tokens,
    )
    .await?;
    info!("router/summary LM configured");

    let db = Db::connect(&config.database_url)?;
    let llm_client = LlmClient::new(
        &config.llm_api_url,
        &llm_api_key,
        &config.llm_model,
        config.max_provider_retries,
    );
    let embedding_api_key = config.embedding_api_key.clone().unwrap_or_default();
    let embedding_client = EmbeddingClient::new(
        &config.embedding_api_url,
        &embedding_api_key,
        &config.embedding_model,
        config.embedding_dim,
    );

    let conversation_service = ConversationService::new(db.clone(), config.clone());
    background::spawn_worker(db.clone(), conversation_service.clone(), config.job_queue_poll_interval_secs);
    info!("background job worker started");

    // This binary exposes only a health-check route: HTTP/WebSocket framing
    // and the conversation-exchange route itself are an external transport
    // concern (spec §1 Non-goals). `db`, `llm_client`, `embedding_client`,
    // and `conversation_service` are the collaborators a transport layer
    // wires into `scribe_core::exchange::handle` per request.
    drop(llm_client);
    drop(embedding_client);

    let health_router = Router::new().route("/health", get(health_check));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    info!("health check listening on :{}", config.http_port);
    axum::serve(listener, health_router).await?;

    Ok(())
}
