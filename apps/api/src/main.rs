mod analytics;
mod auth;
mod config;
mod db;
mod errors;
mod extract;
mod llm_client;
mod models;
mod routes;
mod seed;
mod state;
mod store;
mod student;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{FirebaseVerifier, IdentityVerifier};
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, QuestionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Homework API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (lazy: the first query opens the connection)
    let store: Arc<dyn QuestionStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url)?;
            run_migrations(&pool).await;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set - using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.seed_demo_data {
        match seed::seed_demo_data(store.as_ref()).await {
            Ok(true) => info!("Demo data seeded"),
            Ok(false) => {}
            Err(e) => warn!("Demo seed failed: {e}"),
        }
    }

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone())?;
    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY not set - question submission will fail");
    }
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize identity verification
    let verifier: Option<Arc<dyn IdentityVerifier>> = match &config.firebase_api_key {
        Some(key) => Some(Arc::new(FirebaseVerifier::new(key.clone())?)),
        None => {
            warn!("FIREBASE_API_KEY not set - admin checks disabled");
            None
        }
    };

    // Build app state
    let state = AppState {
        store,
        llm: Arc::new(llm),
        verifier,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
