use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use screening_api::access::bearer::JwtVerifier;
use screening_api::access::rate_limit::{MemoryRateLimiter, RateLimiter, RedisRateLimiter};
use screening_api::config::{Config, StorageBackend};
use screening_api::db::create_pool;
use screening_api::llm_client::{self, LlmClient};
use screening_api::models::candidate::{CandidateRow, JobPostingRow};
use screening_api::routes::build_router;
use screening_api::scoring::provider::{HttpScoreProvider, MemoryScoreProvider, ScoreProvider};
use screening_api::screening::interviewer::{Interviewer, LlmInterviewer, ScriptedInterviewer};
use screening_api::screening::service::{ScreeningService, ScreeningSettings};
use screening_api::state::AppState;
use screening_api::store::{
    CandidateDirectory, MemoryDirectory, MemorySessionStore, PgDirectory, PgSessionStore,
    SessionStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("screening_api={},tower_http=info", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screening API v{}", env!("CARGO_PKG_VERSION"));

    let (store, directory, rate_limiter): (
        Arc<dyn SessionStore>,
        Arc<dyn CandidateDirectory>,
        Arc<dyn RateLimiter>,
    ) = match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let db = create_pool(database_url).await?;

            let redis_url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the postgres backend")?;
            let redis = redis::Client::open(redis_url)?;
            info!("Redis client initialized");

            (
                Arc::new(PgSessionStore::new(db.clone())),
                Arc::new(PgDirectory::new(db)),
                Arc::new(RedisRateLimiter::new(
                    redis,
                    config.public_rate_limit_per_minute,
                )),
            )
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; sessions are lost on restart");
            let directory = MemoryDirectory::new();
            seed_demo_directory(&directory).await;
            (
                Arc::new(MemorySessionStore::new()),
                Arc::new(directory),
                Arc::new(MemoryRateLimiter::new(config.public_rate_limit_per_minute)),
            )
        }
    };

    // Interviewer: LLM when a key is configured, scripted questions otherwise
    let interviewer: Arc<dyn Interviewer> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmInterviewer::new(llm))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; interviewer will use scripted questions");
            Arc::new(ScriptedInterviewer)
        }
    };

    let scores: Arc<dyn ScoreProvider> = match &config.scoring_service_url {
        Some(url) => {
            info!("Scoring service at {url}");
            Arc::new(HttpScoreProvider::new(url)?)
        }
        None => Arc::new(MemoryScoreProvider::new()),
    };

    let screening = ScreeningService::new(
        store,
        directory,
        interviewer,
        ScreeningSettings::from_config(&config),
    );

    // Build app state
    let state = AppState {
        screening,
        jwt: JwtVerifier::new(&config.jwt_secret),
        rate_limiter,
        scores,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the HR frontend once its domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Adds one tenant, job and candidate so the memory backend is usable out of the box.
async fn seed_demo_directory(directory: &MemoryDirectory) {
    let tenant_id = Uuid::new_v4();
    let job = JobPostingRow {
        id: Uuid::new_v4(),
        tenant_id,
        title: "Backend Engineer".to_string(),
        department: "Engineering".to_string(),
        location: Some("Remote".to_string()),
        description: "Design, build and operate the services behind our HR platform.".to_string(),
        requirements: vec![
            "3+ years building web services".to_string(),
            "Experience with SQL databases".to_string(),
        ],
    };
    let candidate = CandidateRow {
        id: Uuid::new_v4(),
        name: "Demo Candidate".to_string(),
        job_posting_id: job.id,
    };

    info!(
        "Seeded demo data: tenant {tenant_id}, job {}, candidate {}",
        job.id, candidate.id
    );
    directory.insert_job(job).await;
    directory.insert_candidate(candidate).await;
}
