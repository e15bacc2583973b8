use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_leads_api::config::Config;
use rust_leads_api::db::Database;
use rust_leads_api::db_storage::{EnrichmentStorage, LeadSink};
use rust_leads_api::enrichment::EnrichmentOrchestrator;
use rust_leads_api::handlers::{self, AppState};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the optional Postgres sink, the
/// enrichment orchestrator and the HTTP routes, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_leads_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Persistence is optional; without a database the API still enriches
    let sink: Option<Arc<dyn LeadSink>> = match config.database_url {
        Some(ref url) => {
            let db = Database::new(url).await?;
            let storage = EnrichmentStorage::new(db.pool);
            storage.ensure_schema().await?;
            tracing::info!("Database connection pool established");
            Some(Arc::new(storage))
        }
        None => None,
    };

    let orchestrator = EnrichmentOrchestrator::from_config(&config)?;
    tracing::info!("Enrichment orchestrator initialized");

    let app_state = Arc::new(AppState {
        orchestrator,
        sink,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::api_router().layer(
        ServiceBuilder::new()
            // Request size limit: 5MB max payload (prevents memory exhaustion)
            .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
            // Rate limiting: 10 req/sec per IP, burst of 20
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
