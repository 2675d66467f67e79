//! Westeros HTTP server.
//!
//! Run with: cargo run -p thrones-cli --release -- serve

use crate::handlers;
use crate::session_middleware::session_scope;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use thrones_executor::{QueryExecutor, SessionProvider};
use thrones_storage::{
    logging, open_backend, BackendKind, GraphBackend, Metrics, MetricsError, MissingParamPolicy, ThronesConfig,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Application state shared across handlers
pub struct AppState {
    pub provider: Arc<SessionProvider>,
    pub executor: Arc<QueryExecutor>,
    pub metrics: Arc<Metrics>,
    pub missing_params: MissingParamPolicy,
    /// Directory served under `/static`
    pub static_dir: String,
}

impl AppState {
    pub fn new(backend: Arc<dyn GraphBackend>, config: &ThronesConfig) -> Result<Self, MetricsError> {
        let metrics = Arc::new(Metrics::new()?);
        Ok(Self {
            provider: Arc::new(SessionProvider::new(backend, metrics.clone())),
            executor: Arc::new(QueryExecutor::new(config.database.query_timeout(), metrics.clone())),
            metrics,
            missing_params: config.server.missing_params,
            static_dir: config.server.static_dir.clone(),
        })
    }
}

/// Creates the Axum router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let pages = Router::new()
        .route("/", get(handlers::index_page))
        .route("/characters", get(handlers::characters_page))
        .route("/stats", get(handlers::stats_page))
        .route("/metrics", get(handlers::metrics))
        .nest_service("/static", ServeDir::new(&state.static_dir));

    // Every route below gets its own graph session
    let api = Router::new()
        .route("/list", get(handlers::list_houses))
        .route("/allies/{house_id}", get(handlers::ally_count))
        .route("/foundedBy/{house_id}", get(handlers::founded_by))
        .route("/searchHouse", get(handlers::search_house))
        .route("/searchCharacter", get(handlers::search_character))
        .route("/createCharacter", get(handlers::create_character))
        .route("/createRel", get(handlers::create_rel))
        .route("/searchRegion", get(handlers::search_region))
        .route("/regions", get(handlers::regions))
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn_with_state(state.clone(), session_scope));

    Router::new()
        .merge(pages)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Where the configured store lives, for startup output.
fn database_location(config: &ThronesConfig) -> String {
    match config.database.backend {
        BackendKind::Neo4j => config.database.url.clone(),
        BackendKind::Memory => match config.database.fixture.as_deref() {
            Some(path) if !path.is_empty() => format!("memory (seeded from {})", path),
            _ => "memory (empty)".to_string(),
        },
    }
}

/// Starts the web server and serves until Ctrl+C.
pub async fn run_server(config: ThronesConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_from_config(&config.logging);

    let backend = open_backend(&config.database).await?;
    let state = Arc::new(AppState::new(backend, &config)?);
    let app = create_router(state);

    let location = database_location(&config);
    tracing::info!(
        port = config.server.port,
        database = %location,
        "Starting on port {}, database is at {}",
        config.server.port,
        location
    );

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    println!("\n🐺 Server running at http://localhost:{}", config.server.port);
    println!("   Database: {}", location);
    println!("   Query timeout: {}s", config.database.query_timeout_secs);
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown_signal = async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received, draining connections");
    };

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    println!("Server stopped gracefully");
    Ok(())
}
