use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contact_book_api::config::Config;
use contact_book_api::db::Database;
use contact_book_api::db_storage::PgContactRepository;
use contact_book_api::enrichment::AddressResolver;
use contact_book_api::export::ExportRegistry;
use contact_book_api::handlers::{self, AppState};
use contact_book_api::orchestrator::ContactOrchestrator;
use contact_book_api::repository::{ContactRepository, InMemoryContactRepository};
use contact_book_api::services::ViaCepClient;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Contact storage (PostgreSQL, or in memory when no database is configured).
/// - The ViaCEP client and export handlers.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contact_book_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let repository: Arc<dyn ContactRepository> = match &config.database_url {
        Some(url) => {
            let db = Database::new(url).await?;
            db.migrate().await?;
            tracing::info!("Database connection pool established");
            Arc::new(PgContactRepository::new(db.pool.clone()))
        }
        None => {
            tracing::warn!("Using in-memory contact storage; data is lost on restart");
            Arc::new(InMemoryContactRepository::new())
        }
    };

    let viacep = ViaCepClient::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize ViaCEP client: {}", e))?;
    tracing::info!("✓ ViaCEP client initialized: {}", config.viacep_base_url);

    let exporters = Arc::new(ExportRegistry::with_defaults());
    tracing::info!("Export formats available: {:?}", exporters.formats());

    let contacts = ContactOrchestrator::new(
        repository,
        AddressResolver::new(Arc::new(viacep)),
        exporters,
    );

    // Build application state
    let app_state = Arc::new(AppState {
        contacts: Arc::new(contacts),
        config: config.clone(),
    });

    // Configure rate limiter per IP
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    // Rate limiting covers the contact routes; the health check bypasses it
    let app = handlers::router_with(app_state, |routes| {
        routes.layer(GovernorLayer {
            config: governor_conf,
        })
    });

    // Start server
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
