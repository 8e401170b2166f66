use anyhow::Context;
use loanshield::{
    build_router, load_templates,
    config::Config,
    services::{RiskModel, Storage},
    AppState,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!(
        cwd = %std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_default(),
        port = config.server.port,
        "Starting loanshield"
    );

    // Storage failures at startup are logged; requests then see "no data"
    let storage = Storage::open(&config.database, config.auth.clone())
        .context("Invalid database URL")?;
    match storage.init().await {
        Ok(()) => tracing::info!("{} database initialized", storage.backend_name()),
        Err(e) => tracing::error!("Database initialization error: {}", e),
    }

    let model = RiskModel::load(&config.model.path);
    let templates = load_templates(&config.server.templates_dir)
        .context("Failed to load templates")?;

    let addr = config.bind_address();
    let app = build_router(AppState::new(storage, model, templates, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on {}", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;
    Ok(())
}
