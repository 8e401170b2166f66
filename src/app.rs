use std::sync::Arc;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    response::Html,
    routing::{get, post},
    Router,
};
use tera::{Context, Tera};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};
use tower_sessions::cookie::SameSite;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use crate::config::Config;
use crate::errors::AppResult;
use crate::services::{RiskModel, Storage};
use crate::{handlers, middleware};

/// Shared by every handler. The model and templates are read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub model: Arc<RiskModel>,
    pub templates: Arc<Tera>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: Storage, model: RiskModel, templates: Tera, config: Config) -> Self {
        Self {
            storage,
            model: Arc::new(model),
            templates: Arc::new(templates),
            config: Arc::new(config),
        }
    }

    pub fn render(&self, template: &str, context: &Context) -> AppResult<Html<String>> {
        let html = self.templates.render(template, context).map_err(|e| {
            tracing::error!("Failed to render {}: {:?}", template, e);
            e
        })?;
        Ok(Html(html))
    }
}

/// Compiles every `*.html` template under `dir`.
pub fn load_templates(dir: &str) -> AppResult<Tera> {
    let glob = format!("{}/**/*.html", dir.trim_end_matches('/'));
    Ok(Tera::new(&glob)?)
}

pub fn build_router(state: AppState) -> Router {
    let server = &state.config.server;

    // Session store setup
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(server.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_name("session");
    let static_files = ServeDir::new(&server.static_dir);
    let body_limit = server.max_body_size;

    Router::new()
        // Auth routes
        .route("/login", get(handlers::serve_login_page).post(handlers::handle_login))
        .route("/signup", get(handlers::serve_signup_page).post(handlers::handle_signup))
        .route("/logout", get(handlers::handle_logout))

        // Prediction routes
        .route("/", get(handlers::serve_home))
        .route("/predict", get(handlers::serve_predict_page).post(handlers::handle_predict))
        .route("/dashboard", get(handlers::serve_dashboard))

        // Informational pages
        .route("/about", get(handlers::serve_about))
        .route("/contact", get(handlers::serve_contact))
        .route("/send_message", post(handlers::handle_send_message))

        // Static files
        .nest_service("/static", static_files)

        // Add middleware
        .layer(from_fn(middleware::require_auth))
        .layer(session_layer)

        // Form bodies are small
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))

        .with_state(state)
}
