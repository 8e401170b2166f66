use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tera::Context;
use tower_sessions::Session;
use crate::app::AppState;
use crate::config::HistoryScope;
use crate::errors::AppResult;
use crate::models::HistoryStats;
use crate::services::SiteStats;
use crate::session;

pub async fn serve_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let user = session::require_user(&session).await?;
    let scope = state.config.history.scope;

    let history = match scope {
        HistoryScope::User => state.storage.list_for_user(&user.username).await,
        HistoryScope::All => state.storage.list_all().await,
    };
    // A store fault renders as an empty history
    let history = history.unwrap_or_else(|e| {
        tracing::error!("Dashboard error for {}: {}", user.username, e);
        Vec::new()
    });
    let stats = HistoryStats::from_records(&history);

    tracing::info!(
        "Dashboard for {}: {} predictions ({} safe, {} danger)",
        user.username,
        stats.total,
        stats.safe,
        stats.danger
    );

    let mut context = Context::new();
    context.insert("current_user", &user.username);
    context.insert("history", &history);
    context.insert("show_owner", &(scope == HistoryScope::All));
    context.insert("safe", &stats.safe);
    context.insert("danger", &stats.danger);
    context.insert("total", &stats.total);
    Ok(state.render("dashboard.html", &context)?.into_response())
}

pub async fn serve_home(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let user = session::require_user(&session).await?;

    let site = state.storage.stats().await.unwrap_or_else(|e| {
        tracing::error!("Home page error: {}", e);
        SiteStats::default()
    });
    let mine = match state.storage.list_for_user(&user.username).await {
        Ok(history) => HistoryStats::from_records(&history),
        Err(e) => {
            tracing::error!("Home page history error for {}: {}", user.username, e);
            HistoryStats::default()
        }
    };

    let mut context = Context::new();
    context.insert("current_user", &user.username);
    context.insert("total_predictions", &site.total_predictions);
    context.insert("total_users", &site.total_users);
    context.insert("mine", &mine);
    context.insert("model_available", &state.model.is_available());
    Ok(state.render("home.html", &context)?.into_response())
}
