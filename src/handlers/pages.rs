use axum::{
    extract::{Form, State},
    response::{IntoResponse, Response},
};
use tera::Context;
use tower_sessions::Session;
use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::ContactForm;
use crate::session;

pub async fn serve_about(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let user = session::require_user(&session).await?;
    let mut context = Context::new();
    context.insert("current_user", &user.username);
    Ok(state.render("about.html", &context)?.into_response())
}

pub async fn serve_contact(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let user = session::require_user(&session).await?;
    render_contact(&state, Some(&user.username), false)
}

// Public: the contact form may be posted without a session
pub async fn handle_send_message(
    State(state): State<AppState>,
    session: Session,
    Form(message): Form<ContactForm>,
) -> AppResult<Response> {
    tracing::info!(
        name = %message.name,
        email = %message.email,
        message = %message.message,
        "New contact message"
    );

    let user = session::current_user(&session).await.unwrap_or_default();
    render_contact(&state, user.as_ref().map(|u| u.username.as_str()), true)
}

fn render_contact(state: &AppState, username: Option<&str>, sent: bool) -> AppResult<Response> {
    let mut context = Context::new();
    context.insert("current_user", &username);
    context.insert("sent", &sent);
    Ok(state.render("contact.html", &context)?.into_response())
}
