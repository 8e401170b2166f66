use axum::{
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    extract::Request,
    body::Body,
};
use tower_sessions::Session;
use crate::session;

/// Routes reachable without a signed-in user.
pub fn is_public_path(path: &str) -> bool {
    matches!(path, "/login" | "/signup" | "/logout" | "/send_message")
        || path.starts_with("/static/")
}

pub async fn require_auth(
    session: Session,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();

    if is_public_path(path) {
        return next.run(req).await;
    }

    if session::is_authenticated(&session).await {
        next.run(req).await
    } else {
        tracing::debug!("Anonymous request to {} redirected to login", path);
        Redirect::to("/login").into_response()
    }
}
