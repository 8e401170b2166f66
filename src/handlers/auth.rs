use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response, Redirect},
};
use tera::Context;
use tower_sessions::Session;
use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::{LoginForm, SignupForm};
use crate::session;

fn render_login(state: &AppState, error: Option<&str>) -> AppResult<Response> {
    let mut context = Context::new();
    context.insert("current_user", &None::<String>);
    context.insert("error", &error);
    Ok(state.render("login.html", &context)?.into_response())
}

fn render_signup(
    state: &AppState,
    status: StatusCode,
    username: &str,
    error: Option<&str>,
) -> AppResult<Response> {
    let mut context = Context::new();
    context.insert("current_user", &None::<String>);
    context.insert("username", username);
    context.insert("error", &error);
    Ok((status, state.render("signup.html", &context)?).into_response())
}

pub async fn serve_login_page(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    if session::is_authenticated(&session).await {
        return Ok(Redirect::to("/").into_response());
    }
    render_login(&state, None)
}

#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(login_form): Form<LoginForm>,
) -> AppResult<Response> {
    if session::is_authenticated(&session).await {
        return Ok(Redirect::to("/").into_response());
    }
    // Trimmed the same way signup trims it
    let username = login_form.username.trim();
    tracing::info!("Login attempt for user: {}", username);

    match state.storage.find_user(username, &login_form.password).await {
        Ok(true) => {
            session::login(&session, username).await?;
            tracing::info!("User {} signed in", username);
            Ok(Redirect::to("/").into_response())
        }
        Ok(false) => {
            tracing::info!("Invalid credentials for user: {}", username);
            render_login(&state, Some("Invalid username or password"))
        }
        // Fail closed when the store cannot answer
        Err(e) => {
            tracing::error!("Login validation error for {}: {}", username, e);
            render_login(&state, Some("Unable to verify credentials right now"))
        }
    }
}

pub async fn serve_signup_page(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    if session::is_authenticated(&session).await {
        return Ok(Redirect::to("/").into_response());
    }
    render_signup(&state, StatusCode::OK, "", None)
}

pub async fn handle_signup(
    State(state): State<AppState>,
    session: Session,
    Form(signup_form): Form<SignupForm>,
) -> AppResult<Response> {
    if session::is_authenticated(&session).await {
        return Ok(Redirect::to("/").into_response());
    }
    let username = signup_form.username.trim();

    match state.storage.create_user(username, &signup_form.password).await {
        Ok(user) => {
            tracing::info!("New user registered: {} (id {})", user.username, user.id);
            Ok(Redirect::to("/login").into_response())
        }
        Err(AppError::DuplicateUsername) => {
            tracing::info!("Signup rejected, username taken: {}", username);
            render_signup(&state, StatusCode::CONFLICT, username, Some("Username already exists!"))
        }
        Err(AppError::Validation(msg)) => {
            render_signup(&state, StatusCode::BAD_REQUEST, username, Some(&msg))
        }
        Err(e) => {
            tracing::error!("Signup error for {}: {}", username, e);
            render_signup(
                &state,
                StatusCode::INTERNAL_SERVER_ERROR,
                username,
                Some("An error occurred while creating the account"),
            )
        }
    }
}

pub async fn handle_logout(session: Session) -> Response {
    if let Err(e) = session::logout(&session).await {
        tracing::warn!("Session removal error: {}", e);
    }
    Redirect::to("/login").into_response()
}
