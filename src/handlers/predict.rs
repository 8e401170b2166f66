use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tera::Context;
use tower_sessions::Session;
use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::PredictForm;
use crate::session::{self, LastPrediction};

fn render_form(
    state: &AppState,
    username: &str,
    status: StatusCode,
    form: &PredictForm,
    error: Option<&str>,
) -> AppResult<Response> {
    let mut context = Context::new();
    context.insert("current_user", username);
    context.insert("form", form);
    context.insert("error", &error);
    context.insert("model_available", &state.model.is_available());
    Ok((status, state.render("predict.html", &context)?).into_response())
}

pub async fn serve_predict_page(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let user = session::require_user(&session).await?;

    // Pre-fill with the previous submission when there is one
    let form = match session::last_prediction(&session).await {
        Ok(Some(last)) => PredictForm::from(&last.application),
        Ok(None) => PredictForm::default(),
        Err(e) => {
            tracing::warn!("Could not read last prediction from session: {}", e);
            PredictForm::default()
        }
    };
    render_form(&state, &user.username, StatusCode::OK, &form, None)
}

pub async fn handle_predict(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PredictForm>,
) -> AppResult<Response> {
    let user = session::require_user(&session).await?;

    let application = match form.parse() {
        Ok(application) => application,
        Err(e) => {
            tracing::debug!("Rejected prediction form from {}: {}", user.username, e);
            return render_form(&state, &user.username, StatusCode::BAD_REQUEST, &form, Some(&e.to_string()));
        }
    };

    // Short-circuits with ModelUnavailable when the artifact never loaded
    let prediction = state.model.predict(&application)?;
    let probability = state.model.probability(&application)?;

    // Persistence failures must not cost the caller their result
    match state.storage.record(&user.username, &application, prediction).await {
        Ok(record) => tracing::info!(
            "Prediction {} saved for user {} (label {})",
            record.id,
            user.username,
            prediction.label()
        ),
        Err(e) => tracing::error!("Prediction for {} not saved: {}", user.username, e),
    }

    let last = LastPrediction {
        application: application.clone(),
        prediction,
    };
    if let Err(e) = session::remember_prediction(&session, last).await {
        tracing::warn!("Could not store last prediction in session: {}", e);
    }

    let mut context = Context::new();
    context.insert("current_user", &user.username);
    context.insert("prediction", &prediction.label());
    context.insert("probability", &format!("{:.1}", probability * 100.0));
    context.insert("application", &application);
    Ok(state.render("result.html", &context)?.into_response())
}
