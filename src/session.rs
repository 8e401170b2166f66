use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use crate::errors::{AppError, AppResult};
use crate::models::{LoanApplication, Prediction};

const USER_KEY: &str = "user";
const LAST_PREDICTION_KEY: &str = "last_prediction";

/// Identity carried by an authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub username: String,
}

/// The most recent submission, kept so the form can be pre-filled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastPrediction {
    pub application: LoanApplication,
    pub prediction: Prediction,
}

pub async fn current_user(session: &Session) -> AppResult<Option<SessionUser>> {
    Ok(session.get::<SessionUser>(USER_KEY).await?)
}

/// Session read failures count as anonymous.
pub async fn is_authenticated(session: &Session) -> bool {
    match current_user(session).await {
        Ok(user) => user.is_some(),
        Err(e) => {
            tracing::warn!("Session lookup failed: {}", e);
            false
        }
    }
}

pub async fn require_user(session: &Session) -> AppResult<SessionUser> {
    current_user(session).await?.ok_or(AppError::Unauthenticated)
}

/// Issues a fresh session id before marking the session as signed in.
pub async fn login(session: &Session, username: &str) -> AppResult<SessionUser> {
    let user = SessionUser {
        username: username.to_string(),
    };
    session.cycle_id().await?;
    session.insert(USER_KEY, user.clone()).await?;
    Ok(user)
}

/// Drops every key and deletes the session from the store.
pub async fn logout(session: &Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}

pub async fn remember_prediction(session: &Session, last: LastPrediction) -> AppResult<()> {
    session.insert(LAST_PREDICTION_KEY, last).await?;
    Ok(())
}

pub async fn last_prediction(session: &Session) -> AppResult<Option<LastPrediction>> {
    Ok(session.get::<LastPrediction>(LAST_PREDICTION_KEY).await?)
}
