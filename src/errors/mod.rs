// Application error type shared by the stores, the model adapter and the handlers.
use thiserror::Error;

pub mod response;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedDatabase(String),

    // Raised by the key-value backend; connection failures land here too.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Password hash error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Username already exists!")]
    DuplicateUsername,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Prediction model is unavailable")]
    ModelUnavailable,

    #[error("Model error: {0}")]
    Model(String),
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
