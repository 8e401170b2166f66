//! Loan risk prediction web application.
//!
//! Signed-in users submit applicant attributes, receive a safe/danger label
//! from a pre-trained classifier and browse their prediction history.

pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;

pub use app::{build_router, load_templates, AppState};
pub use config::Config;
pub use errors::{AppError, AppResult};
