mod auth;
mod predict;
mod dashboard;
mod pages;

pub use auth::{serve_login_page, handle_login, serve_signup_page, handle_signup, handle_logout};
pub use predict::{serve_predict_page, handle_predict};
pub use dashboard::{serve_dashboard, serve_home};
pub use pages::{serve_about, serve_contact, handle_send_message};
