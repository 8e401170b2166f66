mod auth;

pub use auth::{is_public_path, require_auth};
