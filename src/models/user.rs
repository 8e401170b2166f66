use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    // Plaintext or a bcrypt hash, depending on `auth.password_scheme`
    pub password: String,
}
