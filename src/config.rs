use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub auth: AuthConfig,
    pub history: HistoryConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub secure_cookies: bool,
    pub max_body_size: usize, // in bytes
    pub templates_dir: String,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            secure_cookies: false,
            max_body_size: 64 * 1024,
            templates_dir: "templates".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// The scheme picks the backend: `sqlite:`, `postgres://` or `postgresql://`,
    /// `redis://` or `rediss://`. Any other scheme is rejected at startup.
    pub url: String,
    pub max_connections: u32,
    /// Key prefix for the Redis backend, so several deployments can share one server.
    pub namespace: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://loanshield.db".to_string(),
            max_connections: 5,
            namespace: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "model/loan_model.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Stored exactly as submitted.
    #[default]
    Plain,
    Bcrypt,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_username: String,
    pub admin_password: String,
    pub password_scheme: PasswordScheme,
    pub min_username_len: usize,
    pub min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: "12345".to_string(),
            password_scheme: PasswordScheme::Plain,
            min_username_len: 3,
            min_password_len: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryScope {
    /// Each user sees only their own predictions.
    #[default]
    User,
    All,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HistoryConfig {
    pub scope: HistoryScope,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            );

        // Plain PORT and DATABASE_URL win over everything else
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
