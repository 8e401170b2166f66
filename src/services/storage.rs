use chrono::{SubsecRound, Utc};
use crate::config::{AuthConfig, DatabaseConfig, PasswordScheme};
use crate::errors::{AppError, AppResult};
use crate::models::{HistoryRecord, LoanApplication, Prediction, User};
use super::{PostgresService, RedisService, SqliteService};

#[derive(Clone)]
enum Backend {
    Sqlite(SqliteService),
    Postgres(PostgresService),
    Redis(RedisService),
}

/// Global counts shown on the landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteStats {
    pub total_users: u64,
    pub total_predictions: u64,
}

/// Credential and history stores over whichever backend the database URL selects.
#[derive(Clone)]
pub struct Storage {
    backend: Backend,
    auth: AuthConfig,
}

macro_rules! dispatch {
    ($self:ident, $svc:ident => $call:expr) => {
        match &$self.backend {
            Backend::Sqlite($svc) => $call,
            Backend::Postgres($svc) => $call,
            Backend::Redis($svc) => $call,
        }
    };
}

impl Storage {
    pub fn open(database: &DatabaseConfig, auth: AuthConfig) -> AppResult<Self> {
        let url = database.url.as_str();
        let scheme = url.split(':').next().unwrap_or_default();
        let backend = match scheme {
            "sqlite" => Backend::Sqlite(SqliteService::open(url, database.max_connections)?),
            "postgres" | "postgresql" => {
                Backend::Postgres(PostgresService::open(url, database.max_connections)?)
            }
            "redis" | "rediss" => Backend::Redis(RedisService::open(url, &database.namespace)?),
            // Only the scheme is reported, the rest may carry credentials
            _ => return Err(AppError::UnsupportedDatabase(scheme.to_string())),
        };
        Ok(Self { backend, auth })
    }

    pub fn from_sqlite(service: SqliteService, auth: AuthConfig) -> Self {
        Self { backend: Backend::Sqlite(service), auth }
    }

    pub fn from_postgres(service: PostgresService, auth: AuthConfig) -> Self {
        Self { backend: Backend::Postgres(service), auth }
    }

    pub fn from_redis(service: RedisService, auth: AuthConfig) -> Self {
        Self { backend: Backend::Redis(service), auth }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Sqlite(_) => "sqlite",
            Backend::Postgres(_) => "postgres",
            Backend::Redis(_) => "redis",
        }
    }

    /// Creates tables if missing and seeds the default admin account.
    pub async fn init(&self) -> AppResult<()> {
        dispatch!(self, svc => svc.init_schema().await)?;

        let admin = self.auth.admin_username.clone();
        if dispatch!(self, svc => svc.stored_password(&admin).await)?.is_none() {
            let password = self.encode_password(&self.auth.admin_password)?;
            match dispatch!(self, svc => svc.insert_user(&admin, &password).await) {
                Ok(_) => tracing::info!("Seeded default account '{}'", admin),
                // Another process seeded it first
                Err(AppError::DuplicateUsername) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// True iff the pair matches a stored credential.
    pub async fn find_user(&self, username: &str, password: &str) -> AppResult<bool> {
        let stored = match dispatch!(self, svc => svc.stored_password(username).await)? {
            Some(stored) => stored,
            None => return Ok(false),
        };
        match self.auth.password_scheme {
            PasswordScheme::Plain => Ok(stored == password),
            PasswordScheme::Bcrypt => match bcrypt::verify(password, &stored) {
                Ok(matched) => Ok(matched),
                Err(e) => {
                    tracing::warn!("Stored password for {} is not a bcrypt hash: {}", username, e);
                    Ok(false)
                }
            },
        }
    }

    pub async fn create_user(&self, username: &str, password: &str) -> AppResult<User> {
        validate_signup(&self.auth, username, password)?;
        let password = self.encode_password(password)?;
        dispatch!(self, svc => svc.insert_user(username, &password).await)
    }

    pub async fn record(
        &self,
        username: &str,
        application: &LoanApplication,
        prediction: Prediction,
    ) -> AppResult<HistoryRecord> {
        // Stored timestamps keep microsecond precision
        let created_at = Utc::now().trunc_subsecs(6);
        dispatch!(self, svc => svc.insert_history(username, application, prediction, created_at).await)
    }

    /// Newest first.
    pub async fn list_for_user(&self, username: &str) -> AppResult<Vec<HistoryRecord>> {
        dispatch!(self, svc => svc.history_for_user(username).await)
    }

    /// Every user's history, newest first.
    pub async fn list_all(&self) -> AppResult<Vec<HistoryRecord>> {
        dispatch!(self, svc => svc.history_all().await)
    }

    pub async fn stats(&self) -> AppResult<SiteStats> {
        Ok(SiteStats {
            total_users: dispatch!(self, svc => svc.count_users().await)?,
            total_predictions: dispatch!(self, svc => svc.count_history().await)?,
        })
    }

    fn encode_password(&self, password: &str) -> AppResult<String> {
        match self.auth.password_scheme {
            PasswordScheme::Plain => Ok(password.to_string()),
            PasswordScheme::Bcrypt => Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?),
        }
    }
}

/// Signup rules, checked before any insert is attempted.
pub fn validate_signup(auth: &AuthConfig, username: &str, password: &str) -> AppResult<()> {
    if username.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Username and password are required!".into()));
    }
    if username.chars().count() < auth.min_username_len {
        return Err(AppError::Validation(format!(
            "Username must be at least {} characters!",
            auth.min_username_len
        )));
    }
    if password.chars().count() < auth.min_password_len {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters!",
            auth.min_password_len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicU64, Ordering};
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use crate::models::HistoryStats;

    async fn storage_with(auth: AuthConfig) -> Storage {
        let storage = Storage::from_sqlite(SqliteService::in_memory().await.unwrap(), auth);
        storage.init().await.unwrap();
        storage
    }

    async fn storage() -> Storage {
        storage_with(AuthConfig::default()).await
    }

    /// Name no other test run will pick, for isolating runs on a shared server.
    fn unique_name(prefix: &str) -> String {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!(
            "{}_{}_{}_{}",
            prefix,
            std::process::id(),
            nanos,
            NEXT.fetch_add(1, Ordering::Relaxed)
        )
    }

    /// Fresh schema on the server named by TEST_POSTGRES_URL, if set.
    async fn postgres_storage() -> Option<Storage> {
        let url = std::env::var("TEST_POSTGRES_URL").ok()?;
        let schema = unique_name("loanshield_test");
        let admin = sqlx::PgPool::connect(&url).await.unwrap();
        sqlx::query(&format!("CREATE SCHEMA {}", schema))
            .execute(&admin)
            .await
            .unwrap();

        let options = PgConnectOptions::from_str(&url)
            .unwrap()
            .options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new().max_connections(2).connect_lazy_with(options);
        let storage = Storage::from_postgres(PostgresService::new(pool), AuthConfig::default());
        storage.init().await.unwrap();
        Some(storage)
    }

    /// Fresh key namespace on the server named by TEST_REDIS_URL, if set.
    async fn redis_storage() -> Option<Storage> {
        let url = std::env::var("TEST_REDIS_URL").ok()?;
        let namespace = format!("{}:", unique_name("loanshield_test"));
        let storage = Storage::from_redis(
            RedisService::open(&url, &namespace).unwrap(),
            AuthConfig::default(),
        );
        storage.init().await.unwrap();
        Some(storage)
    }

    fn application() -> LoanApplication {
        LoanApplication {
            age: 35.0,
            income: 50000.0,
            loan_amount: 20000.0,
            credit_score: 650.0,
            dti_ratio: 0.3,
            education: "Bachelor".into(),
            employment: "Full-time".into(),
        }
    }

    /// Store behavior every backend must share. Expects a freshly initialized store.
    async fn check_store_contract(storage: &Storage) {
        // Seeded admin, seeded once
        assert!(storage.find_user("admin", "12345").await.unwrap());
        storage.init().await.unwrap();
        assert_eq!(storage.stats().await.unwrap().total_users, 1);

        // Credentials
        let alice = storage.create_user("alice", "wonderland").await.unwrap();
        assert_eq!(alice.username, "alice");
        assert!(storage.find_user("alice", "wonderland").await.unwrap());
        assert!(!storage.find_user("alice", "Wonderland").await.unwrap());
        assert!(!storage.find_user("nobody", "wonderland").await.unwrap());

        // Duplicate usernames change nothing
        let err = storage.create_user("alice", "another1").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));
        assert_eq!(storage.stats().await.unwrap().total_users, 2);
        assert!(storage.find_user("alice", "wonderland").await.unwrap());
        assert!(!storage.find_user("alice", "another1").await.unwrap());

        // Ids stay unique after a rejected insert
        let bob = storage.create_user("bob", "builder").await.unwrap();
        assert!(bob.id > alice.id);
        assert_eq!(storage.stats().await.unwrap().total_users, 3);

        // History, scoped and newest first
        assert!(storage.list_for_user("alice").await.unwrap().is_empty());
        let first = storage.record("alice", &application(), Prediction::Safe).await.unwrap();
        let other = storage.record("bob", &application(), Prediction::Danger).await.unwrap();
        let second = storage.record("alice", &application(), Prediction::Danger).await.unwrap();

        let mine = storage.list_for_user("alice").await.unwrap();
        assert_eq!(mine, vec![second.clone(), first.clone()]);

        let all = storage.list_all().await.unwrap();
        assert_eq!(
            all.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![second.id, other.id, first.id]
        );
        let stats = HistoryStats::from_records(&all);
        assert_eq!((stats.safe, stats.danger, stats.total), (1, 2, 3));
        assert_eq!(storage.stats().await.unwrap().total_predictions, 3);
    }

    #[tokio::test]
    async fn sqlite_store_contract() {
        check_store_contract(&storage().await).await;
    }

    #[tokio::test]
    async fn postgres_store_contract() {
        match postgres_storage().await {
            Some(storage) => check_store_contract(&storage).await,
            None => eprintln!("TEST_POSTGRES_URL not set, skipping"),
        }
    }

    #[tokio::test]
    async fn redis_store_contract() {
        match redis_storage().await {
            Some(storage) => check_store_contract(&storage).await,
            None => eprintln!("TEST_REDIS_URL not set, skipping"),
        }
    }

    #[test]
    fn signup_validation_messages() {
        let auth = AuthConfig::default();
        let message = |u: &str, p: &str| match validate_signup(&auth, u, p) {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("unexpected result: {:?}", other),
        };
        assert_eq!(message("", "secret"), "Username and password are required!");
        assert_eq!(message("bob", ""), "Username and password are required!");
        assert_eq!(message("bo", "secret"), "Username must be at least 3 characters!");
        assert_eq!(message("bob", "1234"), "Password must be at least 5 characters!");
        assert!(validate_signup(&auth, "bob", "12345").is_ok());
    }

    #[tokio::test]
    async fn duplicate_username_leaves_row_count_unchanged() {
        let storage = storage().await;
        storage.create_user("alice", "wonderland").await.unwrap();
        let before = storage.stats().await.unwrap().total_users;

        let err = storage.create_user("alice", "another1").await.unwrap_err();
        assert_eq!(err.to_string(), "Username already exists!");
        assert_eq!(storage.stats().await.unwrap().total_users, before);
    }

    #[tokio::test]
    async fn invalid_signup_never_reaches_the_store() {
        let storage = storage().await;
        assert!(matches!(
            storage.create_user("al", "wonderland").await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(storage.stats().await.unwrap().total_users, 1);
    }

    #[tokio::test]
    async fn bcrypt_scheme_hashes_stored_passwords() {
        let auth = AuthConfig {
            password_scheme: PasswordScheme::Bcrypt,
            ..AuthConfig::default()
        };
        let storage = storage_with(auth).await;
        storage.create_user("carol", "s3cret!").await.unwrap();

        assert!(storage.find_user("carol", "s3cret!").await.unwrap());
        assert!(!storage.find_user("carol", "wrong-pass").await.unwrap());
        assert!(storage.find_user("admin", "12345").await.unwrap());

        let stored = dispatch!(storage, svc => svc.stored_password("carol").await)
            .unwrap()
            .unwrap();
        assert_ne!(stored, "s3cret!");
    }

    #[tokio::test]
    async fn record_adds_exactly_one_danger_row() {
        let storage = storage().await;
        let before = storage.list_for_user("alice").await.unwrap();
        let before_stats = HistoryStats::from_records(&before);

        let record = storage
            .record("alice", &application(), Prediction::Danger)
            .await
            .unwrap();
        assert_eq!(record.prediction, Prediction::Danger);

        let after = storage.list_for_user("alice").await.unwrap();
        let after_stats = HistoryStats::from_records(&after);
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after_stats.danger, before_stats.danger + 1);
        assert_eq!(after_stats.safe, before_stats.safe);
        assert_eq!(after[0], record);
    }

    fn database(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            max_connections: 1,
            namespace: String::new(),
        }
    }

    #[tokio::test]
    async fn database_url_scheme_selects_backend() {
        let backend = |url: &str| {
            Storage::open(&database(url), AuthConfig::default()).map(|s| s.backend_name())
        };
        assert_eq!(backend("redis://127.0.0.1:6379").unwrap(), "redis");
        assert_eq!(backend("rediss://cache.internal:6380").unwrap(), "redis");
        assert_eq!(backend("postgresql://localhost/loanshield").unwrap(), "postgres");
        assert_eq!(backend("postgres://app:pw@db.internal:5432/loans").unwrap(), "postgres");
        assert_eq!(backend("sqlite::memory:").unwrap(), "sqlite");
    }

    #[test]
    fn unknown_database_scheme_is_rejected() {
        for url in ["mysql://app:pw@db/loans", "loanshield.db", ""] {
            match Storage::open(&database(url), AuthConfig::default()) {
                Err(AppError::UnsupportedDatabase(scheme)) => {
                    assert!(!scheme.contains("pw"));
                }
                Err(e) => panic!("unexpected error for {:?}: {}", url, e),
                Ok(_) => panic!("{:?} should be rejected", url),
            }
        }
    }

    #[tokio::test]
    async fn sqlite_file_url_is_created_on_init() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("loanshield.db").display());
        let storage = Storage::open(&database(&url), AuthConfig::default()).unwrap();
        assert_eq!(storage.backend_name(), "sqlite");
        storage.init().await.unwrap();
        assert!(storage.find_user("admin", "12345").await.unwrap());
    }
}
