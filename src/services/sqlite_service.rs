use std::str::FromStr;
use std::time::Duration;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use crate::errors::{AppError, AppResult};
use crate::models::{HistoryRecord, LoanApplication, Prediction, User};

/// Schema for the file-based backend. Every statement is idempotent.
const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    age REAL NOT NULL,
    income REAL NOT NULL,
    loan_amount REAL NOT NULL,
    credit_score REAL NOT NULL,
    dti_ratio REAL NOT NULL,
    education TEXT NOT NULL,
    employment TEXT NOT NULL,
    prediction INTEGER NOT NULL,
    created_at TEXT NOT NULL -- fixed-width RFC3339, sorts lexically
);

CREATE INDEX IF NOT EXISTS idx_history_username ON history(username);
"#;

const HISTORY_COLUMNS: &str = "id, username, age, income, loan_amount, credit_score, \
     dti_ratio, education, employment, prediction, created_at";

#[derive(Clone)]
pub struct SqliteService {
    pool: SqlitePool,
}

impl SqliteService {
    /// Lazily connecting pool; the database file is created on first use.
    pub fn open(url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection that is never recycled,
    /// otherwise the data would vanish with it.
    pub async fn in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> AppResult<()> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn stored_password(&self, username: &str) -> AppResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT password FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(password,)| password))
    }

    pub async fn insert_user(&self, username: &str, password: &str) -> AppResult<User> {
        let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(password)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(User {
                id: done.last_insert_rowid(),
                username: username.to_string(),
                password: password.to_string(),
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn count_users(&self) -> AppResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    pub async fn insert_history(
        &self,
        username: &str,
        application: &LoanApplication,
        prediction: Prediction,
        created_at: DateTime<Utc>,
    ) -> AppResult<HistoryRecord> {
        let done = sqlx::query(
            r#"
            INSERT INTO history (
                username, age, income, loan_amount, credit_score,
                dti_ratio, education, employment, prediction, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(application.age)
        .bind(application.income)
        .bind(application.loan_amount)
        .bind(application.credit_score)
        .bind(application.dti_ratio)
        .bind(&application.education)
        .bind(&application.employment)
        .bind(prediction.label())
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        Ok(HistoryRecord {
            id: done.last_insert_rowid(),
            username: username.to_string(),
            application: application.clone(),
            prediction,
            created_at,
        })
    }

    pub async fn history_for_user(&self, username: &str) -> AppResult<Vec<HistoryRecord>> {
        let sql = format!(
            "SELECT {} FROM history WHERE username = ? ORDER BY created_at DESC, id DESC",
            HISTORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    pub async fn history_all(&self) -> AppResult<Vec<HistoryRecord>> {
        let sql = format!(
            "SELECT {} FROM history ORDER BY created_at DESC, id DESC",
            HISTORY_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    pub async fn count_history(&self) -> AppResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    fn row_to_record(row: SqliteRow) -> AppResult<HistoryRecord> {
        let label: i64 = row.try_get("prediction")?;
        let prediction = Prediction::from_label(label).ok_or_else(|| {
            sqlx::Error::Decode(format!("invalid prediction label {}", label).into())
        })?;
        let created_at_str: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);

        Ok(HistoryRecord {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            application: LoanApplication {
                age: row.try_get("age")?,
                income: row.try_get("income")?,
                loan_amount: row.try_get("loan_amount")?,
                credit_score: row.try_get("credit_score")?,
                dti_ratio: row.try_get("dti_ratio")?,
                education: row.try_get("education")?,
                employment: row.try_get("employment")?,
            },
            prediction,
            created_at,
        })
    }
}
