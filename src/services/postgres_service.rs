use std::str::FromStr;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use crate::errors::{AppError, AppResult};
use crate::models::{HistoryRecord, LoanApplication, Prediction, User};

/// Schema for the managed relational backend. Every statement is idempotent.
const POSTGRES_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS history (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL,
    age DOUBLE PRECISION NOT NULL,
    income DOUBLE PRECISION NOT NULL,
    loan_amount DOUBLE PRECISION NOT NULL,
    credit_score DOUBLE PRECISION NOT NULL,
    dti_ratio DOUBLE PRECISION NOT NULL,
    education TEXT NOT NULL,
    employment TEXT NOT NULL,
    prediction BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_history_username ON history(username);
"#;

const HISTORY_COLUMNS: &str = "id, username, age, income, loan_amount, credit_score, \
     dti_ratio, education, employment, prediction, created_at";

#[derive(Clone)]
pub struct PostgresService {
    pool: PgPool,
}

impl PostgresService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lazily connecting pool, so an unreachable server surfaces on first query.
    pub fn open(url: &str, max_connections: u32) -> AppResult<Self> {
        let options = PgConnectOptions::from_str(url)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy_with(options);
        Ok(Self::new(pool))
    }

    pub async fn init_schema(&self) -> AppResult<()> {
        for stmt in POSTGRES_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn stored_password(&self, username: &str) -> AppResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT password FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(password,)| password))
    }

    pub async fn insert_user(&self, username: &str, password: &str) -> AppResult<User> {
        let result: Result<(i64,), sqlx::Error> =
            sqlx::query_as("INSERT INTO users (username, password) VALUES ($1, $2) RETURNING id")
                .bind(username)
                .bind(password)
                .fetch_one(&self.pool)
                .await;

        match result {
            Ok((id,)) => Ok(User {
                id,
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
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO history (
                username, age, income, loan_amount, credit_score,
                dti_ratio, education, employment, prediction, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
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
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(HistoryRecord {
            id,
            username: username.to_string(),
            application: application.clone(),
            prediction,
            created_at,
        })
    }

    pub async fn history_for_user(&self, username: &str) -> AppResult<Vec<HistoryRecord>> {
        let sql = format!(
            "SELECT {} FROM history WHERE username = $1 ORDER BY created_at DESC, id DESC",
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

    fn row_to_record(row: PgRow) -> AppResult<HistoryRecord> {
        let label: i64 = row.try_get("prediction")?;
        let prediction = Prediction::from_label(label).ok_or_else(|| {
            sqlx::Error::Decode(format!("invalid prediction label {}", label).into())
        })?;

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
            created_at: row.try_get("created_at")?,
        })
    }
}
