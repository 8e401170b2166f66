use redis::{Client, AsyncCommands};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::errors::{AppError, AppResult};
use crate::models::{HistoryRecord, LoanApplication, Prediction, User};

// Key-value backend. Opens one connection per operation.
// Every key starts with `namespace`, which is empty unless set explicitly.
pub struct RedisService {
    client: Arc<Client>,
    namespace: Arc<str>,
}

impl RedisService {
    pub fn new(client: Arc<Client>, namespace: &str) -> Self {
        Self {
            client,
            namespace: Arc::from(namespace),
        }
    }

    pub fn open(url: &str, namespace: &str) -> AppResult<Self> {
        Ok(Self::new(Arc::new(Client::open(url)?), namespace))
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}{}", self.namespace, suffix)
    }

    fn user_key(&self, username: &str) -> String {
        self.key(&format!("user:{}", username))
    }

    fn user_history_key(&self, username: &str) -> String {
        self.key(&format!("history:user:{}", username))
    }

    /// Checks connectivity; there is no schema to create.
    pub async fn init_schema(&self) -> AppResult<()> {
        let mut conn = self.client.get_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    pub async fn stored_password(&self, username: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.get_async_connection().await?;
        let user_data: Option<String> = conn.get(self.user_key(username)).await?;
        match user_data {
            Some(data) => {
                let user: User = serde_json::from_str(&data)?;
                Ok(Some(user.password))
            }
            None => Ok(None),
        }
    }

    pub async fn insert_user(&self, username: &str, password: &str) -> AppResult<User> {
        let mut conn = self.client.get_async_connection().await?;
        let id: i64 = conn.incr(self.key("users:next_id"), 1).await?;
        let user = User {
            id,
            username: username.to_string(),
            password: password.to_string(),
        };

        // SET NX is the uniqueness constraint on usernames
        let created: Option<String> = redis::cmd("SET")
            .arg(self.user_key(username))
            .arg(serde_json::to_string(&user)?)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        if created.is_none() {
            return Err(AppError::DuplicateUsername);
        }

        conn.sadd::<_, _, ()>(self.key("users"), username).await?;
        Ok(user)
    }

    pub async fn count_users(&self) -> AppResult<u64> {
        let mut conn = self.client.get_async_connection().await?;
        let count: u64 = conn.scard(self.key("users")).await?;
        Ok(count)
    }

    pub async fn insert_history(
        &self,
        username: &str,
        application: &LoanApplication,
        prediction: Prediction,
        created_at: DateTime<Utc>,
    ) -> AppResult<HistoryRecord> {
        let mut conn = self.client.get_async_connection().await?;
        let id: i64 = conn.incr(self.key("history:next_id"), 1).await?;
        let record = HistoryRecord {
            id,
            username: username.to_string(),
            application: application.clone(),
            prediction,
            created_at,
        };
        let json = serde_json::to_string(&record)?;

        // LPUSH keeps both lists newest first
        redis::pipe()
            .atomic()
            .lpush(self.user_history_key(username), &json)
            .ignore()
            .lpush(self.key("history:all"), &json)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(record)
    }

    pub async fn history_for_user(&self, username: &str) -> AppResult<Vec<HistoryRecord>> {
        self.read_history(&self.user_history_key(username)).await
    }

    pub async fn history_all(&self) -> AppResult<Vec<HistoryRecord>> {
        self.read_history(&self.key("history:all")).await
    }

    pub async fn count_history(&self) -> AppResult<u64> {
        let mut conn = self.client.get_async_connection().await?;
        let count: u64 = conn.llen(self.key("history:all")).await?;
        Ok(count)
    }

    async fn read_history(&self, key: &str) -> AppResult<Vec<HistoryRecord>> {
        let mut conn = self.client.get_async_connection().await?;
        let entries: Vec<String> = conn.lrange(key, 0, -1).await?;
        entries
            .iter()
            .map(|data| serde_json::from_str(data).map_err(AppError::from))
            .collect()
    }
}

impl Clone for RedisService {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            namespace: self.namespace.clone(),
        }
    }
}
