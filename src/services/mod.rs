mod postgres_service;
mod redis_service;
mod sqlite_service;
mod storage;
mod risk_model;

pub use postgres_service::PostgresService;
pub use redis_service::RedisService;
pub use sqlite_service::SqliteService;
pub use storage::{validate_signup, SiteStats, Storage};
pub use risk_model::{LogisticModel, NumericFeature, NumericFeatures, RiskModel};
