//! 数据库连接管理

use clinic_core::{ClinicError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// 数据库连接池
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// 建立连接池
    pub async fn connect(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(connection_string)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        tracing::info!("Database connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
