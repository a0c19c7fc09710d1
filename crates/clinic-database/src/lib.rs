//! # Clinic 数据库模块
//!
//! 负责患者、员工、检验与处方等持久化档案的存储，提供PostgreSQL连接池和完整的CRUD操作。

pub mod connection;
pub mod models;
pub mod queries;

// 重新导出主要类型
pub use connection::DatabasePool;
pub use models::*;
pub use queries::DatabaseQueries;
