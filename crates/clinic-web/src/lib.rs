//! # Clinic Web模块
//!
//! 提供HTTP API：认证、患者/员工/检验/处方档案、排队与住院流程、
//! 账单收款、指标导出与静态管理界面。

pub mod auth;
pub mod flow;
pub mod handlers;
pub mod server;
pub mod static_files;

pub use auth::AuthService;
pub use server::{AppState, WebServer};
