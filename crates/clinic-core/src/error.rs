//! 错误定义模块

use thiserror::Error;

/// 诊所系统统一错误类型
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("网络错误: {0}")]
    Network(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("权限错误: {0}")]
    Permission(String),

    #[error("系统内部错误: {0}")]
    Internal(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("IO错误: {0}")]
    Io(String),

    #[error("工作流错误: {0}")]
    Workflow(String),

    #[error("计费错误: {0}")]
    Billing(String),

    #[error("通知错误: {0}")]
    Notification(String),

    #[error("分诊路由错误: {0}")]
    RoutingError(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("账单未结清: 患者 {patient} 尚欠 {balance}")]
    UnsettledBalance { patient: String, balance: i64 },
}

/// 诊所系统统一结果类型
pub type Result<T> = std::result::Result<T, ClinicError>;
