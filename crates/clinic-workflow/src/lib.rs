//! # Clinic 工作流模块
//!
//! 提供诊所就诊流程的管理功能，包括：
//! - 排队状态机：管理候诊条目的完整生命周期
//! - 候诊队列管理：按医生维护当日叫号顺序
//! - 分诊路由：按专科和当前负载把无指定医生的患者分配给医生
//! - 住院管理：床位占用与出院结算
//! - 员工任务：为不同角色用户提供任务列表
//! - 协调引擎：串联排队、住院与计费

pub mod admission;
pub mod engine;
pub mod queue;
pub mod routing;
pub mod tasks;

// 重新导出主要类型
pub use admission::AdmissionManager;
pub use engine::{ClinicEngine, ClinicOverview};
pub use queue::{QueueEvent, QueueManager, QueueStateMachine, QueueStats};
pub use routing::{DoctorProfile, DoctorRoster};
pub use tasks::{
    StaffTask, TaskFilter, TaskManager, TaskPriority, TaskStats, TaskStatus,
};
