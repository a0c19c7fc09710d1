//! # Clinic 计费模块
//!
//! 提供诊所的收费能力，包括：
//! - 服务价目表：按计费代码定价，门诊按医生专科取价
//! - 账单台账：明细行、收款、未结/部分/已结清状态
//! - 床位费核算：按占用天数计费，重复核算幂等覆盖

pub mod charges;
pub mod invoice;
pub mod pricing;

// 重新导出主要类型
pub use charges::{bed_charge, billable_days};
pub use invoice::{BillingStats, InvoiceLedger};
pub use pricing::{PriceList, ServicePrice, BED_DAY_CODE};
