//! 核心数据模型定义
//!
//! 金额一律以最小货币单位（分）的 i64 表示。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 患者基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub mrn: String,                           // 病历号 (Medical Record Number)
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<Sex>,                      // 性别
    pub birth_date: Option<chrono::NaiveDate>, // 出生日期
    pub phone: Option<String>,
    pub address: Option<String>,
    pub telegram_chat_id: Option<i64>,         // 绑定的Telegram会话
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// 患者全名
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 性别枚举
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// 员工角色
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffRole {
    Admin,        // 管理员
    Doctor,       // 医生
    Nurse,        // 护士
    Receptionist, // 前台
    LabTech,      // 检验技师
    Cashier,      // 收银
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Doctor => "doctor",
            StaffRole::Nurse => "nurse",
            StaffRole::Receptionist => "receptionist",
            StaffRole::LabTech => "lab_tech",
            StaffRole::Cashier => "cashier",
        }
    }
}

/// 医生专科
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoctorSpecialty {
    General,     // 全科
    Therapy,     // 内科
    Pediatrics,  // 儿科
    Cardiology,  // 心内科
    Dermatology, // 皮肤科
    Surgery,     // 外科
    Gynecology,  // 妇科
}

/// 员工信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: StaffRole,
    pub specialty: Option<DoctorSpecialty>, // 仅医生填写
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 排队状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    Waiting,    // 候诊
    Called,     // 已叫号
    InProgress, // 就诊中
    Completed,  // 已完成
    Canceled,   // 已取消
    NoShow,     // 过号未到
}

/// 排队优先级
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueuePriority {
    Emergency, // 急诊
    Urgent,    // 优先
    Normal,    // 常规
}

/// 候诊队列条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub ticket_number: i32, // 当日该医生队列内的顺序号
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub priority: QueuePriority,
    pub status: QueueStatus,
    pub enqueued_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// 是否仍在就诊流程中
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            QueueStatus::Waiting | QueueStatus::Called | QueueStatus::InProgress
        )
    }
}

/// 住院床位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    pub id: Uuid,
    pub ward: String,   // 病区名称
    pub number: i32,    // 病区内床号
    pub daily_rate: i64,
    pub occupied_by: Option<Uuid>, // 当前占用的住院记录ID
}

/// 住院状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AdmissionStatus {
    Admitted,   // 在院
    Discharged, // 已出院
}

/// 住院记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub bed_id: Uuid,
    pub daily_rate: i64, // 入院时锁定的床位日价
    pub status: AdmissionStatus,
    pub admitted_at: DateTime<Utc>,
    pub discharged_at: Option<DateTime<Utc>>,
    pub accrued_total: i64, // 最近一次核算的床位费
}

/// 检验试剂供应商
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabSupplier {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 检验试剂
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabReagent {
    pub id: Uuid,
    pub name: String,
    pub supplier_id: Option<Uuid>,
    pub unit: String,       // 计量单位
    pub stock_qty: i32,     // 当前库存
    pub reorder_level: i32, // 低于该值时提示补货
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 检验项目（目录）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTest {
    pub id: Uuid,
    pub code: String, // 计费代码
    pub name: String,
    pub price: i64,
    pub reagent_id: Option<Uuid>,
    pub reagent_per_test: i32, // 每次检验消耗的试剂数量
    pub created_at: DateTime<Utc>,
}

/// 检验单状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LabOrderStatus {
    Ordered,    // 已开单
    InProgress, // 检验中
    Completed,  // 已出结果
    Canceled,   // 已取消
}

/// 检验单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabOrder {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub test_id: Uuid,
    pub ordered_by: Uuid, // 开单医生
    pub status: LabOrderStatus,
    pub result_value: Option<String>,
    pub result_note: Option<String>,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 处方
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medication: String,
    pub dosage: String,
    pub frequency: String, // 如 "3x daily"
    pub duration_days: i32,
    pub note: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// 账单状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Unpaid,  // 未支付
    Partial, // 部分支付
    Paid,    // 已结清
}

/// 账单明细行
///
/// `source` 指向产生该费用的业务记录（就诊、住院或检验单），
/// 同一来源的费用重复入账时覆盖而不追加。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub code: String, // 服务计费代码
    pub description: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub amount: i64,
    pub source: Option<Uuid>,
}

/// 账单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub patient_id: Uuid,
    pub items: Vec<InvoiceItem>,
    pub total: i64,
    pub paid_amount: i64,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// 未结余额
    pub fn balance(&self) -> i64 {
        self.total - self.paid_amount
    }
}

/// 支付方式
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// 收款记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: i64,
    pub method: PaymentMethod,
    pub received_at: DateTime<Utc>,
}
