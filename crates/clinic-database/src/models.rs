//! 数据库模型

use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::models::*;
use sqlx::FromRow;
use uuid::Uuid;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: Uuid,
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<String>, // 存储为字符串，转换为Sex枚举
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub telegram_chat_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbPatient> for Patient {
    fn from(db: DbPatient) -> Self {
        Patient {
            id: db.id,
            mrn: db.mrn,
            first_name: db.first_name,
            last_name: db.last_name,
            sex: db.sex.and_then(|s| match s.as_str() {
                "M" => Some(Sex::Male),
                "F" => Some(Sex::Female),
                "O" => Some(Sex::Other),
                _ => None,
            }),
            birth_date: db.birth_date,
            phone: db.phone,
            address: db.address,
            telegram_chat_id: db.telegram_chat_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// 数据库员工表
#[derive(Debug, FromRow)]
pub struct DbStaff {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: String,              // 存储为字符串，转换为StaffRole枚举
    pub specialty: Option<String>, // 存储为字符串，转换为DoctorSpecialty枚举
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbStaff> for Staff {
    fn from(db: DbStaff) -> Self {
        Staff {
            id: db.id,
            username: db.username,
            full_name: db.full_name,
            role: parse_role(&db.role),
            specialty: db.specialty.as_deref().and_then(parse_specialty),
            phone: db.phone,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

pub(crate) fn parse_role(role: &str) -> StaffRole {
    match role {
        "admin" => StaffRole::Admin,
        "doctor" => StaffRole::Doctor,
        "nurse" => StaffRole::Nurse,
        "receptionist" => StaffRole::Receptionist,
        "lab_tech" => StaffRole::LabTech,
        "cashier" => StaffRole::Cashier,
        _ => StaffRole::Receptionist, // 默认角色
    }
}

pub(crate) fn parse_specialty(specialty: &str) -> Option<DoctorSpecialty> {
    match specialty {
        "general" => Some(DoctorSpecialty::General),
        "therapy" => Some(DoctorSpecialty::Therapy),
        "pediatrics" => Some(DoctorSpecialty::Pediatrics),
        "cardiology" => Some(DoctorSpecialty::Cardiology),
        "dermatology" => Some(DoctorSpecialty::Dermatology),
        "surgery" => Some(DoctorSpecialty::Surgery),
        "gynecology" => Some(DoctorSpecialty::Gynecology),
        _ => None,
    }
}

pub(crate) fn specialty_str(specialty: &DoctorSpecialty) -> &'static str {
    match specialty {
        DoctorSpecialty::General => "general",
        DoctorSpecialty::Therapy => "therapy",
        DoctorSpecialty::Pediatrics => "pediatrics",
        DoctorSpecialty::Cardiology => "cardiology",
        DoctorSpecialty::Dermatology => "dermatology",
        DoctorSpecialty::Surgery => "surgery",
        DoctorSpecialty::Gynecology => "gynecology",
    }
}

/// 数据库试剂供应商表
#[derive(Debug, FromRow)]
pub struct DbLabSupplier {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbLabSupplier> for LabSupplier {
    fn from(db: DbLabSupplier) -> Self {
        LabSupplier {
            id: db.id,
            name: db.name,
            phone: db.phone,
            address: db.address,
            created_at: db.created_at,
        }
    }
}

/// 数据库试剂表
#[derive(Debug, FromRow)]
pub struct DbLabReagent {
    pub id: Uuid,
    pub name: String,
    pub supplier_id: Option<Uuid>,
    pub unit: String,
    pub stock_qty: i32,
    pub reorder_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbLabReagent> for LabReagent {
    fn from(db: DbLabReagent) -> Self {
        LabReagent {
            id: db.id,
            name: db.name,
            supplier_id: db.supplier_id,
            unit: db.unit,
            stock_qty: db.stock_qty,
            reorder_level: db.reorder_level,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// 数据库检验项目表
#[derive(Debug, FromRow)]
pub struct DbLabTest {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub price: i64,
    pub reagent_id: Option<Uuid>,
    pub reagent_per_test: i32,
    pub created_at: DateTime<Utc>,
}

impl From<DbLabTest> for LabTest {
    fn from(db: DbLabTest) -> Self {
        LabTest {
            id: db.id,
            code: db.code,
            name: db.name,
            price: db.price,
            reagent_id: db.reagent_id,
            reagent_per_test: db.reagent_per_test,
            created_at: db.created_at,
        }
    }
}

/// 数据库检验单表
#[derive(Debug, FromRow)]
pub struct DbLabOrder {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub test_id: Uuid,
    pub ordered_by: Uuid,
    pub status: String, // 存储为字符串，转换为LabOrderStatus枚举
    pub result_value: Option<String>,
    pub result_note: Option<String>,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<DbLabOrder> for LabOrder {
    fn from(db: DbLabOrder) -> Self {
        LabOrder {
            id: db.id,
            patient_id: db.patient_id,
            test_id: db.test_id,
            ordered_by: db.ordered_by,
            status: match db.status.as_str() {
                "ORDERED" => LabOrderStatus::Ordered,
                "IN_PROGRESS" => LabOrderStatus::InProgress,
                "COMPLETED" => LabOrderStatus::Completed,
                "CANCELED" => LabOrderStatus::Canceled,
                _ => LabOrderStatus::Ordered, // 默认状态
            },
            result_value: db.result_value,
            result_note: db.result_note,
            ordered_at: db.ordered_at,
            completed_at: db.completed_at,
        }
    }
}

/// 数据库处方表
#[derive(Debug, FromRow)]
pub struct DbPrescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub note: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl From<DbPrescription> for Prescription {
    fn from(db: DbPrescription) -> Self {
        Prescription {
            id: db.id,
            patient_id: db.patient_id,
            doctor_id: db.doctor_id,
            medication: db.medication,
            dosage: db.dosage,
            frequency: db.frequency,
            duration_days: db.duration_days,
            note: db.note,
            issued_at: db.issued_at,
        }
    }
}

// 插入模型 - 用于创建新记录

/// 新患者插入模型
#[derive(Debug)]
pub struct NewPatient {
    pub id: Uuid,
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// 新员工插入模型
#[derive(Debug)]
pub struct NewStaff {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: StaffRole,
    pub specialty: Option<DoctorSpecialty>,
    pub phone: Option<String>,
}

/// 新供应商插入模型
#[derive(Debug)]
pub struct NewLabSupplier {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// 新试剂插入模型
#[derive(Debug)]
pub struct NewLabReagent {
    pub id: Uuid,
    pub name: String,
    pub supplier_id: Option<Uuid>,
    pub unit: String,
    pub stock_qty: i32,
    pub reorder_level: i32,
}

/// 新检验项目插入模型
#[derive(Debug)]
pub struct NewLabTest {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub price: i64,
    pub reagent_id: Option<Uuid>,
    pub reagent_per_test: i32,
}

/// 新检验单插入模型
#[derive(Debug)]
pub struct NewLabOrder {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub test_id: Uuid,
    pub ordered_by: Uuid,
}

/// 新处方插入模型
#[derive(Debug)]
pub struct NewPrescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub note: Option<String>,
}
