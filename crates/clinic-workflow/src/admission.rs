//! 住院管理
//!
//! 床位登记、入院占用与出院

use chrono::{DateTime, Utc};
use clinic_billing::{bed_charge, billable_days};
use clinic_core::{Admission, AdmissionStatus, Bed, ClinicError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 单次床位费核算结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualRecord {
    pub admission_id: Uuid,
    pub patient_id: Uuid,
    pub days: i64,
    pub amount: i64,
}

/// 住院管理器
#[derive(Debug, Default)]
pub struct AdmissionManager {
    beds: HashMap<Uuid, Bed>,
    admissions: HashMap<Uuid, Admission>,
    active_by_patient: HashMap<Uuid, Uuid>, // patient_id -> admission_id
}

impl AdmissionManager {
    /// 创建新的住院管理器
    pub fn new() -> Self {
        Self {
            beds: HashMap::new(),
            admissions: HashMap::new(),
            active_by_patient: HashMap::new(),
        }
    }

    /// 登记床位
    pub fn register_bed(&mut self, ward: &str, number: i32, daily_rate: i64) -> Result<Bed> {
        let duplicate = self
            .beds
            .values()
            .any(|bed| bed.ward == ward && bed.number == number);
        if duplicate {
            return Err(ClinicError::Validation(format!(
                "Bed {}/{} already registered",
                ward, number
            )));
        }

        let bed = Bed {
            id: Uuid::new_v4(),
            ward: ward.to_string(),
            number,
            daily_rate,
            occupied_by: None,
        };

        self.beds.insert(bed.id, bed.clone());
        tracing::info!("Registered bed {}/{} at rate {}", ward, number, daily_rate);
        Ok(bed)
    }

    /// 所有床位
    pub fn list_beds(&self) -> Vec<&Bed> {
        let mut beds: Vec<&Bed> = self.beds.values().collect();
        beds.sort_by(|a, b| (&a.ward, a.number).cmp(&(&b.ward, b.number)));
        beds
    }

    /// 空闲床位
    pub fn free_beds(&self) -> Vec<&Bed> {
        self.list_beds()
            .into_iter()
            .filter(|bed| bed.occupied_by.is_none())
            .collect()
    }

    /// 床位占用情况 (占用数, 总数)
    pub fn occupancy(&self) -> (usize, usize) {
        let occupied = self
            .beds
            .values()
            .filter(|bed| bed.occupied_by.is_some())
            .count();
        (occupied, self.beds.len())
    }

    /// 办理入院
    pub fn admit(&mut self, patient_id: Uuid, bed_id: Uuid) -> Result<Admission> {
        if let Some(existing) = self.active_by_patient.get(&patient_id) {
            return Err(ClinicError::Workflow(format!(
                "Patient {} already admitted ({})",
                patient_id, existing
            )));
        }

        let bed = self
            .beds
            .get_mut(&bed_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Bed {} not found", bed_id)))?;

        if bed.occupied_by.is_some() {
            return Err(ClinicError::Workflow(format!(
                "Bed {}/{} is already occupied",
                bed.ward, bed.number
            )));
        }

        let admission = Admission {
            id: Uuid::new_v4(),
            patient_id,
            bed_id,
            daily_rate: bed.daily_rate,
            status: AdmissionStatus::Admitted,
            admitted_at: Utc::now(),
            discharged_at: None,
            accrued_total: 0,
        };

        bed.occupied_by = Some(admission.id);
        self.active_by_patient.insert(patient_id, admission.id);
        self.admissions.insert(admission.id, admission.clone());

        tracing::info!(
            "Admitted patient {} to bed {} (admission {})",
            patient_id,
            bed_id,
            admission.id
        );
        Ok(admission)
    }

    /// 获取住院记录
    pub fn get_admission(&self, admission_id: Uuid) -> Option<&Admission> {
        self.admissions.get(&admission_id)
    }

    /// 患者当前的住院记录
    pub fn active_admission_for_patient(&self, patient_id: Uuid) -> Option<&Admission> {
        self.active_by_patient
            .get(&patient_id)
            .and_then(|id| self.admissions.get(id))
    }

    /// 所有在院记录
    pub fn active_admissions(&self) -> Vec<&Admission> {
        self.admissions
            .values()
            .filter(|admission| admission.status == AdmissionStatus::Admitted)
            .collect()
    }

    /// 核算单个住院记录到指定时刻的床位费
    pub fn accrue_one(&mut self, admission_id: Uuid, until: DateTime<Utc>) -> Result<AccrualRecord> {
        let admission = self
            .admissions
            .get_mut(&admission_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Admission {} not found", admission_id)))?;

        if admission.status != AdmissionStatus::Admitted {
            return Err(ClinicError::Workflow(format!(
                "Admission {} is already discharged",
                admission_id
            )));
        }

        let days = billable_days(admission.admitted_at, until);
        let amount = bed_charge(admission.daily_rate, days);
        admission.accrued_total = amount;

        Ok(AccrualRecord {
            admission_id,
            patient_id: admission.patient_id,
            days,
            amount,
        })
    }

    /// 核算所有在院记录的床位费
    pub fn accrue_all(&mut self, until: DateTime<Utc>) -> Vec<AccrualRecord> {
        let active_ids: Vec<Uuid> = self
            .active_admissions()
            .iter()
            .map(|admission| admission.id)
            .collect();

        let mut records = Vec::new();
        for admission_id in active_ids {
            match self.accrue_one(admission_id, until) {
                Ok(record) => records.push(record),
                Err(e) => tracing::error!("Failed to accrue admission {}: {}", admission_id, e),
            }
        }
        records
    }

    /// 办理出院并释放床位
    ///
    /// 欠费校验由上层引擎在调用前完成。
    pub fn discharge(&mut self, admission_id: Uuid) -> Result<Admission> {
        let admission = self
            .admissions
            .get_mut(&admission_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Admission {} not found", admission_id)))?;

        if admission.status != AdmissionStatus::Admitted {
            return Err(ClinicError::Workflow(format!(
                "Admission {} is already discharged",
                admission_id
            )));
        }

        admission.status = AdmissionStatus::Discharged;
        admission.discharged_at = Some(Utc::now());

        let patient_id = admission.patient_id;
        let bed_id = admission.bed_id;
        let admission = admission.clone();

        if let Some(bed) = self.beds.get_mut(&bed_id) {
            bed.occupied_by = None;
        }
        self.active_by_patient.remove(&patient_id);

        tracing::info!(
            "Discharged patient {} from bed {} (admission {})",
            patient_id,
            bed_id,
            admission_id
        );
        Ok(admission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_admit_and_discharge() {
        let mut manager = AdmissionManager::new();
        let patient = Uuid::new_v4();
        let bed = manager.register_bed("A", 1, 200_000).unwrap();

        let admission = manager.admit(patient, bed.id).unwrap();
        assert_eq!(manager.occupancy(), (1, 1));
        assert!(manager.active_admission_for_patient(patient).is_some());

        let discharged = manager.discharge(admission.id).unwrap();
        assert_eq!(discharged.status, AdmissionStatus::Discharged);
        assert_eq!(manager.occupancy(), (0, 1));
        assert!(manager.active_admission_for_patient(patient).is_none());
    }

    #[test]
    fn test_occupied_bed_rejected() {
        let mut manager = AdmissionManager::new();
        let bed = manager.register_bed("A", 1, 200_000).unwrap();

        manager.admit(Uuid::new_v4(), bed.id).unwrap();
        assert!(manager.admit(Uuid::new_v4(), bed.id).is_err());
    }

    #[test]
    fn test_double_admission_rejected() {
        let mut manager = AdmissionManager::new();
        let patient = Uuid::new_v4();
        let first = manager.register_bed("A", 1, 200_000).unwrap();
        let second = manager.register_bed("A", 2, 200_000).unwrap();

        manager.admit(patient, first.id).unwrap();
        assert!(manager.admit(patient, second.id).is_err());
    }

    #[test]
    fn test_duplicate_bed_rejected() {
        let mut manager = AdmissionManager::new();
        manager.register_bed("A", 1, 200_000).unwrap();
        assert!(manager.register_bed("A", 1, 200_000).is_err());
    }

    #[test]
    fn test_accrual_updates_total() {
        let mut manager = AdmissionManager::new();
        let patient = Uuid::new_v4();
        let bed = manager.register_bed("A", 1, 200_000).unwrap();
        let admission = manager.admit(patient, bed.id).unwrap();

        let until = admission.admitted_at + Duration::hours(30); // 2个计费日
        let record = manager.accrue_one(admission.id, until).unwrap();

        assert_eq!(record.days, 2);
        assert_eq!(record.amount, 400_000);
        assert_eq!(
            manager.get_admission(admission.id).unwrap().accrued_total,
            400_000
        );
    }

    #[test]
    fn test_discharge_twice_rejected() {
        let mut manager = AdmissionManager::new();
        let bed = manager.register_bed("A", 1, 200_000).unwrap();
        let admission = manager.admit(Uuid::new_v4(), bed.id).unwrap();

        manager.discharge(admission.id).unwrap();
        assert!(manager.discharge(admission.id).is_err());
    }
}
