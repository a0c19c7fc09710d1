//! 分诊路由
//!
//! 没有指定医生的患者按专科和当前负载分配

use clinic_core::{ClinicError, DoctorSpecialty, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 医生出诊信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub name: String,
    pub specialty: DoctorSpecialty,
    pub max_workload: i32, // 同时接诊的候诊上限
    pub is_available: bool,
}

/// 医生排班表与负载记录
#[derive(Debug)]
pub struct DoctorRoster {
    doctors: HashMap<Uuid, DoctorProfile>,
    workload_map: HashMap<Uuid, i32>, // 当前候诊人数
}

impl DoctorRoster {
    /// 创建新的排班表
    pub fn new() -> Self {
        Self {
            doctors: HashMap::new(),
            workload_map: HashMap::new(),
        }
    }

    /// 登记出诊医生
    pub fn add_doctor(&mut self, doctor: DoctorProfile) {
        self.workload_map.insert(doctor.id, 0);
        self.doctors.insert(doctor.id, doctor);
    }

    /// 获取医生信息
    pub fn get_doctor(&self, doctor_id: Uuid) -> Option<&DoctorProfile> {
        self.doctors.get(&doctor_id)
    }

    /// 更新医生当前负载
    pub fn update_workload(&mut self, doctor_id: Uuid, delta: i32) {
        if let Some(workload) = self.workload_map.get_mut(&doctor_id) {
            *workload += delta;
            if *workload < 0 {
                *workload = 0;
            }
        }
    }

    /// 获取医生当前负载
    pub fn get_workload(&self, doctor_id: Uuid) -> i32 {
        self.workload_map.get(&doctor_id).copied().unwrap_or(0)
    }

    /// 设置医生可用性
    pub fn set_availability(&mut self, doctor_id: Uuid, is_available: bool) {
        if let Some(doctor) = self.doctors.get_mut(&doctor_id) {
            doctor.is_available = is_available;
        }
    }

    /// 为指定专科选出负载最小且未满的医生
    pub fn assign(&self, specialty: &DoctorSpecialty) -> Result<Uuid> {
        self.doctors
            .values()
            .filter(|doctor| {
                doctor.is_available
                    && doctor.specialty == *specialty
                    && self.get_workload(doctor.id) < doctor.max_workload
            })
            .min_by_key(|doctor| self.get_workload(doctor.id))
            .map(|doctor| doctor.id)
            .ok_or_else(|| {
                ClinicError::RoutingError(format!(
                    "No available doctor for specialty {:?}",
                    specialty
                ))
            })
    }

    /// 校验指定医生是否可以接诊
    pub fn ensure_can_accept(&self, doctor_id: Uuid) -> Result<()> {
        let doctor = self
            .doctors
            .get(&doctor_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Doctor {} not found", doctor_id)))?;

        if !doctor.is_available {
            return Err(ClinicError::RoutingError(format!(
                "Doctor {} is not available",
                doctor.name
            )));
        }

        if self.get_workload(doctor_id) >= doctor.max_workload {
            return Err(ClinicError::RoutingError(format!(
                "Doctor {} is at full capacity",
                doctor.name
            )));
        }

        Ok(())
    }

    /// 所有可出诊的医生
    pub fn available_doctors(&self) -> Vec<&DoctorProfile> {
        self.doctors.values().filter(|d| d.is_available).collect()
    }
}

impl Default for DoctorRoster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(specialty: DoctorSpecialty, max_workload: i32) -> DoctorProfile {
        DoctorProfile {
            id: Uuid::new_v4(),
            name: "Dr. Test".to_string(),
            specialty,
            max_workload,
            is_available: true,
        }
    }

    #[test]
    fn test_assign_picks_least_loaded() {
        let mut roster = DoctorRoster::new();
        let busy = doctor(DoctorSpecialty::General, 10);
        let idle = doctor(DoctorSpecialty::General, 10);
        let busy_id = busy.id;
        let idle_id = idle.id;

        roster.add_doctor(busy);
        roster.add_doctor(idle);
        roster.update_workload(busy_id, 5);

        assert_eq!(roster.assign(&DoctorSpecialty::General).unwrap(), idle_id);
    }

    #[test]
    fn test_assign_skips_full_and_unavailable() {
        let mut roster = DoctorRoster::new();
        let full = doctor(DoctorSpecialty::Cardiology, 1);
        let away = doctor(DoctorSpecialty::Cardiology, 10);
        let full_id = full.id;
        let away_id = away.id;

        roster.add_doctor(full);
        roster.add_doctor(away);
        roster.update_workload(full_id, 1);
        roster.set_availability(away_id, false);

        assert!(roster.assign(&DoctorSpecialty::Cardiology).is_err());
    }

    #[test]
    fn test_no_doctor_for_specialty() {
        let mut roster = DoctorRoster::new();
        roster.add_doctor(doctor(DoctorSpecialty::General, 10));

        assert!(roster.assign(&DoctorSpecialty::Surgery).is_err());
    }

    #[test]
    fn test_workload_never_negative() {
        let mut roster = DoctorRoster::new();
        let profile = doctor(DoctorSpecialty::General, 10);
        let id = profile.id;
        roster.add_doctor(profile);

        roster.update_workload(id, -3);
        assert_eq!(roster.get_workload(id), 0);
    }
}
