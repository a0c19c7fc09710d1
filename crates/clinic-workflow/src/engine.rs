//! 诊所工作流引擎
//!
//! 协调排队、分诊、住院、任务与计费的核心引擎

use crate::{
    admission::{AccrualRecord, AdmissionManager},
    queue::{QueueEvent, QueueManager},
    routing::DoctorRoster,
    tasks::TaskManager,
};
use chrono::{DateTime, Utc};
use clinic_billing::{InvoiceLedger, PriceList, BED_DAY_CODE};
use clinic_core::{
    Admission, ClinicError, DoctorSpecialty, Invoice, LabTest, Payment, PaymentMethod,
    QueueEntry, QueuePriority, Result,
};
use uuid::Uuid;

/// 诊所工作流引擎
///
/// 协调所有工作流组件，提供统一的业务操作接口
#[derive(Debug)]
pub struct ClinicEngine {
    queue: QueueManager,
    roster: DoctorRoster,
    admissions: AdmissionManager,
    tasks: TaskManager,
    billing: InvoiceLedger,
    prices: PriceList,
}

impl ClinicEngine {
    /// 创建新的工作流引擎
    pub fn new(prices: PriceList) -> Self {
        Self {
            queue: QueueManager::new(),
            roster: DoctorRoster::new(),
            admissions: AdmissionManager::new(),
            tasks: TaskManager::new(),
            billing: InvoiceLedger::new(),
            prices,
        }
    }

    /// 患者挂号排队
    ///
    /// 指定了医生则校验其容量；否则按专科自动分诊。
    pub async fn check_in(
        &mut self,
        patient_id: Uuid,
        doctor_id: Option<Uuid>,
        specialty: Option<DoctorSpecialty>,
        priority: QueuePriority,
    ) -> Result<QueueEntry> {
        tracing::info!("Check-in for patient {} with priority {:?}", patient_id, priority);

        let doctor_id = match doctor_id {
            Some(id) => {
                self.roster.ensure_can_accept(id)?;
                id
            }
            None => {
                let specialty = specialty.unwrap_or(DoctorSpecialty::General);
                self.roster.assign(&specialty)?
            }
        };

        let entry = self.queue.enqueue(patient_id, doctor_id, priority)?;
        self.roster.update_workload(doctor_id, 1);
        Ok(entry)
    }

    /// 医生叫下一个号
    pub fn call_next(&mut self, doctor_id: Uuid) -> Result<Option<QueueEntry>> {
        self.queue.call_next(doctor_id)
    }

    /// 叫指定的号
    pub fn call(&mut self, entry_id: Uuid) -> Result<QueueEntry> {
        self.queue.apply_event(entry_id, &QueueEvent::Call)
    }

    /// 开始就诊
    pub fn start_visit(&mut self, entry_id: Uuid) -> Result<QueueEntry> {
        self.queue.apply_event(entry_id, &QueueEvent::Start)
    }

    /// 完成就诊并计费
    ///
    /// 按接诊医生的专科把诊费记入患者的开放账单。
    pub async fn complete_visit(&mut self, entry_id: Uuid) -> Result<(QueueEntry, Invoice)> {
        let entry = self.queue.apply_event(entry_id, &QueueEvent::Complete)?;
        self.roster.update_workload(entry.doctor_id, -1);

        let specialty = self
            .roster
            .get_doctor(entry.doctor_id)
            .map(|doctor| doctor.specialty.clone())
            .unwrap_or(DoctorSpecialty::General);

        let code = PriceList::consultation_code(&specialty);
        let price = self.prices.lookup(code)?.clone();

        let invoice = self.billing.add_charge(
            entry.patient_id,
            &price.code,
            &price.description,
            1,
            price.price,
            Some(entry.id),
        )?;

        tracing::info!(
            "Visit {} completed, invoice {} now totals {}",
            entry_id,
            invoice.invoice_number,
            invoice.total
        );
        Ok((entry, invoice))
    }

    /// 取消排队
    pub fn cancel_visit(&mut self, entry_id: Uuid) -> Result<QueueEntry> {
        let entry = self.queue.apply_event(entry_id, &QueueEvent::Cancel)?;
        self.roster.update_workload(entry.doctor_id, -1);
        Ok(entry)
    }

    /// 标记过号未到
    pub fn mark_no_show(&mut self, entry_id: Uuid) -> Result<QueueEntry> {
        let entry = self.queue.apply_event(entry_id, &QueueEvent::MarkNoShow)?;
        self.roster.update_workload(entry.doctor_id, -1);
        Ok(entry)
    }

    /// 过号重排（保留原号码）
    pub fn requeue(&mut self, entry_id: Uuid) -> Result<QueueEntry> {
        self.queue.apply_event(entry_id, &QueueEvent::Requeue)
    }

    /// 办理入院
    pub fn admit_patient(&mut self, patient_id: Uuid, bed_id: Uuid) -> Result<Admission> {
        self.admissions.admit(patient_id, bed_id)
    }

    /// 核算所有在院患者的床位费并记入账单
    ///
    /// 同一住院记录的床位费覆盖旧明细，可安全重复执行。
    pub async fn accrue_bed_charges(&mut self, until: DateTime<Utc>) -> Result<Vec<AccrualRecord>> {
        let records = self.admissions.accrue_all(until);

        for record in &records {
            self.post_bed_charge(record)?;
        }

        tracing::info!("Accrued bed charges for {} active admissions", records.len());
        Ok(records)
    }

    /// 办理出院
    ///
    /// 先把最终床位费入账，欠费未结清则拒绝出院。
    pub async fn discharge_patient(&mut self, admission_id: Uuid) -> Result<Admission> {
        let record = self.admissions.accrue_one(admission_id, Utc::now())?;
        self.post_bed_charge(&record)?;

        let balance = self.billing.outstanding_balance(record.patient_id);
        if balance > 0 {
            return Err(ClinicError::UnsettledBalance {
                patient: record.patient_id.to_string(),
                balance,
            });
        }

        self.admissions.discharge(admission_id)
    }

    /// 把一次床位费核算结果记入账单
    fn post_bed_charge(&mut self, record: &AccrualRecord) -> Result<()> {
        let admission = self
            .admissions
            .get_admission(record.admission_id)
            .ok_or_else(|| {
                ClinicError::NotFound(format!("Admission {} not found", record.admission_id))
            })?;

        self.billing.add_charge(
            record.patient_id,
            BED_DAY_CODE,
            &format!("Inpatient bed ({} days)", record.days),
            record.days as i32,
            admission.daily_rate,
            Some(record.admission_id),
        )?;
        Ok(())
    }

    /// 检验完成后把检验费记入账单
    pub fn add_lab_charge(&mut self, patient_id: Uuid, test: &LabTest, order_id: Uuid) -> Result<Invoice> {
        self.billing.add_charge(
            patient_id,
            &test.code,
            &test.name,
            1,
            test.price,
            Some(order_id),
        )
    }

    /// 收款
    pub fn record_payment(
        &mut self,
        invoice_id: Uuid,
        amount: i64,
        method: PaymentMethod,
    ) -> Result<Payment> {
        self.billing.record_payment(invoice_id, amount, method)
    }

    /// 获取系统概览
    pub fn overview(&self) -> ClinicOverview {
        let queue_stats = self.queue.stats();
        let (occupied_beds, total_beds) = self.admissions.occupancy();
        let billing_stats = self.billing.stats();

        ClinicOverview {
            waiting_patients: queue_stats.waiting,
            in_progress_visits: queue_stats.in_progress,
            occupied_beds,
            total_beds,
            active_admissions: self.admissions.active_admissions().len(),
            available_doctors: self.roster.available_doctors().len(),
            unsettled_invoices: billing_stats.unpaid_invoices + billing_stats.partial_invoices,
            outstanding_total: billing_stats.outstanding_total,
        }
    }

    /// 获取队列管理器实例
    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    /// 获取排班表实例
    pub fn roster(&self) -> &DoctorRoster {
        &self.roster
    }

    /// 获取住院管理器实例
    pub fn admissions(&self) -> &AdmissionManager {
        &self.admissions
    }

    /// 获取任务管理器实例
    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    /// 获取账单台账实例
    pub fn billing(&self) -> &InvoiceLedger {
        &self.billing
    }

    /// 获取价目表实例
    pub fn prices(&self) -> &PriceList {
        &self.prices
    }

    /// 获取可变排班表实例
    pub fn roster_mut(&mut self) -> &mut DoctorRoster {
        &mut self.roster
    }

    /// 获取可变住院管理器实例
    pub fn admissions_mut(&mut self) -> &mut AdmissionManager {
        &mut self.admissions
    }

    /// 获取可变任务管理器实例
    pub fn tasks_mut(&mut self) -> &mut TaskManager {
        &mut self.tasks
    }

    /// 获取可变账单台账实例
    pub fn billing_mut(&mut self) -> &mut InvoiceLedger {
        &mut self.billing
    }
}

impl Default for ClinicEngine {
    fn default() -> Self {
        Self::new(PriceList::with_defaults())
    }
}

/// 系统概览
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClinicOverview {
    pub waiting_patients: usize,
    pub in_progress_visits: usize,
    pub occupied_beds: usize,
    pub total_beds: usize,
    pub active_admissions: usize,
    pub available_doctors: usize,
    pub unsettled_invoices: usize,
    pub outstanding_total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::DoctorProfile;
    use clinic_core::InvoiceStatus;

    fn engine_with_doctor(specialty: DoctorSpecialty) -> (ClinicEngine, Uuid) {
        let mut engine = ClinicEngine::default();
        let doctor = DoctorProfile {
            id: Uuid::new_v4(),
            name: "Dr. Karimova".to_string(),
            specialty,
            max_workload: 5,
            is_available: true,
        };
        let doctor_id = doctor.id;
        engine.roster_mut().add_doctor(doctor);
        (engine, doctor_id)
    }

    #[tokio::test]
    async fn test_visit_generates_invoice() {
        let (mut engine, doctor_id) = engine_with_doctor(DoctorSpecialty::General);
        let patient = Uuid::new_v4();

        let entry = engine
            .check_in(patient, None, Some(DoctorSpecialty::General), QueuePriority::Normal)
            .await
            .unwrap();
        assert_eq!(entry.doctor_id, doctor_id);
        assert_eq!(engine.roster().get_workload(doctor_id), 1);

        let called = engine.call_next(doctor_id).unwrap().unwrap();
        engine.start_visit(called.id).unwrap();
        let (entry, invoice) = engine.complete_visit(called.id).await.unwrap();

        assert_eq!(entry.patient_id, patient);
        assert_eq!(invoice.total, 80_000); // CONS-GENERAL
        assert_eq!(engine.roster().get_workload(doctor_id), 0);
    }

    #[tokio::test]
    async fn test_completing_twice_does_not_double_charge() {
        let (mut engine, doctor_id) = engine_with_doctor(DoctorSpecialty::General);
        let patient = Uuid::new_v4();

        engine
            .check_in(patient, Some(doctor_id), None, QueuePriority::Normal)
            .await
            .unwrap();
        let called = engine.call_next(doctor_id).unwrap().unwrap();
        engine.start_visit(called.id).unwrap();
        engine.complete_visit(called.id).await.unwrap();

        // 第二次完成是无效状态转换
        assert!(engine.complete_visit(called.id).await.is_err());
        assert_eq!(engine.billing().outstanding_balance(patient), 80_000);
    }

    #[tokio::test]
    async fn test_discharge_requires_settled_invoice() {
        let (mut engine, _doctor) = engine_with_doctor(DoctorSpecialty::General);
        let patient = Uuid::new_v4();

        let bed = engine
            .admissions_mut()
            .register_bed("A", 1, 200_000)
            .unwrap();
        let admission = engine.admit_patient(patient, bed.id).unwrap();

        // 欠费时拒绝出院
        let err = engine.discharge_patient(admission.id).await.unwrap_err();
        assert!(matches!(err, ClinicError::UnsettledBalance { .. }));

        // 结清后可以出院
        let invoice = engine
            .billing()
            .invoices_for_patient(patient)
            .first()
            .map(|invoice| (invoice.id, invoice.balance()))
            .unwrap();
        engine
            .record_payment(invoice.0, invoice.1, PaymentMethod::Cash)
            .unwrap();

        let discharged = engine.discharge_patient(admission.id).await.unwrap();
        assert!(discharged.discharged_at.is_some());
        assert_eq!(engine.admissions().occupancy(), (0, 1));
    }

    #[tokio::test]
    async fn test_accrual_is_idempotent_on_invoice() {
        let (mut engine, _doctor) = engine_with_doctor(DoctorSpecialty::General);
        let patient = Uuid::new_v4();

        let bed = engine
            .admissions_mut()
            .register_bed("A", 1, 200_000)
            .unwrap();
        engine.admit_patient(patient, bed.id).unwrap();

        engine.accrue_bed_charges(Utc::now()).await.unwrap();
        engine.accrue_bed_charges(Utc::now()).await.unwrap();

        let invoices = engine.billing().invoices_for_patient(patient);
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].items.len(), 1);
        assert_eq!(invoices[0].total, 200_000); // 同一天重复核算不翻倍
        assert_eq!(invoices[0].status, InvoiceStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_lab_charge_joins_open_invoice() {
        let (mut engine, doctor_id) = engine_with_doctor(DoctorSpecialty::General);
        let patient = Uuid::new_v4();

        engine
            .check_in(patient, Some(doctor_id), None, QueuePriority::Normal)
            .await
            .unwrap();
        let called = engine.call_next(doctor_id).unwrap().unwrap();
        engine.start_visit(called.id).unwrap();
        engine.complete_visit(called.id).await.unwrap();

        let test = LabTest {
            id: Uuid::new_v4(),
            code: "LAB-CBC".to_string(),
            name: "Complete blood count".to_string(),
            price: 50_000,
            reagent_id: None,
            reagent_per_test: 1,
            created_at: Utc::now(),
        };
        let invoice = engine.add_lab_charge(patient, &test, Uuid::new_v4()).unwrap();

        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.total, 130_000);
    }

    #[tokio::test]
    async fn test_check_in_routes_by_specialty() {
        let (mut engine, general_id) = engine_with_doctor(DoctorSpecialty::General);
        let cardiologist = DoctorProfile {
            id: Uuid::new_v4(),
            name: "Dr. Yusupov".to_string(),
            specialty: DoctorSpecialty::Cardiology,
            max_workload: 5,
            is_available: true,
        };
        let cardiologist_id = cardiologist.id;
        engine.roster_mut().add_doctor(cardiologist);

        let entry = engine
            .check_in(
                Uuid::new_v4(),
                None,
                Some(DoctorSpecialty::Cardiology),
                QueuePriority::Normal,
            )
            .await
            .unwrap();

        assert_eq!(entry.doctor_id, cardiologist_id);
        assert_ne!(entry.doctor_id, general_id);
    }
}
