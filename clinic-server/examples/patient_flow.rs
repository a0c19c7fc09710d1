//! 就诊流程演示程序
//!
//! 展示从挂号排队、就诊计费、收款到住院出院的完整流程

use clinic_billing::PriceList;
use clinic_core::utils::format_money;
use clinic_core::{DoctorSpecialty, PaymentMethod, QueuePriority};
use clinic_workflow::routing::DoctorProfile;
use clinic_workflow::ClinicEngine;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let mut engine = ClinicEngine::new(PriceList::with_defaults());

    println!("🏥 诊所就诊流程演示\n");

    // 1. 设置医生与床位
    let general = DoctorProfile {
        id: Uuid::new_v4(),
        name: "Dr. Karimova".to_string(),
        specialty: DoctorSpecialty::General,
        max_workload: 5,
        is_available: true,
    };
    let general_id = general.id;
    engine.roster_mut().add_doctor(general);

    let bed = engine.admissions_mut().register_bed("A", 1, 200_000)?;
    println!("✅ 医生与床位设置完成");

    // 2. 三位患者挂号
    let patients: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    for (i, patient) in patients.iter().enumerate() {
        let priority = if i == 2 {
            QueuePriority::Emergency
        } else {
            QueuePriority::Normal
        };
        let entry = engine
            .check_in(*patient, None, Some(DoctorSpecialty::General), priority)
            .await?;
        println!("📋 患者 {} 取号 {} (优先级 {:?})", patient, entry.ticket_number, entry.priority);
    }

    // 3. 叫号就诊：急诊患者先被叫到
    let called = engine.call_next(general_id)?.expect("queue not empty");
    println!("\n🔔 叫号: 票号 {} (患者 {})", called.ticket_number, called.patient_id);

    engine.start_visit(called.id)?;
    let (entry, invoice) = engine.complete_visit(called.id).await?;
    println!(
        "💊 就诊完成，账单 {} 合计 {}",
        invoice.invoice_number,
        format_money(invoice.total)
    );

    // 4. 收款
    engine.record_payment(invoice.id, invoice.total, PaymentMethod::Cash)?;
    println!("💰 门诊费已结清");

    // 5. 住院
    let inpatient = entry.patient_id;
    let admission = engine.admit_patient(inpatient, bed.id)?;
    println!("\n🛏 患者 {} 入住 {}/{}", inpatient, bed.ward, bed.number);

    // 出院前必须结清床位费
    match engine.discharge_patient(admission.id).await {
        Err(e) => println!("⛔ 出院被拒绝: {}", e),
        Ok(_) => unreachable!("discharge must fail while unpaid"),
    }

    let balance = engine.billing().outstanding_balance(inpatient);
    let open_invoice = engine
        .billing()
        .invoices_for_patient(inpatient)
        .first()
        .map(|inv| inv.id)
        .expect("open invoice exists");
    engine.record_payment(open_invoice, balance, PaymentMethod::Card)?;
    println!("💰 床位费 {} 已结清", format_money(balance));

    let discharged = engine.discharge_patient(admission.id).await?;
    println!("🚪 出院完成: {:?}", discharged.status);

    // 6. 系统概览
    let overview = engine.overview();
    println!("\n📊 系统概览:");
    println!("   候诊人数: {}", overview.waiting_patients);
    println!("   占用床位: {}/{}", overview.occupied_beds, overview.total_beds);
    println!("   未结账单: {}", overview.unsettled_invoices);
    println!("   未收余额: {}", format_money(overview.outstanding_total));

    Ok(())
}
