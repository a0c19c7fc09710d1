//! 后台周期任务
//!
//! 床位费核算与欠费提醒，由clinic-admin的调度器驱动。

use async_trait::async_trait;
use chrono::Utc;
use clinic_admin::ScheduledJob;
use clinic_core::Invoice;
use clinic_database::{DatabasePool, DatabaseQueries};
use clinic_integration::TelegramNotifier;
use clinic_workflow::ClinicEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// 床位费核算任务
pub struct BedChargeJob {
    engine: Arc<RwLock<ClinicEngine>>,
    interval: Duration,
}

impl BedChargeJob {
    pub fn new(engine: Arc<RwLock<ClinicEngine>>, interval: Duration) -> Self {
        Self { engine, interval }
    }
}

#[async_trait]
impl ScheduledJob for BedChargeJob {
    fn name(&self) -> &str {
        "bed-charge-accrual"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        let mut engine = self.engine.write().await;
        let records = engine.accrue_bed_charges(Utc::now()).await?;
        if !records.is_empty() {
            info!("Accrued bed charges for {} admissions", records.len());
        }
        Ok(())
    }
}

/// 欠费提醒任务
///
/// 给每张未结清账单的患者发送Telegram提醒（未绑定会话的跳过）。
pub struct DebtReminderJob {
    engine: Arc<RwLock<ClinicEngine>>,
    db: Arc<DatabasePool>,
    notifier: TelegramNotifier,
    interval: Duration,
}

impl DebtReminderJob {
    pub fn new(
        engine: Arc<RwLock<ClinicEngine>>,
        db: Arc<DatabasePool>,
        notifier: TelegramNotifier,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            db,
            notifier,
            interval,
        }
    }
}

#[async_trait]
impl ScheduledJob for DebtReminderJob {
    fn name(&self) -> &str {
        "debt-reminder"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        let unsettled: Vec<Invoice> = {
            let engine = self.engine.read().await;
            engine
                .billing()
                .list_unsettled()
                .into_iter()
                .cloned()
                .collect()
        };

        if unsettled.is_empty() {
            return Ok(());
        }

        let queries = DatabaseQueries::new(&self.db);
        let mut reminded = 0;

        for invoice in unsettled {
            let patient = queries.get_patient_by_id(&invoice.patient_id).await?;
            let Some(chat_id) = patient.and_then(|p| p.telegram_chat_id) else {
                continue;
            };

            match self
                .notifier
                .notify_debt_reminder(chat_id, &invoice.invoice_number, invoice.balance())
                .await
            {
                Ok(()) => reminded += 1,
                Err(e) => warn!(
                    "Debt reminder for invoice {} failed: {}",
                    invoice.invoice_number, e
                ),
            }
        }

        info!("Sent {} debt reminders", reminded);
        Ok(())
    }
}
