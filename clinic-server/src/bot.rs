//! Telegram机器人后端
//!
//! 把机器人命令映射到工作流引擎与患者档案。

use anyhow::Result;
use async_trait::async_trait;
use clinic_core::QueueStatus;
use clinic_database::{DatabasePool, DatabaseQueries};
use clinic_integration::{BalanceSummary, BotBackend, QueueSummary};
use clinic_workflow::ClinicEngine;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct EngineBotBackend {
    engine: Arc<RwLock<ClinicEngine>>,
    db: Arc<DatabasePool>,
}

impl EngineBotBackend {
    pub fn new(engine: Arc<RwLock<ClinicEngine>>, db: Arc<DatabasePool>) -> Self {
        Self { engine, db }
    }
}

#[async_trait]
impl BotBackend for EngineBotBackend {
    async fn link_chat(&self, mrn: &str, chat_id: i64) -> Result<Option<String>> {
        let queries = DatabaseQueries::new(&self.db);
        let patient = queries.link_telegram_chat(mrn, chat_id).await?;
        Ok(patient.map(|p| p.full_name()))
    }

    async fn queue_status(&self, chat_id: i64) -> Result<Option<QueueSummary>> {
        let queries = DatabaseQueries::new(&self.db);
        let Some(patient) = queries.get_patient_by_telegram_chat(chat_id).await? else {
            return Ok(None);
        };

        let engine = self.engine.read().await;
        let Some(entry) = engine
            .queue()
            .active_entries()
            .into_iter()
            .find(|entry| entry.patient_id == patient.id)
            .cloned()
        else {
            return Ok(None);
        };

        let ahead = if entry.status == QueueStatus::Waiting {
            engine.queue().position(entry.id).ok()
        } else {
            None
        };

        let doctor_name = engine
            .roster()
            .get_doctor(entry.doctor_id)
            .map(|doctor| doctor.name.clone())
            .unwrap_or_else(|| "your doctor".to_string());

        Ok(Some(QueueSummary {
            ticket_number: entry.ticket_number,
            doctor_name,
            status: format!("{:?}", entry.status).to_lowercase(),
            ahead,
        }))
    }

    async fn invoice_status(&self, chat_id: i64) -> Result<Option<BalanceSummary>> {
        let queries = DatabaseQueries::new(&self.db);
        let Some(patient) = queries.get_patient_by_telegram_chat(chat_id).await? else {
            return Ok(None);
        };

        let engine = self.engine.read().await;
        Ok(engine
            .billing()
            .open_invoice(patient.id)
            .map(|invoice| BalanceSummary {
                invoice_number: invoice.invoice_number.clone(),
                total: invoice.total,
                paid_amount: invoice.paid_amount,
            }))
    }
}
