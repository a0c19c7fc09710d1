//! Telegram通知机器人
//!
//! 通过Telegram Bot API长轮询接收患者命令，并向绑定的患者推送
//! 叫号、账单与欠费提醒。

use anyhow::Result;
use async_trait::async_trait;
use clinic_core::utils::format_money;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

const MAX_SEND_ATTEMPTS: u32 = 3;

/// Telegram配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// BotFather签发的令牌
    pub bot_token: String,
    /// API地址（测试时可指向本地mock）
    pub api_base: String,
    /// 长轮询超时（秒）
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

// Telegram Bot API 响应结构

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
}

/// 一次getUpdates返回的更新
#[derive(Debug, Clone, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub chat: TgChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

/// Telegram Bot API客户端
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            bot_token: config.bot_token.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// 发送文本消息
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "sendMessage failed with status: {}",
                response.status()
            ));
        }

        debug!("Sent telegram message to chat {}", chat_id);
        Ok(())
    }

    /// 长轮询获取更新
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<TgUpdate>> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset.to_string()), ("timeout", timeout_secs.to_string())])
            .send()
            .await?;

        let body: ApiResponse<Vec<TgUpdate>> = response.json().await?;
        if !body.ok {
            return Err(anyhow::anyhow!("getUpdates returned ok=false"));
        }

        Ok(body.result.unwrap_or_default())
    }
}

/// 患者可用的机器人命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// 绑定病历号: /start <mrn>
    Start { mrn: Option<String> },
    /// 查询排队状态: /queue
    Queue,
    /// 查询账单余额: /invoice
    Invoice,
    /// 其余输入
    Help,
}

/// 解析用户输入的命令
pub fn parse_command(text: &str) -> BotCommand {
    let pattern = Regex::new(r"^/(start|queue|invoice)(?:\s+(\S+))?\s*$").unwrap();

    match pattern.captures(text.trim()) {
        Some(captures) => {
            let argument = captures.get(2).map(|m| m.as_str().to_string());
            match &captures[1] {
                "start" => BotCommand::Start { mrn: argument },
                "queue" => BotCommand::Queue,
                "invoice" => BotCommand::Invoice,
                _ => BotCommand::Help,
            }
        }
        None => BotCommand::Help,
    }
}

/// 排队状态摘要（供机器人展示）
#[derive(Debug, Clone)]
pub struct QueueSummary {
    pub ticket_number: i32,
    pub doctor_name: String,
    pub status: String,
    /// 候诊中时前面还有几人
    pub ahead: Option<usize>,
}

/// 账单余额摘要
#[derive(Debug, Clone)]
pub struct BalanceSummary {
    pub invoice_number: String,
    pub total: i64,
    pub paid_amount: i64,
}

/// 机器人后端
///
/// 由服务端实现，把命令映射到队列与账单数据。
#[async_trait]
pub trait BotBackend: Send + Sync {
    /// 绑定会话到病历号，返回患者姓名
    async fn link_chat(&self, mrn: &str, chat_id: i64) -> Result<Option<String>>;

    /// 该会话对应患者的当前排队状态
    async fn queue_status(&self, chat_id: i64) -> Result<Option<QueueSummary>>;

    /// 该会话对应患者的未结账单
    async fn invoice_status(&self, chat_id: i64) -> Result<Option<BalanceSummary>>;
}

/// 生成命令的回复文本
pub async fn handle_command(backend: &dyn BotBackend, chat_id: i64, command: BotCommand) -> String {
    match command {
        BotCommand::Start { mrn: Some(mrn) } => match backend.link_chat(&mrn, chat_id).await {
            Ok(Some(name)) => format!(
                "Salom, {}! Chat linked to record {}. Use /queue or /invoice.",
                name, mrn
            ),
            Ok(None) => format!("No patient found with record number {}.", mrn),
            Err(e) => {
                error!("link_chat failed for chat {}: {}", chat_id, e);
                "Service is temporarily unavailable, please try again later.".to_string()
            }
        },
        BotCommand::Start { mrn: None } => {
            "Send /start <record number> to link your patient record.".to_string()
        }
        BotCommand::Queue => match backend.queue_status(chat_id).await {
            Ok(Some(summary)) => match summary.ahead {
                Some(ahead) => format!(
                    "Ticket {} with {}: {} ({} ahead of you).",
                    summary.ticket_number, summary.doctor_name, summary.status, ahead
                ),
                None => format!(
                    "Ticket {} with {}: {}.",
                    summary.ticket_number, summary.doctor_name, summary.status
                ),
            },
            Ok(None) => "You are not in a queue right now.".to_string(),
            Err(e) => {
                error!("queue_status failed for chat {}: {}", chat_id, e);
                "Service is temporarily unavailable, please try again later.".to_string()
            }
        },
        BotCommand::Invoice => match backend.invoice_status(chat_id).await {
            Ok(Some(summary)) => format!(
                "Invoice {}: total {}, paid {}, due {}.",
                summary.invoice_number,
                format_money(summary.total),
                format_money(summary.paid_amount),
                format_money(summary.total - summary.paid_amount)
            ),
            Ok(None) => "You have no outstanding invoices.".to_string(),
            Err(e) => {
                error!("invoice_status failed for chat {}: {}", chat_id, e);
                "Service is temporarily unavailable, please try again later.".to_string()
            }
        },
        BotCommand::Help => {
            "Commands: /start <record number>, /queue, /invoice".to_string()
        }
    }
}

/// Telegram机器人
///
/// 轮询更新并把命令转给后端处理。
pub struct TelegramBot {
    client: TelegramClient,
    backend: std::sync::Arc<dyn BotBackend>,
    poll_timeout_secs: u64,
    offset: i64,
}

impl TelegramBot {
    pub fn new(config: &TelegramConfig, backend: std::sync::Arc<dyn BotBackend>) -> Self {
        Self {
            client: TelegramClient::new(config),
            backend,
            poll_timeout_secs: config.poll_timeout_secs,
            offset: 0,
        }
    }

    /// 轮询循环；出错时退避后继续
    pub async fn run(mut self) {
        info!("Telegram bot polling started");

        loop {
            match self.client.get_updates(self.offset, self.poll_timeout_secs).await {
                Ok(updates) => {
                    for update in updates {
                        self.offset = self.offset.max(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    warn!("getUpdates failed: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn handle_update(&self, update: TgUpdate) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };

        let chat_id = message.chat.id;
        let command = parse_command(&text);
        debug!("Chat {} issued {:?}", chat_id, command);

        let reply = handle_command(self.backend.as_ref(), chat_id, command).await;
        if let Err(e) = self.client.send_message(chat_id, &reply).await {
            error!("Failed to reply to chat {}: {}", chat_id, e);
        }
    }
}

/// 主动通知发送器
#[derive(Clone)]
pub struct TelegramNotifier {
    client: TelegramClient,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: TelegramClient::new(config),
        }
    }

    /// 叫号通知
    pub async fn notify_queue_called(&self, chat_id: i64, ticket_number: i32, doctor_name: &str) -> Result<()> {
        let text = format!(
            "Your ticket {} has been called. Please proceed to {}.",
            ticket_number, doctor_name
        );
        self.send_with_retry(chat_id, &text).await
    }

    /// 新账单通知
    pub async fn notify_invoice_issued(&self, chat_id: i64, invoice_number: &str, total: i64) -> Result<()> {
        let text = format!(
            "Invoice {} issued, total {}.",
            invoice_number,
            format_money(total)
        );
        self.send_with_retry(chat_id, &text).await
    }

    /// 欠费提醒
    pub async fn notify_debt_reminder(&self, chat_id: i64, invoice_number: &str, balance: i64) -> Result<()> {
        let text = format!(
            "Reminder: invoice {} has an outstanding balance of {}.",
            invoice_number,
            format_money(balance)
        );
        self.send_with_retry(chat_id, &text).await
    }

    /// 重试发送，超过次数后放弃
    async fn send_with_retry(&self, chat_id: i64, text: &str) -> Result<()> {
        let mut last_error = None;

        for attempt in 1..=MAX_SEND_ATTEMPTS {
            match self.client.send_message(chat_id, text).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "Telegram send attempt {}/{} to chat {} failed: {}",
                        attempt, MAX_SEND_ATTEMPTS, chat_id, e
                    );
                    last_error = Some(e);
                    tokio::time::sleep(std::time::Duration::from_millis(200 * attempt as u64)).await;
                }
            }
        }

        let e = last_error.unwrap_or_else(|| anyhow::anyhow!("unknown send failure"));
        error!("Dropping telegram notification to chat {}: {}", chat_id, e);
        Err(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_mrn() {
        assert_eq!(
            parse_command("/start P-240115-A1B2C3"),
            BotCommand::Start {
                mrn: Some("P-240115-A1B2C3".to_string())
            }
        );
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(parse_command("/start"), BotCommand::Start { mrn: None });
        assert_eq!(parse_command("/queue"), BotCommand::Queue);
        assert_eq!(parse_command("/invoice  "), BotCommand::Invoice);
    }

    #[test]
    fn test_unknown_input_is_help() {
        assert_eq!(parse_command("hello"), BotCommand::Help);
        assert_eq!(parse_command("/unknown"), BotCommand::Help);
        assert_eq!(parse_command(""), BotCommand::Help);
    }

    struct FakeBackend;

    #[async_trait]
    impl BotBackend for FakeBackend {
        async fn link_chat(&self, mrn: &str, _chat_id: i64) -> Result<Option<String>> {
            if mrn == "P-240115-A1B2C3" {
                Ok(Some("Alisher Usmanov".to_string()))
            } else {
                Ok(None)
            }
        }

        async fn queue_status(&self, _chat_id: i64) -> Result<Option<QueueSummary>> {
            Ok(Some(QueueSummary {
                ticket_number: 7,
                doctor_name: "Dr. Karimova".to_string(),
                status: "waiting".to_string(),
                ahead: Some(2),
            }))
        }

        async fn invoice_status(&self, _chat_id: i64) -> Result<Option<BalanceSummary>> {
            Ok(Some(BalanceSummary {
                invoice_number: "INV-240115-AAAAAA".to_string(),
                total: 130_000,
                paid_amount: 30_000,
            }))
        }
    }

    #[tokio::test]
    async fn test_handle_link_command() {
        let reply = handle_command(
            &FakeBackend,
            1,
            BotCommand::Start {
                mrn: Some("P-240115-A1B2C3".to_string()),
            },
        )
        .await;
        assert!(reply.contains("Alisher Usmanov"));

        let reply = handle_command(
            &FakeBackend,
            1,
            BotCommand::Start {
                mrn: Some("P-000000-XXXXXX".to_string()),
            },
        )
        .await;
        assert!(reply.contains("No patient found"));
    }

    #[tokio::test]
    async fn test_handle_queue_and_invoice() {
        let reply = handle_command(&FakeBackend, 1, BotCommand::Queue).await;
        assert!(reply.contains("Ticket 7"));
        assert!(reply.contains("2 ahead"));

        let reply = handle_command(&FakeBackend, 1, BotCommand::Invoice).await;
        assert!(reply.contains("due 1000.00"));
    }
}
