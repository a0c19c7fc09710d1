//! # Clinic 集成模块
//!
//! 提供与外部系统的集成功能，包括：
//! - Telegram机器人：患者绑定、排队/账单查询命令与主动通知
//! - Webhook事件通知系统，实现实时事件推送

pub mod telegram;
pub mod webhook;

pub use telegram::{
    BalanceSummary, BotBackend, BotCommand, QueueSummary, TelegramBot, TelegramClient,
    TelegramConfig, TelegramNotifier,
};
pub use webhook::{WebhookEvent, WebhookEventType, WebhookManager, WebhookSubscription};
