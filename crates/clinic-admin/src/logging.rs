//! 审计日志
//!
//! 记录谁在什么时候对哪条业务记录做了什么，供管理端查询

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

/// 审计条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// 操作人（用户名或 "system"）
    pub actor: String,
    /// 动作，如 "patient.create"、"invoice.pay"
    pub action: String,
    /// 操作对象的标识
    pub subject: String,
    pub detail: Option<String>,
}

/// 审计查询过滤器
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor: Option<String>,
    /// 动作匹配（正则表达式）
    pub action_pattern: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// 审计统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_recorded: u64,
    pub buffered: usize,
    pub by_action: HashMap<String, u64>,
}

/// 审计日志环形缓冲
pub struct AuditTrail {
    entries: RwLock<VecDeque<AuditEntry>>,
    capacity: usize,
    total_recorded: RwLock<u64>,
    by_action: RwLock<HashMap<String, u64>>,
}

impl AuditTrail {
    /// 创建指定容量的审计日志
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            total_recorded: RwLock::new(0),
            by_action: RwLock::new(HashMap::new()),
        }
    }

    /// 记录一条审计
    pub async fn record(&self, actor: &str, action: &str, subject: &str, detail: Option<String>) {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action: action.to_string(),
            subject: subject.to_string(),
            detail,
        };

        tracing::debug!("audit: {} {} {}", entry.actor, entry.action, entry.subject);

        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        drop(entries);

        *self.total_recorded.write().await += 1;
        *self
            .by_action
            .write()
            .await
            .entry(action.to_string())
            .or_insert(0) += 1;
    }

    /// 查询审计日志（新的在前）
    pub async fn query(&self, filter: &AuditFilter) -> anyhow::Result<Vec<AuditEntry>> {
        let pattern = match &filter.action_pattern {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };

        let entries = self.entries.read().await;
        let mut matched: Vec<AuditEntry> = entries
            .iter()
            .filter(|entry| {
                if let Some(actor) = &filter.actor {
                    if &entry.actor != actor {
                        return false;
                    }
                }
                if let Some(pattern) = &pattern {
                    if !pattern.is_match(&entry.action) {
                        return false;
                    }
                }
                if let Some(since) = filter.since {
                    if entry.timestamp < since {
                        return false;
                    }
                }
                if let Some(until) = filter.until {
                    if entry.timestamp > until {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        matched.reverse();
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    /// 审计统计
    pub async fn stats(&self) -> AuditStats {
        AuditStats {
            total_recorded: *self.total_recorded.read().await,
            buffered: self.entries.read().await.len(),
            by_action: self.by_action.read().await.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_query() {
        let trail = AuditTrail::new(100);

        trail.record("reception", "patient.create", "P-1", None).await;
        trail.record("cashier", "invoice.pay", "INV-1", Some("50000".into())).await;
        trail.record("reception", "patient.update", "P-1", None).await;

        let all = trail.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        // 新的在前
        assert_eq!(all[0].action, "patient.update");

        let by_actor = trail
            .query(&AuditFilter {
                actor: Some("reception".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_actor.len(), 2);

        let by_pattern = trail
            .query(&AuditFilter {
                action_pattern: Some("^patient\\.".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_pattern.len(), 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let trail = AuditTrail::new(2);

        trail.record("a", "x", "1", None).await;
        trail.record("a", "y", "2", None).await;
        trail.record("a", "z", "3", None).await;

        let all = trail.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].action, "z");

        let stats = trail.stats().await;
        assert_eq!(stats.total_recorded, 3);
        assert_eq!(stats.buffered, 2);
    }

    #[tokio::test]
    async fn test_bad_pattern_is_error() {
        let trail = AuditTrail::new(10);
        let result = trail
            .query(&AuditFilter {
                action_pattern: Some("(".to_string()),
                ..Default::default()
            })
            .await;
        assert!(result.is_err());
    }
}
