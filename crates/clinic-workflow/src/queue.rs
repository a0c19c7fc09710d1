//! 候诊队列
//!
//! 排队状态机与按医生组织的当日叫号队列

use chrono::{NaiveDate, Utc};
use clinic_core::{ClinicError, QueueEntry, QueuePriority, QueueStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 排队状态转换事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueEvent {
    Call,       // 叫号
    Start,      // 开始就诊
    Complete,   // 完成就诊
    Cancel,     // 取消
    Requeue,    // 过号重排
    MarkNoShow, // 标记未到
}

/// 排队状态机
#[derive(Debug)]
pub struct QueueStateMachine {
    transitions: HashMap<(QueueStatus, QueueEvent), QueueStatus>,
}

impl QueueStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 定义状态转换规则
        transitions.insert((QueueStatus::Waiting, QueueEvent::Call), QueueStatus::Called);
        transitions.insert((QueueStatus::Called, QueueEvent::Start), QueueStatus::InProgress);
        transitions.insert((QueueStatus::InProgress, QueueEvent::Complete), QueueStatus::Completed);
        transitions.insert((QueueStatus::Waiting, QueueEvent::Cancel), QueueStatus::Canceled);
        transitions.insert((QueueStatus::Called, QueueEvent::Cancel), QueueStatus::Canceled);
        transitions.insert((QueueStatus::Called, QueueEvent::Requeue), QueueStatus::Waiting);
        transitions.insert((QueueStatus::Called, QueueEvent::MarkNoShow), QueueStatus::NoShow);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: &QueueStatus, event: &QueueEvent) -> bool {
        self.transitions.contains_key(&(from.clone(), event.clone()))
    }

    /// 执行状态转换
    pub fn transition(&self, from: &QueueStatus, event: &QueueEvent) -> Result<QueueStatus> {
        match self.transitions.get(&(from.clone(), event.clone())) {
            Some(to) => Ok(to.clone()),
            None => Err(ClinicError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: &QueueStatus) -> Vec<QueueEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| state == current_state)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

impl Default for QueueStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// 队列统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub called: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// 候诊队列管理器
#[derive(Debug)]
pub struct QueueManager {
    machine: QueueStateMachine,
    entries: HashMap<Uuid, QueueEntry>,
    doctor_queues: HashMap<Uuid, Vec<Uuid>>, // doctor_id -> entry_ids
    ticket_counters: HashMap<(Uuid, NaiveDate), i32>,
}

impl QueueManager {
    /// 创建新的队列管理器
    pub fn new() -> Self {
        Self {
            machine: QueueStateMachine::new(),
            entries: HashMap::new(),
            doctor_queues: HashMap::new(),
            ticket_counters: HashMap::new(),
        }
    }

    /// 患者取号排队
    ///
    /// 号码是该医生当日队列内的递增序号，取消的号码不复用。
    pub fn enqueue(
        &mut self,
        patient_id: Uuid,
        doctor_id: Uuid,
        priority: QueuePriority,
    ) -> Result<QueueEntry> {
        // 同一患者在同一医生处同时只能有一个活跃号
        let duplicate = self.entries.values().any(|entry| {
            entry.patient_id == patient_id
                && entry.doctor_id == doctor_id
                && entry.is_active()
        });
        if duplicate {
            return Err(ClinicError::Workflow(format!(
                "Patient {} already has an active queue entry with doctor {}",
                patient_id, doctor_id
            )));
        }

        let now = Utc::now();
        let counter = self
            .ticket_counters
            .entry((doctor_id, now.date_naive()))
            .or_insert(0);
        *counter += 1;

        let entry = QueueEntry {
            id: Uuid::new_v4(),
            ticket_number: *counter,
            patient_id,
            doctor_id,
            priority,
            status: QueueStatus::Waiting,
            enqueued_at: now,
            called_at: None,
            started_at: None,
            completed_at: None,
        };

        self.entries.insert(entry.id, entry.clone());
        self.doctor_queues
            .entry(doctor_id)
            .or_default()
            .push(entry.id);

        tracing::info!(
            "Enqueued patient {} as ticket {} for doctor {}",
            patient_id,
            entry.ticket_number,
            doctor_id
        );
        Ok(entry)
    }

    /// 对条目应用状态转换事件并记录时间戳
    pub fn apply_event(&mut self, entry_id: Uuid, event: &QueueEvent) -> Result<QueueEntry> {
        let entry = self
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Queue entry {} not found", entry_id)))?;

        let new_status = self.machine.transition(&entry.status, event)?;
        let old_status = entry.status.clone();
        entry.status = new_status;

        let now = Utc::now();
        match event {
            QueueEvent::Call => entry.called_at = Some(now),
            QueueEvent::Start => entry.started_at = Some(now),
            QueueEvent::Complete => entry.completed_at = Some(now),
            QueueEvent::Requeue => entry.called_at = None,
            _ => {}
        }

        tracing::info!(
            "Queue entry {} (ticket {}) moved from {:?} to {:?}",
            entry_id,
            entry.ticket_number,
            old_status,
            entry.status
        );
        Ok(entry.clone())
    }

    /// 叫下一个号：优先级最高、等待最久的候诊条目
    pub fn call_next(&mut self, doctor_id: Uuid) -> Result<Option<QueueEntry>> {
        let next = self
            .doctor_queues
            .get(&doctor_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.entries.get(id))
                    .filter(|entry| entry.status == QueueStatus::Waiting)
                    .min_by_key(|entry| (entry.priority.clone(), entry.enqueued_at))
                    .map(|entry| entry.id)
            })
            .unwrap_or(None);

        match next {
            Some(entry_id) => Ok(Some(self.apply_event(entry_id, &QueueEvent::Call)?)),
            None => Ok(None),
        }
    }

    /// 获取条目
    pub fn get_entry(&self, entry_id: Uuid) -> Option<&QueueEntry> {
        self.entries.get(&entry_id)
    }

    /// 条目在其医生候诊队列中的位置（0为下一个被叫）
    pub fn position(&self, entry_id: Uuid) -> Result<usize> {
        let entry = self
            .entries
            .get(&entry_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Queue entry {} not found", entry_id)))?;

        if entry.status != QueueStatus::Waiting {
            return Err(ClinicError::Workflow(format!(
                "Queue entry {} is not waiting",
                entry_id
            )));
        }

        let ahead = self
            .doctor_queues
            .get(&entry.doctor_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.entries.get(id))
                    .filter(|other| other.status == QueueStatus::Waiting)
                    .filter(|other| {
                        (other.priority.clone(), other.enqueued_at)
                            < (entry.priority.clone(), entry.enqueued_at)
                    })
                    .count()
            })
            .unwrap_or(0);

        Ok(ahead)
    }

    /// 医生的当日队列（按叫号顺序）
    pub fn entries_for_doctor(&self, doctor_id: Uuid) -> Vec<QueueEntry> {
        let mut entries: Vec<QueueEntry> = self
            .doctor_queues
            .get(&doctor_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.entries.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        entries.sort_by_key(|entry| (entry.priority.clone(), entry.enqueued_at));
        entries
    }

    /// 按号码在医生队列中查找
    pub fn find_by_ticket(&self, doctor_id: Uuid, ticket_number: i32) -> Option<&QueueEntry> {
        self.doctor_queues.get(&doctor_id).and_then(|ids| {
            ids.iter()
                .filter_map(|id| self.entries.get(id))
                .find(|entry| entry.ticket_number == ticket_number)
        })
    }

    /// 所有活跃条目
    pub fn active_entries(&self) -> Vec<&QueueEntry> {
        self.entries.values().filter(|e| e.is_active()).collect()
    }

    /// 队列统计
    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            waiting: 0,
            called: 0,
            in_progress: 0,
            completed: 0,
        };

        for entry in self.entries.values() {
            match entry.status {
                QueueStatus::Waiting => stats.waiting += 1,
                QueueStatus::Called => stats.called += 1,
                QueueStatus::InProgress => stats.in_progress += 1,
                QueueStatus::Completed => stats.completed += 1,
                _ => {}
            }
        }

        stats
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = QueueStateMachine::new();

        // 测试有效转换
        assert!(sm.can_transition(&QueueStatus::Waiting, &QueueEvent::Call));
        assert!(sm.can_transition(&QueueStatus::Called, &QueueEvent::Start));
        assert!(sm.can_transition(&QueueStatus::InProgress, &QueueEvent::Complete));
        assert!(sm.can_transition(&QueueStatus::Called, &QueueEvent::Requeue));
    }

    #[test]
    fn test_invalid_transitions() {
        let sm = QueueStateMachine::new();

        // 测试无效转换
        assert!(!sm.can_transition(&QueueStatus::Waiting, &QueueEvent::Complete));
        assert!(!sm.can_transition(&QueueStatus::Completed, &QueueEvent::Call));
        assert!(!sm.can_transition(&QueueStatus::InProgress, &QueueEvent::Cancel));
        assert!(!sm.can_transition(&QueueStatus::Canceled, &QueueEvent::Call));
    }

    #[test]
    fn test_ticket_numbers_increase() {
        let mut manager = QueueManager::new();
        let doctor = Uuid::new_v4();

        let first = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Normal)
            .unwrap();
        let second = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Normal)
            .unwrap();

        assert_eq!(first.ticket_number, 1);
        assert_eq!(second.ticket_number, 2);
    }

    #[test]
    fn test_duplicate_active_entry_rejected() {
        let mut manager = QueueManager::new();
        let doctor = Uuid::new_v4();
        let patient = Uuid::new_v4();

        manager
            .enqueue(patient, doctor, QueuePriority::Normal)
            .unwrap();
        assert!(manager
            .enqueue(patient, doctor, QueuePriority::Normal)
            .is_err());
    }

    #[test]
    fn test_call_next_respects_priority() {
        let mut manager = QueueManager::new();
        let doctor = Uuid::new_v4();

        let routine = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Normal)
            .unwrap();
        let emergency = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Emergency)
            .unwrap();

        let called = manager.call_next(doctor).unwrap().unwrap();
        assert_eq!(called.id, emergency.id);

        let called = manager.call_next(doctor).unwrap().unwrap();
        assert_eq!(called.id, routine.id);

        assert!(manager.call_next(doctor).unwrap().is_none());
    }

    #[test]
    fn test_full_visit_lifecycle() {
        let mut manager = QueueManager::new();
        let doctor = Uuid::new_v4();

        let entry = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Normal)
            .unwrap();

        let entry = manager.apply_event(entry.id, &QueueEvent::Call).unwrap();
        assert!(entry.called_at.is_some());

        let entry = manager.apply_event(entry.id, &QueueEvent::Start).unwrap();
        assert!(entry.started_at.is_some());

        let entry = manager.apply_event(entry.id, &QueueEvent::Complete).unwrap();
        assert_eq!(entry.status, QueueStatus::Completed);
        assert!(entry.completed_at.is_some());

        // 完成后不能再转换
        assert!(manager.apply_event(entry.id, &QueueEvent::Call).is_err());
    }

    #[test]
    fn test_requeue_keeps_ticket() {
        let mut manager = QueueManager::new();
        let doctor = Uuid::new_v4();

        let entry = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Normal)
            .unwrap();
        let ticket = entry.ticket_number;

        manager.apply_event(entry.id, &QueueEvent::Call).unwrap();
        let entry = manager.apply_event(entry.id, &QueueEvent::Requeue).unwrap();

        assert_eq!(entry.status, QueueStatus::Waiting);
        assert_eq!(entry.ticket_number, ticket);
        assert!(entry.called_at.is_none());
    }

    #[test]
    fn test_position() {
        let mut manager = QueueManager::new();
        let doctor = Uuid::new_v4();

        let first = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Normal)
            .unwrap();
        let second = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Normal)
            .unwrap();

        assert_eq!(manager.position(first.id).unwrap(), 0);
        assert_eq!(manager.position(second.id).unwrap(), 1);

        // 急诊插队后常规号后移
        let emergency = manager
            .enqueue(Uuid::new_v4(), doctor, QueuePriority::Emergency)
            .unwrap();
        assert_eq!(manager.position(emergency.id).unwrap(), 0);
        assert_eq!(manager.position(first.id).unwrap(), 1);
    }
}
