//! 员工任务管理
//!
//! 为不同角色员工提供个性化的任务列表

use clinic_core::{ClinicError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 员工任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffTask {
    pub id: Uuid,
    pub subject: String,
    pub patient_id: Option<Uuid>, // 关联患者（可选）
    pub assignee_id: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub due_at: Option<chrono::DateTime<chrono::Utc>>,
    pub tags: Vec<String>,
}

/// 任务状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TaskStatus {
    Pending,    // 待处理
    InProgress, // 处理中
    Completed,  // 已完成
    Rejected,   // 已拒绝
    OnHold,     // 暂停
}

/// 任务优先级
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Critical, // 危急
    High,     // 高
    Normal,   // 正常
    Low,      // 低
}

/// 任务列表过滤器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFilter {
    pub assignee_id: Option<Uuid>,
    pub status: Option<Vec<TaskStatus>>,
    pub priority: Option<Vec<TaskPriority>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            assignee_id: None,
            status: None,
            priority: None,
            limit: Some(50),
            offset: Some(0),
        }
    }
}

/// 任务统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStats {
    pub total_tasks: i32,
    pub pending_tasks: i32,
    pub in_progress_tasks: i32,
    pub completed_tasks: i32,
    pub overdue_tasks: i32,
    pub tasks_by_priority: HashMap<TaskPriority, i32>,
}

/// 任务管理器
#[derive(Debug)]
pub struct TaskManager {
    tasks: HashMap<Uuid, StaffTask>,
    assignee_tasks: HashMap<Uuid, Vec<Uuid>>, // assignee_id -> task_ids
    patient_tasks: HashMap<Uuid, Vec<Uuid>>,  // patient_id -> task_ids
}

impl TaskManager {
    /// 创建新的任务管理器
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            assignee_tasks: HashMap::new(),
            patient_tasks: HashMap::new(),
        }
    }

    /// 创建任务
    pub fn create_task(
        &mut self,
        subject: &str,
        patient_id: Option<Uuid>,
        assignee_id: Option<Uuid>,
        priority: TaskPriority,
        due_at: Option<chrono::DateTime<chrono::Utc>>,
        tags: Vec<String>,
    ) -> Result<StaffTask> {
        let task = StaffTask {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            patient_id,
            assignee_id,
            status: TaskStatus::Pending,
            priority,
            created_at: chrono::Utc::now(),
            due_at,
            tags,
        };

        let task_id = task.id;
        self.tasks.insert(task_id, task.clone());

        if let Some(assignee_id) = assignee_id {
            self.assignee_tasks
                .entry(assignee_id)
                .or_default()
                .push(task_id);
        }

        if let Some(patient_id) = patient_id {
            self.patient_tasks
                .entry(patient_id)
                .or_default()
                .push(task_id);
        }

        tracing::info!("Created task {} ({})", task_id, subject);
        Ok(task)
    }

    /// 获取任务
    pub fn get_task(&self, task_id: Uuid) -> Option<&StaffTask> {
        self.tasks.get(&task_id)
    }

    /// 更新任务状态
    pub fn update_task_status(&mut self, task_id: Uuid, status: TaskStatus) -> Result<()> {
        if let Some(task) = self.tasks.get_mut(&task_id) {
            let old_status = task.status.clone();
            task.status = status.clone();

            tracing::info!(
                "Updated task {} status from {:?} to {:?}",
                task_id,
                old_status,
                status
            );

            // 完成或拒绝的任务从执行人的活跃列表移除
            if matches!(status, TaskStatus::Completed | TaskStatus::Rejected) {
                if let Some(assignee_id) = task.assignee_id {
                    if let Some(task_ids) = self.assignee_tasks.get_mut(&assignee_id) {
                        task_ids.retain(|&id| id != task_id);
                    }
                }
            }

            Ok(())
        } else {
            Err(ClinicError::NotFound(format!("Task {} not found", task_id)))
        }
    }

    /// 分配任务给员工
    pub fn assign_task(&mut self, task_id: Uuid, assignee_id: Uuid) -> Result<()> {
        if let Some(task) = self.tasks.get_mut(&task_id) {
            // 从旧执行人的列表中移除
            if let Some(old_id) = task.assignee_id {
                if let Some(task_ids) = self.assignee_tasks.get_mut(&old_id) {
                    task_ids.retain(|&id| id != task_id);
                }
            }

            task.assignee_id = Some(assignee_id);

            self.assignee_tasks
                .entry(assignee_id)
                .or_default()
                .push(task_id);

            tracing::info!("Assigned task {} to staff {}", task_id, assignee_id);
            Ok(())
        } else {
            Err(ClinicError::NotFound(format!("Task {} not found", task_id)))
        }
    }

    /// 查询任务列表
    pub fn query_tasks(&self, filter: &TaskFilter) -> Vec<StaffTask> {
        let mut tasks: Vec<&StaffTask> = self.tasks.values().collect();

        // 应用过滤器
        if let Some(assignee_id) = filter.assignee_id {
            tasks.retain(|task| task.assignee_id == Some(assignee_id));
        }

        if let Some(statuses) = &filter.status {
            tasks.retain(|task| statuses.contains(&task.status));
        }

        if let Some(priorities) = &filter.priority {
            tasks.retain(|task| priorities.contains(&task.priority));
        }

        // 按优先级和创建时间排序
        tasks.sort_by(|a, b| match a.priority.cmp(&b.priority) {
            std::cmp::Ordering::Equal => a.created_at.cmp(&b.created_at),
            other => other,
        });

        // 应用分页；limit为None时不截断
        let total = tasks.len();
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map(|limit| limit as usize).unwrap_or(total);

        let start = offset.min(total);
        let end = (start + limit).min(total);

        tasks[start..end].iter().map(|task| (*task).clone()).collect()
    }

    /// 员工的任务列表
    pub fn tasks_for_assignee(&self, assignee_id: Uuid) -> Vec<StaffTask> {
        let filter = TaskFilter {
            assignee_id: Some(assignee_id),
            ..Default::default()
        };
        self.query_tasks(&filter)
    }

    /// 患者关联的任务
    pub fn tasks_for_patient(&self, patient_id: Uuid) -> Vec<&StaffTask> {
        self.patient_tasks
            .get(&patient_id)
            .map(|ids| ids.iter().filter_map(|id| self.tasks.get(id)).collect())
            .unwrap_or_default()
    }

    /// 任务统计
    pub fn stats(&self, assignee_id: Option<Uuid>) -> TaskStats {
        let filter = TaskFilter {
            assignee_id,
            limit: None,
            ..Default::default()
        };
        let tasks = self.query_tasks(&filter);

        let mut stats = TaskStats {
            total_tasks: tasks.len() as i32,
            pending_tasks: 0,
            in_progress_tasks: 0,
            completed_tasks: 0,
            overdue_tasks: 0,
            tasks_by_priority: HashMap::new(),
        };

        let now = chrono::Utc::now();
        for task in &tasks {
            match task.status {
                TaskStatus::Pending => stats.pending_tasks += 1,
                TaskStatus::InProgress => stats.in_progress_tasks += 1,
                TaskStatus::Completed => stats.completed_tasks += 1,
                _ => {}
            }

            // 检查是否逾期
            if let Some(due_at) = task.due_at {
                if now > due_at && !matches!(task.status, TaskStatus::Completed) {
                    stats.overdue_tasks += 1;
                }
            }

            *stats
                .tasks_by_priority
                .entry(task.priority.clone())
                .or_insert(0) += 1;
        }

        stats
    }

    /// 所有活跃任务
    pub fn active_tasks(&self) -> Vec<&StaffTask> {
        self.tasks
            .values()
            .filter(|task| matches!(task.status, TaskStatus::Pending | TaskStatus::InProgress))
            .collect()
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_create_and_query() {
        let mut manager = TaskManager::new();
        let nurse = Uuid::new_v4();

        manager
            .create_task("Prepare ward A", None, Some(nurse), TaskPriority::Normal, None, vec![])
            .unwrap();
        manager
            .create_task("Check oxygen supply", None, Some(nurse), TaskPriority::Critical, None, vec![])
            .unwrap();

        let tasks = manager.tasks_for_assignee(nurse);
        assert_eq!(tasks.len(), 2);
        // 危急任务排在前面
        assert_eq!(tasks[0].priority, TaskPriority::Critical);
    }

    #[test]
    fn test_completed_task_leaves_active_list() {
        let mut manager = TaskManager::new();
        let nurse = Uuid::new_v4();

        let task = manager
            .create_task("Restock reagents", None, Some(nurse), TaskPriority::Normal, None, vec![])
            .unwrap();
        manager
            .update_task_status(task.id, TaskStatus::Completed)
            .unwrap();

        assert!(manager.active_tasks().is_empty());
        assert_eq!(
            manager.get_task(task.id).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn test_reassign() {
        let mut manager = TaskManager::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let task = manager
            .create_task("Call patient about results", None, Some(first), TaskPriority::High, None, vec![])
            .unwrap();
        manager.assign_task(task.id, second).unwrap();

        assert_eq!(manager.tasks_for_assignee(second).len(), 1);
        assert!(manager.tasks_for_assignee(first).is_empty());
    }

    #[test]
    fn test_overdue_stats() {
        let mut manager = TaskManager::new();
        let nurse = Uuid::new_v4();

        manager
            .create_task(
                "Overdue task",
                None,
                Some(nurse),
                TaskPriority::Normal,
                Some(chrono::Utc::now() - Duration::hours(1)),
                vec![],
            )
            .unwrap();

        let stats = manager.stats(Some(nurse));
        assert_eq!(stats.overdue_tasks, 1);
    }

    #[test]
    fn test_unknown_task() {
        let mut manager = TaskManager::new();
        assert!(manager
            .update_task_status(Uuid::new_v4(), TaskStatus::Completed)
            .is_err());
    }
}
