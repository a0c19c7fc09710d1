//! 周期任务调度
//!
//! 床位费核算、欠费提醒等后台任务按固定间隔执行，
//! 单次失败只记录日志，不影响后续执行。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 周期任务
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// 任务名称
    fn name(&self) -> &str;

    /// 执行间隔
    fn interval(&self) -> Duration;

    /// 执行一次
    async fn run(&self) -> anyhow::Result<()>;
}

/// 任务调度器
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Arc<dyn ScheduledJob>>,
}

impl Scheduler {
    /// 创建空调度器
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// 注册任务
    pub fn register(&mut self, job: Arc<dyn ScheduledJob>) {
        info!(
            "Registered scheduled job '{}' every {:?}",
            job.name(),
            job.interval()
        );
        self.jobs.push(job);
    }

    /// 已注册任务名称
    pub fn job_names(&self) -> Vec<String> {
        self.jobs.iter().map(|job| job.name().to_string()).collect()
    }

    /// 启动所有任务，返回各自的句柄
    pub fn spawn_all(&self) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .map(|job| {
                let job = job.clone();
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(job.interval());
                    loop {
                        ticker.tick().await;
                        if let Err(e) = job.run().await {
                            error!("Scheduled job '{}' failed: {}", job.name(), e);
                        }
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        counter: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ScheduledJob for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(10)
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingJob;

    #[async_trait]
    impl ScheduledJob for FailingJob {
        fn name(&self) -> &str {
            "failing"
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(10)
        }

        async fn run(&self) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    #[tokio::test]
    async fn test_jobs_tick_repeatedly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.register(Arc::new(CountingJob {
            counter: counter.clone(),
        }));

        let handles = scheduler.spawn_all();
        tokio::time::sleep(Duration::from_millis(55)).await;
        for handle in handles {
            handle.abort();
        }

        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_failing_job_does_not_stop_scheduler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.register(Arc::new(FailingJob));
        scheduler.register(Arc::new(CountingJob {
            counter: counter.clone(),
        }));

        assert_eq!(scheduler.job_names(), vec!["failing", "counting"]);

        let handles = scheduler.spawn_all();
        tokio::time::sleep(Duration::from_millis(55)).await;
        for handle in handles {
            handle.abort();
        }

        assert!(counter.load(Ordering::SeqCst) >= 2);
    }
}
