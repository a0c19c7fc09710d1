//! 系统监控
//!
//! 基于Prometheus收集运行指标并提供文本导出

use anyhow::{Context, Result};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder};

/// 诊所运行指标收集器
pub struct ClinicMonitor {
    /// Prometheus指标注册表
    registry: Registry,
    /// HTTP请求计数器
    http_requests_total: IntCounter,
    /// HTTP请求延迟直方图
    http_request_duration: Histogram,
    /// 患者登记计数器
    patients_registered_total: IntCounter,
    /// 完成就诊计数器
    visits_completed_total: IntCounter,
    /// 收款金额累计（最小货币单位）
    payments_received_total: IntCounter,
    /// 当前候诊人数
    queue_waiting: IntGauge,
    /// 占用床位数
    beds_occupied: IntGauge,
    /// 总床位数
    beds_total: IntGauge,
    /// 未结清账单数
    invoices_unsettled: IntGauge,
}

impl ClinicMonitor {
    /// 创建监控器并注册全部指标
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounter::with_opts(Opts::new(
            "clinic_http_requests_total",
            "Total HTTP requests handled",
        ))?;
        let http_request_duration = Histogram::with_opts(HistogramOpts::new(
            "clinic_http_request_duration_seconds",
            "HTTP request latency",
        ))?;
        let patients_registered_total = IntCounter::with_opts(Opts::new(
            "clinic_patients_registered_total",
            "Patients registered since start",
        ))?;
        let visits_completed_total = IntCounter::with_opts(Opts::new(
            "clinic_visits_completed_total",
            "Outpatient visits completed since start",
        ))?;
        let payments_received_total = IntCounter::with_opts(Opts::new(
            "clinic_payments_received_total",
            "Total payments received, in minor currency units",
        ))?;
        let queue_waiting = IntGauge::with_opts(Opts::new(
            "clinic_queue_waiting",
            "Patients currently waiting in queues",
        ))?;
        let beds_occupied = IntGauge::with_opts(Opts::new(
            "clinic_beds_occupied",
            "Currently occupied beds",
        ))?;
        let beds_total =
            IntGauge::with_opts(Opts::new("clinic_beds_total", "Registered beds"))?;
        let invoices_unsettled = IntGauge::with_opts(Opts::new(
            "clinic_invoices_unsettled",
            "Invoices with an outstanding balance",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(patients_registered_total.clone()))?;
        registry.register(Box::new(visits_completed_total.clone()))?;
        registry.register(Box::new(payments_received_total.clone()))?;
        registry.register(Box::new(queue_waiting.clone()))?;
        registry.register(Box::new(beds_occupied.clone()))?;
        registry.register(Box::new(beds_total.clone()))?;
        registry.register(Box::new(invoices_unsettled.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration,
            patients_registered_total,
            visits_completed_total,
            payments_received_total,
            queue_waiting,
            beds_occupied,
            beds_total,
            invoices_unsettled,
        })
    }

    /// 记录一次HTTP请求
    pub fn record_http_request(&self, duration_secs: f64) {
        self.http_requests_total.inc();
        self.http_request_duration.observe(duration_secs);
    }

    /// 记录患者登记
    pub fn record_patient_registered(&self) {
        self.patients_registered_total.inc();
    }

    /// 记录完成就诊
    pub fn record_visit_completed(&self) {
        self.visits_completed_total.inc();
    }

    /// 记录收款
    pub fn record_payment(&self, amount: i64) {
        if amount > 0 {
            self.payments_received_total.inc_by(amount as u64);
        }
    }

    /// 刷新队列/床位/账单快照指标
    pub fn update_snapshot(
        &self,
        queue_waiting: usize,
        beds_occupied: usize,
        beds_total: usize,
        invoices_unsettled: usize,
    ) {
        self.queue_waiting.set(queue_waiting as i64);
        self.beds_occupied.set(beds_occupied as i64);
        self.beds_total.set(beds_total as i64);
        self.invoices_unsettled.set(invoices_unsettled as i64);
    }

    /// 导出Prometheus文本格式
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics buffer is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_gauges() {
        let monitor = ClinicMonitor::new().unwrap();

        monitor.record_http_request(0.05);
        monitor.record_patient_registered();
        monitor.record_visit_completed();
        monitor.record_payment(80_000);
        monitor.update_snapshot(3, 2, 16, 5);

        let exported = monitor.export().unwrap();
        assert!(exported.contains("clinic_http_requests_total 1"));
        assert!(exported.contains("clinic_patients_registered_total 1"));
        assert!(exported.contains("clinic_payments_received_total 80000"));
        assert!(exported.contains("clinic_queue_waiting 3"));
        assert!(exported.contains("clinic_beds_total 16"));
    }

    #[test]
    fn test_negative_payment_ignored() {
        let monitor = ClinicMonitor::new().unwrap();
        monitor.record_payment(-5);
        let exported = monitor.export().unwrap();
        assert!(exported.contains("clinic_payments_received_total 0"));
    }
}
