//! Web服务器

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use clinic_admin::{AuditTrail, ClinicMonitor};
use clinic_core::{ClinicError, Result};
use clinic_database::DatabasePool;
use clinic_integration::webhook::{WebhookEvent, WebhookManager};
use clinic_integration::TelegramNotifier;
use clinic_workflow::ClinicEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::auth::{
    auth_middleware, get_all_users_handler, get_current_user, login_handler, AuthService,
};
use crate::flow;
use crate::handlers;
use crate::static_files;

/// 全局共享状态
#[derive(Clone)]
pub struct AppState {
    /// 工作流引擎（队列、住院、任务、账单的活动状态）
    pub engine: Arc<RwLock<ClinicEngine>>,
    /// 持久化档案
    pub db: Arc<DatabasePool>,
    pub auth: Arc<AuthService>,
    pub monitor: Arc<ClinicMonitor>,
    pub audit: Arc<AuditTrail>,
    pub events: Arc<WebhookManager>,
    /// 已配置Telegram时的通知发送器
    pub notifier: Option<TelegramNotifier>,
}

impl AppState {
    /// 异步广播Webhook事件，不阻塞请求处理
    pub fn emit_event(&self, event: WebhookEvent) {
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(e) = events.emit_event(event).await {
                error!("Failed to emit webhook event: {}", e);
            }
        });
    }
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        let app = Self::create_app(state);
        Self { addr, app }
    }

    fn create_app(state: AppState) -> Router {
        // 需要认证的路由
        let protected = Router::new()
            .route("/auth/me", get(get_current_user))
            .route("/auth/users", get(get_all_users_handler))
            .nest("/api/v1", api_routes())
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            ));

        Router::new()
            // 根路径与健康检查
            .route("/", get(handlers::api_root))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))

            // 认证路由（无需token）
            .route("/auth/login", post(login_handler))
            .merge(protected)

            // 静态管理界面
            .nest_service("/static", static_files::create_static_service())

            // 全局中间件
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CompressionLayer::new())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    ),
            )
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                track_metrics,
            ))
            .with_state(state)
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| ClinicError::Internal(format!("Web server failed: {}", e)))?;

        Ok(())
    }
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        // 患者与员工档案
        .route("/patients", get(handlers::get_patients).post(handlers::create_patient))
        .route("/patients/:id", get(handlers::get_patient).put(handlers::update_patient))
        .route("/staff", get(handlers::get_staff).post(handlers::create_staff))
        .route("/staff/:id/active", post(handlers::set_staff_active))

        // 检验
        .route("/lab/suppliers", get(handlers::get_lab_suppliers).post(handlers::create_lab_supplier))
        .route("/lab/reagents", get(handlers::get_lab_reagents).post(handlers::create_lab_reagent))
        .route("/lab/reagents/low-stock", get(handlers::get_low_stock_reagents))
        .route("/lab/reagents/:id/stock", post(handlers::adjust_reagent_stock))
        .route("/lab/tests", get(handlers::get_lab_tests).post(handlers::create_lab_test))
        .route("/lab/orders", get(handlers::get_lab_orders).post(handlers::create_lab_order))
        .route("/lab/orders/:id/complete", post(handlers::complete_lab_order))
        .route("/lab/orders/:id/cancel", post(handlers::cancel_lab_order))

        // 处方
        .route("/prescriptions", get(handlers::get_prescriptions).post(handlers::create_prescription))

        // 排队叫号
        .route("/queue", get(flow::get_queue).post(flow::check_in))
        .route("/queue/stats", get(flow::get_queue_stats))
        .route("/queue/next", post(flow::call_next))
        .route("/queue/:id/position", get(flow::get_queue_position))
        .route("/queue/:id/call", post(flow::call_entry))
        .route("/queue/:id/start", post(flow::start_visit))
        .route("/queue/:id/complete", post(flow::complete_visit))
        .route("/queue/:id/cancel", post(flow::cancel_visit))
        .route("/queue/:id/no-show", post(flow::mark_no_show))
        .route("/queue/:id/requeue", post(flow::requeue))

        // 住院
        .route("/beds", get(flow::get_beds).post(flow::register_bed))
        .route("/admissions", get(flow::get_admissions).post(flow::admit_patient))
        .route("/admissions/accrue", post(flow::accrue_bed_charges))
        .route("/admissions/:id/discharge", post(flow::discharge_patient))

        // 账单
        .route("/invoices", get(flow::get_invoices))
        .route("/invoices/stats", get(flow::get_billing_stats))
        .route("/invoices/:id", get(flow::get_invoice))
        .route("/invoices/:id/payments", post(flow::record_payment))

        // 员工任务
        .route("/tasks", get(flow::get_tasks).post(flow::create_task))
        .route("/tasks/stats", get(flow::get_task_stats))
        .route("/tasks/:id/status", post(flow::update_task_status))
        .route("/tasks/:id/assign", post(flow::assign_task))

        // Webhook订阅
        .route(
            "/webhooks",
            get(handlers::list_webhook_subscriptions).post(handlers::create_webhook_subscription),
        )
        .route(
            "/webhooks/:id",
            axum::routing::delete(handlers::delete_webhook_subscription),
        )

        // 系统概览
        .route("/overview", get(flow::get_overview))
}

/// HTTP请求指标中间件
async fn track_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = std::time::Instant::now();
    let response = next.run(request).await;
    state
        .monitor
        .record_http_request(start.elapsed().as_secs_f64());
    response
}
