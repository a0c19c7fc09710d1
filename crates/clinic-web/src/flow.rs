//! HTTP处理器：就诊流程
//!
//! 排队叫号、住院与出院、账单收款和员工任务。

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use clinic_core::{
    ClinicError, DoctorSpecialty, InvoiceStatus, PaymentMethod, QueuePriority, StaffRole,
};
use clinic_database::DatabaseQueries;
use clinic_integration::webhook::{WebhookEvent, WebhookEventType};
use clinic_workflow::tasks::{TaskFilter, TaskPriority, TaskStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::{require_role, AuthUser};
use crate::handlers::Result;
use crate::server::AppState;

// ========== 排队相关处理器 ==========

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub specialty: Option<DoctorSpecialty>,
    pub priority: Option<QueuePriority>,
}

#[derive(Debug, Deserialize)]
pub struct DoctorQueryParams {
    pub doctor_id: Uuid,
}

/// 患者挂号排队
pub async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CheckInRequest>,
) -> Result<impl IntoResponse> {
    require_role(
        &user,
        &[StaffRole::Admin, StaffRole::Receptionist, StaffRole::Nurse],
    )?;

    let entry = {
        let mut engine = state.engine.write().await;
        engine
            .check_in(
                request.patient_id,
                request.doctor_id,
                request.specialty,
                request.priority.unwrap_or(QueuePriority::Normal),
            )
            .await?
    };

    state
        .audit
        .record(
            &user.username,
            "queue.check_in",
            &entry.id.to_string(),
            Some(format!("ticket {}", entry.ticket_number)),
        )
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::QueueEntryCreated,
        json!({ "entry_id": entry.id, "ticket": entry.ticket_number, "doctor_id": entry.doctor_id }),
    ));

    Ok((StatusCode::CREATED, Json(entry)))
}

/// 医生的当日队列
pub async fn get_queue(
    State(state): State<AppState>,
    Query(params): Query<DoctorQueryParams>,
) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    let entries = engine.queue().entries_for_doctor(params.doctor_id);
    Ok(Json(json!({ "entries": entries, "total": entries.len() })))
}

/// 队列统计
pub async fn get_queue_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    Ok(Json(engine.queue().stats()))
}

/// 叫下一个号并通知患者
pub async fn call_next(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<DoctorQueryParams>,
) -> Result<impl IntoResponse> {
    let called = {
        let mut engine = state.engine.write().await;
        engine.call_next(params.doctor_id)?
    };

    let Some(entry) = called else {
        return Ok(Json(json!({ "called": null })));
    };

    state
        .audit
        .record(&user.username, "queue.call", &entry.id.to_string(), None)
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::QueueCalled,
        json!({ "entry_id": entry.id, "ticket": entry.ticket_number }),
    ));
    notify_called(&state, &entry.patient_id, entry.ticket_number, entry.doctor_id).await;

    Ok(Json(json!({ "called": entry })))
}

/// 叫指定的号
pub async fn call_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let entry = {
        let mut engine = state.engine.write().await;
        engine.call(id)?
    };

    state
        .audit
        .record(&user.username, "queue.call", &entry.id.to_string(), None)
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::QueueCalled,
        json!({ "entry_id": entry.id, "ticket": entry.ticket_number }),
    ));
    notify_called(&state, &entry.patient_id, entry.ticket_number, entry.doctor_id).await;

    Ok(Json(entry))
}

/// 候诊位置查询
pub async fn get_queue_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    let position = engine.queue().position(id)?;
    Ok(Json(json!({ "entry_id": id, "ahead": position })))
}

/// 开始就诊
pub async fn start_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let mut engine = state.engine.write().await;
    let entry = engine.start_visit(id)?;
    Ok(Json(entry))
}

/// 完成就诊并生成账单
pub async fn complete_visit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (entry, invoice) = {
        let mut engine = state.engine.write().await;
        engine.complete_visit(id).await?
    };

    state.monitor.record_visit_completed();
    state
        .audit
        .record(
            &user.username,
            "queue.complete",
            &entry.id.to_string(),
            Some(invoice.invoice_number.clone()),
        )
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::VisitCompleted,
        json!({ "entry_id": entry.id, "invoice": invoice.invoice_number }),
    ));
    state.emit_event(WebhookEvent::new(
        WebhookEventType::InvoiceCreated,
        json!({ "invoice": invoice.invoice_number, "total": invoice.total }),
    ));

    Ok(Json(json!({ "entry": entry, "invoice": invoice })))
}

/// 取消排队
pub async fn cancel_visit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let mut engine = state.engine.write().await;
    let entry = engine.cancel_visit(id)?;
    drop(engine);

    state
        .audit
        .record(&user.username, "queue.cancel", &id.to_string(), None)
        .await;
    Ok(Json(entry))
}

/// 标记过号未到
pub async fn mark_no_show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let mut engine = state.engine.write().await;
    let entry = engine.mark_no_show(id)?;
    Ok(Json(entry))
}

/// 过号重排
pub async fn requeue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let mut engine = state.engine.write().await;
    let entry = engine.requeue(id)?;
    Ok(Json(entry))
}

/// 叫号后尝试给绑定Telegram的患者推送通知
async fn notify_called(state: &AppState, patient_id: &Uuid, ticket_number: i32, doctor_id: Uuid) {
    let Some(notifier) = &state.notifier else {
        return;
    };

    let queries = DatabaseQueries::new(&state.db);
    let chat_id = match queries.get_patient_by_id(patient_id).await {
        Ok(Some(patient)) => patient.telegram_chat_id,
        Ok(None) => None,
        Err(e) => {
            error!("Failed to load patient {} for notification: {}", patient_id, e);
            None
        }
    };

    let Some(chat_id) = chat_id else {
        return;
    };

    let doctor_name = {
        let engine = state.engine.read().await;
        engine
            .roster()
            .get_doctor(doctor_id)
            .map(|doctor| doctor.name.clone())
            .unwrap_or_else(|| "your doctor".to_string())
    };

    let notifier = notifier.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier
            .notify_queue_called(chat_id, ticket_number, &doctor_name)
            .await
        {
            error!("Queue-called notification failed: {}", e);
        }
    });
}

// ========== 住院相关处理器 ==========

#[derive(Debug, Deserialize)]
pub struct RegisterBedRequest {
    pub ward: String,
    pub number: i32,
    pub daily_rate: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdmitRequest {
    pub patient_id: Uuid,
    pub bed_id: Uuid,
}

/// 床位列表
pub async fn get_beds(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    let beds: Vec<_> = engine.admissions().list_beds().into_iter().cloned().collect();
    let (occupied, total) = engine.admissions().occupancy();
    Ok(Json(json!({ "beds": beds, "occupied": occupied, "total": total })))
}

/// 登记床位（仅管理员）
pub async fn register_bed(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<RegisterBedRequest>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin])?;

    let mut engine = state.engine.write().await;
    let bed = engine
        .admissions_mut()
        .register_bed(&request.ward, request.number, request.daily_rate)?;
    Ok((StatusCode::CREATED, Json(bed)))
}

/// 办理入院
pub async fn admit_patient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AdmitRequest>,
) -> Result<impl IntoResponse> {
    require_role(
        &user,
        &[StaffRole::Admin, StaffRole::Doctor, StaffRole::Nurse],
    )?;

    let admission = {
        let mut engine = state.engine.write().await;
        engine.admit_patient(request.patient_id, request.bed_id)?
    };

    state
        .audit
        .record(&user.username, "admission.create", &admission.id.to_string(), None)
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::AdmissionCreated,
        json!({ "admission_id": admission.id, "patient_id": admission.patient_id }),
    ));

    info!("Admitted patient {} (admission {})", request.patient_id, admission.id);
    Ok((StatusCode::CREATED, Json(admission)))
}

/// 在院列表
pub async fn get_admissions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    let admissions: Vec<_> = engine
        .admissions()
        .active_admissions()
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(json!({ "admissions": admissions, "total": admissions.len() })))
}

/// 手动触发床位费核算
pub async fn accrue_bed_charges(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin, StaffRole::Cashier])?;

    let records = {
        let mut engine = state.engine.write().await;
        engine.accrue_bed_charges(chrono::Utc::now()).await?
    };

    state
        .audit
        .record(&user.username, "admission.accrue", "all", None)
        .await;
    Ok(Json(json!({ "accrued": records })))
}

/// 办理出院；欠费未结清则返回409
pub async fn discharge_patient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin, StaffRole::Doctor])?;

    let admission = {
        let mut engine = state.engine.write().await;
        engine.discharge_patient(id).await?
    };

    state
        .audit
        .record(&user.username, "admission.discharge", &id.to_string(), None)
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::PatientDischarged,
        json!({ "admission_id": admission.id, "patient_id": admission.patient_id }),
    ));

    Ok(Json(admission))
}

// ========== 账单相关处理器 ==========

#[derive(Debug, Deserialize)]
pub struct InvoiceQueryParams {
    pub patient_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: i64,
    pub method: PaymentMethod,
}

/// 账单查询
pub async fn get_invoices(
    State(state): State<AppState>,
    Query(params): Query<InvoiceQueryParams>,
) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    let billing = engine.billing();

    let invoices: Vec<_> = if let Some(patient_id) = params.patient_id {
        billing
            .invoices_for_patient(patient_id)
            .into_iter()
            .cloned()
            .collect()
    } else if let Some(status) = &params.status {
        let status = match status.as_str() {
            "unpaid" => InvoiceStatus::Unpaid,
            "partial" => InvoiceStatus::Partial,
            "paid" => InvoiceStatus::Paid,
            other => {
                return Err(
                    ClinicError::Validation(format!("Unknown invoice status: {}", other)).into(),
                )
            }
        };
        billing.list_by_status(&status).into_iter().cloned().collect()
    } else {
        billing.list_unsettled().into_iter().cloned().collect()
    };

    Ok(Json(json!({ "invoices": invoices, "total": invoices.len() })))
}

/// 获取单个账单及收款记录
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    let billing = engine.billing();

    let invoice = billing
        .get_invoice(id)
        .cloned()
        .ok_or_else(|| ClinicError::NotFound(format!("Invoice {} not found", id)))?;
    let payments: Vec<_> = billing.payments_for_invoice(id).into_iter().cloned().collect();

    Ok(Json(json!({ "invoice": invoice, "payments": payments })))
}

/// 收款
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse> {
    require_role(
        &user,
        &[StaffRole::Admin, StaffRole::Cashier, StaffRole::Receptionist],
    )?;

    let (payment, invoice) = {
        let mut engine = state.engine.write().await;
        let payment = engine.record_payment(id, request.amount, request.method)?;
        let invoice = engine
            .billing()
            .get_invoice(id)
            .cloned()
            .ok_or_else(|| ClinicError::Internal("Invoice vanished after payment".to_string()))?;
        (payment, invoice)
    };

    state.monitor.record_payment(payment.amount);
    state
        .audit
        .record(
            &user.username,
            "invoice.pay",
            &invoice.invoice_number,
            Some(payment.amount.to_string()),
        )
        .await;

    if invoice.status == InvoiceStatus::Paid {
        state.emit_event(WebhookEvent::new(
            WebhookEventType::InvoicePaid,
            json!({ "invoice": invoice.invoice_number, "total": invoice.total }),
        ));
    }

    Ok((StatusCode::CREATED, Json(json!({ "payment": payment, "invoice": invoice }))))
}

/// 账单统计
pub async fn get_billing_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    Ok(Json(engine.billing().stats()))
}

// ========== 任务相关处理器 ==========

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub subject: String,
    pub patient_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub priority: Option<TaskPriority>,
    pub due_at: Option<chrono::DateTime<chrono::Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct TaskQueryParams {
    pub assignee_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    pub assignee_id: Uuid,
}

/// 创建任务
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse> {
    let task = {
        let mut engine = state.engine.write().await;
        engine.tasks_mut().create_task(
            &request.subject,
            request.patient_id,
            request.assignee_id,
            request.priority.unwrap_or(TaskPriority::Normal),
            request.due_at,
            request.tags.unwrap_or_default(),
        )?
    };

    state
        .audit
        .record(&user.username, "task.create", &task.id.to_string(), None)
        .await;
    Ok((StatusCode::CREATED, Json(task)))
}

/// 任务查询
pub async fn get_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskQueryParams>,
) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    let tasks = engine.tasks().query_tasks(&TaskFilter {
        assignee_id: params.assignee_id,
        limit: params.limit.or(Some(50)),
        offset: params.offset,
        ..Default::default()
    });
    Ok(Json(json!({ "tasks": tasks, "total": tasks.len() })))
}

/// 更新任务状态
pub async fn update_task_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTaskStatusRequest>,
) -> Result<impl IntoResponse> {
    let mut engine = state.engine.write().await;
    engine.tasks_mut().update_task_status(id, request.status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// 分配任务
pub async fn assign_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignTaskRequest>,
) -> Result<impl IntoResponse> {
    let mut engine = state.engine.write().await;
    engine.tasks_mut().assign_task(id, request.assignee_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// 任务统计
pub async fn get_task_stats(
    State(state): State<AppState>,
    Query(params): Query<TaskQueryParams>,
) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    Ok(Json(engine.tasks().stats(params.assignee_id)))
}

// ========== 系统概览 ==========

/// 系统概览
pub async fn get_overview(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let engine = state.engine.read().await;
    let overview = engine.overview();

    state.monitor.update_snapshot(
        overview.waiting_patients,
        overview.occupied_beds,
        overview.total_beds,
        overview.unsettled_invoices,
    );

    Ok(Json(overview))
}
