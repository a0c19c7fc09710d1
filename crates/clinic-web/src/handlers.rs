//! HTTP处理器：档案类资源
//!
//! 患者、员工、检验目录/检验单与处方的CRUD，以及健康检查和指标导出。

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::NaiveDate;
use clinic_core::utils::{generate_mrn, is_valid_phone};
use clinic_core::{ClinicError, DoctorSpecialty, LabOrderStatus, Sex, StaffRole};
use clinic_database::{
    DatabaseQueries, NewLabOrder, NewLabReagent, NewLabSupplier, NewLabTest, NewPatient,
    NewPrescription, NewStaff,
};
use clinic_integration::webhook::{WebhookEvent, WebhookEventType, WebhookSubscriptionRequest};
use clinic_workflow::routing::DoctorProfile;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::{require_role, AuthUser};
use crate::server::AppState;

const MAX_PAGE_SIZE: i64 = 200;

/// HTTP层错误包装，负责把核心错误映射为响应状态码
#[derive(Debug)]
pub struct ApiError(pub ClinicError);

impl From<ClinicError> for ApiError {
    fn from(e: ClinicError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::Validation(_) | ClinicError::Billing(_) => StatusCode::BAD_REQUEST,
            ClinicError::Permission(_) => StatusCode::FORBIDDEN,
            ClinicError::Workflow(_)
            | ClinicError::RoutingError(_)
            | ClinicError::InvalidStateTransition { .. }
            | ClinicError::UnsettledBalance { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": true,
            "message": self.0.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// HTTP处理器统一结果类型
pub type Result<T> = std::result::Result<T, ApiError>;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Clinic Management API",
        "version": "1.0.0",
        "status": "running",
        "endpoints": {
            "health": "/health",
            "metrics": "/metrics",
            "api": "/api/v1"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": "1.0.0"
    }))
}

/// Prometheus指标导出
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    // 导出前刷新快照指标
    {
        let engine = state.engine.read().await;
        let overview = engine.overview();
        state.monitor.update_snapshot(
            overview.waiting_patients,
            overview.occupied_beds,
            overview.total_beds,
            overview.unsettled_invoices,
        );
    }

    let body = state
        .monitor
        .export()
        .map_err(|e| ClinicError::Internal(e.to_string()))?;
    Ok(body)
}

// ========== 患者相关处理器 ==========

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatientQueryParams {
    pub search: Option<String>,
    pub mrn: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// 登记新患者
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<impl IntoResponse> {
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(ClinicError::Validation("Patient name is required".to_string()).into());
    }
    if let Some(phone) = &request.phone {
        if !is_valid_phone(phone) {
            return Err(ClinicError::Validation(format!("Invalid phone: {}", phone)).into());
        }
    }

    let new_patient = NewPatient {
        id: Uuid::new_v4(),
        mrn: generate_mrn(),
        first_name: request.first_name,
        last_name: request.last_name,
        sex: request.sex,
        birth_date: request.birth_date,
        phone: request.phone,
        address: request.address,
    };

    let queries = DatabaseQueries::new(&state.db);
    let id = queries.create_patient(&new_patient).await?;
    let patient = queries
        .get_patient_by_id(&id)
        .await?
        .ok_or_else(|| ClinicError::Internal("Patient vanished after insert".to_string()))?;

    state.monitor.record_patient_registered();
    state
        .audit
        .record(&user.username, "patient.create", &patient.mrn, None)
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::PatientRegistered,
        json!({ "id": patient.id, "mrn": patient.mrn }),
    ));

    info!("Registered patient {} ({})", patient.full_name(), patient.mrn);
    Ok((StatusCode::CREATED, Json(patient)))
}

/// 患者查询
pub async fn get_patients(
    State(state): State<AppState>,
    Query(params): Query<PatientQueryParams>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let limit = params.limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);

    let patients = if let Some(mrn) = &params.mrn {
        queries.get_patient_by_mrn(mrn).await?.into_iter().collect()
    } else if let Some(search) = &params.search {
        queries.search_patients_by_name(search, limit).await?
    } else {
        queries
            .list_patients(limit, params.offset.unwrap_or(0).max(0))
            .await?
    };

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len(),
    })))
}

/// 获取单个患者
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let patient = queries
        .get_patient_by_id(&id)
        .await?
        .ok_or_else(|| ClinicError::NotFound(format!("Patient {} not found", id)))?;
    Ok(Json(patient))
}

/// 更新患者联系信息
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateContactRequest>,
) -> Result<impl IntoResponse> {
    if let Some(phone) = &request.phone {
        if !is_valid_phone(phone) {
            return Err(ClinicError::Validation(format!("Invalid phone: {}", phone)).into());
        }
    }

    let queries = DatabaseQueries::new(&state.db);
    queries
        .update_patient_contact(&id, request.phone, request.address)
        .await?;

    state
        .audit
        .record(&user.username, "patient.update", &id.to_string(), None)
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::PatientUpdated,
        json!({ "id": id }),
    ));

    Ok(StatusCode::NO_CONTENT)
}

// ========== 员工相关处理器 ==========

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub username: String,
    pub full_name: String,
    pub role: StaffRole,
    pub specialty: Option<DoctorSpecialty>,
    pub phone: Option<String>,
    /// 医生同时接诊的候诊上限
    pub max_workload: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StaffQueryParams {
    pub role: Option<String>,
    pub only_active: Option<bool>,
}

/// 创建员工（仅管理员）
///
/// 医生会同时进入分诊排班表。
pub async fn create_staff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateStaffRequest>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin])?;

    if request.role == StaffRole::Doctor && request.specialty.is_none() {
        return Err(ClinicError::Validation(
            "Doctors must have a specialty".to_string(),
        )
        .into());
    }

    let new_staff = NewStaff {
        id: Uuid::new_v4(),
        username: request.username.clone(),
        full_name: request.full_name.clone(),
        role: request.role.clone(),
        specialty: request.specialty.clone(),
        phone: request.phone,
    };

    let queries = DatabaseQueries::new(&state.db);
    let id = queries.create_staff(&new_staff).await?;

    if let (StaffRole::Doctor, Some(specialty)) = (&request.role, request.specialty) {
        let mut engine = state.engine.write().await;
        engine.roster_mut().add_doctor(DoctorProfile {
            id,
            name: request.full_name.clone(),
            specialty,
            max_workload: request.max_workload.unwrap_or(10),
            is_available: true,
        });
    }

    state
        .audit
        .record(&user.username, "staff.create", &request.username, None)
        .await;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// 员工列表
pub async fn get_staff(
    State(state): State<AppState>,
    Query(params): Query<StaffQueryParams>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);

    let staff = match &params.role {
        Some(role) => queries.list_staff_by_role(role).await?,
        None => queries.list_staff(params.only_active.unwrap_or(true)).await?,
    };

    Ok(Json(json!({ "staff": staff, "total": staff.len() })))
}

/// 启用/停用员工
pub async fn set_staff_active(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin])?;

    let is_active = request
        .get("is_active")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| ClinicError::Validation("is_active is required".to_string()))?;

    let queries = DatabaseQueries::new(&state.db);
    queries.set_staff_active(&id, is_active).await?;

    // 医生停诊后不再接受分诊
    {
        let mut engine = state.engine.write().await;
        engine.roster_mut().set_availability(id, is_active);
    }

    state
        .audit
        .record(&user.username, "staff.set_active", &id.to_string(), None)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// ========== 检验相关处理器 ==========

#[derive(Debug, Deserialize)]
pub struct CreateSupplierRequest {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReagentRequest {
    pub name: String,
    pub supplier_id: Option<Uuid>,
    pub unit: String,
    pub stock_qty: i32,
    pub reorder_level: i32,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateLabTestRequest {
    pub code: String,
    pub name: String,
    pub price: i64,
    pub reagent_id: Option<Uuid>,
    pub reagent_per_test: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLabOrderRequest {
    pub patient_id: Uuid,
    pub test_id: Uuid,
    pub ordered_by: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CompleteLabOrderRequest {
    pub result_value: String,
    pub result_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LabOrderQueryParams {
    pub patient_id: Uuid,
}

/// 创建试剂供应商
pub async fn create_lab_supplier(
    State(state): State<AppState>,
    Json(request): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let id = queries
        .create_lab_supplier(&NewLabSupplier {
            id: Uuid::new_v4(),
            name: request.name,
            phone: request.phone,
            address: request.address,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// 供应商列表
pub async fn get_lab_suppliers(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let suppliers = queries.list_lab_suppliers().await?;
    Ok(Json(json!({ "suppliers": suppliers })))
}

/// 创建试剂
pub async fn create_lab_reagent(
    State(state): State<AppState>,
    Json(request): Json<CreateReagentRequest>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let id = queries
        .create_lab_reagent(&NewLabReagent {
            id: Uuid::new_v4(),
            name: request.name,
            supplier_id: request.supplier_id,
            unit: request.unit,
            stock_qty: request.stock_qty,
            reorder_level: request.reorder_level,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// 试剂列表
pub async fn get_lab_reagents(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let reagents = queries.list_lab_reagents().await?;
    Ok(Json(json!({ "reagents": reagents })))
}

/// 调整试剂库存
pub async fn adjust_reagent_stock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin, StaffRole::LabTech])?;

    let queries = DatabaseQueries::new(&state.db);
    let reagent = queries.adjust_reagent_stock(&id, request.delta).await?;

    state
        .audit
        .record(
            &user.username,
            "reagent.adjust_stock",
            &id.to_string(),
            Some(request.delta.to_string()),
        )
        .await;
    Ok(Json(reagent))
}

/// 低库存试剂
pub async fn get_low_stock_reagents(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let reagents = queries.low_stock_reagents().await?;
    Ok(Json(json!({ "reagents": reagents })))
}

/// 创建检验项目
pub async fn create_lab_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateLabTestRequest>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin, StaffRole::LabTech])?;

    if request.price < 0 {
        return Err(ClinicError::Validation("Price cannot be negative".to_string()).into());
    }

    let queries = DatabaseQueries::new(&state.db);
    let id = queries
        .create_lab_test(&NewLabTest {
            id: Uuid::new_v4(),
            code: request.code,
            name: request.name,
            price: request.price,
            reagent_id: request.reagent_id,
            reagent_per_test: request.reagent_per_test.unwrap_or(1),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// 检验项目列表
pub async fn get_lab_tests(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let tests = queries.list_lab_tests().await?;
    Ok(Json(json!({ "tests": tests })))
}

/// 开检验单并扣减试剂库存
pub async fn create_lab_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateLabOrderRequest>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);

    let test = queries
        .get_lab_test_by_id(&request.test_id)
        .await?
        .ok_or_else(|| ClinicError::NotFound(format!("Lab test {} not found", request.test_id)))?;

    // 先扣库存，不足则拒绝开单
    if let Some(reagent_id) = test.reagent_id {
        queries
            .adjust_reagent_stock(&reagent_id, -test.reagent_per_test)
            .await?;
    }

    let id = queries
        .create_lab_order(&NewLabOrder {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            test_id: request.test_id,
            ordered_by: request.ordered_by,
        })
        .await?;

    state
        .audit
        .record(&user.username, "lab_order.create", &id.to_string(), None)
        .await;
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "test": test.code }))))
}

/// 录入检验结果，完成检验单并计费
pub async fn complete_lab_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteLabOrderRequest>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin, StaffRole::LabTech])?;

    let queries = DatabaseQueries::new(&state.db);
    let order = queries
        .complete_lab_order(&id, &request.result_value, request.result_note)
        .await?;

    let test = queries
        .get_lab_test_by_id(&order.test_id)
        .await?
        .ok_or_else(|| ClinicError::NotFound(format!("Lab test {} not found", order.test_id)))?;

    let invoice = {
        let mut engine = state.engine.write().await;
        engine.add_lab_charge(order.patient_id, &test, order.id)?
    };

    state
        .audit
        .record(&user.username, "lab_order.complete", &id.to_string(), None)
        .await;
    state.emit_event(WebhookEvent::new(
        WebhookEventType::LabOrderCompleted,
        json!({ "order_id": order.id, "test": test.code, "invoice": invoice.invoice_number }),
    ));

    Ok(Json(json!({ "order": order, "invoice": invoice })))
}

/// 患者的检验单
pub async fn get_lab_orders(
    State(state): State<AppState>,
    Query(params): Query<LabOrderQueryParams>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let orders = queries
        .get_lab_orders_by_patient_id(&params.patient_id)
        .await?;
    Ok(Json(json!({ "orders": orders, "total": orders.len() })))
}

/// 取消检验单
pub async fn cancel_lab_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    queries
        .update_lab_order_status(&id, &LabOrderStatus::Canceled)
        .await?;

    state
        .audit
        .record(&user.username, "lab_order.cancel", &id.to_string(), None)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// ========== 处方相关处理器 ==========

#[derive(Debug, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionQueryParams {
    pub patient_id: Uuid,
}

/// 开处方（医生）
pub async fn create_prescription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin, StaffRole::Doctor])?;

    if request.duration_days <= 0 {
        return Err(ClinicError::Validation(
            "duration_days must be positive".to_string(),
        )
        .into());
    }

    let queries = DatabaseQueries::new(&state.db);
    let id = queries
        .create_prescription(&NewPrescription {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            medication: request.medication,
            dosage: request.dosage,
            frequency: request.frequency,
            duration_days: request.duration_days,
            note: request.note,
        })
        .await?;

    state
        .audit
        .record(&user.username, "prescription.create", &id.to_string(), None)
        .await;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// 患者的处方列表
pub async fn get_prescriptions(
    State(state): State<AppState>,
    Query(params): Query<PrescriptionQueryParams>,
) -> Result<impl IntoResponse> {
    let queries = DatabaseQueries::new(&state.db);
    let prescriptions = queries
        .get_prescriptions_by_patient_id(&params.patient_id)
        .await?;
    Ok(Json(json!({
        "prescriptions": prescriptions,
        "total": prescriptions.len()
    })))
}

// ========== Webhook订阅管理 ==========

/// 订阅Webhook事件（仅管理员）
pub async fn create_webhook_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<WebhookSubscriptionRequest>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin])?;

    let id = state
        .events
        .subscribe(request)
        .await
        .map_err(|e| ClinicError::Validation(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// 订阅列表（仅管理员）
pub async fn list_webhook_subscriptions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin])?;

    let subscriptions = state.events.list_subscriptions().await;
    Ok(Json(json!({ "subscriptions": subscriptions })))
}

/// 取消订阅（仅管理员）
pub async fn delete_webhook_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    require_role(&user, &[StaffRole::Admin])?;

    state
        .events
        .unsubscribe(&id)
        .await
        .map_err(|e| ClinicError::NotFound(e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
