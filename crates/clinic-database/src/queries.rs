//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use clinic_core::{
    ClinicError, LabOrder, LabOrderStatus, LabReagent, LabSupplier, LabTest, Patient,
    Prescription, Result, Sex, Staff,
};
use sqlx::Row;
use uuid::Uuid;

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建患者表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id UUID PRIMARY KEY,
                mrn VARCHAR(32) UNIQUE NOT NULL,
                first_name VARCHAR(128) NOT NULL,
                last_name VARCHAR(128) NOT NULL,
                sex CHAR(1),
                birth_date DATE,
                phone VARCHAR(32),
                address TEXT,
                telegram_chat_id BIGINT,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建员工表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS staff (
                id UUID PRIMARY KEY,
                username VARCHAR(64) UNIQUE NOT NULL,
                full_name VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL,
                specialty VARCHAR(20),
                phone VARCHAR(32),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建试剂供应商表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS lab_suppliers (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                phone VARCHAR(32),
                address TEXT,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建试剂表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS lab_reagents (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                supplier_id UUID REFERENCES lab_suppliers(id),
                unit VARCHAR(32) NOT NULL,
                stock_qty INTEGER NOT NULL DEFAULT 0,
                reorder_level INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建检验项目表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS lab_tests (
                id UUID PRIMARY KEY,
                code VARCHAR(32) UNIQUE NOT NULL,
                name VARCHAR(255) NOT NULL,
                price BIGINT NOT NULL,
                reagent_id UUID REFERENCES lab_reagents(id),
                reagent_per_test INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建检验单表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS lab_orders (
                id UUID PRIMARY KEY,
                patient_id UUID NOT NULL REFERENCES patients(id),
                test_id UUID NOT NULL REFERENCES lab_tests(id),
                ordered_by UUID NOT NULL REFERENCES staff(id),
                status VARCHAR(20) NOT NULL DEFAULT 'ORDERED',
                result_value TEXT,
                result_note TEXT,
                ordered_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                completed_at TIMESTAMP WITH TIME ZONE
            )
        "#).execute(pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建处方表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS prescriptions (
                id UUID PRIMARY KEY,
                patient_id UUID NOT NULL REFERENCES patients(id),
                doctor_id UUID NOT NULL REFERENCES staff(id),
                medication VARCHAR(255) NOT NULL,
                dosage VARCHAR(128) NOT NULL,
                frequency VARCHAR(64) NOT NULL,
                duration_days INTEGER NOT NULL,
                note TEXT,
                issued_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建索引以优化查询性能
        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_patients_mrn ON patients(mrn)",
            "CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name)",
            "CREATE INDEX IF NOT EXISTS idx_staff_username ON staff(username)",
            "CREATE INDEX IF NOT EXISTS idx_staff_role ON staff(role)",
            "CREATE INDEX IF NOT EXISTS idx_lab_reagents_supplier_id ON lab_reagents(supplier_id)",
            "CREATE INDEX IF NOT EXISTS idx_lab_tests_code ON lab_tests(code)",
            "CREATE INDEX IF NOT EXISTS idx_lab_orders_patient_id ON lab_orders(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_lab_orders_status ON lab_orders(status)",
            "CREATE INDEX IF NOT EXISTS idx_prescriptions_patient_id ON prescriptions(patient_id)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    // ========== 患者相关操作 ==========

    /// 登记新患者
    pub async fn create_patient(&self, patient: &NewPatient) -> Result<Uuid> {
        let pool = self.pool.pool();

        let sex_str = patient.sex.as_ref().map(|s| match s {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Other => "O",
        });

        sqlx::query(r#"
            INSERT INTO patients (id, mrn, first_name, last_name, sex, birth_date, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
        "#)
        .bind(patient.id)
        .bind(&patient.mrn)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(sex_str)
        .bind(patient.birth_date)
        .bind(&patient.phone)
        .bind(&patient.address)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// 根据ID查找患者
    pub async fn get_patient_by_id(&self, id: &Uuid) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 根据病历号查找患者
    pub async fn get_patient_by_mrn(&self, mrn: &str) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE mrn = $1")
            .bind(mrn)
            .fetch_optional(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 根据姓名搜索患者
    pub async fn search_patients_by_name(&self, name: &str, limit: i64) -> Result<Vec<Patient>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE first_name ILIKE $1 OR last_name ILIKE $1 ORDER BY updated_at DESC LIMIT $2"
        )
        .bind(format!("%{}%", name))
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Patient::from).collect())
    }

    /// 患者列表（按更新时间倒序分页）
    pub async fn list_patients(&self, limit: i64, offset: i64) -> Result<Vec<Patient>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients ORDER BY updated_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Patient::from).collect())
    }

    /// 更新患者联系信息
    pub async fn update_patient_contact(
        &self,
        id: &Uuid,
        phone: Option<String>,
        address: Option<String>,
    ) -> Result<()> {
        let pool = self.pool.pool();

        let result = sqlx::query(
            "UPDATE patients SET phone = $1, address = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(phone)
        .bind(address)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound(format!("Patient {} not found", id)));
        }

        Ok(())
    }

    /// 绑定患者的Telegram会话
    pub async fn link_telegram_chat(&self, mrn: &str, chat_id: i64) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>(
            "UPDATE patients SET telegram_chat_id = $1, updated_at = NOW() WHERE mrn = $2 RETURNING *",
        )
        .bind(chat_id)
        .bind(mrn)
        .fetch_optional(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 根据Telegram会话查找患者
    pub async fn get_patient_by_telegram_chat(&self, chat_id: i64) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE telegram_chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 获取所有已绑定Telegram的患者
    pub async fn patients_with_telegram(&self) -> Result<Vec<Patient>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE telegram_chat_id IS NOT NULL",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Patient::from).collect())
    }

    // ========== 员工相关操作 ==========

    /// 创建新员工
    pub async fn create_staff(&self, staff: &NewStaff) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO staff (id, username, full_name, role, specialty, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        "#)
        .bind(staff.id)
        .bind(&staff.username)
        .bind(&staff.full_name)
        .bind(staff.role.as_str())
        .bind(staff.specialty.as_ref().map(specialty_str))
        .bind(&staff.phone)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// 根据ID查找员工
    pub async fn get_staff_by_id(&self, id: &Uuid) -> Result<Option<Staff>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbStaff>("SELECT * FROM staff WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Staff::from))
    }

    /// 员工列表
    pub async fn list_staff(&self, only_active: bool) -> Result<Vec<Staff>> {
        let pool = self.pool.pool();

        let sql = if only_active {
            "SELECT * FROM staff WHERE is_active ORDER BY full_name"
        } else {
            "SELECT * FROM staff ORDER BY full_name"
        };

        let results = sqlx::query_as::<_, DbStaff>(sql)
            .fetch_all(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Staff::from).collect())
    }

    /// 按角色查询员工
    pub async fn list_staff_by_role(&self, role: &str) -> Result<Vec<Staff>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbStaff>(
            "SELECT * FROM staff WHERE role = $1 AND is_active ORDER BY full_name",
        )
        .bind(role)
        .fetch_all(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Staff::from).collect())
    }

    /// 启用/停用员工账号
    pub async fn set_staff_active(&self, id: &Uuid, is_active: bool) -> Result<()> {
        let pool = self.pool.pool();

        let result =
            sqlx::query("UPDATE staff SET is_active = $1, updated_at = NOW() WHERE id = $2")
                .bind(is_active)
                .bind(id)
                .execute(pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound(format!("Staff {} not found", id)));
        }

        Ok(())
    }

    // ========== 检验供应商相关操作 ==========

    /// 创建试剂供应商
    pub async fn create_lab_supplier(&self, supplier: &NewLabSupplier) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO lab_suppliers (id, name, phone, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        "#)
        .bind(supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// 供应商列表
    pub async fn list_lab_suppliers(&self) -> Result<Vec<LabSupplier>> {
        let pool = self.pool.pool();

        let results =
            sqlx::query_as::<_, DbLabSupplier>("SELECT * FROM lab_suppliers ORDER BY name")
                .fetch_all(pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(LabSupplier::from).collect())
    }

    // ========== 检验试剂相关操作 ==========

    /// 创建试剂
    pub async fn create_lab_reagent(&self, reagent: &NewLabReagent) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO lab_reagents (id, name, supplier_id, unit, stock_qty, reorder_level)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        "#)
        .bind(reagent.id)
        .bind(&reagent.name)
        .bind(reagent.supplier_id)
        .bind(&reagent.unit)
        .bind(reagent.stock_qty)
        .bind(reagent.reorder_level)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// 试剂列表
    pub async fn list_lab_reagents(&self) -> Result<Vec<LabReagent>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbLabReagent>("SELECT * FROM lab_reagents ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(LabReagent::from).collect())
    }

    /// 调整试剂库存；扣减不允许使库存为负
    pub async fn adjust_reagent_stock(&self, id: &Uuid, delta: i32) -> Result<LabReagent> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbLabReagent>(r#"
            UPDATE lab_reagents
            SET stock_qty = stock_qty + $1, updated_at = NOW()
            WHERE id = $2 AND stock_qty + $1 >= 0
            RETURNING *
        "#)
        .bind(delta)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        match result {
            Some(reagent) => Ok(LabReagent::from(reagent)),
            None => Err(ClinicError::Validation(format!(
                "Reagent {} not found or insufficient stock for delta {}",
                id, delta
            ))),
        }
    }

    /// 低库存试剂列表（库存不高于补货线）
    pub async fn low_stock_reagents(&self) -> Result<Vec<LabReagent>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbLabReagent>(
            "SELECT * FROM lab_reagents WHERE stock_qty <= reorder_level ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(LabReagent::from).collect())
    }

    // ========== 检验项目相关操作 ==========

    /// 创建检验项目
    pub async fn create_lab_test(&self, test: &NewLabTest) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO lab_tests (id, code, name, price, reagent_id, reagent_per_test)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        "#)
        .bind(test.id)
        .bind(&test.code)
        .bind(&test.name)
        .bind(test.price)
        .bind(test.reagent_id)
        .bind(test.reagent_per_test)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// 检验项目列表
    pub async fn list_lab_tests(&self) -> Result<Vec<LabTest>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbLabTest>("SELECT * FROM lab_tests ORDER BY code")
            .fetch_all(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(LabTest::from).collect())
    }

    /// 根据ID查找检验项目
    pub async fn get_lab_test_by_id(&self, id: &Uuid) -> Result<Option<LabTest>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbLabTest>("SELECT * FROM lab_tests WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(LabTest::from))
    }

    // ========== 检验单相关操作 ==========

    /// 开检验单
    pub async fn create_lab_order(&self, order: &NewLabOrder) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO lab_orders (id, patient_id, test_id, ordered_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        "#)
        .bind(order.id)
        .bind(order.patient_id)
        .bind(order.test_id)
        .bind(order.ordered_by)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// 根据ID查找检验单
    pub async fn get_lab_order_by_id(&self, id: &Uuid) -> Result<Option<LabOrder>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbLabOrder>("SELECT * FROM lab_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(LabOrder::from))
    }

    /// 患者的检验单列表
    pub async fn get_lab_orders_by_patient_id(&self, patient_id: &Uuid) -> Result<Vec<LabOrder>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbLabOrder>(
            "SELECT * FROM lab_orders WHERE patient_id = $1 ORDER BY ordered_at DESC",
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(LabOrder::from).collect())
    }

    /// 更新检验单状态
    pub async fn update_lab_order_status(&self, id: &Uuid, status: &LabOrderStatus) -> Result<()> {
        let pool = self.pool.pool();

        let status_str = lab_order_status_str(status);

        let result = sqlx::query("UPDATE lab_orders SET status = $1 WHERE id = $2")
            .bind(status_str)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound(format!("Lab order {} not found", id)));
        }

        Ok(())
    }

    /// 录入检验结果并标记完成
    pub async fn complete_lab_order(
        &self,
        id: &Uuid,
        result_value: &str,
        result_note: Option<String>,
    ) -> Result<LabOrder> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbLabOrder>(r#"
            UPDATE lab_orders
            SET status = 'COMPLETED', result_value = $1, result_note = $2, completed_at = NOW()
            WHERE id = $3 AND status IN ('ORDERED', 'IN_PROGRESS')
            RETURNING *
        "#)
        .bind(result_value)
        .bind(result_note)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        match result {
            Some(order) => Ok(LabOrder::from(order)),
            None => Err(ClinicError::Validation(format!(
                "Lab order {} not found or already finalized",
                id
            ))),
        }
    }

    // ========== 处方相关操作 ==========

    /// 开处方
    pub async fn create_prescription(&self, prescription: &NewPrescription) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO prescriptions (id, patient_id, doctor_id, medication, dosage, frequency, duration_days, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
        "#)
        .bind(prescription.id)
        .bind(prescription.patient_id)
        .bind(prescription.doctor_id)
        .bind(&prescription.medication)
        .bind(&prescription.dosage)
        .bind(&prescription.frequency)
        .bind(prescription.duration_days)
        .bind(&prescription.note)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// 患者的处方列表
    pub async fn get_prescriptions_by_patient_id(
        &self,
        patient_id: &Uuid,
    ) -> Result<Vec<Prescription>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbPrescription>(
            "SELECT * FROM prescriptions WHERE patient_id = $1 ORDER BY issued_at DESC",
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Prescription::from).collect())
    }
}

fn lab_order_status_str(status: &LabOrderStatus) -> &'static str {
    match status {
        LabOrderStatus::Ordered => "ORDERED",
        LabOrderStatus::InProgress => "IN_PROGRESS",
        LabOrderStatus::Completed => "COMPLETED",
        LabOrderStatus::Canceled => "CANCELED",
    }
}
