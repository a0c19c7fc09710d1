//! 账单台账
//!
//! 每位患者同一时间只有一张未结清的"开放"账单，收费都汇入其中，
//! 结清后再次收费会开新账单。

use chrono::Utc;
use clinic_core::utils::generate_invoice_number;
use clinic_core::{
    ClinicError, Invoice, InvoiceItem, InvoiceStatus, Payment, PaymentMethod, Result,
};
use std::collections::HashMap;
use uuid::Uuid;

/// 账单统计
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BillingStats {
    pub total_invoices: usize,
    pub unpaid_invoices: usize,
    pub partial_invoices: usize,
    pub paid_invoices: usize,
    pub revenue_collected: i64,
    pub outstanding_total: i64,
}

/// 账单台账
#[derive(Debug, Default)]
pub struct InvoiceLedger {
    invoices: HashMap<Uuid, Invoice>,
    patient_invoices: HashMap<Uuid, Vec<Uuid>>, // patient_id -> invoice_ids
    payments: HashMap<Uuid, Vec<Payment>>,      // invoice_id -> payments
}

impl InvoiceLedger {
    /// 创建空台账
    pub fn new() -> Self {
        Self {
            invoices: HashMap::new(),
            patient_invoices: HashMap::new(),
            payments: HashMap::new(),
        }
    }

    /// 患者当前的开放账单
    pub fn open_invoice(&self, patient_id: Uuid) -> Option<&Invoice> {
        self.patient_invoices
            .get(&patient_id)?
            .iter()
            .filter_map(|id| self.invoices.get(id))
            .find(|invoice| invoice.status != InvoiceStatus::Paid)
    }

    /// 已包含指定来源明细的账单（含已结清的）
    fn invoice_with_source(&self, patient_id: Uuid, source: Option<Uuid>) -> Option<Uuid> {
        source?;
        self.patient_invoices.get(&patient_id)?.iter().find_map(|id| {
            let invoice = self.invoices.get(id)?;
            invoice
                .items
                .iter()
                .any(|item| item.source == source)
                .then_some(*id)
        })
    }

    /// 向患者的开放账单记一笔费用，没有开放账单则新开一张。
    ///
    /// `source` 相同的费用覆盖原明细行而不是追加；重复核算落在
    /// 原账单上，即使它已经结清（金额变化会重新打开欠费）。
    pub fn add_charge(
        &mut self,
        patient_id: Uuid,
        code: &str,
        description: &str,
        quantity: i32,
        unit_price: i64,
        source: Option<Uuid>,
    ) -> Result<Invoice> {
        if quantity <= 0 {
            return Err(ClinicError::Billing(format!(
                "Charge quantity must be positive, got {}",
                quantity
            )));
        }

        let invoice_id = match self.invoice_with_source(patient_id, source) {
            Some(id) => id,
            None => match self.open_invoice(patient_id) {
                Some(invoice) => invoice.id,
                None => self.create_invoice(patient_id),
            },
        };

        let invoice = self
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| ClinicError::Internal("Open invoice disappeared".to_string()))?;

        let amount = unit_price * quantity as i64;
        let item = InvoiceItem {
            id: Uuid::new_v4(),
            code: code.to_string(),
            description: description.to_string(),
            quantity,
            unit_price,
            amount,
            source,
        };

        // 同一来源的费用覆盖旧明细
        let existing = source
            .and_then(|_| invoice.items.iter().position(|i| i.source == source));
        match existing {
            Some(pos) => invoice.items[pos] = item,
            None => invoice.items.push(item),
        }

        invoice.total = invoice.items.iter().map(|i| i.amount).sum();
        invoice.status = compute_status(invoice.paid_amount, invoice.total);
        invoice.updated_at = Utc::now();

        tracing::info!(
            "Charged {} x{} ({}) to invoice {} for patient {}",
            code,
            quantity,
            amount,
            invoice.invoice_number,
            patient_id
        );

        Ok(invoice.clone())
    }

    /// 新开账单
    fn create_invoice(&mut self, patient_id: Uuid) -> Uuid {
        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number: generate_invoice_number(),
            patient_id,
            items: Vec::new(),
            total: 0,
            paid_amount: 0,
            status: InvoiceStatus::Unpaid,
            issued_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let invoice_id = invoice.id;
        tracing::info!(
            "Opened invoice {} for patient {}",
            invoice.invoice_number,
            patient_id
        );

        self.invoices.insert(invoice_id, invoice);
        self.patient_invoices
            .entry(patient_id)
            .or_default()
            .push(invoice_id);

        invoice_id
    }

    /// 收款
    pub fn record_payment(
        &mut self,
        invoice_id: Uuid,
        amount: i64,
        method: PaymentMethod,
    ) -> Result<Payment> {
        let invoice = self
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        if amount <= 0 {
            return Err(ClinicError::Billing(format!(
                "Payment amount must be positive, got {}",
                amount
            )));
        }

        let balance = invoice.balance();
        if amount > balance {
            return Err(ClinicError::Billing(format!(
                "Payment {} exceeds outstanding balance {}",
                amount, balance
            )));
        }

        invoice.paid_amount += amount;
        invoice.status = compute_status(invoice.paid_amount, invoice.total);
        invoice.updated_at = Utc::now();

        let payment = Payment {
            id: Uuid::new_v4(),
            invoice_id,
            amount,
            method,
            received_at: Utc::now(),
        };

        tracing::info!(
            "Recorded payment {} on invoice {} (status now {:?})",
            amount,
            invoice.invoice_number,
            invoice.status
        );

        self.payments
            .entry(invoice_id)
            .or_default()
            .push(payment.clone());

        Ok(payment)
    }

    /// 获取账单
    pub fn get_invoice(&self, invoice_id: Uuid) -> Option<&Invoice> {
        self.invoices.get(&invoice_id)
    }

    /// 按账单编号查找
    pub fn get_invoice_by_number(&self, invoice_number: &str) -> Option<&Invoice> {
        self.invoices
            .values()
            .find(|invoice| invoice.invoice_number == invoice_number)
    }

    /// 患者的全部账单（按开具时间倒序）
    pub fn invoices_for_patient(&self, patient_id: Uuid) -> Vec<&Invoice> {
        let mut invoices: Vec<&Invoice> = self
            .patient_invoices
            .get(&patient_id)
            .map(|ids| ids.iter().filter_map(|id| self.invoices.get(id)).collect())
            .unwrap_or_default();

        invoices.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        invoices
    }

    /// 账单的收款记录
    pub fn payments_for_invoice(&self, invoice_id: Uuid) -> Vec<&Payment> {
        self.payments
            .get(&invoice_id)
            .map(|payments| payments.iter().collect())
            .unwrap_or_default()
    }

    /// 患者的未结余额
    pub fn outstanding_balance(&self, patient_id: Uuid) -> i64 {
        self.invoices_for_patient(patient_id)
            .iter()
            .map(|invoice| invoice.balance())
            .sum()
    }

    /// 所有未结清账单
    pub fn list_unsettled(&self) -> Vec<&Invoice> {
        self.invoices
            .values()
            .filter(|invoice| invoice.status != InvoiceStatus::Paid && invoice.total > 0)
            .collect()
    }

    /// 按状态筛选账单
    pub fn list_by_status(&self, status: &InvoiceStatus) -> Vec<&Invoice> {
        self.invoices
            .values()
            .filter(|invoice| invoice.status == *status)
            .collect()
    }

    /// 台账统计
    pub fn stats(&self) -> BillingStats {
        let mut stats = BillingStats {
            total_invoices: self.invoices.len(),
            unpaid_invoices: 0,
            partial_invoices: 0,
            paid_invoices: 0,
            revenue_collected: 0,
            outstanding_total: 0,
        };

        for invoice in self.invoices.values() {
            match invoice.status {
                InvoiceStatus::Unpaid => stats.unpaid_invoices += 1,
                InvoiceStatus::Partial => stats.partial_invoices += 1,
                InvoiceStatus::Paid => stats.paid_invoices += 1,
            }
            stats.revenue_collected += invoice.paid_amount;
            stats.outstanding_total += invoice.balance();
        }

        stats
    }
}

/// 账单状态由已收/应收金额唯一决定
fn compute_status(paid_amount: i64, total: i64) -> InvoiceStatus {
    if paid_amount == 0 {
        InvoiceStatus::Unpaid
    } else if paid_amount < total {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn test_charge_opens_invoice() {
        let mut ledger = InvoiceLedger::new();
        let patient_id = patient();

        let invoice = ledger
            .add_charge(patient_id, "CONS-GENERAL", "General consultation", 1, 80_000, None)
            .unwrap();

        assert_eq!(invoice.total, 80_000);
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(ledger.invoices_for_patient(patient_id).len(), 1);
    }

    #[test]
    fn test_charges_accumulate_on_open_invoice() {
        let mut ledger = InvoiceLedger::new();
        let patient_id = patient();

        ledger
            .add_charge(patient_id, "CONS-GENERAL", "General consultation", 1, 80_000, None)
            .unwrap();
        let invoice = ledger
            .add_charge(patient_id, "LAB-CBC", "Complete blood count", 1, 50_000, None)
            .unwrap();

        assert_eq!(invoice.total, 130_000);
        assert_eq!(invoice.items.len(), 2);
        assert_eq!(ledger.invoices_for_patient(patient_id).len(), 1);
    }

    #[test]
    fn test_same_source_replaces_item() {
        let mut ledger = InvoiceLedger::new();
        let patient_id = patient();
        let admission_id = Uuid::new_v4();

        ledger
            .add_charge(patient_id, "BED-DAY", "Inpatient bed (1 day)", 1, 200_000, Some(admission_id))
            .unwrap();
        let invoice = ledger
            .add_charge(patient_id, "BED-DAY", "Inpatient bed (3 days)", 3, 200_000, Some(admission_id))
            .unwrap();

        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.total, 600_000);
    }

    #[test]
    fn test_settled_source_reaccrual_stays_on_same_invoice() {
        let mut ledger = InvoiceLedger::new();
        let patient_id = patient();
        let admission_id = Uuid::new_v4();

        let invoice = ledger
            .add_charge(patient_id, "BED-DAY", "Inpatient bed (1 day)", 1, 200_000, Some(admission_id))
            .unwrap();
        ledger
            .record_payment(invoice.id, 200_000, PaymentMethod::Cash)
            .unwrap();

        // 金额不变的重复核算不产生新账单也不产生欠费
        let after = ledger
            .add_charge(patient_id, "BED-DAY", "Inpatient bed (1 day)", 1, 200_000, Some(admission_id))
            .unwrap();
        assert_eq!(after.id, invoice.id);
        assert_eq!(after.status, InvoiceStatus::Paid);
        assert_eq!(ledger.invoices_for_patient(patient_id).len(), 1);

        // 继续住院天数增加时，原账单重新出现欠费
        let reopened = ledger
            .add_charge(patient_id, "BED-DAY", "Inpatient bed (2 days)", 2, 200_000, Some(admission_id))
            .unwrap();
        assert_eq!(reopened.id, invoice.id);
        assert_eq!(reopened.status, InvoiceStatus::Partial);
        assert_eq!(reopened.balance(), 200_000);
    }

    #[test]
    fn test_payment_transitions() {
        let mut ledger = InvoiceLedger::new();
        let patient_id = patient();

        let invoice = ledger
            .add_charge(patient_id, "CONS-GENERAL", "General consultation", 1, 80_000, None)
            .unwrap();

        ledger
            .record_payment(invoice.id, 30_000, PaymentMethod::Cash)
            .unwrap();
        assert_eq!(
            ledger.get_invoice(invoice.id).unwrap().status,
            InvoiceStatus::Partial
        );

        ledger
            .record_payment(invoice.id, 50_000, PaymentMethod::Card)
            .unwrap();
        assert_eq!(
            ledger.get_invoice(invoice.id).unwrap().status,
            InvoiceStatus::Paid
        );
        assert_eq!(ledger.outstanding_balance(patient_id), 0);
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut ledger = InvoiceLedger::new();
        let patient_id = patient();

        let invoice = ledger
            .add_charge(patient_id, "CONS-GENERAL", "General consultation", 1, 80_000, None)
            .unwrap();

        assert!(ledger
            .record_payment(invoice.id, 100_000, PaymentMethod::Cash)
            .is_err());
        assert!(ledger
            .record_payment(invoice.id, 0, PaymentMethod::Cash)
            .is_err());
    }

    #[test]
    fn test_new_invoice_after_settlement() {
        let mut ledger = InvoiceLedger::new();
        let patient_id = patient();

        let first = ledger
            .add_charge(patient_id, "CONS-GENERAL", "General consultation", 1, 80_000, None)
            .unwrap();
        ledger
            .record_payment(first.id, 80_000, PaymentMethod::Cash)
            .unwrap();

        let second = ledger
            .add_charge(patient_id, "CONS-GENERAL", "General consultation", 1, 80_000, None)
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(ledger.invoices_for_patient(patient_id).len(), 2);
    }

    #[test]
    fn test_stats() {
        let mut ledger = InvoiceLedger::new();
        let a = patient();
        let b = patient();

        let inv_a = ledger
            .add_charge(a, "CONS-GENERAL", "General consultation", 1, 80_000, None)
            .unwrap();
        ledger
            .add_charge(b, "CONS-CARDIOLOGY", "Cardiology consultation", 1, 150_000, None)
            .unwrap();
        ledger
            .record_payment(inv_a.id, 80_000, PaymentMethod::Cash)
            .unwrap();

        let stats = ledger.stats();
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.paid_invoices, 1);
        assert_eq!(stats.unpaid_invoices, 1);
        assert_eq!(stats.revenue_collected, 80_000);
        assert_eq!(stats.outstanding_total, 150_000);
    }
}
