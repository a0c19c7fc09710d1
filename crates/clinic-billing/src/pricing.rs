//! 服务价目表

use clinic_core::{ClinicError, DoctorSpecialty, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 床位日费用的计费代码
pub const BED_DAY_CODE: &str = "BED-DAY";

/// 价目表条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePrice {
    pub code: String,
    pub description: String,
    pub price: i64,
}

/// 服务价目表
#[derive(Debug)]
pub struct PriceList {
    prices: HashMap<String, ServicePrice>,
}

impl PriceList {
    /// 创建空价目表
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// 带标准条目的价目表
    pub fn with_defaults() -> Self {
        let mut list = Self::new();

        list.set_price("CONS-GENERAL", "General consultation", 80_000);
        list.set_price("CONS-THERAPY", "Therapy consultation", 100_000);
        list.set_price("CONS-PEDIATRICS", "Pediatric consultation", 90_000);
        list.set_price("CONS-CARDIOLOGY", "Cardiology consultation", 150_000);
        list.set_price("CONS-DERMATOLOGY", "Dermatology consultation", 120_000);
        list.set_price("CONS-SURGERY", "Surgical consultation", 150_000);
        list.set_price("CONS-GYNECOLOGY", "Gynecology consultation", 130_000);
        list.set_price(BED_DAY_CODE, "Inpatient bed (per day)", 200_000);

        list
    }

    /// 门诊就诊对应的计费代码
    pub fn consultation_code(specialty: &DoctorSpecialty) -> &'static str {
        match specialty {
            DoctorSpecialty::General => "CONS-GENERAL",
            DoctorSpecialty::Therapy => "CONS-THERAPY",
            DoctorSpecialty::Pediatrics => "CONS-PEDIATRICS",
            DoctorSpecialty::Cardiology => "CONS-CARDIOLOGY",
            DoctorSpecialty::Dermatology => "CONS-DERMATOLOGY",
            DoctorSpecialty::Surgery => "CONS-SURGERY",
            DoctorSpecialty::Gynecology => "CONS-GYNECOLOGY",
        }
    }

    /// 设置价格（已存在则覆盖）
    pub fn set_price(&mut self, code: &str, description: &str, price: i64) {
        self.prices.insert(
            code.to_string(),
            ServicePrice {
                code: code.to_string(),
                description: description.to_string(),
                price,
            },
        );
    }

    /// 查询价格，未知代码为验证错误
    pub fn lookup(&self, code: &str) -> Result<&ServicePrice> {
        self.prices
            .get(code)
            .ok_or_else(|| ClinicError::Validation(format!("Unknown service code: {}", code)))
    }

    /// 全部条目
    pub fn all(&self) -> Vec<&ServicePrice> {
        let mut entries: Vec<&ServicePrice> = self.prices.values().collect();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }
}

impl Default for PriceList {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_specialties() {
        let list = PriceList::with_defaults();

        for specialty in [
            DoctorSpecialty::General,
            DoctorSpecialty::Therapy,
            DoctorSpecialty::Pediatrics,
            DoctorSpecialty::Cardiology,
            DoctorSpecialty::Dermatology,
            DoctorSpecialty::Surgery,
            DoctorSpecialty::Gynecology,
        ] {
            let code = PriceList::consultation_code(&specialty);
            assert!(list.lookup(code).is_ok(), "missing price for {}", code);
        }

        assert!(list.lookup(BED_DAY_CODE).is_ok());
    }

    #[test]
    fn test_unknown_code() {
        let list = PriceList::with_defaults();
        assert!(list.lookup("NO-SUCH-CODE").is_err());
    }

    #[test]
    fn test_set_price_overrides() {
        let mut list = PriceList::with_defaults();
        list.set_price(BED_DAY_CODE, "Inpatient bed (per day)", 250_000);
        assert_eq!(list.lookup(BED_DAY_CODE).unwrap().price, 250_000);
    }
}
