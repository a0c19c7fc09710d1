//! 通用工具函数

use chrono::Utc;
use uuid::Uuid;

/// 生成病历号
pub fn generate_mrn() -> String {
    let tail = Uuid::new_v4().simple().to_string();
    format!("P-{}-{}", Utc::now().format("%y%m%d"), &tail[..6].to_uppercase())
}

/// 验证病历号格式
pub fn is_valid_mrn(mrn: &str) -> bool {
    let parts: Vec<&str> = mrn.split('-').collect();
    parts.len() == 3
        && parts[0] == "P"
        && parts[1].len() == 6
        && parts[1].chars().all(|c| c.is_ascii_digit())
        && parts[2].len() == 6
        && parts[2].chars().all(|c| c.is_ascii_alphanumeric())
}

/// 生成账单编号
pub fn generate_invoice_number() -> String {
    let tail = Uuid::new_v4().simple().to_string();
    format!("INV-{}-{}", Utc::now().format("%y%m%d"), &tail[..6].to_uppercase())
}

/// 验证电话号码（允许前导+，其余为7~15位数字）
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

/// 将最小货币单位金额格式化为带两位小数的字符串
pub fn format_money(amount: i64) -> String {
    format!("{}.{:02}", amount / 100, (amount % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_mrn() {
        let mrn = generate_mrn();
        assert!(is_valid_mrn(&mrn), "generated MRN should validate: {}", mrn);
    }

    #[test]
    fn test_is_valid_mrn() {
        assert!(is_valid_mrn("P-240115-A1B2C3"));
        assert!(!is_valid_mrn(""));
        assert!(!is_valid_mrn("P-2401-A1B2C3"));
        assert!(!is_valid_mrn("X-240115-A1B2C3"));
    }

    #[test]
    fn test_invoice_number() {
        let number = generate_invoice_number();
        assert!(number.starts_with("INV-"));
        assert_eq!(number.split('-').count(), 3);
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("+998901234567"));
        assert!(is_valid_phone("9981234"));
        assert!(!is_valid_phone("12-34"));
        assert!(!is_valid_phone("abc1234567"));
        assert!(!is_valid_phone("123"));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(150000), "1500.00");
        assert_eq!(format_money(99), "0.99");
        assert_eq!(format_money(100), "1.00");
    }
}
